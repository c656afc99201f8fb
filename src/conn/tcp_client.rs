use crate::conn::{ConnectConfiguration, Tls};
use crate::{ScnpError, ScnpResult};
use rustls::pki_types::{CertificateDer, ServerName, UnixTime};
use rustls::{ClientConfig, ClientConnection, RootCertStore, StreamOwned};
use std::net::TcpStream;
use std::sync::Arc;
use std::time::Duration;

// The byte stream to the server, plain or TLS. A clone of the underlying
// socket is kept for the canceller: shutting the socket down is the
// mechanism that interrupts an in-flight operation.
pub(crate) enum TcpClient {
    Plain(PlainTcpClient),
    Tls(TlsTcpClient),
}

impl std::fmt::Debug for TcpClient {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            Self::Plain(_) => write!(f, "TcpClient::Plain"),
            Self::Tls(_) => write!(f, "TcpClient::Tls"),
        }
    }
}

impl TcpClient {
    pub fn try_new(config: &ConnectConfiguration) -> ScnpResult<Self> {
        Ok(match config.tls {
            Tls::Off => Self::Plain(PlainTcpClient::try_new(config)?),
            _ => Self::Tls(TlsTcpClient::try_new(config)?),
        })
    }

    pub fn writer(&mut self) -> &mut dyn std::io::Write {
        match self {
            Self::Plain(client) => &mut client.writer,
            Self::Tls(client) => &mut client.stream,
        }
    }

    pub fn reader(&mut self) -> &mut dyn std::io::Read {
        match self {
            Self::Plain(client) => &mut client.reader,
            Self::Tls(client) => &mut client.stream,
        }
    }

    // A second handle to the socket, used by the canceller to shut the
    // connection down from another thread.
    pub fn shutdown_handle(&self) -> std::io::Result<TcpStream> {
        match self {
            Self::Plain(client) => client.reader.try_clone(),
            Self::Tls(client) => client.stream.sock.try_clone(),
        }
    }
}

pub(crate) struct PlainTcpClient {
    reader: TcpStream,
    writer: TcpStream,
}

impl PlainTcpClient {
    fn try_new(config: &ConnectConfiguration) -> ScnpResult<Self> {
        debug!("connecting to {}:{}", config.host, config.port);
        let tcp_stream = TcpStream::connect(config.addr())?;
        tcp_stream.set_nodelay(true)?;
        set_io_timeouts(&tcp_stream, config.io_timeout)?;
        Ok(Self {
            writer: tcp_stream.try_clone()?,
            reader: tcp_stream,
        })
    }
}

pub(crate) struct TlsTcpClient {
    stream: StreamOwned<ClientConnection, TcpStream>,
}

impl TlsTcpClient {
    fn try_new(config: &ConnectConfiguration) -> ScnpResult<Self> {
        let client_config = Arc::new(rustls_client_config(&config.tls)?);
        let server_name = ServerName::try_from(config.host.clone())?;
        let client_connection = ClientConnection::new(client_config, server_name)?;

        debug!("connecting to {}:{} with TLS", config.host, config.port);
        let tcp_stream = TcpStream::connect(config.addr())?;
        tcp_stream.set_nodelay(true)?;
        set_io_timeouts(&tcp_stream, config.io_timeout)?;
        Ok(Self {
            stream: StreamOwned::new(client_connection, tcp_stream),
        })
    }
}

fn set_io_timeouts(tcp_stream: &TcpStream, timeout: Option<Duration>) -> std::io::Result<()> {
    tcp_stream.set_read_timeout(timeout)?;
    tcp_stream.set_write_timeout(timeout)
}

fn rustls_client_config(tls: &Tls) -> ScnpResult<ClientConfig> {
    match tls {
        Tls::Off => unreachable!("no TLS config for plain connections"),
        Tls::Secure => {
            let mut root_store = RootCertStore::empty();
            root_store.extend(webpki_roots::TLS_SERVER_ROOTS.iter().cloned());
            Ok(ClientConfig::builder()
                .with_root_certificates(root_store)
                .with_no_client_auth())
        }
        Tls::SecureWithRoots(der_certs) => {
            let mut root_store = RootCertStore::empty();
            for der in der_certs {
                root_store
                    .add(CertificateDer::from(der.clone()))
                    .map_err(|e| ScnpError::TlsProtocol { source: e })?;
            }
            Ok(ClientConfig::builder()
                .with_root_certificates(root_store)
                .with_no_client_auth())
        }
        Tls::Insecure => {
            warn!("TLS certificate validation is switched off");
            Ok(ClientConfig::builder()
                .dangerous()
                .with_custom_certificate_verifier(Arc::new(NoCertVerification(
                    rustls::crypto::ring::default_provider(),
                )))
                .with_no_client_auth())
        }
    }
}

// Accepts any server certificate; signatures are still verified.
#[derive(Debug)]
struct NoCertVerification(rustls::crypto::CryptoProvider);

impl rustls::client::danger::ServerCertVerifier for NoCertVerification {
    fn verify_server_cert(
        &self,
        _end_entity: &CertificateDer<'_>,
        _intermediates: &[CertificateDer<'_>],
        _server_name: &ServerName<'_>,
        _ocsp_response: &[u8],
        _now: UnixTime,
    ) -> Result<rustls::client::danger::ServerCertVerified, rustls::Error> {
        Ok(rustls::client::danger::ServerCertVerified::assertion())
    }

    fn verify_tls12_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &rustls::DigitallySignedStruct,
    ) -> Result<rustls::client::danger::HandshakeSignatureValid, rustls::Error> {
        rustls::crypto::verify_tls12_signature(
            message,
            cert,
            dss,
            &self.0.signature_verification_algorithms,
        )
    }

    fn verify_tls13_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &rustls::DigitallySignedStruct,
    ) -> Result<rustls::client::danger::HandshakeSignatureValid, rustls::Error> {
        rustls::crypto::verify_tls13_signature(
            message,
            cert,
            dss,
            &self.0.signature_verification_algorithms,
        )
    }

    fn supported_verify_schemes(&self) -> Vec<rustls::SignatureScheme> {
        self.0
            .signature_verification_algorithms
            .supported_schemes()
    }
}
