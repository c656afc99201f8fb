use crate::base::RsState;
use crate::conn::{initial_request, ConnectConfiguration, SessionRef, TcpClient};
use crate::protocol::parts::{
    ClientInfo, ConnectOptions, ParameterDescriptors, ResultSetMetadata, ServerError,
    StatementContext, TransactionFlags,
};
use crate::protocol::{MessageType, Part, Reply, Request};
use crate::scnp_error::prot_err;
use crate::stats::{Metric, Statistics};
use crate::{ScnpError, ScnpResult};
use std::sync::Arc;
use std::time::Instant;

// Owns the connection to the server and the session state: id, packet
// counter, negotiated options, transaction flags, warnings. All wire
// traffic of the session funnels through roundtrip().
#[derive(Debug)]
pub(crate) struct SessionCore {
    tcp_client: TcpClient,
    session_id: i64,
    packet_seq_number: i32,
    authenticated: bool,
    auto_commit: bool,
    in_transaction: bool,
    statement_sequence: Option<i64>,
    connect_options: ConnectOptions,
    client_info: ClientInfo,
    client_info_touched: bool,
    warnings: Vec<ServerError>,
}

impl SessionCore {
    // Connects and exchanges the prolog. Authentication is a separate
    // step on top of the returned core.
    pub fn try_new(config: &ConnectConfiguration) -> ScnpResult<Self> {
        let mut tcp_client = TcpClient::try_new(config)?;
        initial_request::send_and_receive(&mut tcp_client)?;

        let os_user = username::get_user_name().unwrap_or_default();
        let mut client_info = ClientInfo::default();
        if !config.application_name.is_empty() {
            client_info.set_application(&config.application_name);
        }

        Ok(Self {
            tcp_client,
            session_id: 0,
            packet_seq_number: 0,
            authenticated: false,
            auto_commit: true,
            in_transaction: false,
            statement_sequence: None,
            connect_options: ConnectOptions::new(config.client_locale.clone(), os_user),
            client_info,
            client_info_touched: true,
            warnings: Vec::new(),
        })
    }

    pub fn session_id(&self) -> i64 {
        self.session_id
    }

    pub fn set_session_id(&mut self, session_id: i64) {
        if session_id != self.session_id {
            debug!(
                "session id changes from {} to {session_id}",
                self.session_id
            );
            self.session_id = session_id;
        }
    }

    pub fn set_authenticated(&mut self) {
        self.authenticated = true;
    }

    pub fn connect_options(&self) -> &ConnectOptions {
        &self.connect_options
    }

    pub fn connect_options_mut(&mut self) -> &mut ConnectOptions {
        &mut self.connect_options
    }

    pub fn is_auto_commit(&self) -> bool {
        self.auto_commit
    }

    pub fn set_auto_commit(&mut self, auto_commit: bool) {
        self.auto_commit = auto_commit;
    }

    pub fn is_in_transaction(&self) -> bool {
        self.in_transaction
    }

    pub fn set_client_info_field(&mut self, setter: impl FnOnce(&mut ClientInfo)) {
        setter(&mut self.client_info);
        self.client_info_touched = true;
    }

    pub fn clear_warnings(&mut self) {
        self.warnings.clear();
    }

    pub fn set_warnings(&mut self, warnings: Vec<ServerError>) {
        for warning in &warnings {
            debug!("server warning: {warning}");
        }
        self.warnings = warnings;
    }

    pub fn take_warnings(&mut self) -> Vec<ServerError> {
        std::mem::take(&mut self.warnings)
    }

    pub fn evaluate_statement_context(&mut self, stmt_ctx: &StatementContext) {
        trace!(
            "received statement context with sequence info {:?}",
            stmt_ctx.statement_sequence_info()
        );
        self.statement_sequence = stmt_ctx.statement_sequence_info();
    }

    pub fn evaluate_ta_flags(&mut self, ta_flags: &TransactionFlags) -> ScnpResult<()> {
        if ta_flags.write_transaction_started() {
            self.in_transaction = true;
        }
        if ta_flags.is_committed() || ta_flags.is_rolled_back() {
            self.in_transaction = false;
        }
        if ta_flags.is_session_closing_error() {
            return Err(ScnpError::bad_connection(prot_err!(
                "server requested termination of the session"
            )));
        }
        Ok(())
    }

    fn next_seq_number(&mut self) -> i32 {
        self.packet_seq_number += 1;
        self.packet_seq_number
    }

    // Statement sequence info and changed client info ride along with the
    // next request.
    pub(crate) fn augment_request(&mut self, request: &mut Request) {
        if self.authenticated {
            if let Some(sequence_info) = self.statement_sequence {
                request.add_statement_context(sequence_info);
            }
            if self.client_info_touched && !self.client_info.is_empty() {
                // older servers reject ClientInfo outside of the connect
                let client_info_accepted = match self.connect_options.full_version() {
                    Some(version) => version.supports_client_info(),
                    None => true,
                };
                if client_info_accepted {
                    request.push(Part::ClientInfo(self.client_info.clone()));
                    self.client_info_touched = false;
                }
            }
        }
    }

    // One request, one reply; strictly alternating per connection.
    pub fn roundtrip(
        &mut self,
        request: &Request,
        session: Option<&SessionRef>,
        o_a_rsmd: Option<&Arc<ResultSetMetadata>>,
        o_a_descriptors: Option<&Arc<ParameterDescriptors>>,
        o_rs: &mut Option<&mut RsState>,
    ) -> ScnpResult<Reply> {
        let (session_id, seq_number, default_error_handling) =
            if let MessageType::Authenticate = request.message_type() {
                (0, 1, false)
            } else {
                (self.session_id, self.next_seq_number(), true)
            };
        let auto_commit = self.auto_commit;
        let stats = Statistics::global();

        // materialize the request and write it in one piece
        let mut buffer = Vec::<u8>::with_capacity(1024);
        request.emit(session_id, seq_number, auto_commit, o_a_descriptors, &mut buffer)?;
        trace!(
            "request: {} bytes, head: {}",
            buffer.len(),
            hex::encode(&buffer[..buffer.len().min(48)])
        );
        let started_writing = Instant::now();
        let w = self.tcp_client.writer();
        w.write_all(&buffer)?;
        w.flush()?;
        stats.record(Metric::Write, started_writing.elapsed());
        stats.add_bytes_written(buffer.len() as u64);

        let started_reading = Instant::now();
        let mut counting_reader = CountingReader::new(self.tcp_client.reader());
        let mut reply = Reply::parse(
            o_a_rsmd,
            o_a_descriptors,
            o_rs,
            session,
            &mut counting_reader,
        )?;
        stats.record(Metric::Read, started_reading.elapsed());
        stats.add_bytes_read(counting_reader.count);

        if default_error_handling {
            reply.handle_db_error(self)?;
        }
        Ok(reply)
    }

    // Sends the disconnect message; the reply is not awaited.
    pub fn emit_disconnect(&mut self) {
        if self.authenticated {
            debug!("disconnecting session {}", self.session_id);
            let request = Request::new_for_disconnect();
            let session_id = self.session_id;
            let seq_number = self.next_seq_number();
            let mut buffer = Vec::<u8>::with_capacity(64);
            if request
                .emit(session_id, seq_number, false, None, &mut buffer)
                .is_ok()
            {
                let w = self.tcp_client.writer();
                w.write_all(&buffer).ok();
                w.flush().ok();
            }
            self.authenticated = false;
        }
    }

    pub fn shutdown_handle(&self) -> std::io::Result<std::net::TcpStream> {
        self.tcp_client.shutdown_handle()
    }
}

impl Drop for SessionCore {
    fn drop(&mut self) {
        self.emit_disconnect();
    }
}

struct CountingReader<'a> {
    inner: &'a mut dyn std::io::Read,
    count: u64,
}

impl<'a> CountingReader<'a> {
    fn new(inner: &'a mut dyn std::io::Read) -> Self {
        Self { inner, count: 0 }
    }
}

impl std::io::Read for CountingReader<'_> {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        let n = self.inner.read(buf)?;
        self.count += n as u64;
        Ok(n)
    }
}
