use crate::protocol::util;
use crate::ScnpResult;
use byteorder::{LittleEndian, ReadBytesExt};
use std::error::Error;

// Error code the server uses for rejected authentication.
pub(crate) const CODE_AUTHENTICATION_FAILED: i32 = 10;

/// Severity of a server message.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Severity {
    /// A warning sent along with a regular response.
    Warning,
    /// The request could not be answered correctly.
    Error,
    /// A session-terminating error.
    Fatal,
    /// Severity value this driver does not know.
    Unknown(i8),
}

impl Severity {
    pub(crate) fn from_i8(i: i8) -> Self {
        match i {
            0 => Self::Warning,
            1 => Self::Error,
            2 => Self::Fatal,
            i => Self::Unknown(i),
        }
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match *self {
            Self::Warning => write!(f, "warning"),
            Self::Error => write!(f, "error"),
            Self::Fatal => write!(f, "fatal error"),
            Self::Unknown(i) => write!(f, "message of unknown severity ({i})"),
        }
    }
}

/// An error as reported by the database server.
#[derive(Clone, PartialEq, Eq)]
pub struct ServerError {
    code: i32,
    position: i32,
    severity: Severity,
    sqlstate: Vec<u8>,
    text: String,
}

const BASE_SIZE: i32 = 4 + 4 + 4 + 1 + 5;

impl ServerError {
    /// The server-side error code.
    #[must_use]
    pub fn code(&self) -> i32 {
        self.code
    }

    /// Position in the statement text where the error occurred.
    #[must_use]
    pub fn position(&self) -> i32 {
        self.position
    }

    /// Severity of the error.
    #[must_use]
    pub fn severity(&self) -> Severity {
        self.severity
    }

    /// The five-byte SQL state.
    #[must_use]
    pub fn sqlstate(&self) -> &[u8] {
        &self.sqlstate
    }

    /// The error description.
    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }

    pub(crate) fn new(
        code: i32,
        position: i32,
        severity: Severity,
        sqlstate: Vec<u8>,
        text: String,
    ) -> Self {
        Self {
            code,
            position,
            severity,
            sqlstate,
            text,
        }
    }

    // An Error part is an array of such records, each padded to 8 bytes.
    pub(crate) fn parse(no_of_args: usize, rdr: &mut dyn std::io::Read) -> ScnpResult<Vec<Self>> {
        let mut server_errors = Vec::with_capacity(no_of_args);
        for _ in 0..no_of_args {
            let code = rdr.read_i32::<LittleEndian>()?;
            let position = rdr.read_i32::<LittleEndian>()?;
            let text_length = rdr.read_i32::<LittleEndian>()?;
            let severity = Severity::from_i8(rdr.read_i8()?);
            let sqlstate = util::parse_bytes(5, rdr)?;
            let bytes = util::parse_bytes(text_length.max(0) as usize, rdr)?;
            let text = util::lossy_string_from_cesu8(&bytes);
            // each record ends with a filler byte and padding to 8
            let pad = 8 - (BASE_SIZE + text_length) % 8;
            util::skip_bytes(pad as usize, rdr)?;

            let server_error = Self::new(code, position, severity, sqlstate, text);
            debug!("parsed server error {server_error}");
            server_errors.push(server_error);
        }
        Ok(server_errors)
    }
}

impl Error for ServerError {}

impl std::fmt::Display for ServerError {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(
            f,
            r#"{} [code: {}, sql state: {}] at position {}: "{}""#,
            self.severity,
            self.code,
            String::from_utf8_lossy(&self.sqlstate),
            self.position,
            self.text
        )
    }
}

impl std::fmt::Debug for ServerError {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{self}")
    }
}
