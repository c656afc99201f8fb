use crate::conn::HanaVersion;
use crate::protocol::parts::option_part::{OptionId, OptionPart};
use crate::protocol::parts::option_value::OptionValue;
use crate::ScnpResult;

// Data-format version this driver asks for. The server may grant less;
// the granted value gates the type codes used on the wire.
pub(crate) const REQUESTED_DATA_FORMAT_VERSION: i32 = 8;

pub(crate) type ConnectOptionsPart = OptionPart<ConnOptId>;

// The connect-options handshake: the client states its capabilities with
// the connect request, the server replies with what it grants plus its own
// identity (connection id, system id, version string).
#[derive(Clone, Debug)]
pub(crate) struct ConnectOptions {
    client_locale: Option<String>,
    os_user: String,
    data_format_version: i32,
    connection_id: Option<u32>,
    system_id: Option<String>,
    database_name: Option<String>,
    full_version: Option<HanaVersion>,
    implicit_lob_streaming: bool,
}

impl ConnectOptions {
    pub fn new(client_locale: Option<String>, os_user: String) -> Self {
        Self {
            client_locale,
            os_user,
            data_format_version: REQUESTED_DATA_FORMAT_VERSION,
            connection_id: None,
            system_id: None,
            database_name: None,
            full_version: None,
            implicit_lob_streaming: false,
        }
    }

    // The option bag that goes out with the connect request.
    pub fn for_server(&self) -> ConnectOptionsPart {
        let mut part = ConnectOptionsPart::default();
        part.insert(ConnOptId::CompleteArrayExecution, OptionValue::Boolean(true));
        part.insert(ConnOptId::ClientDistributionMode, OptionValue::Int(0)); // off
        part.insert(ConnOptId::SplitBatchCommands, OptionValue::Boolean(true));
        part.insert(
            ConnOptId::DataFormatVersion2,
            OptionValue::Int(REQUESTED_DATA_FORMAT_VERSION),
        );
        part.insert(ConnOptId::OsUser, OptionValue::String(self.os_user.clone()));
        if let Some(ref locale) = self.client_locale {
            part.insert(ConnOptId::ClientLocale, OptionValue::String(locale.clone()));
        }
        part
    }

    // Digests the server's connect-options reply. The data-format version
    // the server grants can be lower than the requested one and is the one
    // that counts from here on.
    pub fn digest_server_options(&mut self, incoming: ConnectOptionsPart) -> ScnpResult<()> {
        for (id, value) in incoming.iter() {
            match id {
                ConnOptId::ConnectionID => {
                    self.connection_id = Some(value.get_int()?.max(0) as u32);
                }
                ConnOptId::DataFormatVersion2 => {
                    self.data_format_version = value.get_int()?;
                    debug!("server granted data format version {}", self.data_format_version);
                }
                ConnOptId::SystemID => {
                    self.system_id = Some(value.get_string()?.to_string());
                }
                ConnOptId::DatabaseName => {
                    self.database_name = Some(value.get_string()?.to_string());
                }
                ConnOptId::FullVersionString => {
                    self.full_version = Some(HanaVersion::parse(value.get_string()?));
                }
                ConnOptId::ImplicitLobStreaming => {
                    self.implicit_lob_streaming = value.get_bool()?;
                }
                id => {
                    debug!("ignoring connect option from server: {id:?} = {value:?}");
                }
            }
        }
        Ok(())
    }

    pub fn data_format_version(&self) -> i32 {
        self.data_format_version
    }

    pub fn connection_id(&self) -> Option<u32> {
        self.connection_id
    }

    pub fn full_version(&self) -> Option<&HanaVersion> {
        self.full_version.as_ref()
    }

    pub fn database_name(&self) -> Option<&str> {
        self.database_name.as_deref()
    }

    pub fn implicit_lob_streaming(&self) -> bool {
        self.implicit_lob_streaming
    }
}

#[derive(Clone, Copy, Debug, Eq, Ord, PartialEq, PartialOrd)]
#[rustfmt::skip]
pub(crate) enum ConnOptId {
    ConnectionID,              //  1  filled by the server, usable for KILL
    CompleteArrayExecution,    //  2  deprecated, always true
    ClientLocale,              //  3  used within the calculation engine
    SystemID,                  // 11  SID of the instance (output only)
    ClientDistributionMode,    // 15
    SplitBatchCommands,        // 18  permit splitting of batch commands
    DataFormatVersion2,        // 23  the negotiated data format version
    OsUser,                    // 32  operating-system user of the client
    EnableArrayType,           // 36
    ImplicitLobStreaming,      // 37
    FullVersionString,         // 44  server version (output only)
    DatabaseName,              // 45  (MDC) database name (output only)
    ClientReconnectWaitTimeout,// 51
    OriginalAnchorConnectionID,// 52
    Unknown(u8),
}

impl OptionId for ConnOptId {
    fn from_u8(i: u8) -> Self {
        match i {
            1 => Self::ConnectionID,
            2 => Self::CompleteArrayExecution,
            3 => Self::ClientLocale,
            11 => Self::SystemID,
            15 => Self::ClientDistributionMode,
            18 => Self::SplitBatchCommands,
            23 => Self::DataFormatVersion2,
            32 => Self::OsUser,
            36 => Self::EnableArrayType,
            37 => Self::ImplicitLobStreaming,
            44 => Self::FullVersionString,
            45 => Self::DatabaseName,
            51 => Self::ClientReconnectWaitTimeout,
            52 => Self::OriginalAnchorConnectionID,
            i => Self::Unknown(i),
        }
    }
    fn to_u8(self) -> u8 {
        match self {
            Self::ConnectionID => 1,
            Self::CompleteArrayExecution => 2,
            Self::ClientLocale => 3,
            Self::SystemID => 11,
            Self::ClientDistributionMode => 15,
            Self::SplitBatchCommands => 18,
            Self::DataFormatVersion2 => 23,
            Self::OsUser => 32,
            Self::EnableArrayType => 36,
            Self::ImplicitLobStreaming => 37,
            Self::FullVersionString => 44,
            Self::DatabaseName => 45,
            Self::ClientReconnectWaitTimeout => 51,
            Self::OriginalAnchorConnectionID => 52,
            Self::Unknown(i) => i,
        }
    }
    fn part_name() -> &'static str {
        "ConnectOptions"
    }
}
