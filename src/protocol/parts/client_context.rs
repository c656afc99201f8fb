use crate::protocol::parts::option_part::{OptionId, OptionPart};
use crate::protocol::parts::option_value::OptionValue;

// The client context is sent with the first authentication request and
// identifies the driver to the server.
pub(crate) type ClientContext = OptionPart<ClientContextId>;

#[derive(Clone, Copy, Debug, Eq, Ord, PartialEq, PartialOrd)]
pub(crate) enum ClientContextId {
    ClientVersion,            // 1
    ClientType,               // 2
    ClientApplicationProgram, // 3
    Unknown(u8),
}

impl OptionId for ClientContextId {
    fn from_u8(i: u8) -> Self {
        match i {
            1 => Self::ClientVersion,
            2 => Self::ClientType,
            3 => Self::ClientApplicationProgram,
            i => Self::Unknown(i),
        }
    }
    fn to_u8(self) -> u8 {
        match self {
            Self::ClientVersion => 1,
            Self::ClientType => 2,
            Self::ClientApplicationProgram => 3,
            Self::Unknown(i) => i,
        }
    }
    fn part_name() -> &'static str {
        "ClientContext"
    }
}

impl ClientContext {
    pub fn for_connect(application_name: &str) -> Self {
        let mut cc = Self::default();
        cc.insert(
            ClientContextId::ClientVersion,
            OptionValue::String(env!("CARGO_PKG_VERSION").to_string()),
        );
        cc.insert(
            ClientContextId::ClientType,
            OptionValue::String(env!("CARGO_PKG_NAME").to_string()),
        );
        cc.insert(
            ClientContextId::ClientApplicationProgram,
            OptionValue::String(application_name.to_string()),
        );
        cc
    }
}
