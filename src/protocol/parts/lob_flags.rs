use crate::protocol::parts::option_part::{OptionId, OptionPart};
use crate::protocol::parts::option_value::OptionValue;

// Sent with execute requests that stream LOB input, to announce implicit
// LOB streaming to the server.
pub(crate) type LobFlags = OptionPart<LobFlagsId>;

#[derive(Clone, Copy, Debug, Eq, Ord, PartialEq, PartialOrd)]
pub(crate) enum LobFlagsId {
    ImplicitStreaming, // 0
    Unknown(u8),
}

impl OptionId for LobFlagsId {
    fn from_u8(i: u8) -> Self {
        match i {
            0 => Self::ImplicitStreaming,
            i => Self::Unknown(i),
        }
    }
    fn to_u8(self) -> u8 {
        match self {
            Self::ImplicitStreaming => 0,
            Self::Unknown(i) => i,
        }
    }
    fn part_name() -> &'static str {
        "LobFlags"
    }
}

impl LobFlags {
    pub fn implicit_streaming() -> Self {
        let mut flags = Self::default();
        flags.insert(LobFlagsId::ImplicitStreaming, OptionValue::Boolean(true));
        flags
    }
}
