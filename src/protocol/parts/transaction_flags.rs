use crate::protocol::parts::option_part::{OptionId, OptionPart};

// Transaction state changes are reported with most replies.
pub(crate) type TransactionFlags = OptionPart<TaFlagId>;

#[derive(Clone, Copy, Debug, Eq, Ord, PartialEq, PartialOrd)]
pub(crate) enum TaFlagId {
    RolledBack,            // 0
    Committed,             // 1
    NewIsolationlevel,     // 2
    DdlCommitmodeChanged,  // 3
    WriteTaStarted,        // 4
    NoWriteTaStarted,      // 5
    SessionclosingTaError, // 6
    Unknown(u8),
}

impl OptionId for TaFlagId {
    fn from_u8(i: u8) -> Self {
        match i {
            0 => Self::RolledBack,
            1 => Self::Committed,
            2 => Self::NewIsolationlevel,
            3 => Self::DdlCommitmodeChanged,
            4 => Self::WriteTaStarted,
            5 => Self::NoWriteTaStarted,
            6 => Self::SessionclosingTaError,
            i => Self::Unknown(i),
        }
    }
    fn to_u8(self) -> u8 {
        match self {
            Self::RolledBack => 0,
            Self::Committed => 1,
            Self::NewIsolationlevel => 2,
            Self::DdlCommitmodeChanged => 3,
            Self::WriteTaStarted => 4,
            Self::NoWriteTaStarted => 5,
            Self::SessionclosingTaError => 6,
            Self::Unknown(i) => i,
        }
    }
    fn part_name() -> &'static str {
        "TransactionFlags"
    }
}

impl TransactionFlags {
    pub fn is_committed(&self) -> bool {
        self.get_opt(TaFlagId::Committed)
            .and_then(|v| v.get_bool().ok())
            .unwrap_or(false)
    }
    pub fn is_rolled_back(&self) -> bool {
        self.get_opt(TaFlagId::RolledBack)
            .and_then(|v| v.get_bool().ok())
            .unwrap_or(false)
    }
    pub fn write_transaction_started(&self) -> bool {
        self.get_opt(TaFlagId::WriteTaStarted)
            .and_then(|v| v.get_bool().ok())
            .unwrap_or(false)
    }
    pub fn is_session_closing_error(&self) -> bool {
        self.get_opt(TaFlagId::SessionclosingTaError)
            .and_then(|v| v.get_bool().ok())
            .unwrap_or(false)
    }
}
