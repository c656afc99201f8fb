use crate::protocol::parts::option_part::{OptionId, OptionPart};
use crate::protocol::parts::option_value::OptionValue;

// The statement context ties the statements of a transaction together.
// The server sends a sequence info value with each reply; the client
// echoes the last one it saw with each subsequent request.
pub(crate) type StatementContext = OptionPart<StatementContextId>;

#[derive(Clone, Copy, Debug, Eq, Ord, PartialEq, PartialOrd)]
pub(crate) enum StatementContextId {
    StatementSequenceInfo,         // 1
    ServerProcessingTime,          // 2, microseconds
    SchemaName,                    // 3
    FlagSet,                       // 4
    QueryTimeout,                  // 5
    ClientReconnectionWaitTimeout, // 6
    ServerCpuTime,                 // 7, microseconds
    ServerMemoryUsage,             // 8, bytes
    Unknown(u8),
}

impl OptionId for StatementContextId {
    fn from_u8(i: u8) -> Self {
        match i {
            1 => Self::StatementSequenceInfo,
            2 => Self::ServerProcessingTime,
            3 => Self::SchemaName,
            4 => Self::FlagSet,
            5 => Self::QueryTimeout,
            6 => Self::ClientReconnectionWaitTimeout,
            7 => Self::ServerCpuTime,
            8 => Self::ServerMemoryUsage,
            i => Self::Unknown(i),
        }
    }
    fn to_u8(self) -> u8 {
        match self {
            Self::StatementSequenceInfo => 1,
            Self::ServerProcessingTime => 2,
            Self::SchemaName => 3,
            Self::FlagSet => 4,
            Self::QueryTimeout => 5,
            Self::ClientReconnectionWaitTimeout => 6,
            Self::ServerCpuTime => 7,
            Self::ServerMemoryUsage => 8,
            Self::Unknown(i) => i,
        }
    }
    fn part_name() -> &'static str {
        "StatementContext"
    }
}

impl StatementContext {
    pub fn with_sequence_info(value: i64) -> Self {
        let mut part = Self::default();
        part.insert(
            StatementContextId::StatementSequenceInfo,
            OptionValue::BigInt(value),
        );
        part
    }

    pub fn statement_sequence_info(&self) -> Option<i64> {
        match self.get_opt(StatementContextId::StatementSequenceInfo) {
            Some(OptionValue::BigInt(value)) => Some(*value),
            _ => None,
        }
    }
}
