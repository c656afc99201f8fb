use crate::protocol::parts::option_part::{OptionId, OptionPart};
use crate::protocol::parts::option_value::OptionValue;
use crate::ScnpResult;

// Request/reply payload of the DbConnectInfo message: asks where a given
// database of a multi-database system is reachable.
pub(crate) type DbConnectInfo = OptionPart<DbConnectInfoId>;

#[derive(Clone, Copy, Debug, Eq, Ord, PartialEq, PartialOrd)]
pub(crate) enum DbConnectInfoId {
    DatabaseName,      // 1
    Host,              // 2
    Port,              // 3
    OnCorrectDatabase, // 4
    NetworkGroup,      // 5
    Unknown(u8),
}

impl OptionId for DbConnectInfoId {
    fn from_u8(i: u8) -> Self {
        match i {
            1 => Self::DatabaseName,
            2 => Self::Host,
            3 => Self::Port,
            4 => Self::OnCorrectDatabase,
            5 => Self::NetworkGroup,
            i => Self::Unknown(i),
        }
    }
    fn to_u8(self) -> u8 {
        match self {
            Self::DatabaseName => 1,
            Self::Host => 2,
            Self::Port => 3,
            Self::OnCorrectDatabase => 4,
            Self::NetworkGroup => 5,
            Self::Unknown(i) => i,
        }
    }
    fn part_name() -> &'static str {
        "DbConnectInfo"
    }
}

impl DbConnectInfo {
    pub fn request(database_name: String, network_group: Option<String>) -> Self {
        let mut part = Self::default();
        part.insert(DbConnectInfoId::DatabaseName, OptionValue::String(database_name));
        if let Some(group) = network_group {
            part.insert(DbConnectInfoId::NetworkGroup, OptionValue::String(group));
        }
        part
    }

    pub fn on_correct_database(&self) -> ScnpResult<bool> {
        self.get(DbConnectInfoId::OnCorrectDatabase)?.get_bool()
    }

    pub fn host(&self) -> ScnpResult<&str> {
        self.get(DbConnectInfoId::Host)?.get_string()
    }

    pub fn port(&self) -> ScnpResult<u16> {
        let port = self.get(DbConnectInfoId::Port)?.get_int()?;
        u16::try_from(port)
            .map_err(|_| crate::ScnpError::Protocol(format!("invalid port number {port}")))
    }
}
