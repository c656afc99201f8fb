use crate::scnp_error::prot_err;
use crate::ScnpResult;

// All part kinds this driver sends or understands. Kinds that can occur in
// replies but carry nothing we act on (topology, partition information,
// session context, ...) are listed so that the reply reader can skip them
// by byte length.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub(crate) enum PartKind {
    Command = 3,              // SQL command text
    ResultSet = 5,            // tabular result set data
    Error = 6,                // error information
    StatementId = 10,         // prepared statement identifier
    TransactionId = 11,       // transaction identifier
    ExecutionResults = 12,    // rows affected by a DML statement
    ResultSetId = 13,         // identifier of a result set
    TopologyInformation = 15, // landscape topology
    TableLocation = 16,       // location of table data
    ReadLobRequest = 17,      // request data of a READLOB message
    ReadLobReply = 18,        // reply data of a READLOB message
    CommandInfo = 27,         // command information
    WriteLobRequest = 28,     // request data of a WRITELOB message
    ClientContext = 29,       // client context
    WriteLobReply = 30,       // reply data of a WRITELOB message
    Parameters = 32,          // input parameter data
    Authentication = 33,      // authentication data
    SessionContext = 34,      // session context information
    ClientId = 35,            // identity of the client process
    StatementContext = 39,    // statement visibility context
    PartitionInformation = 40, // table partitioning information
    OutputParameters = 41,    // output parameter data
    ConnectOptions = 42,      // connect options
    FetchSize = 45,           // number of rows to fetch
    ParameterMetadata = 47,   // parameter metadata
    ResultSetMetadata = 48,   // result set metadata
    ClientInfo = 57,          // client information values
    TransactionFlags = 64,    // transaction handling flags
    DbConnectInfo = 67,       // part of a redirect response
    LobFlags = 68,            // LOB flags
    ResultSetOptions = 69,    // additional context data for result sets
}

impl PartKind {
    pub fn from_i8(val: i8) -> ScnpResult<Self> {
        match val {
            3 => Ok(Self::Command),
            5 => Ok(Self::ResultSet),
            6 => Ok(Self::Error),
            10 => Ok(Self::StatementId),
            11 => Ok(Self::TransactionId),
            12 => Ok(Self::ExecutionResults),
            13 => Ok(Self::ResultSetId),
            15 => Ok(Self::TopologyInformation),
            16 => Ok(Self::TableLocation),
            17 => Ok(Self::ReadLobRequest),
            18 => Ok(Self::ReadLobReply),
            27 => Ok(Self::CommandInfo),
            28 => Ok(Self::WriteLobRequest),
            29 => Ok(Self::ClientContext),
            30 => Ok(Self::WriteLobReply),
            32 => Ok(Self::Parameters),
            33 => Ok(Self::Authentication),
            34 => Ok(Self::SessionContext),
            35 => Ok(Self::ClientId),
            39 => Ok(Self::StatementContext),
            40 => Ok(Self::PartitionInformation),
            41 => Ok(Self::OutputParameters),
            42 => Ok(Self::ConnectOptions),
            45 => Ok(Self::FetchSize),
            47 => Ok(Self::ParameterMetadata),
            48 => Ok(Self::ResultSetMetadata),
            57 => Ok(Self::ClientInfo),
            64 => Ok(Self::TransactionFlags),
            67 => Ok(Self::DbConnectInfo),
            68 => Ok(Self::LobFlags),
            69 => Ok(Self::ResultSetOptions),
            _ => Err(prot_err!("invalid part kind {val}")),
        }
    }

    // Reply-side kinds that this driver does not act on; they are skipped
    // over by their declared byte length.
    pub fn is_skippable(self) -> bool {
        matches!(
            self,
            Self::TopologyInformation
                | Self::TableLocation
                | Self::PartitionInformation
                | Self::SessionContext
                | Self::CommandInfo
                | Self::ResultSetOptions
        )
    }
}
