use crate::scnp_error::prot_err;
use crate::ScnpResult;

// The function code of a reply segment. It identifies the nature of the
// statement or functionality that has been executed.
// ABAP-only and reserved numbers are omitted.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub(crate) enum ReplyType {
    Nil,                       // Nil
    Ddl,                       // DDL statement
    Insert,                    // INSERT statement
    Update,                    // UPDATE statement
    Delete,                    // DELETE statement
    Select,                    // SELECT statement
    SelectForUpdate,           // SELECT ... FOR UPDATE statement
    Explain,                   // EXPLAIN statement
    DbProcedureCall,           // CALL statement
    DbProcedureCallWithResult, // CALL statement returning one or more results
    Fetch,                     // FETCH message
    Commit,                    // COMMIT message or statement
    Rollback,                  // ROLLBACK message or statement
    Connect,                   // CONNECT or AUTHENTICATE message
    WriteLob,                  // WRITELOB message
    ReadLob,                   // READLOB message
    Disconnect,                // DISCONNECT message
    CloseCursor,               // CLOSECURSOR message
}

impl ReplyType {
    pub fn from_i16(val: i16) -> ScnpResult<Self> {
        match val {
            0 => Ok(Self::Nil),
            1 => Ok(Self::Ddl),
            2 => Ok(Self::Insert),
            3 => Ok(Self::Update),
            4 => Ok(Self::Delete),
            5 => Ok(Self::Select),
            6 => Ok(Self::SelectForUpdate),
            7 => Ok(Self::Explain),
            8 => Ok(Self::DbProcedureCall),
            9 => Ok(Self::DbProcedureCallWithResult),
            10 => Ok(Self::Fetch),
            11 => Ok(Self::Commit),
            12 => Ok(Self::Rollback),
            14 => Ok(Self::Connect),
            15 => Ok(Self::WriteLob),
            16 => Ok(Self::ReadLob),
            18 => Ok(Self::Disconnect),
            19 => Ok(Self::CloseCursor),
            _ => Err(prot_err!("unexpected function code {val} in reply")),
        }
    }

    pub fn to_i16(self) -> i16 {
        match self {
            Self::Nil => 0,
            Self::Ddl => 1,
            Self::Insert => 2,
            Self::Update => 3,
            Self::Delete => 4,
            Self::Select => 5,
            Self::SelectForUpdate => 6,
            Self::Explain => 7,
            Self::DbProcedureCall => 8,
            Self::DbProcedureCallWithResult => 9,
            Self::Fetch => 10,
            Self::Commit => 11,
            Self::Rollback => 12,
            Self::Connect => 14,
            Self::WriteLob => 15,
            Self::ReadLob => 16,
            Self::Disconnect => 18,
            Self::CloseCursor => 19,
        }
    }

    // True for replies that are allowed to open a cursor.
    pub fn is_select_shaped(self) -> bool {
        matches!(self, Self::Select | Self::SelectForUpdate | Self::Explain)
    }
}
