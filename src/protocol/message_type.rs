/// The action a request message asks the server to perform.
///
/// The numbers are the wire representation ("message type" in the segment
/// header of a request).
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub(crate) enum MessageType {
    ExecuteDirect = 2,   // directly execute an SQL statement
    Prepare = 3,         // prepare an SQL statement
    Execute = 13,        // execute a previously prepared SQL statement
    ReadLob = 16,        // read large object data
    WriteLob = 17,       // write large object data
    Authenticate = 65,   // send authentication data
    Connect = 66,        // connect to the database
    Commit = 67,         // commit the current transaction
    Rollback = 68,       // roll back the current transaction
    CloseResultSet = 69, // close a result set
    DropStatementId = 70, // drop a prepared statement identifier
    FetchNext = 71,      // fetch the next chunk of a result set
    Disconnect = 77,     // disconnect the session
    DbConnectInfo = 82,  // request database connect information
}
