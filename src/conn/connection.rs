use crate::conn::authentication::{authenticate, credential_refresh};
use crate::conn::{keep_alive, Canceller, ConnectConfiguration, SessionCore, SessionRef};
use crate::prepared_statement::PreparedStatement;
use crate::protocol::parts::{
    DbConnectInfo, ExecutionResult, ServerError, Value,
};
use crate::protocol::{
    MessageType, Part, ReplyType, Request, COMMAND_OPTIONS_NONE, HOLD_CURSORS_OVER_COMMIT,
};
use crate::stats::{Metric, Statistics};
use crate::{HanaVersion, ResultSet, ScnpError, ScnpResult};
use debug_ignore::DebugIgnore;
use secstr::SecUtf8;
use std::time::Instant;

/// Opens a connection: TCP (or TLS), prolog, authentication.
///
/// If authentication fails and a matching refresh callback is configured,
/// the credential is refreshed (at most once across concurrent attempts)
/// and the connect is retried a single time.
pub fn connect(config: &ConnectConfiguration) -> ScnpResult<Connection> {
    let password_epoch = credential_refresh::password_gate().epoch();
    let token_epoch = credential_refresh::token_gate().epoch();
    let certificate_epoch = credential_refresh::certificate_gate().epoch();

    match Connection::open(config) {
        Ok(connection) => Ok(connection),
        Err(auth_error @ ScnpError::AuthFailed { .. }) => {
            let mut refreshed_config = config.clone();
            if !refresh_credentials(
                &mut refreshed_config,
                password_epoch,
                token_epoch,
                certificate_epoch,
            ) {
                return Err(auth_error);
            }
            debug!("credentials were refreshed, retrying the connect once");
            Connection::open(&refreshed_config)
        }
        Err(e) => Err(e),
    }
}

fn refresh_credentials(
    config: &mut ConnectConfiguration,
    password_epoch: u64,
    token_epoch: u64,
    certificate_epoch: u64,
) -> bool {
    let mut refreshed = false;
    if let Some(ref callback) = config.credential_refresh.password {
        if let Some(password) =
            credential_refresh::password_gate().refresh(password_epoch, &**callback)
        {
            config.credentials.password = Some(DebugIgnore(SecUtf8::from(password)));
            refreshed = true;
        }
    }
    if let Some(ref callback) = config.credential_refresh.token {
        if let Some(token) = credential_refresh::token_gate().refresh(token_epoch, &**callback) {
            config.credentials.jwt_token = Some(DebugIgnore(token));
            refreshed = true;
        }
    }
    if let Some(ref callback) = config.credential_refresh.certificate {
        if let Some(certificate) =
            credential_refresh::certificate_gate().refresh(certificate_epoch, &**callback)
        {
            config.credentials.client_certificate = Some(certificate);
            refreshed = true;
        }
    }
    refreshed
}

/// A connection to the server.
///
/// All operations are serialized on the connection: exactly one request
/// is in flight at any time, and while a query's cursor is open, other
/// statements are rejected with [`ScnpError::NestedQuery`].
#[derive(Debug)]
pub struct Connection {
    session: SessionRef,
}

impl Connection {
    fn open(config: &ConnectConfiguration) -> ScnpResult<Self> {
        let started = Instant::now();
        let mut core = SessionCore::try_new(config)?;
        authenticate(&mut core, config)?;
        let session = SessionRef::new(core, config)?;
        Statistics::global().change_open_connections(1);
        Statistics::global().record(Metric::Auth, started.elapsed());

        if let Some(interval) = config.keep_alive_interval {
            keep_alive::spawn(session.downgrade(), interval);
        }
        Ok(Self { session })
    }

    /// Prepares a statement.
    pub fn prepare(&self, sql: &str) -> ScnpResult<PreparedStatement> {
        self.session.check_no_open_cursor()?;
        PreparedStatement::try_new(self.session.clone(), sql)
    }

    /// Executes a statement directly, without preparation. Returns the
    /// execution results (e.g. rows affected) of the statement.
    pub fn execute_direct(&self, sql: &str) -> ScnpResult<Vec<ExecutionResult>> {
        let started = Instant::now();
        self.session.check_no_open_cursor()?;

        let mut request = Request::new(MessageType::ExecuteDirect, COMMAND_OPTIONS_NONE);
        request.push(Part::Command(sql));
        let reply = self.session.roundtrip(&mut request, None, None, &mut None)?;

        let mut execution_results = Vec::new();
        for part in reply.parts {
            match part {
                Part::ExecutionResults(results) => execution_results.extend(results),
                Part::ResultSet(_) => {
                    return Err(ScnpError::InvalidArgument(
                        "the statement produced rows; use query_direct".to_string(),
                    ))
                }
                part => trace!("execute_direct: ignoring part {:?}", part.kind()),
            }
        }
        Statistics::global().record(Metric::Execute, started.elapsed());
        Ok(execution_results)
    }

    /// Runs a query directly, without preparation, and opens a cursor.
    pub fn query_direct(&self, sql: &str) -> ScnpResult<ResultSet> {
        let started = Instant::now();
        self.session.check_no_open_cursor()?;

        let mut request = Request::new(MessageType::ExecuteDirect, HOLD_CURSORS_OVER_COMMIT);
        request.push(Part::Command(sql));
        let reply = self.session.roundtrip(&mut request, None, None, &mut None)?;

        let mut o_rs_state = None;
        for part in reply.parts {
            match part {
                Part::ResultSet(Some(rs_state)) => o_rs_state = Some(rs_state),
                Part::ResultSet(None) => {}
                part => trace!("query_direct: ignoring part {:?}", part.kind()),
            }
        }
        Statistics::global().record(Metric::Query, started.elapsed());
        match o_rs_state {
            Some(rs_state) => Ok(ResultSet::new(self.session.clone(), rs_state)),
            None => Err(ScnpError::InvalidArgument(
                "the statement produced no result set".to_string(),
            )),
        }
    }

    /// Starts a transaction: switches auto-commit off and applies the
    /// given isolation level and access mode.
    pub fn begin(&self, isolation: Isolation, read_only: bool) -> ScnpResult<Transaction<'_>> {
        self.session.check_no_open_cursor()?;
        if self.session.with_core(|core| core.is_in_transaction())? {
            return Err(ScnpError::NestedTransaction);
        }
        let isolation_sql = match isolation {
            Isolation::Default => None,
            Isolation::ReadCommitted => {
                Some("SET TRANSACTION ISOLATION LEVEL READ COMMITTED")
            }
            Isolation::RepeatableRead => {
                Some("SET TRANSACTION ISOLATION LEVEL REPEATABLE READ")
            }
            Isolation::Serializable => Some("SET TRANSACTION ISOLATION LEVEL SERIALIZABLE"),
            Isolation::ReadUncommitted => return Err(ScnpError::UnsupportedIsolationLevel),
        };

        self.session.with_core(|core| core.set_auto_commit(false))?;
        let result = (|| {
            if let Some(sql) = isolation_sql {
                self.execute_direct(sql)?;
            }
            if read_only {
                self.execute_direct("SET TRANSACTION READ ONLY")?;
            }
            Ok(())
        })();
        if let Err(e) = result {
            self.session
                .with_core(|core| core.set_auto_commit(true))
                .ok();
            return Err(e);
        }

        Statistics::global().change_open_transactions(1);
        Ok(Transaction {
            connection: self,
            completed: false,
        })
    }

    fn end_transaction(&self, message_type: MessageType, metric: Metric) -> ScnpResult<()> {
        let started = Instant::now();
        let request = Request::new(message_type, COMMAND_OPTIONS_NONE);
        let result = self.session.send(request).map(|_| ());
        self.session
            .with_core(|core| core.set_auto_commit(true))
            .ok();
        Statistics::global().change_open_transactions(-1);
        Statistics::global().record(metric, started.elapsed());
        result
    }

    /// Verifies that the connection is alive with a trivial statement.
    pub fn ping(&self) -> ScnpResult<()> {
        self.session.check_no_open_cursor()?;
        self.session.ping()
    }

    /// A handle that can interrupt this connection's in-flight operation
    /// from another thread.
    #[must_use]
    pub fn canceller(&self) -> Canceller {
        self.session.canceller()
    }

    /// The warnings the server sent with the last reply.
    pub fn warnings(&self) -> ScnpResult<Vec<ServerError>> {
        self.session.with_core(|core| core.take_warnings())
    }

    /// The server version, as reported during the connect handshake.
    pub fn server_version(&self) -> ScnpResult<Option<HanaVersion>> {
        self.session
            .with_core(|core| core.connect_options().full_version().cloned())
    }

    /// The data-format version the server granted. Can be lower than the
    /// requested one; the type codes in all metadata follow this version.
    pub fn data_format_version(&self) -> ScnpResult<i32> {
        self.session
            .with_core(|core| core.connect_options().data_format_version())
    }

    /// The session id the server assigned to this connection.
    #[must_use]
    pub fn session_id(&self) -> i64 {
        self.session.session_id()
    }

    /// Changes the number of rows per fetch round trip.
    pub fn set_fetch_size(&self, fetch_size: u32) {
        self.session.set_fetch_size(fetch_size);
    }

    /// Reports the application name to the server (client info).
    pub fn set_application(&self, application: &str) -> ScnpResult<()> {
        let application = application.to_string();
        self.session
            .with_core(move |core| core.set_client_info_field(|ci| ci.set_application(application)))
    }

    /// Reports the application user to the server (client info).
    pub fn set_application_user(&self, user: &str) -> ScnpResult<()> {
        let user = user.to_string();
        self.session
            .with_core(move |core| core.set_client_info_field(|ci| ci.set_application_user(&user)))
    }

    /// Reports the application version to the server (client info).
    pub fn set_application_version(&self, version: &str) -> ScnpResult<()> {
        let version = version.to_string();
        self.session.with_core(move |core| {
            core.set_client_info_field(|ci| ci.set_application_version(&version));
        })
    }

    /// Reports the application source to the server (client info).
    pub fn set_application_source(&self, source: &str) -> ScnpResult<()> {
        let source = source.to_string();
        self.session.with_core(move |core| {
            core.set_client_info_field(|ci| ci.set_application_source(&source));
        })
    }

    /// Asks where the given database of this system is reachable.
    pub fn db_connect_info(&self, database_name: &str) -> ScnpResult<DbConnectAddress> {
        self.session.check_no_open_cursor()?;
        let mut request = Request::new(MessageType::DbConnectInfo, COMMAND_OPTIONS_NONE);
        request.push(Part::DbConnectInfo(DbConnectInfo::request(
            database_name.to_string(),
            None,
        )));
        let reply = self.session.roundtrip(&mut request, None, None, &mut None)?;
        reply.assert_expected_reply_type(ReplyType::Nil)?;
        for part in reply.parts {
            if let Part::DbConnectInfo(info) = part {
                return Ok(DbConnectAddress {
                    on_correct_database: info.on_correct_database().unwrap_or(false),
                    host: info.host().ok().map(ToString::to_string),
                    port: info.port().ok(),
                });
            }
        }
        Err(crate::scnp_error::prot_err!(
            "reply carried no db-connect information"
        ))
    }

    /// Re-opens a table-output cursor that a procedure call registered in
    /// the query result cache (legacy table-output mode).
    pub fn resultset_for_ref(&self, resultset_id: u64) -> ScnpResult<ResultSet> {
        crate::rs_cache::take(resultset_id)
    }

    /// Takes a single value out of a single-row query, e.g. a count.
    pub fn query_single_value(&self, sql: &str) -> ScnpResult<Value<'static>> {
        self.query_direct(sql)?.into_single_value()
    }

    /// The process-wide counters and latency histograms.
    #[must_use]
    pub fn statistics() -> &'static Statistics {
        Statistics::global()
    }

    /// Closes the connection. Closing is idempotent; the session's
    /// entries in the query result cache are purged.
    pub fn close(self) {
        // Drop does the work
    }
}

impl Drop for Connection {
    fn drop(&mut self) {
        Statistics::global().change_open_connections(-1);
        self.session.close();
    }
}

/// Transaction isolation levels that can be requested with
/// [`Connection::begin`].
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Isolation {
    /// Keep the server's default.
    Default,
    /// READ COMMITTED.
    ReadCommitted,
    /// REPEATABLE READ.
    RepeatableRead,
    /// SERIALIZABLE.
    Serializable,
    /// Not supported by the server; `begin` rejects it.
    ReadUncommitted,
}

/// An open transaction. Must be completed with [`commit`](Self::commit)
/// or [`rollback`](Self::rollback); dropping it uncompleted rolls back.
#[derive(Debug)]
pub struct Transaction<'a> {
    connection: &'a Connection,
    completed: bool,
}

impl Transaction<'_> {
    /// Commits the transaction.
    pub fn commit(mut self) -> ScnpResult<()> {
        self.completed = true;
        self.connection
            .end_transaction(MessageType::Commit, Metric::Commit)
    }

    /// Rolls the transaction back.
    pub fn rollback(mut self) -> ScnpResult<()> {
        self.completed = true;
        self.connection
            .end_transaction(MessageType::Rollback, Metric::Rollback)
    }
}

impl Drop for Transaction<'_> {
    fn drop(&mut self) {
        if !self.completed {
            debug!("rolling back an uncompleted transaction");
            self.connection
                .end_transaction(MessageType::Rollback, Metric::Rollback)
                .ok();
        }
    }
}

/// Where a database of a multi-database system is reachable.
#[derive(Clone, Debug)]
pub struct DbConnectAddress {
    /// True if the current connection already points at that database.
    pub on_correct_database: bool,
    /// Host to connect to, when a redirect is needed.
    pub host: Option<String>,
    /// Port to connect to, when a redirect is needed.
    pub port: Option<u16>,
}
