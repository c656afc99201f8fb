use crate::base::{ResultSet, RsState};
use crate::conn::SessionRef;
use crate::protocol::parts::{
    ExecutionResult, LobFlags, OutputParameters, ParameterDescriptors, ParameterRows,
    ResultSetMetadata, Value,
};
use crate::protocol::{
    MessageType, Part, PartKind, ReplyType, Request, COMMAND_OPTIONS_NONE,
    HOLD_CURSORS_OVER_COMMIT,
};
use crate::scnp_error::prot_err;
use crate::stats::{Metric, Statistics};
use crate::types::lob::{write_open_lobs, LobFeeder};
use crate::{ScnpError, ScnpResult};
use std::sync::Arc;
use std::time::Instant;

/// A statement that was prepared on the server.
///
/// The statement id stays valid until the statement is dropped (which
/// happens with this handle) or the connection goes away.
#[derive(Debug)]
pub struct PreparedStatement {
    session: SessionRef,
    statement_id: u64,
    a_descriptors: Arc<ParameterDescriptors>,
    o_a_rsmd: Option<Arc<ResultSetMetadata>>,
    function_code: ReplyType,
}

/// What a procedure call returned.
#[derive(Debug)]
pub struct CallResult {
    /// The scalar INOUT/OUT values, if the procedure has any.
    pub output_parameters: Option<OutputParameters>,
    /// The table outputs, one cursor per table output parameter.
    pub table_results: Vec<ResultSet>,
    /// In legacy table-output mode: the ids under which the table
    /// outputs were registered in the query result cache instead.
    pub table_refs: Vec<u64>,
}

impl PreparedStatement {
    // Runs the PREPARE round trip.
    pub(crate) fn try_new(session: SessionRef, sql: &str) -> ScnpResult<Self> {
        let started = Instant::now();
        let mut request = Request::new(MessageType::Prepare, COMMAND_OPTIONS_NONE);
        request.push(Part::Command(sql));
        let mut reply = session.roundtrip(&mut request, None, None, &mut None)?;

        let function_code = reply.function_code;
        let mut o_statement_id = None;
        let mut a_descriptors = Arc::new(ParameterDescriptors::default());
        let mut o_a_rsmd = None;
        while let Some(part) = reply.parts.pop() {
            match part {
                Part::StatementId(id) => o_statement_id = Some(id),
                Part::ParameterMetadata(descriptors) => a_descriptors = descriptors,
                Part::ResultSetMetadata(rsmd) => o_a_rsmd = Some(Arc::new(rsmd)),
                part => warn!("prepare: ignoring unexpected part {:?}", part.kind()),
            }
        }
        let statement_id =
            o_statement_id.ok_or_else(|| prot_err!("prepare reply carried no statement id"))?;
        debug!("prepared statement {statement_id} with function code {function_code:?}");

        Statistics::global().change_open_statements(1);
        Statistics::global().record(Metric::Prepare, started.elapsed());
        Ok(Self {
            session,
            statement_id,
            a_descriptors,
            o_a_rsmd,
            function_code,
        })
    }

    /// The parameter descriptors of the statement.
    #[must_use]
    pub fn parameter_descriptors(&self) -> &ParameterDescriptors {
        &self.a_descriptors
    }

    /// The result metadata, for statements that produce rows.
    #[must_use]
    pub fn result_metadata(&self) -> Option<&ResultSetMetadata> {
        self.o_a_rsmd.as_deref()
    }

    /// True if executions of this statement produce rows.
    #[must_use]
    pub fn returns_rows(&self) -> bool {
        self.function_code.is_select_shaped()
            || self.function_code == ReplyType::DbProcedureCallWithResult
    }

    /// Executes the statement with one row of arguments. For DML, the
    /// execution results are returned; a statement that produces rows is
    /// rejected here, use [`query`](Self::query).
    pub fn execute(&self, values: Vec<Value<'_>>) -> ScnpResult<Vec<ExecutionResult>> {
        self.execute_batch(vec![values])
    }

    /// Executes the statement once per argument row.
    ///
    /// Rows that carry LOB streams are sent in packages: a package is
    /// flushed as soon as its latest row has a LOB that did not fit its
    /// first chunk, so that within every package only the last row can
    /// carry incomplete LOB data. The remaining chunks are streamed
    /// before the next package goes out.
    pub fn execute_batch(&self, rows: Vec<Vec<Value<'_>>>) -> ScnpResult<Vec<ExecutionResult>> {
        self.execute_rows(rows.into_iter())
    }

    /// Executes the statement once per row produced by the supplier,
    /// until the supplier signals the end with None. Packaging works as
    /// in [`execute_batch`](Self::execute_batch).
    pub fn execute_from_supplier(
        &self,
        mut supplier: impl FnMut() -> Option<Vec<Value<'static>>>,
    ) -> ScnpResult<Vec<ExecutionResult>> {
        self.execute_rows(std::iter::from_fn(move || supplier()))
    }

    fn execute_rows<'v>(
        &self,
        rows: impl Iterator<Item = Vec<Value<'v>>>,
    ) -> ScnpResult<Vec<ExecutionResult>> {
        let started = Instant::now();
        self.session.check_no_open_cursor()?;

        let lob_chunk_size = self.session.lob_write_length();
        let mut execution_results = Vec::new();
        let mut package = ParameterRows::new();
        let mut package_feeders: Vec<LobFeeder> = Vec::new();
        let mut any_row = false;

        let mut rows = rows.peekable();
        while let Some(row) = rows.next() {
            any_row = true;
            let open_feeders = package.push_row(row, &self.a_descriptors, lob_chunk_size)?;
            let row_has_open_lob = !open_feeders.is_empty();
            package_feeders.extend(open_feeders);
            if row_has_open_lob || rows.peek().is_none() {
                let outcome = self.execute_package(
                    std::mem::replace(&mut package, ParameterRows::new()),
                    std::mem::take(&mut package_feeders),
                )?;
                execution_results.extend(outcome.execution_results);
            }
        }
        if !any_row {
            return Err(ScnpError::InvalidArgument(
                "execution needs at least one row".to_string(),
            ));
        }

        Statistics::global().record(Metric::Execute, started.elapsed());
        Ok(execution_results)
    }

    /// Executes a row-producing statement and opens a cursor.
    pub fn query(&self, values: Vec<Value<'_>>) -> ScnpResult<ResultSet> {
        let started = Instant::now();
        self.session.check_no_open_cursor()?;

        let mut rows = ParameterRows::new();
        let feeders = rows.push_row(values, &self.a_descriptors, self.session.lob_write_length())?;
        let outcome = self.execute_package_with_options(rows, feeders, HOLD_CURSORS_OVER_COMMIT)?;
        Statistics::global().record(Metric::Query, started.elapsed());

        match outcome.result_sets.into_iter().next() {
            Some(rs_state) => Ok(ResultSet::new(self.session.clone(), rs_state)),
            None => Err(ScnpError::InvalidArgument(
                "the statement produced no result set".to_string(),
            )),
        }
    }

    /// Calls a stored procedure and demultiplexes its reply into scalar
    /// outputs and zero or more table-output cursors.
    pub fn call(&self, values: Vec<Value<'_>>) -> ScnpResult<CallResult> {
        let started = Instant::now();
        self.session.check_no_open_cursor()?;

        let mut rows = ParameterRows::new();
        let feeders = if self.a_descriptors.has_in() || !values.is_empty() {
            rows.push_row(values, &self.a_descriptors, self.session.lob_write_length())?
        } else {
            Vec::new()
        };
        let outcome = self.execute_package(rows, feeders)?;
        Statistics::global().record(Metric::Call, started.elapsed());

        let mut table_results = Vec::new();
        let mut table_refs = Vec::new();
        for rs_state in outcome.result_sets {
            let result_set = ResultSet::new(self.session.clone(), rs_state);
            if self.session.legacy_table_output() {
                let id = result_set.resultset_id();
                crate::rs_cache::register(id, self.session.session_id(), result_set);
                table_refs.push(id);
            } else {
                table_results.push(result_set);
            }
        }
        Ok(CallResult {
            output_parameters: outcome.output_parameters,
            table_results,
            table_refs,
        })
    }

    // One EXECUTE round trip for one package of rows, including the
    // piecewise transfer of the LOBs the package left open.
    fn execute_package(
        &self,
        parameter_rows: ParameterRows<'_>,
        feeders: Vec<LobFeeder>,
    ) -> ScnpResult<ExecuteOutcome> {
        self.execute_package_with_options(parameter_rows, feeders, COMMAND_OPTIONS_NONE)
    }

    fn execute_package_with_options(
        &self,
        parameter_rows: ParameterRows<'_>,
        feeders: Vec<LobFeeder>,
        command_options: u8,
    ) -> ScnpResult<ExecuteOutcome> {
        let mut request = Request::new(MessageType::Execute, command_options);
        request.push(Part::StatementId(self.statement_id));
        if !parameter_rows.is_empty() {
            request.push(Part::Parameters(parameter_rows));
        }
        if !feeders.is_empty() {
            let implicit_streaming = self
                .session
                .with_core(|core| core.connect_options().implicit_lob_streaming())?;
            if implicit_streaming {
                request.push(Part::LobFlags(LobFlags::implicit_streaming()));
            }
        }

        let mut reply = self.session.roundtrip(
            &mut request,
            self.o_a_rsmd.as_ref(),
            Some(&self.a_descriptors),
            &mut None,
        )?;

        let mut outcome = ExecuteOutcome::default();
        let mut o_locator_ids = None;
        while let Some(part) = reply.parts.pop() {
            match part {
                Part::ExecutionResults(mut results) => {
                    // parts are digested in reverse order
                    results.extend(std::mem::take(&mut outcome.execution_results));
                    outcome.execution_results = results;
                }
                Part::ResultSet(Some(rs_state)) => outcome.result_sets.insert(0, rs_state),
                Part::ResultSet(None) => {
                    // resultset id 0: the execution produced no cursor
                }
                Part::OutputParameters(output_parameters) => {
                    outcome.output_parameters = Some(output_parameters);
                }
                Part::WriteLobReply(write_lob_reply) => {
                    o_locator_ids = Some(write_lob_reply.into_locator_ids());
                }
                part if part.kind() == PartKind::ResultSetId => {
                    // id of a non-opened result set (trigger-only insert)
                }
                part => warn!("execute: ignoring unexpected part {:?}", part.kind()),
            }
        }

        if !feeders.is_empty() {
            let locator_ids = o_locator_ids
                .ok_or_else(|| prot_err!("server assigned no locators for open LOB streams"))?;
            write_open_lobs(&self.session, locator_ids, feeders)?;
        }
        Ok(outcome)
    }
}

#[derive(Debug, Default)]
struct ExecuteOutcome {
    execution_results: Vec<ExecutionResult>,
    result_sets: Vec<RsState>,
    output_parameters: Option<OutputParameters>,
}

impl Drop for PreparedStatement {
    // Dropping the server-side statement is best-effort; errors are
    // logged, not propagated.
    fn drop(&mut self) {
        Statistics::global().change_open_statements(-1);
        if !self.session.is_bad() {
            debug!("dropping statement {}", self.statement_id);
            let mut request = Request::new(MessageType::DropStatementId, COMMAND_OPTIONS_NONE);
            request.push(Part::StatementId(self.statement_id));
            match self.session.try_send(request) {
                Ok(_) => {}
                Err(e) => {
                    warn!("dropping statement {} failed with {e:?}", self.statement_id);
                }
            }
        }
    }
}
