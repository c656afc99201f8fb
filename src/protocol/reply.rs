use crate::base::RsState;
use crate::conn::SessionCore;
use crate::conn::SessionRef;
use crate::protocol::parts::{ExecutionResult, ParameterDescriptors, ResultSetMetadata, Severity};
use crate::protocol::{util, Part, PartKind, Parts, ReplyType};
use crate::scnp_error::prot_err;
use crate::{ExecutionResults, ScnpError, ScnpResult};
use byteorder::{LittleEndian, ReadBytesExt};
use std::sync::Arc;

// A reply message: the function code of its (first) segment plus the
// decoded parts of all segments, in wire order.
#[derive(Debug)]
pub(crate) struct Reply {
    session_id: i64,
    pub function_code: ReplyType,
    pub parts: Parts<'static>,
}

impl Reply {
    pub fn session_id(&self) -> i64 {
        self.session_id
    }

    pub fn assert_expected_reply_type(&self, expected: ReplyType) -> ScnpResult<()> {
        if self.function_code == expected {
            Ok(())
        } else {
            Err(prot_err!(
                "expected reply type {expected:?}, got {:?}",
                self.function_code
            ))
        }
    }

    // Reads and decodes one reply.
    //
    // * `o_a_rsmd` is injected for executions of prepared statements,
    //   whose replies carry no metadata of their own
    // * `o_a_descriptors` likewise for output parameters
    // * `o_rs` is the open cursor state for fetch-next replies
    //
    // The variable part is buffered completely; the final part has to end
    // exactly at the declared variable-part length (trailing padding of
    // less than 8 bytes is tolerated).
    pub fn parse(
        o_a_rsmd: Option<&Arc<ResultSetMetadata>>,
        o_a_descriptors: Option<&Arc<ParameterDescriptors>>,
        o_rs: &mut Option<&mut RsState>,
        session: Option<&SessionRef>,
        rdr: &mut dyn std::io::Read,
    ) -> ScnpResult<Self> {
        // MESSAGE HEADER, 32 bytes
        let session_id = rdr.read_i64::<LittleEndian>()?; // I8
        let packet_seq_number = rdr.read_i32::<LittleEndian>()?; // I4
        let varpart_length = rdr.read_u32::<LittleEndian>()?; // UI4
        let _varpart_size = rdr.read_u32::<LittleEndian>()?; // UI4
        let no_of_segments = rdr.read_i16::<LittleEndian>()?; // I2
        util::skip_bytes(10, rdr)?; // I1 + B9
        trace!(
            "reply header: session {session_id}, packet {packet_seq_number}, \
             {varpart_length} variable bytes, {no_of_segments} segment(s)"
        );
        if no_of_segments < 1 {
            return Err(prot_err!("reply without segments"));
        }

        let mut cursor =
            std::io::Cursor::new(util::parse_bytes(varpart_length as usize, rdr)?);

        let mut reply = None::<Reply>;
        for segment_index in 0..no_of_segments {
            // SEGMENT HEADER, 24 bytes
            cursor.read_i32::<LittleEndian>()?; // I4 segment length
            cursor.read_i32::<LittleEndian>()?; // I4 segment offset
            let no_of_parts = cursor.read_i16::<LittleEndian>()?; // I2
            cursor.read_i16::<LittleEndian>()?; // I2 segment number
            let segment_kind = cursor.read_i8()?; // I1
            match segment_kind {
                2 | 5 => {} // reply, error
                1 => return Err(prot_err!("received a request segment in a reply")),
                k => return Err(prot_err!("invalid segment kind {k}")),
            }
            cursor.read_i8()?; // I1 reserved
            let function_code = ReplyType::from_i16(cursor.read_i16::<LittleEndian>()?)?; // I2
            util::skip_bytes(8, &mut cursor)?; // B8 reserved
            debug!("reply segment with function code {function_code:?}");

            let reply = reply.get_or_insert_with(|| Reply {
                session_id,
                function_code,
                parts: Parts::default(),
            });

            for part_index in 0..no_of_parts {
                let last = segment_index == no_of_segments - 1 && part_index == no_of_parts - 1;
                if let Some(part) = Part::parse(
                    &mut reply.parts,
                    session,
                    o_a_rsmd,
                    o_a_descriptors,
                    o_rs,
                    last,
                    &mut cursor,
                )? {
                    reply.parts.push(part);
                }
            }
        }

        let remaining = cursor.get_ref().len() as u64 - cursor.position();
        if remaining >= 8 {
            return Err(prot_err!(
                "the last part left {remaining} bytes of the declared variable part unconsumed"
            ));
        }

        Ok(reply.expect("at least one segment"))
    }

    // Default per-reply error handling: digests the side-effect parts and
    // turns Error parts into errors. Warnings are retained on the session.
    // If the reply carries execution results, the k-th failed row is
    // linked to the k-th server error.
    pub fn handle_db_error(&mut self, core: &mut SessionCore) -> ScnpResult<()> {
        core.clear_warnings();
        self.digest_context_parts(core)?;

        let mut server_errors = match self.parts.remove_first_of_kind(PartKind::Error) {
            None => return Ok(()),
            Some(Part::Error(server_warnings_and_errors)) => {
                let (warnings, server_errors): (Vec<_>, Vec<_>) = server_warnings_and_errors
                    .into_iter()
                    .partition(|se| se.severity() == Severity::Warning);
                core.set_warnings(warnings);
                if server_errors.is_empty() {
                    return Ok(());
                }
                server_errors
            }
            Some(_) => unreachable!("remove_first_of_kind returned a non-error part"),
        };

        match self.parts.remove_first_of_kind(PartKind::ExecutionResults) {
            Some(Part::ExecutionResults(execution_results)) => {
                // position-match failed rows with the reported errors
                let mut error_iter = server_errors.into_iter();
                let mut execution_results: Vec<ExecutionResult> = execution_results
                    .into_iter()
                    .map(|er| match er {
                        ExecutionResult::Failure(_) => ExecutionResult::Failure(error_iter.next()),
                        other => other,
                    })
                    .collect();
                for leftover in error_iter {
                    warn!("more server errors than failed rows in the execution results");
                    execution_results.push(ExecutionResult::Failure(Some(leftover)));
                }
                Err(ScnpError::Execution(ExecutionResults(execution_results)))
            }
            _ => {
                if server_errors.len() == 1 {
                    Err(ScnpError::from(server_errors.remove(0)))
                } else {
                    Err(prot_err!(
                        "reply carried {} server errors without execution results",
                        server_errors.len()
                    ))
                }
            }
        }
    }

    // StatementContext and TransactionFlags arrive with most replies and
    // only update session state.
    pub fn digest_context_parts(&mut self, core: &mut SessionCore) -> ScnpResult<()> {
        while let Some(part) = self.parts.remove_first_of_kind(PartKind::StatementContext) {
            if let Part::StatementContext(stmt_ctx) = part {
                core.evaluate_statement_context(&stmt_ctx);
            }
        }
        while let Some(part) = self.parts.remove_first_of_kind(PartKind::TransactionFlags) {
            if let Part::TransactionFlags(ta_flags) = part {
                core.evaluate_ta_flags(&ta_flags)?;
            }
        }
        Ok(())
    }
}
