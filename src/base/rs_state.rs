use crate::base::{DecodeError, Row, RsCore, RsRef};
use crate::conn::SessionRef;
use crate::protocol::parts::{resultset, ResultSetMetadata};
use crate::protocol::{
    MessageType, Part, PartAttributes, PartKind, Parts, ReplyType, Request, COMMAND_OPTIONS_NONE,
};
use crate::scnp_error::prot_err;
use crate::ScnpResult;
use std::collections::VecDeque;
use std::sync::Arc;

// The client-side state of one result set: the rows fetched so far, the
// attribute bits of the last ResultSet part, and (while the server still
// holds a cursor) the shared cursor identity.
#[derive(Debug)]
pub(crate) struct RsState {
    o_rs_ref: Option<RsRef>,
    a_rsmd: Arc<ResultSetMetadata>,
    next_rows: VecDeque<Row>,
    attributes: PartAttributes,
    decode_errors: Vec<DecodeError>,
    total_row_count: usize,
}

impl RsState {
    // Builds or extends result-set state from one ResultSet part.
    //
    // Fetch replies (`o_rs` is Some) extend the existing state and yield
    // None. A first reply builds a new state: the resultset id and the
    // metadata were delivered as earlier parts of the same reply (or the
    // metadata is injected, for executions of prepared statements).
    pub fn parse_rows_part(
        no_of_rows: usize,
        attributes: PartAttributes,
        parts: &mut Parts,
        session: &SessionRef,
        o_a_rsmd: Option<&Arc<ResultSetMetadata>>,
        o_rs: &mut Option<&mut RsState>,
        rdr: &mut std::io::Cursor<Vec<u8>>,
    ) -> ScnpResult<Option<RsState>> {
        match o_rs {
            Some(rs_state) => {
                // fetch-next reply
                let row_offset = rs_state.total_row_count;
                let rows = resultset::parse_rows(
                    session,
                    &rs_state.a_rsmd,
                    no_of_rows,
                    rs_state.o_rs_ref.as_ref(),
                    row_offset,
                    &mut rs_state.decode_errors,
                    rdr,
                )?;
                rs_state.total_row_count += rows.len();
                rs_state.next_rows.extend(rows);
                rs_state.update_attributes(attributes);
                Ok(None)
            }
            None => {
                let a_rsmd = match o_a_rsmd {
                    Some(a_rsmd) => Arc::clone(a_rsmd),
                    None => match parts.remove_first_of_kind(PartKind::ResultSetMetadata) {
                        Some(Part::ResultSetMetadata(rsmd)) => Arc::new(rsmd),
                        _ => return Err(prot_err!("no metadata provided for result set")),
                    },
                };
                let resultset_id = match parts.remove_first_of_kind(PartKind::ResultSetId) {
                    Some(Part::ResultSetId(id)) => id,
                    _ => return Err(prot_err!("no resultset id provided for result set")),
                };
                if resultset_id == 0 {
                    // id 0 means the execution produced no result (e.g. a
                    // trigger-only insert); no cursor is opened
                    if no_of_rows > 0 {
                        return Err(prot_err!("rows delivered for resultset id 0"));
                    }
                    return Ok(None);
                }

                let rs_ref = RsCore::new_ref(session.clone(), resultset_id);
                let mut decode_errors = Vec::new();
                let rows = resultset::parse_rows(
                    session,
                    &a_rsmd,
                    no_of_rows,
                    Some(&rs_ref),
                    0,
                    &mut decode_errors,
                    rdr,
                )?;

                let mut rs_state = RsState {
                    o_rs_ref: Some(rs_ref),
                    a_rsmd,
                    total_row_count: rows.len(),
                    next_rows: rows.into(),
                    attributes,
                    decode_errors,
                };
                rs_state.update_attributes(attributes);
                Ok(Some(rs_state))
            }
        }
    }

    fn update_attributes(&mut self, attributes: PartAttributes) {
        self.attributes = attributes;
        if attributes.is_last_packet() || attributes.result_set_is_closed() {
            // the server dropped its cursor; nothing to close anymore
            if let Some(ref rs_ref) = self.o_rs_ref {
                if let Ok(mut rs_core) = rs_ref.lock() {
                    rs_core.note_server_side_closed();
                }
            }
        }
    }

    pub fn metadata(&self) -> &Arc<ResultSetMetadata> {
        &self.a_rsmd
    }

    pub fn resultset_id(&self) -> ScnpResult<u64> {
        match self.o_rs_ref {
            Some(ref rs_ref) => Ok(rs_ref.lock()?.resultset_id()),
            None => Err(prot_err!("result set has no server-side cursor")),
        }
    }

    pub fn rs_ref(&self) -> Option<&RsRef> {
        self.o_rs_ref.as_ref()
    }

    pub fn is_complete(&self) -> bool {
        self.attributes.is_last_packet() || self.attributes.result_set_is_closed()
    }

    pub fn decode_errors(&self) -> &[DecodeError] {
        &self.decode_errors
    }

    pub fn pop_row(&mut self) -> Option<Row> {
        self.next_rows.pop_front()
    }

    pub fn has_buffered_rows(&self) -> bool {
        !self.next_rows.is_empty()
    }

    // Server-side fetch of the next chunk.
    pub fn fetch_next(&mut self, session: &SessionRef) -> ScnpResult<()> {
        let resultset_id = self.resultset_id()?;
        let fetch_size = session.fetch_size();
        debug!("fetching next {fetch_size} rows of result set {resultset_id}");
        let mut request = Request::new(MessageType::FetchNext, COMMAND_OPTIONS_NONE);
        request.push(Part::ResultSetId(resultset_id));
        request.push(Part::FetchSize(fetch_size));

        let a_rsmd = Arc::clone(&self.a_rsmd);
        let reply = session.roundtrip(&mut request, Some(&a_rsmd), None, &mut Some(self))?;
        reply.assert_expected_reply_type(ReplyType::Fetch)?;
        Ok(())
    }

    // Close the server-side cursor early. Best-effort by contract; the
    // actual close request is issued by the RsCore drop.
    pub fn close(&mut self) {
        self.next_rows.clear();
        self.o_rs_ref = None;
    }
}
