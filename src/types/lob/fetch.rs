use crate::conn::SessionRef;
use crate::protocol::parts::{ReadLobReply, ReadLobRequest};
use crate::protocol::{MessageType, Part, ReplyType, Request, COMMAND_OPTIONS_NONE};
use crate::scnp_error::prot_err;
use crate::stats::{Metric, Statistics};
use crate::ScnpResult;
use std::time::Instant;

// Fetches one chunk of a LOB value. `offset` counts from 0 in the unit of
// the LOB type (bytes, or server characters for NCLOB); the wire offset
// is 1-based.
pub(crate) fn fetch_lob_chunk(
    session: &SessionRef,
    locator_id: u64,
    offset: u64,
    length: u32,
) -> ScnpResult<(Vec<u8>, bool)> {
    let started = Instant::now();
    let mut request = Request::new(MessageType::ReadLob, COMMAND_OPTIONS_NONE);
    request.push(Part::ReadLobRequest(ReadLobRequest::new(
        locator_id,
        offset + 1,
        length,
    )));

    let reply = session.roundtrip(&mut request, None, None, &mut None)?;
    reply.assert_expected_reply_type(ReplyType::ReadLob)?;

    let mut o_read_lob_reply: Option<ReadLobReply> = None;
    for part in reply.parts {
        match part {
            Part::ReadLobReply(read_lob_reply) => {
                if read_lob_reply.locator_id() != locator_id {
                    return Err(prot_err!("read-lob reply for a different locator"));
                }
                o_read_lob_reply = Some(read_lob_reply);
            }
            part => warn!("ignoring unexpected part {:?} in a read-lob reply", part.kind()),
        }
    }

    let result = o_read_lob_reply
        .map(ReadLobReply::into_data_and_last)
        .ok_or_else(|| prot_err!("read-lob reply carried no data"));
    Statistics::global().record(Metric::FetchLob, started.elapsed());
    result
}
