use crate::conn::SessionRef;
use crate::protocol::parts::WriteLobRequest;
use crate::protocol::{MessageType, Part, ReplyType, Request, COMMAND_OPTIONS_NONE};
use crate::scnp_error::prot_err;
use crate::{ScnpError, ScnpResult};
use std::sync::{Arc, Mutex};

// Pulls chunks out of a caller-provided reader. For character LOBs the
// reader delivers UTF-8; the feeder converts to CESU-8 and carries
// incomplete trailing characters over into the next chunk.
pub(crate) struct LobFeeder {
    reader: Arc<Mutex<dyn std::io::Read + Send>>,
    carry: Vec<u8>,
    char_mode: bool,
    finished: bool,
}

impl std::fmt::Debug for LobFeeder {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(
            f,
            "LobFeeder {{ char_mode: {}, finished: {} }}",
            self.char_mode, self.finished
        )
    }
}

impl LobFeeder {
    pub fn new(reader: Arc<Mutex<dyn std::io::Read + Send>>, char_mode: bool) -> Self {
        Self {
            reader,
            carry: Vec::new(),
            char_mode,
            finished: false,
        }
    }

    // Returns the next chunk (raw bytes, or CESU-8 for character LOBs)
    // and whether the source is exhausted.
    pub fn next_chunk(&mut self, max_bytes: usize) -> ScnpResult<(Vec<u8>, bool)> {
        if self.finished {
            return Ok((Vec::new(), true));
        }

        // CESU-8 can expand a UTF-8 character from 4 to 6 bytes
        let budget = if self.char_mode {
            (max_bytes * 2 / 3).max(8)
        } else {
            max_bytes.max(1)
        };

        let mut buf = std::mem::take(&mut self.carry);
        let eof = {
            let mut reader = self.reader.lock()?;
            read_to_budget(&mut *reader, &mut buf, budget)?
        };

        let out = if self.char_mode {
            if !eof {
                let tail = super::char_boundaries::utf8_tail_len(&buf);
                self.carry = buf.split_off(buf.len() - tail);
            }
            let s = std::str::from_utf8(&buf).map_err(|_| {
                ScnpError::InvalidArgument("LOB reader delivered invalid UTF-8".to_string())
            })?;
            crate::protocol::util::to_cesu8(s).to_vec()
        } else {
            buf
        };

        self.finished = eof;
        Ok((out, eof))
    }
}

// Fills `buf` up to `budget` additional payload; true on end of stream.
fn read_to_budget(
    reader: &mut dyn std::io::Read,
    buf: &mut Vec<u8>,
    budget: usize,
) -> ScnpResult<bool> {
    let target = buf.len() + budget;
    let mut chunk = [0_u8; 8192];
    while buf.len() < target {
        let want = (target - buf.len()).min(chunk.len());
        let n = reader.read(&mut chunk[..want])?;
        if n == 0 {
            return Ok(true);
        }
        buf.extend_from_slice(&chunk[..n]);
    }
    Ok(false)
}

// Streams the remaining data of every LOB whose first chunk did not reach
// the end, keyed by the locator ids of the execute reply, until each one
// is flagged as last-data.
pub(crate) fn write_open_lobs(
    session: &SessionRef,
    locator_ids: Vec<u64>,
    feeders: Vec<LobFeeder>,
) -> ScnpResult<()> {
    if locator_ids.len() != feeders.len() {
        return Err(prot_err!(
            "server assigned {} locators for {} open LOB streams",
            locator_ids.len(),
            feeders.len()
        ));
    }
    for (locator_id, mut feeder) in locator_ids.into_iter().zip(feeders.into_iter()) {
        loop {
            let (chunk, is_last) = feeder.next_chunk(session.lob_write_length())?;
            trace!(
                "writing {} bytes to locator {locator_id}, last = {is_last}",
                chunk.len()
            );
            let mut request = Request::new(MessageType::WriteLob, COMMAND_OPTIONS_NONE);
            request.push(Part::WriteLobRequest(WriteLobRequest::new(
                locator_id, -1, &chunk, is_last,
            )));
            let reply = session.roundtrip(&mut request, None, None, &mut None)?;
            reply.assert_expected_reply_type(ReplyType::WriteLob)?;
            if is_last {
                break;
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn feeder_for(content: &'static [u8], char_mode: bool) -> LobFeeder {
        LobFeeder::new(Arc::new(Mutex::new(std::io::Cursor::new(content))), char_mode)
    }

    #[test]
    fn binary_chunks_cover_the_stream() {
        let mut feeder = feeder_for(b"0123456789", false);
        let (c1, eof1) = feeder.next_chunk(4).unwrap();
        assert_eq!((c1.as_slice(), eof1), (&b"0123"[..], false));
        let (c2, eof2) = feeder.next_chunk(4).unwrap();
        assert_eq!((c2.as_slice(), eof2), (&b"4567"[..], false));
        let (c3, eof3) = feeder.next_chunk(4).unwrap();
        assert_eq!((c3.as_slice(), eof3), (&b"89"[..], true));
        assert_eq!(feeder.next_chunk(4).unwrap(), (Vec::new(), true));
    }

    #[test]
    fn char_chunks_never_split_a_character_and_expand_to_cesu8() {
        // "𝄞" is 4 bytes UTF-8; the budget forces splits near it
        let text = "ab𝄞cd𝄞".as_bytes();
        let mut feeder = feeder_for(text, true);
        let mut collected = Vec::new();
        loop {
            let (chunk, eof) = feeder.next_chunk(9).unwrap();
            // each chunk is complete CESU-8
            assert!(cesu8::from_cesu8(&chunk).is_ok());
            collected.extend_from_slice(&chunk);
            if eof {
                break;
            }
        }
        assert_eq!(
            cesu8::from_cesu8(&collected).unwrap().into_owned(),
            "ab𝄞cd𝄞"
        );
    }
}
