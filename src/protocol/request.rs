//! Emission of request messages.
//!
//! There is no use case for multiple segments in one request, so message
//! and segment are modeled together, as one `Request`.

use crate::protocol::parts::{ParameterDescriptors, StatementContext};
use crate::protocol::{MessageType, Part, Parts};
use crate::scnp_error::prot_err;
use crate::ScnpResult;
use byteorder::{LittleEndian, WriteBytesExt};
use std::sync::Arc;

pub(crate) const MESSAGE_HEADER_SIZE: u32 = 32;
pub(crate) const SEGMENT_HEADER_SIZE: usize = 24;

// Command options bitset of the request segment header.
pub(crate) const COMMAND_OPTIONS_NONE: u8 = 0;
pub(crate) const HOLD_CURSORS_OVER_COMMIT: u8 = 8;

#[derive(Debug)]
pub(crate) struct Request<'a> {
    message_type: MessageType,
    command_options: u8,
    parts: Parts<'a>,
}

impl<'a> Request<'a> {
    pub fn new(message_type: MessageType, command_options: u8) -> Self {
        Self {
            message_type,
            command_options,
            parts: Parts::default(),
        }
    }

    pub fn new_for_disconnect() -> Self {
        Self::new(MessageType::Disconnect, COMMAND_OPTIONS_NONE)
    }

    pub fn message_type(&self) -> MessageType {
        self.message_type
    }

    pub fn push(&mut self, part: Part<'a>) {
        self.parts.push(part);
    }

    pub fn add_statement_context(&mut self, sequence_info: i64) {
        trace!("sending statement context with sequence info {sequence_info}");
        self.push(Part::StatementContext(StatementContext::with_sequence_info(
            sequence_info,
        )));
    }

    // Emits message header, a single request segment header, and the
    // parts, each padded to 8 bytes.
    #[allow(clippy::cast_possible_truncation)]
    #[allow(clippy::cast_possible_wrap)]
    pub fn emit(
        &self,
        session_id: i64,
        packet_seq_number: i32,
        auto_commit: bool,
        o_a_descriptors: Option<&Arc<ParameterDescriptors>>,
        w: &mut dyn std::io::Write,
    ) -> ScnpResult<()> {
        let varpart_size = self.varpart_size(o_a_descriptors)?;
        let mut remaining_bufsize = varpart_size;
        debug!(
            "emitting request of type {:?} for session {session_id}, packet {packet_seq_number}, \
             total size {}",
            self.message_type,
            MESSAGE_HEADER_SIZE + varpart_size
        );

        // MESSAGE HEADER
        w.write_i64::<LittleEndian>(session_id)?; // I8
        w.write_i32::<LittleEndian>(packet_seq_number)?; // I4
        w.write_u32::<LittleEndian>(varpart_size)?; // UI4
        w.write_u32::<LittleEndian>(remaining_bufsize)?; // UI4
        w.write_i16::<LittleEndian>(1)?; // I2, number of segments
        for _ in 0..10 {
            w.write_u8(0)?; // I1 packet options + B9 filler
        }

        // SEGMENT HEADER
        let segment_size = self.segment_size(o_a_descriptors)? as i32;
        w.write_i32::<LittleEndian>(segment_size)?; // I4, length incl. header
        w.write_i32::<LittleEndian>(0)?; // I4, offset in the message
        w.write_i16::<LittleEndian>(self.parts.len() as i16)?; // I2
        w.write_i16::<LittleEndian>(1)?; // I2, segment number, 1-based
        w.write_i8(1)?; // I1, segment kind: request
        w.write_i8(self.message_type as i8)?; // I1
        w.write_i8(auto_commit.into())?; // I1
        w.write_u8(self.command_options)?; // I1
        for _ in 0..8 {
            w.write_u8(0)?; // B8 reserved
        }
        remaining_bufsize -= SEGMENT_HEADER_SIZE as u32;

        // PARTS
        for part in self.parts.ref_inner() {
            remaining_bufsize = part.emit(remaining_bufsize, o_a_descriptors, w)?;
        }
        w.flush()?;
        trace!("request is written");
        Ok(())
    }

    // Byte length of everything after the message header. The segment
    // length field is an i32 and the message var-part length a u32; both
    // limits are validated here.
    fn varpart_size(&self, o_a_descriptors: Option<&Arc<ParameterDescriptors>>) -> ScnpResult<u32> {
        let size = self.segment_size(o_a_descriptors)?;
        if size > i32::MAX as usize {
            return Err(prot_err!("request of {size} bytes exceeds the segment limit"));
        }
        Ok(size as u32)
    }

    fn segment_size(
        &self,
        o_a_descriptors: Option<&Arc<ParameterDescriptors>>,
    ) -> ScnpResult<usize> {
        let mut size = SEGMENT_HEADER_SIZE;
        for part in self.parts.ref_inner() {
            size += part.size(true, o_a_descriptors)?;
        }
        Ok(size)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::parts::{AuthFields, ClientContext};
    use byteorder::{LittleEndian, ReadBytesExt};
    use std::io::Read;

    // The declared sizes must match the emitted bytes exactly, and every
    // part body must be padded to a multiple of 8.
    #[test]
    fn emitted_sizes_match_the_declared_sizes() {
        let mut auth_fields = AuthFields::with_capacity(3);
        auth_fields.push_string("logonname");
        auth_fields.push(vec![7_u8; 64]);

        let mut request = Request::new(MessageType::Authenticate, COMMAND_OPTIONS_NONE);
        request.push(Part::ClientContext(ClientContext::for_connect("demo")));
        request.push(Part::Auth(auth_fields));

        let mut buffer = Vec::new();
        request.emit(0, 1, true, None, &mut buffer).unwrap();

        let mut rdr = std::io::Cursor::new(&buffer);
        assert_eq!(rdr.read_i64::<LittleEndian>().unwrap(), 0); // session id
        assert_eq!(rdr.read_i32::<LittleEndian>().unwrap(), 1); // packet
        let varpart_length = rdr.read_u32::<LittleEndian>().unwrap();
        assert_eq!(varpart_length as usize, buffer.len() - 32);
        rdr.read_u32::<LittleEndian>().unwrap(); // varpart size
        assert_eq!(rdr.read_i16::<LittleEndian>().unwrap(), 1); // segments
        let mut filler = [0_u8; 10];
        rdr.read_exact(&mut filler).unwrap();

        let segment_length = rdr.read_i32::<LittleEndian>().unwrap();
        assert_eq!(segment_length as u32, varpart_length);
        rdr.read_i32::<LittleEndian>().unwrap(); // offset
        let no_of_parts = rdr.read_i16::<LittleEndian>().unwrap();
        assert_eq!(no_of_parts, 2);
        rdr.read_i16::<LittleEndian>().unwrap(); // segment number
        assert_eq!(rdr.read_i8().unwrap(), 1); // request segment
        assert_eq!(rdr.read_i8().unwrap(), MessageType::Authenticate as i8);
        assert_eq!(rdr.read_i8().unwrap(), 1); // auto-commit
        rdr.read_u8().unwrap(); // command options
        let mut reserved = [0_u8; 8];
        rdr.read_exact(&mut reserved).unwrap();

        // walk the parts by their declared body sizes
        for _ in 0..no_of_parts {
            rdr.read_i8().unwrap(); // kind
            rdr.read_u8().unwrap(); // attributes
            rdr.read_i16::<LittleEndian>().unwrap(); // small argument count
            rdr.read_i32::<LittleEndian>().unwrap(); // big argument count
            let body_size = rdr.read_i32::<LittleEndian>().unwrap() as usize;
            rdr.read_i32::<LittleEndian>().unwrap(); // remaining buffer size
            let padded = body_size + crate::protocol::part::padsize(body_size);
            assert_eq!(padded % 8, 0);
            let mut body = vec![0_u8; padded];
            rdr.read_exact(&mut body).unwrap();
        }
        assert_eq!(rdr.position() as usize, buffer.len());
    }

    #[test]
    fn request_size_validation_rejects_oversized_commands() {
        // a command over the i32 limit cannot be built in a test, but the
        // size computation must stay in usize and be consistent
        let mut request = Request::new(MessageType::ExecuteDirect, COMMAND_OPTIONS_NONE);
        request.push(Part::Command("select 1 from dummy"));
        let size = request.varpart_size(None).unwrap();
        let mut buffer = Vec::new();
        request.emit(17, 2, true, None, &mut buffer).unwrap();
        assert_eq!(buffer.len(), 32 + size as usize);
    }
}

