use crate::base::RsRef;
use crate::conn::SessionRef;
use crate::protocol::util;
use crate::types::lob::char_boundaries::{cesu8_tail_len, cesu8_unit_count};
use crate::types::lob::fetch::fetch_lob_chunk;
use crate::{ScnpError, ScnpResult};

// Shared machinery of the three LOB handles: the locator, the fetch
// offset bookkeeping, and the buffer of fetched but undelivered wire
// bytes. While the handle lives, it keeps the producing result set's
// cursor alive, because closing the cursor invalidates the locator.
#[derive(Debug)]
pub(crate) struct LobHandle {
    session: SessionRef,
    o_rs_ref: Option<RsRef>,
    is_complete: bool,
    total_char_length: u64,
    total_byte_length: u64,
    locator_id: u64,
    buffer: Vec<u8>,
    // in server units: bytes, or UTF-16 units for character LOBs
    acquired_offset: u64,
    char_counted: bool,
}

impl LobHandle {
    #[allow(clippy::too_many_arguments)]
    fn new(
        session: &SessionRef,
        o_rs_ref: Option<&RsRef>,
        is_last_data: bool,
        total_char_length: u64,
        total_byte_length: u64,
        locator_id: u64,
        first_chunk: Vec<u8>,
        char_counted: bool,
    ) -> Self {
        let acquired_offset = if char_counted {
            cesu8_unit_count(&first_chunk)
        } else {
            first_chunk.len() as u64
        };
        Self {
            session: session.clone(),
            o_rs_ref: o_rs_ref.cloned(),
            is_complete: is_last_data,
            total_char_length,
            total_byte_length,
            locator_id,
            buffer: first_chunk,
            acquired_offset,
            char_counted,
        }
    }

    fn fetch_next_chunk(&mut self) -> ScnpResult<()> {
        if self.is_complete {
            return Ok(());
        }
        let (data, is_last) =
            fetch_lob_chunk(
                &self.session,
                self.locator_id,
                self.acquired_offset,
                self.session.lob_read_length(),
            )?;
        self.acquired_offset += if self.char_counted {
            cesu8_unit_count(&data)
        } else {
            data.len() as u64
        };
        self.buffer.extend_from_slice(&data);
        self.is_complete = is_last;
        if self.is_complete {
            // the locator is done with; the cursor may go
            self.o_rs_ref = None;
        }
        Ok(())
    }

    fn load_all(&mut self) -> ScnpResult<()> {
        while !self.is_complete {
            self.fetch_next_chunk()?;
        }
        Ok(())
    }
}

/// A large binary value read back from the server, chunk by chunk.
#[derive(Debug)]
pub struct Blob(LobHandle);

impl Blob {
    pub(crate) fn new(
        session: &SessionRef,
        o_rs_ref: Option<&RsRef>,
        is_last_data: bool,
        total_byte_length: u64,
        locator_id: u64,
        first_chunk: Vec<u8>,
    ) -> Self {
        Self(LobHandle::new(
            session,
            o_rs_ref,
            is_last_data,
            0,
            total_byte_length,
            locator_id,
            first_chunk,
            false,
        ))
    }

    /// Total size in bytes, as announced by the server.
    #[must_use]
    pub fn total_byte_length(&self) -> u64 {
        self.0.total_byte_length
    }

    /// Fetches the remaining chunks and returns the complete value.
    pub fn into_bytes(mut self) -> ScnpResult<Vec<u8>> {
        self.0.load_all()?;
        Ok(std::mem::take(&mut self.0.buffer))
    }
}

impl std::io::Read for Blob {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        while self.0.buffer.is_empty() && !self.0.is_complete {
            self.0.fetch_next_chunk().map_err(util::io_error)?;
        }
        let n = self.0.buffer.len().min(buf.len());
        buf[..n].copy_from_slice(&self.0.buffer[..n]);
        self.0.buffer.drain(..n);
        Ok(n)
    }
}

/// A large ASCII character value read back from the server.
#[derive(Debug)]
pub struct Clob(CharLobHandle);

impl Clob {
    pub(crate) fn new(
        session: &SessionRef,
        o_rs_ref: Option<&RsRef>,
        is_last_data: bool,
        total_char_length: u64,
        total_byte_length: u64,
        locator_id: u64,
        first_chunk: Vec<u8>,
    ) -> Self {
        // CLOB offsets count bytes
        Self(CharLobHandle::new(LobHandle::new(
            session,
            o_rs_ref,
            is_last_data,
            total_char_length,
            total_byte_length,
            locator_id,
            first_chunk,
            false,
        )))
    }

    /// Total size in characters, as announced by the server.
    #[must_use]
    pub fn total_char_length(&self) -> u64 {
        self.0.handle.total_char_length
    }

    /// Fetches the remaining chunks and returns the complete value.
    pub fn into_string(self) -> ScnpResult<String> {
        self.0.into_string()
    }
}

impl std::io::Read for Clob {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        self.0.read(buf)
    }
}

/// A large Unicode character value read back from the server.
///
/// NCLOB offsets are counted in the server's characters: a
/// supplementary-plane code point (a 6-byte CESU-8 surrogate pair) counts
/// as two. The handle tracks its fetch offset in that convention.
#[derive(Debug)]
pub struct NClob(CharLobHandle);

impl NClob {
    pub(crate) fn new(
        session: &SessionRef,
        o_rs_ref: Option<&RsRef>,
        is_last_data: bool,
        total_char_length: u64,
        total_byte_length: u64,
        locator_id: u64,
        first_chunk: Vec<u8>,
    ) -> Self {
        Self(CharLobHandle::new(LobHandle::new(
            session,
            o_rs_ref,
            is_last_data,
            total_char_length,
            total_byte_length,
            locator_id,
            first_chunk,
            true,
        )))
    }

    /// Total size in server characters, as announced by the server.
    #[must_use]
    pub fn total_char_length(&self) -> u64 {
        self.0.handle.total_char_length
    }

    /// Total size in bytes, as announced by the server.
    #[must_use]
    pub fn total_byte_length(&self) -> u64 {
        self.0.handle.total_byte_length
    }

    /// Fetches the remaining chunks and returns the complete value.
    pub fn into_string(self) -> ScnpResult<String> {
        self.0.into_string()
    }
}

impl std::io::Read for NClob {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        self.0.read(buf)
    }
}

// Character LOBs deliver UTF-8; the wire bytes are CESU-8 and a chunk may
// end inside a character or between surrogate halves, so decoding works
// on the longest decodable prefix and carries the rest.
#[derive(Debug)]
pub(crate) struct CharLobHandle {
    handle: LobHandle,
    decoded: Vec<u8>, // UTF-8, ready for delivery
}

impl CharLobHandle {
    fn new(handle: LobHandle) -> Self {
        Self {
            handle,
            decoded: Vec::new(),
        }
    }

    fn into_string(mut self) -> ScnpResult<String> {
        self.handle.load_all()?;
        self.decode_available()?;
        if !self.handle.buffer.is_empty() {
            return Err(ScnpError::Cesu8);
        }
        String::from_utf8(std::mem::take(&mut self.decoded)).map_err(|_| ScnpError::Cesu8)
    }

    fn decode_available(&mut self) -> ScnpResult<()> {
        let tail = if self.handle.is_complete {
            0
        } else {
            cesu8_tail_len(&self.handle.buffer)
        };
        let decodable = self.handle.buffer.len() - tail;
        if decodable > 0 {
            let prefix: Vec<u8> = self.handle.buffer.drain(..decodable).collect();
            let s = util::string_from_cesu8_with(prefix, self.handle.session.cesu8_handling())?;
            self.decoded.extend_from_slice(s.as_bytes());
        }
        Ok(())
    }

    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        while self.decoded.is_empty() {
            if self.handle.buffer.is_empty() && self.handle.is_complete {
                return Ok(0);
            }
            if !self.handle.is_complete && cesu8_tail_len(&self.handle.buffer) == self.handle.buffer.len()
            {
                self.handle.fetch_next_chunk().map_err(util::io_error)?;
            } else if self.handle.buffer.is_empty() {
                self.handle.fetch_next_chunk().map_err(util::io_error)?;
            }
            self.decode_available().map_err(util::io_error)?;
            if self.decoded.is_empty() && self.handle.is_complete && self.handle.buffer.is_empty() {
                return Ok(0);
            }
        }
        let n = self.decoded.len().min(buf.len());
        buf[..n].copy_from_slice(&self.decoded[..n]);
        self.decoded.drain(..n);
        Ok(n)
    }
}
