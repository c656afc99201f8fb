use crate::ScnpResult;
use byteorder::{LittleEndian, WriteBytesExt};

// Asks for one chunk of a LOB. The offset is 1-based and counts bytes for
// binary and ASCII LOBs, characters (in the server's CESU-8 convention)
// for NCLOB-typed ones.
#[derive(Debug)]
pub(crate) struct ReadLobRequest {
    locator_id: u64,
    offset: u64,
    length: u32,
}

impl ReadLobRequest {
    pub fn new(locator_id: u64, offset: u64, length: u32) -> Self {
        trace!("ReadLobRequest offset = {offset}, length = {length}");
        Self {
            locator_id,
            offset,
            length,
        }
    }

    pub fn emit(&self, w: &mut dyn std::io::Write) -> ScnpResult<()> {
        w.write_u64::<LittleEndian>(self.locator_id)?;
        w.write_u64::<LittleEndian>(self.offset)?;
        w.write_u32::<LittleEndian>(self.length)?;
        w.write_u32::<LittleEndian>(0)?; // filler
        Ok(())
    }

    pub fn size() -> usize {
        24
    }
}
