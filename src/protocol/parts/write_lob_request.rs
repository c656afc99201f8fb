use crate::ScnpResult;
use byteorder::{LittleEndian, WriteBytesExt};

// Writes one chunk of a LOB that was announced as incomplete in an
// execute request. Offset -1 appends at the server-side write position.
#[derive(Debug)]
pub(crate) struct WriteLobRequest<'a> {
    locator_id: u64,
    offset: i64,
    data: &'a [u8],
    is_last_data: bool,
}

impl<'a> WriteLobRequest<'a> {
    pub fn new(locator_id: u64, offset: i64, data: &'a [u8], is_last_data: bool) -> Self {
        trace!(
            "WriteLobRequest offset = {offset}, chunk length = {}, last = {is_last_data}",
            data.len()
        );
        Self {
            locator_id,
            offset,
            data,
            is_last_data,
        }
    }

    pub fn size(&self) -> usize {
        21 + self.data.len()
    }

    pub fn emit(&self, w: &mut dyn std::io::Write) -> ScnpResult<()> {
        // 1: NULL (unused here), 2: DATA_INCLUDED, 4: LAST_DATA
        let options = if self.is_last_data { 6 } else { 2 };
        w.write_u64::<LittleEndian>(self.locator_id)?;
        w.write_u8(options)?;
        w.write_i64::<LittleEndian>(self.offset)?;
        #[allow(clippy::cast_possible_truncation)]
        w.write_u32::<LittleEndian>(self.data.len() as u32)?;
        w.write_all(self.data)?;
        Ok(())
    }
}
