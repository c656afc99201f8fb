use crate::ScnpResult;
use byteorder::{LittleEndian, ReadBytesExt};

// Locator ids for the LOBs whose first chunk did not complete them, in
// parameter-then-row order.
#[derive(Debug)]
pub(crate) struct WriteLobReply {
    locator_ids: Vec<u64>,
}

impl WriteLobReply {
    pub fn into_locator_ids(self) -> Vec<u64> {
        self.locator_ids
    }

    pub fn parse(count: usize, rdr: &mut dyn std::io::Read) -> ScnpResult<Self> {
        let mut locator_ids = Vec::with_capacity(count);
        for _ in 0..count {
            locator_ids.push(rdr.read_u64::<LittleEndian>()?);
        }
        Ok(Self { locator_ids })
    }
}
