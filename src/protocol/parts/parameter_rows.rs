use crate::protocol::parts::{ParameterDescriptor, ParameterDescriptors, Value};
use crate::types::lob::LobFeeder;
use crate::{ScnpError, ScnpResult};
use byteorder::{LittleEndian, WriteBytesExt};

const LOB_DATA_INCLUDED: u8 = 0b_0000_0010;
const LOB_LAST_DATA: u8 = 0b_0000_0100;

// The Parameters part: row-major encoding of the input parameter values.
// LOB cells carry their first chunk inline; the chunk bytes are appended
// behind the row's fixed cells, and the cell holds (options, length,
// position) referring to them.
#[derive(Debug, Default)]
pub(crate) struct ParameterRows<'a>(Vec<ParameterRow<'a>>);

impl<'a> ParameterRows<'a> {
    pub fn new() -> Self {
        Self(Vec::new())
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn count(&self) -> usize {
        self.0.len()
    }

    // Appends one row. Pre-reads the first chunk of every LOB stream in
    // the row and returns the feeders that did not reach their end within
    // the first chunk; their remaining data must be sent via WRITELOB
    // once the server has assigned locator ids.
    pub fn push_row(
        &mut self,
        values: Vec<Value<'a>>,
        descriptors: &ParameterDescriptors,
        lob_chunk_size: usize,
    ) -> ScnpResult<Vec<LobFeeder>> {
        let (row, open_feeders) = ParameterRow::prepare(values, descriptors, lob_chunk_size)?;
        self.0.push(row);
        Ok(open_feeders)
    }

    pub fn size(&self, descriptors: &ParameterDescriptors) -> ScnpResult<usize> {
        let mut size = 0;
        for row in &self.0 {
            size += row.size(descriptors)?;
        }
        Ok(size)
    }

    pub fn emit(
        &self,
        descriptors: &ParameterDescriptors,
        w: &mut dyn std::io::Write,
    ) -> ScnpResult<()> {
        let mut data_pos = 0_i32;
        for row in &self.0 {
            row.emit(descriptors, &mut data_pos, w)?;
        }
        Ok(())
    }
}

// One row of input parameters, with the pre-read first chunks of its LOB
// streams (in parameter order).
#[derive(Debug)]
struct ParameterRow<'a> {
    values: Vec<Value<'a>>,
    lob_chunks: Vec<InputLobChunk>,
}

#[derive(Debug)]
pub(crate) struct InputLobChunk {
    pub data: Vec<u8>,
    pub is_last: bool,
}

impl<'a> ParameterRow<'a> {
    fn prepare(
        values: Vec<Value<'a>>,
        descriptors: &ParameterDescriptors,
        lob_chunk_size: usize,
    ) -> ScnpResult<(Self, Vec<LobFeeder>)> {
        let in_count = descriptors.iter_in().count();
        if values.len() != in_count {
            return Err(ScnpError::InvalidArgument(format!(
                "statement expects {in_count} input parameters, got {}",
                values.len()
            )));
        }

        let mut lob_chunks = Vec::new();
        let mut open_feeders = Vec::new();
        for (value, descriptor) in values.iter().zip(descriptors.iter_in()) {
            match value {
                Value::LobStream(Some(reader)) => {
                    let mut feeder =
                        LobFeeder::new(reader.clone(), descriptor.type_id().is_char_lob());
                    let (data, is_last) = feeder.next_chunk(lob_chunk_size)?;
                    lob_chunks.push(InputLobChunk { data, is_last });
                    if !is_last {
                        open_feeders.push(feeder);
                    }
                }
                Value::LobStream(None) => {
                    lob_chunks.push(InputLobChunk {
                        data: Vec::new(),
                        is_last: true,
                    });
                }
                value if !value.is_null() => {
                    descriptor
                        .type_id()
                        .accepts_value_of_type(value.type_id_for_emit(descriptor.type_id())?)
                        .map_err(|e| ScnpError::InvalidArgument(e.to_string()))?;
                }
                _ => {}
            }
        }
        Ok((Self { values, lob_chunks }, open_feeders))
    }

    fn size(&self, descriptors: &ParameterDescriptors) -> ScnpResult<usize> {
        let mut size = 0;
        let mut in_descriptors = descriptors.iter_in();
        let mut chunks = self.lob_chunks.iter();
        for value in &self.values {
            let descriptor = in_descriptors
                .next()
                .ok_or_else(|| ScnpError::InvalidArgument("not enough metadata".to_string()))?;
            if let Value::LobStream(_) = value {
                let chunk = chunks.next().expect("chunk per LOB stream");
                size += 10 + chunk.data.len();
            } else {
                size += value.size(descriptor.type_id())?;
            }
        }
        Ok(size)
    }

    fn emit(
        &self,
        descriptors: &ParameterDescriptors,
        data_pos: &mut i32,
        w: &mut dyn std::io::Write,
    ) -> ScnpResult<()> {
        let mut in_descriptors = descriptors.iter_in();
        let mut chunks = self.lob_chunks.iter();
        for value in &self.values {
            let descriptor = in_descriptors
                .next()
                .ok_or_else(|| ScnpError::InvalidArgument("not enough metadata".to_string()))?;
            if let Value::LobStream(_) = value {
                let chunk = chunks.next().expect("chunk per LOB stream");
                emit_lob_cell(chunk, descriptor, data_pos, w)?;
            } else {
                value.emit(data_pos, descriptor, w)?;
            }
        }
        // the chunk data follows the row's cells
        for chunk in &self.lob_chunks {
            w.write_all(&chunk.data)?;
        }
        Ok(())
    }
}

#[allow(clippy::cast_possible_truncation)]
fn emit_lob_cell(
    chunk: &InputLobChunk,
    descriptor: &ParameterDescriptor,
    data_pos: &mut i32,
    w: &mut dyn std::io::Write,
) -> ScnpResult<()> {
    w.write_u8(descriptor.type_id().type_code(false))?;
    let mut options = LOB_DATA_INCLUDED;
    if chunk.is_last {
        options |= LOB_LAST_DATA;
    }
    w.write_u8(options)?;
    w.write_i32::<LittleEndian>(chunk.data.len() as i32)?;
    w.write_i32::<LittleEndian>(*data_pos)?;
    *data_pos += chunk.data.len() as i32;
    Ok(())
}
