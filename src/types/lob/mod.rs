//! LOB transport: chunked read-back of large output values and piecewise
//! write of large input parameters.

pub(crate) mod char_boundaries;
mod fetch;
mod handle;
mod lob_writer;

pub use self::handle::{Blob, Clob, NClob};
pub(crate) use self::lob_writer::{write_open_lobs, LobFeeder};

use crate::base::RsRef;
use crate::conn::SessionRef;
use crate::protocol::util;
use crate::scnp_error::prot_err;
use crate::{ScnpResult, Value};
use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};

// An output LOB cell: options byte, lengths, locator id, and (when the
// data-included flag is set) the first chunk inline.

pub(crate) fn parse_blob(
    session: &SessionRef,
    o_rs_ref: Option<&RsRef>,
    nullable: bool,
    rdr: &mut dyn std::io::Read,
) -> ScnpResult<Value<'static>> {
    let (is_null, is_data_included, is_last_data) = parse_lob_options(rdr)?;
    if is_null {
        return null_value(nullable, "BLOB");
    }
    let (_, byte_length, locator_id, data) = parse_lob_body(rdr, is_data_included)?;
    Ok(Value::Blob(Blob::new(
        session,
        o_rs_ref,
        is_last_data,
        byte_length,
        locator_id,
        data,
    )))
}

pub(crate) fn parse_clob(
    session: &SessionRef,
    o_rs_ref: Option<&RsRef>,
    nullable: bool,
    rdr: &mut dyn std::io::Read,
) -> ScnpResult<Value<'static>> {
    let (is_null, is_data_included, is_last_data) = parse_lob_options(rdr)?;
    if is_null {
        return null_value(nullable, "CLOB");
    }
    let (char_length, byte_length, locator_id, data) = parse_lob_body(rdr, is_data_included)?;
    Ok(Value::Clob(Clob::new(
        session,
        o_rs_ref,
        is_last_data,
        char_length,
        byte_length,
        locator_id,
        data,
    )))
}

pub(crate) fn parse_nclob(
    session: &SessionRef,
    o_rs_ref: Option<&RsRef>,
    nullable: bool,
    rdr: &mut dyn std::io::Read,
) -> ScnpResult<Value<'static>> {
    let (is_null, is_data_included, is_last_data) = parse_lob_options(rdr)?;
    if is_null {
        return null_value(nullable, "NCLOB");
    }
    let (char_length, byte_length, locator_id, data) = parse_lob_body(rdr, is_data_included)?;
    Ok(Value::NClob(NClob::new(
        session,
        o_rs_ref,
        is_last_data,
        char_length,
        byte_length,
        locator_id,
        data,
    )))
}

fn null_value(nullable: bool, type_name: &str) -> ScnpResult<Value<'static>> {
    if nullable {
        Ok(Value::Null)
    } else {
        Err(prot_err!("found null value for not-null {type_name} column"))
    }
}

fn parse_lob_options(rdr: &mut dyn std::io::Read) -> ScnpResult<(bool, bool, bool)> {
    let _data_type = rdr.read_u8()?; // I1
    let options = rdr.read_u8()?; // I1
    let is_null = (options & 0b_1) != 0;
    let is_data_included = (options & 0b_10) != 0;
    let is_last_data = (options & 0b_100) != 0;
    Ok((is_null, is_data_included, is_last_data))
}

fn parse_lob_body(
    rdr: &mut dyn std::io::Read,
    is_data_included: bool,
) -> ScnpResult<(u64, u64, u64, Vec<u8>)> {
    util::skip_bytes(2, rdr)?; // U2 filler
    let total_char_length = rdr.read_u64::<LittleEndian>()?; // I8
    let total_byte_length = rdr.read_u64::<LittleEndian>()?; // I8
    let locator_id = rdr.read_u64::<LittleEndian>()?; // I8
    let chunk_length = rdr.read_i32::<LittleEndian>()?; // I4
    let data = if is_data_included {
        util::parse_bytes(chunk_length.max(0) as usize, rdr)?
    } else {
        Vec::new()
    };
    Ok((total_char_length, total_byte_length, locator_id, data))
}

// The header of a LOB cell in an input-parameters row for an empty
// stream: no data included, position only.
#[allow(clippy::cast_possible_truncation)]
pub(crate) fn emit_lob_header(
    length: u64,
    data_pos: &mut i32,
    w: &mut dyn std::io::Write,
) -> ScnpResult<()> {
    // bit 1: data included, bit 2: last data
    w.write_u8(0b_000)?;
    w.write_i32::<LittleEndian>(length as i32)?;
    w.write_i32::<LittleEndian>(*data_pos)?;
    *data_pos += length as i32;
    Ok(())
}
