use crate::scnp_error::prot_err;
use crate::ScnpResult;
use byteorder::{BigEndian, LittleEndian, ReadBytesExt, WriteBytesExt};

pub(crate) const MAX_1_BYTE_LENGTH: u8 = 245;
const LENGTH_INDICATOR_2BYTE: u8 = 246;
const LENGTH_INDICATOR_4BYTE: u8 = 247;
pub(crate) const LENGTH_INDICATOR_NULL: u8 = 255;

// Variable-length header of data values: one byte for lengths up to 245,
// otherwise an indicator byte followed by a little-endian u16 or u32.
pub(crate) fn emit(l: usize, w: &mut dyn std::io::Write) -> ScnpResult<()> {
    match l {
        l if l <= MAX_1_BYTE_LENGTH as usize => w.write_u8(l as u8)?,
        l if l <= 0xFFFF => {
            w.write_u8(LENGTH_INDICATOR_2BYTE)?;
            w.write_u16::<LittleEndian>(l as u16)?;
        }
        l if l <= 0xFFFF_FFFF => {
            w.write_u8(LENGTH_INDICATOR_4BYTE)?;
            w.write_u32::<LittleEndian>(l as u32)?;
        }
        l => {
            return Err(prot_err!("value of {l} bytes is too big for the wire"));
        }
    }
    Ok(())
}

pub(crate) fn parse(l8: u8, rdr: &mut dyn std::io::Read) -> ScnpResult<usize> {
    match l8 {
        0..=MAX_1_BYTE_LENGTH => Ok(l8 as usize),
        LENGTH_INDICATOR_2BYTE => Ok(rdr.read_u16::<LittleEndian>()? as usize),
        LENGTH_INDICATOR_4BYTE => Ok(rdr.read_u32::<LittleEndian>()? as usize),
        // Authentication sub-fields use the big-endian escape instead
        LENGTH_INDICATOR_NULL => Ok(rdr.read_u16::<BigEndian>()? as usize),
        _ => Err(prot_err!("unknown length indicator {l8}")),
    }
}

pub(crate) fn size(l: usize) -> usize {
    1 + match l {
        l if l <= MAX_1_BYTE_LENGTH as usize => 0,
        l if l <= 0xFFFF => 2,
        _ => 4,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn roundtrip(l: usize) -> usize {
        let mut buf = Vec::new();
        emit(l, &mut buf).unwrap();
        assert_eq!(buf.len(), size(l));
        let mut rdr = std::io::Cursor::new(&buf[1..]);
        parse(buf[0], &mut rdr).unwrap()
    }

    #[test]
    fn all_three_widths_roundtrip() {
        for l in [0, 1, 245, 246, 1000, 0xFFFF, 0x10000, 5_000_000] {
            assert_eq!(roundtrip(l), l);
        }
    }
}
