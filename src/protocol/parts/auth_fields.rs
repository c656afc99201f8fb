use crate::protocol::parts::length_indicator;
use crate::protocol::util;
use crate::scnp_error::prot_err;
use crate::ScnpResult;
use byteorder::{BigEndian, LittleEndian, ReadBytesExt, WriteBytesExt};

// The payload of an Authentication part: a field count followed by
// length-prefixed opaque fields. In contrast to data values, oversized
// auth fields use a big-endian length after the 0xFF marker.
#[derive(Debug, Default)]
pub(crate) struct AuthFields(Vec<AuthField>);

impl AuthFields {
    pub fn with_capacity(count: usize) -> Self {
        Self(Vec::with_capacity(count))
    }

    pub fn parse(rdr: &mut dyn std::io::Read) -> ScnpResult<Self> {
        let field_count = rdr.read_u16::<LittleEndian>()? as usize;
        let mut auth_fields = Self(Vec::with_capacity(field_count));
        for _ in 0..field_count {
            auth_fields.0.push(AuthField::parse(rdr)?);
        }
        Ok(auth_fields)
    }

    pub fn pop(&mut self) -> Option<Vec<u8>> {
        self.0.pop().map(|f| f.0)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn size(&self) -> usize {
        2 + self.0.iter().map(AuthField::size).sum::<usize>()
    }

    pub fn emit(&self, w: &mut dyn std::io::Write) -> ScnpResult<()> {
        w.write_i16::<LittleEndian>(self.0.len() as i16)?;
        for field in &self.0 {
            field.emit(w)?;
        }
        Ok(())
    }

    pub fn push(&mut self, data: Vec<u8>) {
        self.0.push(AuthField(data));
    }

    pub fn push_string(&mut self, s: &str) {
        self.0.push(AuthField(s.as_bytes().to_vec()));
    }
}

#[derive(Debug)]
struct AuthField(Vec<u8>);

impl AuthField {
    fn emit(&self, w: &mut dyn std::io::Write) -> ScnpResult<()> {
        match self.0.len() {
            l if l <= length_indicator::MAX_1_BYTE_LENGTH as usize => {
                w.write_u8(l as u8)?;
            }
            l if l <= 0xFFFF => {
                w.write_u8(length_indicator::LENGTH_INDICATOR_NULL)?;
                w.write_u16::<BigEndian>(l as u16)?;
            }
            l => {
                return Err(prot_err!("authentication field of {l} bytes is too long"));
            }
        }
        w.write_all(&self.0)?;
        Ok(())
    }

    fn size(&self) -> usize {
        let l = self.0.len();
        if l <= length_indicator::MAX_1_BYTE_LENGTH as usize {
            1 + l
        } else {
            3 + l
        }
    }

    fn parse(rdr: &mut dyn std::io::Read) -> ScnpResult<Self> {
        let len = length_indicator::parse(rdr.read_u8()?, rdr)?;
        Ok(Self(util::parse_bytes(len, rdr)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_and_long_fields_roundtrip() {
        let mut fields = AuthFields::with_capacity(3);
        fields.push_string("logonname");
        fields.push(vec![0xAB_u8; 64]);
        fields.push(vec![0xCD_u8; 300]); // forces the big-endian escape

        let mut buf = Vec::new();
        fields.emit(&mut buf).unwrap();
        assert_eq!(buf.len(), fields.size());

        let mut parsed = AuthFields::parse(&mut std::io::Cursor::new(buf)).unwrap();
        assert_eq!(parsed.len(), 3);
        assert_eq!(parsed.pop().unwrap(), vec![0xCD_u8; 300]);
        assert_eq!(parsed.pop().unwrap(), vec![0xAB_u8; 64]);
        assert_eq!(parsed.pop().unwrap(), b"logonname".to_vec());
    }
}
