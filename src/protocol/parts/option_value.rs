use crate::protocol::util;
use crate::scnp_error::prot_err;
use crate::ScnpResult;
use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};

// Tagged value in an option bag. The tags are a small subset of the value
// type codes.
#[derive(Clone, Debug, PartialEq)]
pub(crate) enum OptionValue {
    TinyInt(u8),
    Int(i32),
    BigInt(i64),
    Double(f64),
    Boolean(bool),
    String(String),
    BString(Vec<u8>),
}

impl OptionValue {
    pub fn type_code(&self) -> u8 {
        match *self {
            Self::TinyInt(_) => 1,
            Self::Int(_) => 3,
            Self::BigInt(_) => 4,
            Self::Double(_) => 7,
            Self::Boolean(_) => 28,
            Self::String(_) => 29,
            Self::BString(_) => 33,
        }
    }

    pub fn size(&self) -> usize {
        1 + match *self {
            Self::TinyInt(_) | Self::Boolean(_) => 1,
            Self::Int(_) => 4,
            Self::BigInt(_) | Self::Double(_) => 8,
            Self::String(ref s) => 2 + util::cesu8_length(s),
            Self::BString(ref v) => 2 + v.len(),
        }
    }

    pub fn emit(&self, w: &mut dyn std::io::Write) -> ScnpResult<()> {
        w.write_u8(self.type_code())?;
        match *self {
            Self::TinyInt(u) => w.write_u8(u)?,
            Self::Int(i) => w.write_i32::<LittleEndian>(i)?,
            Self::BigInt(i) => w.write_i64::<LittleEndian>(i)?,
            Self::Double(f) => w.write_f64::<LittleEndian>(f)?,
            Self::Boolean(b) => w.write_u8(b.into())?,
            Self::String(ref s) => emit_i16_length_and_bytes(&util::to_cesu8(s), w)?,
            Self::BString(ref v) => emit_i16_length_and_bytes(v, w)?,
        }
        Ok(())
    }

    pub fn parse(rdr: &mut dyn std::io::Read) -> ScnpResult<Self> {
        match rdr.read_u8()? {
            1 => Ok(Self::TinyInt(rdr.read_u8()?)),
            3 => Ok(Self::Int(rdr.read_i32::<LittleEndian>()?)),
            4 => Ok(Self::BigInt(rdr.read_i64::<LittleEndian>()?)),
            7 => Ok(Self::Double(rdr.read_f64::<LittleEndian>()?)),
            28 => Ok(Self::Boolean(rdr.read_u8()? > 0)),
            29 => Ok(Self::String(util::string_from_cesu8(
                parse_i16_length_and_bytes(rdr)?,
            )?)),
            33 => Ok(Self::BString(parse_i16_length_and_bytes(rdr)?)),
            tc => Err(prot_err!("unsupported option value type code {tc}")),
        }
    }

    pub fn get_int(&self) -> ScnpResult<i32> {
        if let Self::Int(i) = self {
            Ok(*i)
        } else {
            Err(prot_err!("option value {self:?} is not Int-typed"))
        }
    }

    pub fn get_bool(&self) -> ScnpResult<bool> {
        if let Self::Boolean(b) = self {
            Ok(*b)
        } else {
            Err(prot_err!("option value {self:?} is not Boolean-typed"))
        }
    }

    pub fn get_string(&self) -> ScnpResult<&str> {
        if let Self::String(s) = self {
            Ok(s)
        } else {
            Err(prot_err!("option value {self:?} is not String-typed"))
        }
    }
}

fn emit_i16_length_and_bytes(v: &[u8], w: &mut dyn std::io::Write) -> ScnpResult<()> {
    w.write_i16::<LittleEndian>(i16::try_from(v.len()).map_err(|_| {
        prot_err!("option value of {} bytes is too long", v.len())
    })?)?;
    w.write_all(v)?;
    Ok(())
}

fn parse_i16_length_and_bytes(rdr: &mut dyn std::io::Read) -> ScnpResult<Vec<u8>> {
    let len = rdr.read_i16::<LittleEndian>()?;
    Ok(util::parse_bytes(len.max(0) as usize, rdr)?)
}

impl std::fmt::Display for OptionValue {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            Self::TinyInt(v) => write!(f, "{v}"),
            Self::Int(v) => write!(f, "{v}"),
            Self::BigInt(v) => write!(f, "{v}"),
            Self::Double(v) => write!(f, "{v}"),
            Self::Boolean(v) => write!(f, "{v}"),
            Self::String(v) => write!(f, "{v}"),
            Self::BString(v) => write!(f, "{v:?}"),
        }
    }
}
