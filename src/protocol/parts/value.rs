use crate::conn::SessionRef;
use crate::protocol::parts::{length_indicator, ParameterDescriptor, TypeId};
use crate::protocol::util::{self, Cesu8Handling};
use crate::scnp_error::prot_err;
use crate::types::{
    decimal, lob, parse_daydate, parse_longdate, parse_seconddate, parse_secondtime, DayDate,
    LongDate, SecondDate, SecondTime,
};
use crate::{ScnpError, ScnpResult};
use bigdecimal::BigDecimal;
use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use std::sync::{Arc, Mutex};

const ALPHANUM_PURELY_NUMERIC: u8 = 0b_1000_0000;
const ALPHANUM_LENGTH_MASK: u8 = 0b_0111_1111;

/// A database value.
///
/// This is the closed set of shapes that can be bound to a statement
/// parameter or read from a result-set cell.
pub enum Value<'a> {
    /// A database NULL.
    Null,
    /// 8-bit unsigned integer.
    TinyInt(u8),
    /// 16-bit signed integer.
    SmallInt(i16),
    /// 32-bit signed integer.
    Int(i32),
    /// 64-bit signed integer.
    BigInt(i64),
    /// Fixed-point decimal.
    Decimal(BigDecimal),
    /// 32-bit float.
    Real(f32),
    /// 64-bit float.
    Double(f64),
    /// TRUE or FALSE.
    Boolean(bool),
    /// Character data; the server reports all valid strings with this shape.
    String(String),
    /// Borrowed character data, avoids a copy when sending large strings.
    Str(&'a str),
    /// Raw bytes of a text column whose content was not valid CESU-8.
    DbBytes(Vec<u8>),
    /// Binary data.
    Binary(Vec<u8>),
    /// DATE with day precision.
    DayDate(DayDate),
    /// TIME with second precision.
    SecondTime(SecondTime),
    /// Timestamp with second precision.
    SecondDate(SecondDate),
    /// Timestamp with 100ns precision.
    LongDate(LongDate),
    /// Large binary object read back from the server.
    Blob(lob::Blob),
    /// Large ASCII character object read back from the server.
    Clob(lob::Clob),
    /// Large Unicode character object read back from the server.
    NClob(lob::NClob),
    /// A large value streamed to the server from the given reader.
    LobStream(Option<Arc<Mutex<dyn std::io::Read + Send>>>),
    /// A reference to a result set held in the process-wide query result
    /// cache (legacy stored-procedure table-output mode).
    TableRef(u64),
}

impl<'a> Value<'a> {
    /// Returns true if this is the NULL value.
    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    // The type id that is actually emitted for this value when the
    // parameter is declared with `requested`.
    pub(crate) fn type_id_for_emit(&self, requested: TypeId) -> ScnpResult<TypeId> {
        Ok(match *self {
            Value::Null => match requested {
                // the server rejects NULL SECONDTIME values
                TypeId::SecondTime => TypeId::SecondDate,
                tid => tid,
            },
            Value::TinyInt(_) => TypeId::TinyInt,
            Value::SmallInt(_) => TypeId::SmallInt,
            Value::Int(_) => TypeId::Int,
            Value::BigInt(_) => TypeId::BigInt,
            Value::Decimal(_) => match requested {
                TypeId::Fixed8 | TypeId::Fixed12 | TypeId::Fixed16 | TypeId::Decimal => requested,
                _ => {
                    return Err(ScnpError::InvalidArgument(format!(
                        "cannot send a decimal for a {requested} parameter"
                    )))
                }
            },
            Value::Real(_) => TypeId::Real,
            Value::Double(_) => TypeId::Double,
            Value::Boolean(_) => TypeId::Boolean,
            Value::String(_) | Value::Str(_) => TypeId::String,
            Value::Binary(_) => TypeId::Binary,
            Value::DayDate(_) => TypeId::DayDate,
            Value::SecondTime(_) => TypeId::SecondTime,
            Value::SecondDate(_) => TypeId::SecondDate,
            Value::LongDate(_) => TypeId::LongDate,
            Value::Blob(_) | Value::Clob(_) | Value::NClob(_) | Value::LobStream(_) => requested,
            Value::DbBytes(_) => {
                return Err(ScnpError::InvalidArgument(
                    "raw database bytes cannot be sent back to the server".to_string(),
                ))
            }
            Value::TableRef(_) => {
                return Err(ScnpError::InvalidArgument(
                    "a table reference cannot be sent to the server".to_string(),
                ))
            }
        })
    }

    // Emits type tag and value. LOB streams only emit their header here;
    // the data travels separately (first chunk appended to the parameter
    // part, the rest via WRITELOB).
    pub(crate) fn emit(
        &self,
        data_pos: &mut i32,
        descriptor: &ParameterDescriptor,
        w: &mut dyn std::io::Write,
    ) -> ScnpResult<()> {
        if self.emit_type_id(descriptor.type_id(), w)? {
            return Ok(()); // null: the tag alone is the encoding
        }
        match *self {
            Value::Null => {}
            Value::TinyInt(u) => w.write_u8(u)?,
            Value::SmallInt(i) => w.write_i16::<LittleEndian>(i)?,
            Value::Int(i) => w.write_i32::<LittleEndian>(i)?,
            Value::BigInt(i) => w.write_i64::<LittleEndian>(i)?,
            Value::Decimal(ref bd) => {
                decimal::emit(bd, descriptor.type_id(), descriptor.scale(), w)?;
            }
            Value::Real(f) => w.write_f32::<LittleEndian>(f)?,
            Value::Double(f) => w.write_f64::<LittleEndian>(f)?,
            Value::Boolean(b) => w.write_u8(2 * u8::from(b))?,
            Value::String(ref s) => emit_length_and_bytes(&util::to_cesu8(s), w)?,
            Value::Str(s) => emit_length_and_bytes(&util::to_cesu8(s), w)?,
            Value::Binary(ref v) => emit_length_and_bytes(v, w)?,
            Value::DayDate(dd) => w.write_i32::<LittleEndian>(dd.raw())?,
            Value::SecondTime(st) => w.write_u32::<LittleEndian>(st.raw())?,
            Value::SecondDate(sd) => w.write_i64::<LittleEndian>(sd.raw())?,
            Value::LongDate(ld) => w.write_i64::<LittleEndian>(ld.raw())?,
            Value::LobStream(None) => lob::emit_lob_header(0, data_pos, w)?,
            ref v => {
                return Err(ScnpError::InvalidArgument(format!(
                    "value {v:?} cannot be sent to the server directly"
                )))
            }
        }
        Ok(())
    }

    // Writes the type tag; returns true if the value is NULL.
    fn emit_type_id(&self, requested: TypeId, w: &mut dyn std::io::Write) -> ScnpResult<bool> {
        let is_null = self.is_null();
        w.write_u8(self.type_id_for_emit(requested)?.type_code(is_null))?;
        Ok(is_null)
    }

    // Byte size of the emitted form, including the type tag.
    pub(crate) fn size(&self, type_id: TypeId) -> ScnpResult<usize> {
        Ok(1 + match self {
            Value::Null => 0,
            Value::TinyInt(_) | Value::Boolean(_) => 1,
            Value::SmallInt(_) => 2,
            Value::Int(_) | Value::Real(_) | Value::DayDate(_) | Value::SecondTime(_) => 4,
            Value::BigInt(_)
            | Value::Double(_)
            | Value::SecondDate(_)
            | Value::LongDate(_) => 8,
            Value::Decimal(_) => match type_id {
                TypeId::Fixed8 => 8,
                TypeId::Fixed12 => 12,
                TypeId::Fixed16 | TypeId::Decimal => 16,
                tid => {
                    return Err(ScnpError::InvalidArgument(format!(
                        "invalid type id {tid} for a decimal value"
                    )))
                }
            },
            Value::String(s) => length_and_bytes_size(util::cesu8_length(s)),
            Value::Str(s) => length_and_bytes_size(util::cesu8_length(s)),
            Value::Binary(v) => length_and_bytes_size(v.len()),
            Value::LobStream(None) => 9,
            v => {
                return Err(ScnpError::InvalidArgument(format!(
                    "size of value {v:?} cannot be computed for direct transfer"
                )))
            }
        })
    }
}

impl Value<'static> {
    // Parses one cell. `nullable` comes from the field descriptor,
    // `scale` feeds the decimal decoders, the session reference is needed
    // to create LOB handles that can fetch further chunks.
    pub(crate) fn parse(
        type_id: TypeId,
        scale: i16,
        nullable: bool,
        session: &SessionRef,
        o_rs_ref: Option<&crate::base::RsRef>,
        rdr: &mut dyn std::io::Read,
    ) -> ScnpResult<Value<'static>> {
        let cesu8_handling = session.cesu8_handling();
        match type_id {
            TypeId::TinyInt => parse_fixed_size(nullable, rdr, |r| Ok(Value::TinyInt(r.read_u8()?))),
            TypeId::SmallInt => parse_fixed_size(nullable, rdr, |r| {
                Ok(Value::SmallInt(r.read_i16::<LittleEndian>()?))
            }),
            TypeId::Int => parse_fixed_size(nullable, rdr, |r| {
                Ok(Value::Int(r.read_i32::<LittleEndian>()?))
            }),
            TypeId::BigInt => parse_fixed_size(nullable, rdr, |r| {
                Ok(Value::BigInt(r.read_i64::<LittleEndian>()?))
            }),
            TypeId::Real => parse_real(nullable, rdr),
            TypeId::Double => parse_double(nullable, rdr),
            TypeId::Boolean => parse_bool(nullable, rdr),
            TypeId::Decimal | TypeId::Fixed8 | TypeId::Fixed12 | TypeId::Fixed16 => {
                decimal::parse(nullable, type_id, scale, rdr)
            }
            TypeId::Char
            | TypeId::Varchar
            | TypeId::NChar
            | TypeId::NVarchar
            | TypeId::String
            | TypeId::NString
            | TypeId::ShortText => parse_string(nullable, cesu8_handling, rdr),
            TypeId::Alphanum => parse_alphanum(nullable, rdr),
            TypeId::Binary
            | TypeId::Varbinary
            | TypeId::BString
            | TypeId::Geometry
            | TypeId::Point => parse_binary(nullable, rdr),
            TypeId::Blob | TypeId::BinText => lob::parse_blob(session, o_rs_ref, nullable, rdr),
            TypeId::Clob => lob::parse_clob(session, o_rs_ref, nullable, rdr),
            TypeId::NClob | TypeId::Text => lob::parse_nclob(session, o_rs_ref, nullable, rdr),
            TypeId::LongDate => parse_longdate(nullable, rdr),
            TypeId::SecondDate => parse_seconddate(nullable, rdr),
            TypeId::DayDate => parse_daydate(nullable, rdr),
            TypeId::SecondTime => parse_secondtime(nullable, rdr),
            TypeId::BLocator => Err(prot_err!("BLOCATOR cells are not supported")),
        }
    }

    /// Extracts a `String`, converting compatible shapes.
    pub fn try_into_string(self) -> ScnpResult<String> {
        match self {
            Value::String(s) => Ok(s),
            Value::NClob(nclob) => nclob.into_string(),
            Value::Clob(clob) => clob.into_string(),
            v => Err(ScnpError::InvalidArgument(format!(
                "value {v:?} cannot be converted into a String"
            ))),
        }
    }

    /// Extracts an `i64`, converting the integer shapes.
    pub fn try_into_i64(self) -> ScnpResult<i64> {
        match self {
            Value::TinyInt(u) => Ok(i64::from(u)),
            Value::SmallInt(i) => Ok(i64::from(i)),
            Value::Int(i) => Ok(i64::from(i)),
            Value::BigInt(i) => Ok(i),
            v => Err(ScnpError::InvalidArgument(format!(
                "value {v:?} cannot be converted into an i64"
            ))),
        }
    }
}

fn parse_fixed_size(
    nullable: bool,
    rdr: &mut dyn std::io::Read,
    read_value: impl FnOnce(&mut dyn std::io::Read) -> ScnpResult<Value<'static>>,
) -> ScnpResult<Value<'static>> {
    if parse_null_indicator(nullable, rdr)? {
        Ok(Value::Null)
    } else {
        read_value(rdr)
    }
}

// Reads the one-byte null indicator of the fixed-size types.
fn parse_null_indicator(nullable: bool, rdr: &mut dyn std::io::Read) -> ScnpResult<bool> {
    let is_null = rdr.read_u8()? == 0;
    if is_null && !nullable {
        Err(prot_err!("found null value for not-null column"))
    } else {
        Ok(is_null)
    }
}

// REAL and DOUBLE encode NULL as the all-ones bit pattern instead of a
// separate indicator byte.
fn parse_real(nullable: bool, rdr: &mut dyn std::io::Read) -> ScnpResult<Value<'static>> {
    let mut bytes = [0_u8; 4];
    rdr.read_exact(&mut bytes)?;
    if u32::from_le_bytes(bytes) == u32::MAX {
        if nullable {
            Ok(Value::Null)
        } else {
            Err(prot_err!("found null value for not-null REAL column"))
        }
    } else {
        Ok(Value::Real(f32::from_le_bytes(bytes)))
    }
}

fn parse_double(nullable: bool, rdr: &mut dyn std::io::Read) -> ScnpResult<Value<'static>> {
    let mut bytes = [0_u8; 8];
    rdr.read_exact(&mut bytes)?;
    if u64::from_le_bytes(bytes) == u64::MAX {
        if nullable {
            Ok(Value::Null)
        } else {
            Err(prot_err!("found null value for not-null DOUBLE column"))
        }
    } else {
        Ok(Value::Double(f64::from_le_bytes(bytes)))
    }
}

// 0x00 = FALSE, 0x01 = NULL, 0x02 = TRUE
fn parse_bool(nullable: bool, rdr: &mut dyn std::io::Read) -> ScnpResult<Value<'static>> {
    match rdr.read_u8()? {
        0 => Ok(Value::Boolean(false)),
        2 => Ok(Value::Boolean(true)),
        1 => {
            if nullable {
                Ok(Value::Null)
            } else {
                Err(prot_err!("found null value for not-null BOOLEAN column"))
            }
        }
        i => Err(prot_err!("invalid BOOLEAN encoding {i}")),
    }
}

fn parse_string(
    nullable: bool,
    cesu8_handling: Cesu8Handling,
    rdr: &mut dyn std::io::Read,
) -> ScnpResult<Value<'static>> {
    let l8 = rdr.read_u8()?;
    if l8 == length_indicator::LENGTH_INDICATOR_NULL {
        return if nullable {
            Ok(Value::Null)
        } else {
            Err(prot_err!("found null value for not-null string column"))
        };
    }
    let bytes = parse_length_and_bytes(l8, rdr)?;
    // Almost always the server sends correct CESU-8. A few system views
    // are not guaranteed to; keep the original bytes reachable then.
    Ok(match util::try_string_from_cesu8(bytes) {
        Ok(s) => Value::String(s),
        Err(bytes) => match cesu8_handling {
            Cesu8Handling::Replace => Value::String(util::lossy_string_from_cesu8(&bytes)),
            Cesu8Handling::Strict => Value::DbBytes(bytes),
        },
    })
}

fn parse_binary(nullable: bool, rdr: &mut dyn std::io::Read) -> ScnpResult<Value<'static>> {
    let l8 = rdr.read_u8()?;
    if l8 == length_indicator::LENGTH_INDICATOR_NULL {
        return if nullable {
            Ok(Value::Null)
        } else {
            Err(prot_err!("found null value for not-null binary column"))
        };
    }
    Ok(Value::Binary(parse_length_and_bytes(l8, rdr)?))
}

fn parse_alphanum(nullable: bool, rdr: &mut dyn std::io::Read) -> ScnpResult<Value<'static>> {
    let indicator1 = rdr.read_u8()?;
    if indicator1 == length_indicator::LENGTH_INDICATOR_NULL {
        return if nullable {
            Ok(Value::Null)
        } else {
            Err(prot_err!("found null value for not-null ALPHANUM column"))
        };
    }
    let data_length = indicator1 - 1;
    let indicator2 = rdr.read_u8()?;
    let mut value = util::parse_bytes(data_length as usize, rdr)?;
    let bytes = if indicator2 & ALPHANUM_PURELY_NUMERIC == 0 {
        value
    } else {
        // purely numeric values are delivered without their leading zeros
        let field_length = indicator2 & ALPHANUM_LENGTH_MASK;
        let mut prefixed = vec![b'0'; (field_length - data_length) as usize];
        prefixed.append(&mut value);
        prefixed
    };
    Ok(Value::String(util::string_from_cesu8(bytes)?))
}

fn parse_length_and_bytes(l8: u8, rdr: &mut dyn std::io::Read) -> ScnpResult<Vec<u8>> {
    let len = length_indicator::parse(l8, rdr)?;
    Ok(util::parse_bytes(len, rdr)?)
}

fn emit_length_and_bytes(v: &[u8], w: &mut dyn std::io::Write) -> ScnpResult<()> {
    length_indicator::emit(v.len(), w)?;
    w.write_all(v)?;
    Ok(())
}

fn length_and_bytes_size(l: usize) -> usize {
    length_indicator::size(l) + l
}

// Derived Debug is not available because of the reader behind LobStream.
impl std::fmt::Debug for Value<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            Value::String(v) => write!(f, "String({v:?})"),
            Value::Str(v) => write!(f, "Str({v:?})"),
            v => write!(f, "{v}"),
        }
    }
}

impl std::fmt::Display for Value<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            Value::Null => write!(f, "<NULL>"),
            Value::TinyInt(v) => write!(f, "{v}"),
            Value::SmallInt(v) => write!(f, "{v}"),
            Value::Int(v) => write!(f, "{v}"),
            Value::BigInt(v) => write!(f, "{v}"),
            Value::Decimal(v) => write!(f, "{v}"),
            Value::Real(v) => write!(f, "{v}"),
            Value::Double(v) => write!(f, "{v}"),
            Value::Boolean(v) => write!(f, "{v}"),
            Value::String(v) => write!(f, "{v}"),
            Value::Str(v) => write!(f, "{v}"),
            Value::DbBytes(v) => write!(f, "<{} undecodable bytes>", v.len()),
            Value::Binary(v) => write!(f, "<{} bytes>", v.len()),
            Value::DayDate(v) => write!(f, "{v}"),
            Value::SecondTime(v) => write!(f, "{v}"),
            Value::SecondDate(v) => write!(f, "{v}"),
            Value::LongDate(v) => write!(f, "{v}"),
            Value::Blob(_) => write!(f, "<BLOB>"),
            Value::Clob(_) => write!(f, "<CLOB>"),
            Value::NClob(_) => write!(f, "<NCLOB>"),
            Value::LobStream(_) => write!(f, "<LOB stream>"),
            Value::TableRef(id) => write!(f, "<result set reference {id}>"),
        }
    }
}
