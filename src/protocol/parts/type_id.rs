use crate::scnp_error::prot_err;
use crate::ScnpResult;

/// Type code of a database column or parameter.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum TypeId {
    /// 8-bit unsigned integer.
    TinyInt = 1,
    /// 16-bit signed integer.
    SmallInt = 2,
    /// 32-bit signed integer.
    Int = 3,
    /// 64-bit signed integer.
    BigInt = 4,
    /// Fixed-point decimal in the 16-byte packed wire representation.
    Decimal = 5,
    /// 32-bit floating-point number.
    Real = 6,
    /// 64-bit floating-point number.
    Double = 7,
    /// Fixed-length character string.
    Char = 8,
    /// Variable-length character string.
    Varchar = 9,
    /// Fixed-length national character string.
    NChar = 10,
    /// Variable-length national character string.
    NVarchar = 11,
    /// Fixed-length binary data.
    Binary = 12,
    /// Variable-length binary data.
    Varbinary = 13,
    /// Large ASCII character object.
    Clob = 25,
    /// Large national character object.
    NClob = 26,
    /// Large binary object.
    Blob = 27,
    /// TRUE or FALSE.
    Boolean = 28,
    /// Character string; the server reports most strings with this code.
    String = 29,
    /// National character string.
    NString = 30,
    /// Binary locator.
    BLocator = 31,
    /// Binary string.
    BString = 33,
    /// Large text object.
    Text = 51,
    /// Short text.
    ShortText = 52,
    /// Binary text.
    BinText = 53,
    /// Alphanumeric value with the purely-numeric zero-padding rule.
    Alphanum = 55,
    /// Timestamp with 100ns precision, eight bytes.
    LongDate = 61,
    /// Timestamp with second precision.
    SecondDate = 62,
    /// Date with day precision.
    DayDate = 63,
    /// Time with second precision.
    SecondTime = 64,
    /// Spatial type GEOMETRY; transported like a binary value.
    Geometry = 74,
    /// Spatial type POINT; transported like a binary value.
    Point = 75,
    /// DECIMAL transport format: 16-byte two's-complement mantissa.
    Fixed16 = 76,
    /// DECIMAL transport format: 8-byte two's-complement mantissa.
    Fixed8 = 81,
    /// DECIMAL transport format: 12-byte two's-complement mantissa.
    Fixed12 = 82,
}

impl TypeId {
    pub(crate) fn try_new(type_code: u8) -> ScnpResult<Self> {
        Ok(match type_code {
            1 => Self::TinyInt,
            2 => Self::SmallInt,
            3 => Self::Int,
            4 => Self::BigInt,
            5 => Self::Decimal,
            6 => Self::Real,
            7 => Self::Double,
            8 => Self::Char,
            9 => Self::Varchar,
            10 => Self::NChar,
            11 => Self::NVarchar,
            12 => Self::Binary,
            13 => Self::Varbinary,
            // 14-16 (DATE, TIME, TIMESTAMP) are gone since protocol version 3
            25 => Self::Clob,
            26 => Self::NClob,
            27 => Self::Blob,
            28 => Self::Boolean,
            29 => Self::String,
            30 => Self::NString,
            31 => Self::BLocator,
            33 => Self::BString,
            51 => Self::Text,
            52 => Self::ShortText,
            53 => Self::BinText,
            55 => Self::Alphanum,
            61 => Self::LongDate,
            62 => Self::SecondDate,
            63 => Self::DayDate,
            64 => Self::SecondTime,
            74 => Self::Geometry,
            75 => Self::Point,
            76 => Self::Fixed16,
            81 => Self::Fixed8,
            82 => Self::Fixed12,
            tc => return Err(prot_err!("illegal type code {tc}")),
        })
    }

    // Type codes below 128 denote non-nullable fields, codes above 128
    // the nullable variant of (code - 128).
    pub(crate) fn type_code(self, nullable: bool) -> u8 {
        (if nullable { 128 } else { 0 }) + self as u8
    }

    // Character-typed LOBs; their offsets are counted in characters and
    // their data is CESU-8.
    pub(crate) fn is_char_lob(self) -> bool {
        matches!(self, Self::Clob | Self::NClob | Self::Text)
    }

    // Validates that a value of type `value_type` can be sent for a
    // parameter declared with this type id.
    pub(crate) fn accepts_value_of_type(self, value_type: Self) -> ScnpResult<()> {
        if value_type == self {
            return Ok(());
        }
        match (value_type, self) {
            (Self::Boolean, Self::TinyInt | Self::SmallInt | Self::Int | Self::BigInt) => Ok(()),
            // no conversion strategy for the spatial types, be restrictive
            (Self::String, Self::Geometry | Self::Point) => Err(prot_err!(
                "a string value cannot be bound to a {self:?} parameter"
            )),
            (Self::String, _) => Ok(()),
            (
                Self::Binary,
                Self::Blob | Self::BLocator | Self::Varbinary | Self::Geometry | Self::Point,
            )
            | (Self::Decimal, Self::Fixed8 | Self::Fixed12 | Self::Fixed16) => Ok(()),
            _ => Err(prot_err!(
                "value type {value_type:?} does not match parameter type {self:?}"
            )),
        }
    }
}

impl std::fmt::Display for TypeId {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{self:?}")
    }
}
