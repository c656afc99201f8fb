//! Wire codecs for the DECIMAL family.
//!
//! Two transport shapes exist: the 16-byte packed form (sign bit, 14-bit
//! biased exponent, 113-bit unsigned mantissa) used by older data-format
//! versions, and the FIXED8/12/16 forms (two's-complement little-endian
//! mantissa with the scale taken from the field metadata) used from
//! data-format version 8 on.

use crate::protocol::util;
use crate::scnp_error::prot_err;
use crate::{ScnpError, ScnpResult, TypeId, Value};
use bigdecimal::BigDecimal;
use byteorder::{ByteOrder, LittleEndian, ReadBytesExt, WriteBytesExt};
use num::{FromPrimitive, ToPrimitive, Zero};
use num_bigint::{BigInt, Sign};

const EXPONENT_BIAS: i64 = 6176;

pub(crate) fn parse(
    nullable: bool,
    type_id: TypeId,
    scale: i16,
    rdr: &mut dyn std::io::Read,
) -> ScnpResult<Value<'static>> {
    match type_id {
        TypeId::Decimal => {
            let mut raw = [0_u8; 16];
            rdr.read_exact(&mut raw)?;
            big_decimal_from_packed(raw, nullable, scale)
        }
        TypeId::Fixed8 => Ok(if parse_null(nullable, rdr)? {
            Value::Null
        } else {
            let i = rdr.read_i64::<LittleEndian>()?;
            Value::Decimal(BigDecimal::new(
                BigInt::from_i64(i).ok_or_else(|| prot_err!("invalid FIXED8 value"))?,
                i64::from(scale),
            ))
        }),
        TypeId::Fixed12 => Ok(if parse_null(nullable, rdr)? {
            Value::Null
        } else {
            let bytes = util::parse_bytes(12, rdr)?;
            Value::Decimal(BigDecimal::new(
                BigInt::from_signed_bytes_le(&bytes),
                i64::from(scale),
            ))
        }),
        TypeId::Fixed16 => Ok(if parse_null(nullable, rdr)? {
            Value::Null
        } else {
            let i = rdr.read_i128::<LittleEndian>()?;
            Value::Decimal(BigDecimal::new(
                BigInt::from_i128(i).ok_or_else(|| prot_err!("invalid FIXED16 value"))?,
                i64::from(scale),
            ))
        }),
        _ => Err(prot_err!("unexpected type id {type_id} for decimal")),
    }
}

fn parse_null(nullable: bool, rdr: &mut dyn std::io::Read) -> ScnpResult<bool> {
    let is_null = rdr.read_u8()? == 0;
    if is_null && !nullable {
        Err(prot_err!("found null value for not-null column"))
    } else {
        Ok(is_null)
    }
}

pub(crate) fn emit(
    big_decimal: &BigDecimal,
    type_id: TypeId,
    scale: i16,
    w: &mut dyn std::io::Write,
) -> ScnpResult<()> {
    match type_id {
        TypeId::Decimal => {
            w.write_all(&packed_from_big_decimal(big_decimal)?)?;
        }
        TypeId::Fixed8 => {
            let (bigint, _) = big_decimal
                .with_scale(i64::from(scale))
                .into_bigint_and_exponent();
            w.write_i64::<LittleEndian>(
                bigint
                    .to_i64()
                    .ok_or_else(|| out_of_range(big_decimal, type_id))?,
            )?;
        }
        TypeId::Fixed12 => {
            let (bigint, _) = big_decimal
                .with_scale(i64::from(scale))
                .into_bigint_and_exponent();
            let mut bytes = bigint.to_signed_bytes_le();
            if bytes.len() > 12 {
                return Err(out_of_range(big_decimal, type_id));
            }
            // sign-extend to the full width
            let filler = if bytes.last().copied().unwrap_or(0) & 0b_1000_0000 == 0 {
                0_u8
            } else {
                255_u8
            };
            bytes.resize(12, filler);
            w.write_all(&bytes)?;
        }
        TypeId::Fixed16 => {
            let (bigint, _) = big_decimal
                .with_scale(i64::from(scale))
                .into_bigint_and_exponent();
            w.write_i128::<LittleEndian>(
                bigint
                    .to_i128()
                    .ok_or_else(|| out_of_range(big_decimal, type_id))?,
            )?;
        }
        _ => return Err(prot_err!("unexpected type id {type_id} for decimal")),
    }
    Ok(())
}

fn out_of_range(big_decimal: &BigDecimal, type_id: TypeId) -> ScnpError {
    ScnpError::InvalidArgument(format!("decimal {big_decimal} does not fit into {type_id}"))
}

// The packed layout:
//   MANTISSA 113 bit   unsigned integer, bytes 0..14 plus the lowest bit of byte 14
//   EXPONENT  14 bit   biased with 6176, range -6143..=6144
//   SIGN       1 bit   highest bit of byte 15
// The represented number is sign * mantissa * 10^exponent.
// A biased exponent with both top combination bits set encodes NaN or
// infinity, which the database never produces and this driver rejects.
pub(crate) fn big_decimal_from_packed(
    mut raw: [u8; 16],
    nullable: bool,
    scale: i16,
) -> ScnpResult<Value<'static>> {
    if raw[15] == 112 && raw[0..=14].iter().all(|b| *b == 0) {
        return if nullable {
            Ok(Value::Null)
        } else {
            Err(prot_err!("found null value for not-null DECIMAL column"))
        };
    }
    if raw[15] & 0b_0110_0000 == 0b_0110_0000 {
        return Err(ScnpError::DecimalFormat);
    }

    let is_negative = (raw[15] & 0b_1000_0000) != 0;
    raw[15] &= 0b_0111_1111;
    let exponent = i64::from(LittleEndian::read_u16(&raw[14..=15]) >> 1) - EXPONENT_BIAS;
    raw[14] &= 0b_0000_0001;
    let mantissa = BigInt::from_bytes_le(Sign::Plus, &raw[0..=14]);

    let mut big_decimal = if is_negative {
        -BigDecimal::new(mantissa, -exponent)
    } else {
        BigDecimal::new(mantissa, -exponent)
    };
    if scale < i16::MAX {
        big_decimal = big_decimal.with_scale(i64::from(scale));
    }
    Ok(Value::Decimal(big_decimal))
}

pub(crate) fn packed_from_big_decimal(big_decimal: &BigDecimal) -> ScnpResult<[u8; 16]> {
    let ten = BigInt::from(10_u8);
    let (mut bigint, neg_exponent) = big_decimal.as_bigint_and_exponent();
    let mut exponent = -neg_exponent;

    // the server expects mantissas that are not multiples of 10
    while !bigint.is_zero() && (&bigint % &ten).is_zero() {
        bigint /= 10;
        exponent += 1;
    }

    // round until the mantissa fits into 113 bits
    loop {
        let (_, mantissa) = bigint.to_bytes_le();
        let l = mantissa.len();
        if (l > 15) || ((l == 15) && (mantissa[14] & 0b_1111_1110) != 0) {
            bigint /= 10;
            exponent += 1;
        } else {
            break;
        }
    }

    if !(-6143..=6144).contains(&exponent) {
        return Err(ScnpError::InvalidArgument(format!(
            "decimal exponent {exponent} out of range"
        )));
    }

    let (sign, mantissa) = bigint.to_bytes_le();
    let mut raw = [0_u8; 16];
    raw[..mantissa.len()].copy_from_slice(&mantissa);

    #[allow(clippy::cast_possible_truncation)]
    #[allow(clippy::cast_sign_loss)]
    let biased_exponent = (exponent + EXPONENT_BIAS) as u16;
    let low_byte = raw[14];
    LittleEndian::write_u16(&mut raw[14..=15], (biased_exponent << 1) | u16::from(low_byte));

    if let Sign::Minus = sign {
        raw[15] |= 0b_1000_0000;
    }
    Ok(raw)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn packed_roundtrip(input: &str) {
        let before = BigDecimal::from_str(input).unwrap();
        let raw = packed_from_big_decimal(&before).unwrap();
        match big_decimal_from_packed(raw, false, i16::MAX).unwrap() {
            Value::Decimal(after) => assert_eq!(before, after, "mismatch for {input}"),
            other => panic!("unexpected value {other:?}"),
        }
    }

    #[test]
    fn packed_decimal_roundtrips() {
        for input in [
            "0",
            "1",
            "-1",
            "1234.5678",
            "-1234.5678",
            "123456789.0000",
            "0.000000000000000000000000000000001234567890000",
            "-0.1234567890000",
            "123456789123456789",
            "1234567890000000000000000123456789",
            "9999999999999999999999999999999999",
        ] {
            packed_roundtrip(input);
        }
    }

    #[test]
    fn packed_null_and_reserved_patterns() {
        let mut null_raw = [0_u8; 16];
        null_raw[15] = 112;
        assert!(matches!(
            big_decimal_from_packed(null_raw, true, 2).unwrap(),
            Value::Null
        ));
        assert!(big_decimal_from_packed(null_raw, false, 2).is_err());

        let mut special = [0_u8; 16];
        special[15] = 0b_0110_0000; // infinity/NaN combination bits
        special[0] = 1;
        assert!(matches!(
            big_decimal_from_packed(special, true, 2),
            Err(ScnpError::DecimalFormat)
        ));
    }

    #[test]
    fn fixed_forms_roundtrip_with_external_scale() {
        for (type_id, input, scale) in [
            (TypeId::Fixed8, "1234.56", 2),
            (TypeId::Fixed8, "-0.001", 3),
            (TypeId::Fixed12, "123456789012345678.901", 3),
            (TypeId::Fixed12, "-42", 0),
            (TypeId::Fixed16, "17014118346046923173168730371.5884105727", 10),
            (TypeId::Fixed16, "-17014118346046923173168730371.5884105728", 10),
        ] {
            let before = BigDecimal::from_str(input).unwrap();
            let mut buf = Vec::new();
            emit(&before, type_id, scale, &mut buf).unwrap();
            // the null indicator byte precedes the mantissa on the wire
            let mut wire = vec![1_u8];
            wire.extend_from_slice(&buf);
            match parse(false, type_id, scale, &mut std::io::Cursor::new(wire)).unwrap() {
                Value::Decimal(after) => assert_eq!(before, after, "mismatch for {input}"),
                other => panic!("unexpected value {other:?}"),
            }
        }
    }

    #[test]
    fn fixed8_overflow_is_an_argument_error() {
        let too_big = BigDecimal::from_str("92233720368547758.08").unwrap();
        let mut buf = Vec::new();
        assert!(matches!(
            emit(&too_big, TypeId::Fixed8, 2, &mut buf),
            Err(ScnpError::InvalidArgument(_))
        ));
    }
}
