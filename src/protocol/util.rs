//! The CESU-8 <-> UTF-8 boundary, and small read helpers.
//!
//! All text travels as CESU-8 on the wire: supplementary-plane code points
//! are represented as two 3-byte sequences forming a UTF-16 surrogate pair
//! instead of the single 4-byte UTF-8 sequence.

use crate::{ScnpError, ScnpResult};

/// Decides what happens when the server sends bytes that are not valid
/// CESU-8 in a text field.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum Cesu8Handling {
    /// Fail the affected value with [`ScnpError::Cesu8`].
    #[default]
    Strict,
    /// Substitute U+FFFD for the malformed sequence(s).
    Replace,
}

pub(crate) fn to_cesu8(s: &str) -> std::borrow::Cow<'_, [u8]> {
    cesu8::to_cesu8(s)
}

// Number of bytes the CESU-8 encoding of s will occupy.
pub(crate) fn cesu8_length(s: &str) -> usize {
    s.chars()
        .map(|c| match c.len_utf8() {
            4 => 6, // supplementary plane: two 3-byte surrogate sequences
            n => n,
        })
        .sum()
}

// Number of characters as the server counts them: each UTF-16 code unit is
// one character, so a supplementary-plane code point counts as two.
// LOB offsets for NCLOB columns must be computed with this convention.
pub(crate) fn cesu8_char_count(s: &str) -> u64 {
    s.chars().map(|c| if c.len_utf8() == 4 { 2 } else { 1 }).sum()
}

pub(crate) fn string_from_cesu8(bytes: Vec<u8>) -> ScnpResult<String> {
    try_string_from_cesu8(bytes).map_err(|_| ScnpError::Cesu8)
}

pub(crate) fn try_string_from_cesu8(bytes: Vec<u8>) -> Result<String, Vec<u8>> {
    match String::from_utf8(bytes) {
        Ok(s) => Ok(s),
        Err(e) => {
            let bytes = e.into_bytes();
            match cesu8::from_cesu8(&bytes) {
                Ok(cow) => Ok(cow.to_string()),
                Err(_) => Err(bytes),
            }
        }
    }
}

pub(crate) fn string_from_cesu8_with(bytes: Vec<u8>, handling: Cesu8Handling) -> ScnpResult<String> {
    match handling {
        Cesu8Handling::Strict => string_from_cesu8(bytes),
        Cesu8Handling::Replace => Ok(lossy_string_from_cesu8(&bytes)),
    }
}

// Best-effort decoding: valid prefixes are kept, each undecodable unit
// becomes U+FFFD.
pub(crate) fn lossy_string_from_cesu8(bytes: &[u8]) -> String {
    match cesu8::from_cesu8(bytes) {
        Ok(cow) => cow.to_string(),
        Err(_) => String::from_utf8_lossy(bytes).to_string(),
    }
}

// Read n bytes into a fresh Vec<u8>.
pub(crate) fn parse_bytes(len: usize, rdr: &mut dyn std::io::Read) -> std::io::Result<Vec<u8>> {
    let mut vec = vec![0_u8; len];
    rdr.read_exact(&mut vec)?;
    Ok(vec)
}

pub(crate) fn skip_bytes(mut n: usize, rdr: &mut dyn std::io::Read) -> std::io::Result<()> {
    let mut buffer = [0_u8; 32];
    while n > 0 {
        let chunk = n.min(buffer.len());
        rdr.read_exact(&mut buffer[0..chunk])?;
        n -= chunk;
    }
    Ok(())
}

pub(crate) fn io_error<E>(error: E) -> std::io::Error
where
    E: Into<Box<dyn std::error::Error + Send + Sync>>,
{
    std::io::Error::other(error)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cesu8_roundtrip_with_supplementary_plane() {
        let s = "Hello World - 𝄞𝄞€€!";
        let wire = to_cesu8(s);
        // every 𝄞 (U+1D11E) becomes a 6-byte surrogate pair
        assert_eq!(wire.len(), cesu8_length(s));
        assert!(wire.len() > s.len());
        let back = string_from_cesu8(wire.to_vec()).unwrap();
        assert_eq!(back, s);
    }

    #[test]
    fn char_count_follows_the_server_convention() {
        assert_eq!(cesu8_char_count("abc"), 3);
        assert_eq!(cesu8_char_count("€"), 1); // BMP, 3 bytes UTF-8
        assert_eq!(cesu8_char_count("𝄞"), 2); // supplementary plane
        assert_eq!(cesu8_char_count("a𝄞b"), 4);
    }

    #[test]
    fn malformed_input_fails_or_replaces_by_handling() {
        let bad = vec![b'a', 0xED, 0xA0, b'b'];
        assert!(matches!(
            string_from_cesu8_with(bad.clone(), Cesu8Handling::Strict),
            Err(ScnpError::Cesu8)
        ));
        let replaced = string_from_cesu8_with(bad, Cesu8Handling::Replace).unwrap();
        assert!(replaced.contains('\u{FFFD}'));
    }
}
