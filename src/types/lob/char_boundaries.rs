// Boundary helpers for splitting text streams into chunks without
// cutting through a character.
//
// Outbound (UTF-8 from the caller's reader): a chunk may end in the
// middle of a multi-byte character; the incomplete bytes are carried over
// into the next chunk.
//
// Inbound (CESU-8 from the server): a chunk may end inside a 1..3-byte
// unit, and even a complete unit must be held back when it is the high
// half of a surrogate pair, because the low half arrives with the next
// chunk.

// Length of the trailing incomplete UTF-8 character, 0 if the buffer ends
// at a character boundary.
pub(crate) fn utf8_tail_len(bytes: &[u8]) -> usize {
    let n = bytes.len();
    for back in 1..=n.min(4) {
        let b = bytes[n - back];
        let expected = match b {
            0x00..=0x7F => Some(1),
            0xC0..=0xDF => Some(2),
            0xE0..=0xEF => Some(3),
            0xF0..=0xF7 => Some(4),
            _ => None, // continuation byte, keep walking back
        };
        if let Some(char_len) = expected {
            return if char_len == back { 0 } else { back };
        }
    }
    // no lead byte within reach; leave the bytes alone and let the
    // decoder report them
    0
}

// Length of the trailing CESU-8 bytes that cannot be decoded yet: an
// incomplete unit, plus a complete high-surrogate unit waiting for its
// low half.
pub(crate) fn cesu8_tail_len(bytes: &[u8]) -> usize {
    let n = bytes.len();
    let mut tail = 0;

    // incomplete last unit
    for back in 1..=n.min(3) {
        let b = bytes[n - back];
        if (b & 0b_1100_0000) != 0b_1000_0000 {
            let unit_len = match b {
                0x00..=0x7F => 1,
                0xC0..=0xDF => 2,
                0xE0..=0xEF => 3,
                _ => return 0, // malformed, let the decoder report it
            };
            if unit_len != back {
                tail = back;
            }
            break;
        }
    }

    // a complete unit directly before the tail that is a high surrogate
    // (ED A0..AF xx) must wait for the low half
    let end = n - tail;
    if end >= 3 && bytes[end - 3] == 0xED && (0xA0..=0xAF).contains(&bytes[end - 2]) {
        tail += 3;
    }
    tail
}

// Server characters (UTF-16 code units) contained in a CESU-8 buffer:
// every non-continuation byte starts one unit.
pub(crate) fn cesu8_unit_count(bytes: &[u8]) -> u64 {
    bytes
        .iter()
        .filter(|b| (**b & 0b_1100_0000) != 0b_1000_0000)
        .count() as u64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn utf8_tails() {
        assert_eq!(utf8_tail_len(b"abc"), 0);
        let euro = "€".as_bytes(); // 3 bytes
        assert_eq!(utf8_tail_len(euro), 0);
        assert_eq!(utf8_tail_len(&euro[..2]), 2);
        let clef = "𝄞".as_bytes(); // 4 bytes
        assert_eq!(utf8_tail_len(&clef[..1]), 1);
        assert_eq!(utf8_tail_len(&clef[..3]), 3);
        assert_eq!(utf8_tail_len(clef), 0);
        let mut mixed = b"ab".to_vec();
        mixed.extend_from_slice(&clef[..2]);
        assert_eq!(utf8_tail_len(&mixed), 2);
    }

    #[test]
    fn cesu8_tails() {
        // "𝄞" in CESU-8: ED A0 B4 ED B4 9E
        let clef = [0xED, 0xA0, 0xB4, 0xED, 0xB4, 0x9E];
        assert_eq!(cesu8_tail_len(&clef), 0);
        // high half only: must be held back completely
        assert_eq!(cesu8_tail_len(&clef[..3]), 3);
        // high half plus partial low half
        assert_eq!(cesu8_tail_len(&clef[..4]), 4);
        assert_eq!(cesu8_tail_len(&clef[..5]), 5);
        // plain text before a partial unit
        let mut mixed = b"ab".to_vec();
        mixed.extend_from_slice(&[0xE2, 0x82]); // incomplete €
        assert_eq!(cesu8_tail_len(&mixed), 2);
        assert_eq!(cesu8_tail_len(b"abc"), 0);
    }

    #[test]
    fn unit_counts_match_the_server_convention() {
        assert_eq!(cesu8_unit_count(b"abc"), 3);
        assert_eq!(cesu8_unit_count("€".as_bytes()), 1);
        // the surrogate pair counts as two units
        assert_eq!(cesu8_unit_count(&[0xED, 0xA0, 0xB4, 0xED, 0xB4, 0x9E]), 2);
    }
}
