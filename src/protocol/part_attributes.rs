// Last part in a sequence of parts (FETCH, array command EXECUTE)
const LAST_PACKET: u8 = 0b_0000_0001;

// Part in a sequence of parts
const NEXT_PACKET: u8 = 0b_0000_0010;

// First part in a sequence of parts
const FIRST_PACKET: u8 = 0b_0000_0100;

// Empty part, caused by a "row not found" condition
const ROW_NOT_FOUND: u8 = 0b_0000_1000;

// The result set that produced this part is closed
const RESULT_SET_IS_CLOSED: u8 = 0b_0001_0000;

// Attribute bits of a part header.
#[derive(Clone, Copy)]
pub(crate) struct PartAttributes(u8);

impl PartAttributes {
    pub fn new(bits: u8) -> Self {
        Self(bits)
    }

    pub fn is_last_packet(self) -> bool {
        (self.0 & LAST_PACKET) != 0
    }
    pub fn has_next_packet(self) -> bool {
        (self.0 & NEXT_PACKET) != 0
    }
    pub fn is_first_packet(self) -> bool {
        (self.0 & FIRST_PACKET) != 0
    }
    pub fn row_not_found(self) -> bool {
        (self.0 & ROW_NOT_FOUND) != 0
    }
    pub fn result_set_is_closed(self) -> bool {
        (self.0 & RESULT_SET_IS_CLOSED) != 0
    }
}

impl std::fmt::Debug for PartAttributes {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        let mut flags = Vec::new();
        if self.is_last_packet() {
            flags.push("LAST");
        }
        if self.has_next_packet() {
            flags.push("NEXT");
        }
        if self.is_first_packet() {
            flags.push("FIRST");
        }
        if self.row_not_found() {
            flags.push("ROW_NOT_FOUND");
        }
        if self.result_set_is_closed() {
            flags.push("CLOSED");
        }
        write!(f, "PartAttributes({})", flags.join("|"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bits_map_to_accessors() {
        let attributes = PartAttributes::new(LAST_PACKET | RESULT_SET_IS_CLOSED);
        assert!(attributes.is_last_packet());
        assert!(attributes.result_set_is_closed());
        assert!(!attributes.has_next_packet());
        assert!(!attributes.is_first_packet());
        assert!(!attributes.row_not_found());
    }
}
