use crate::protocol::parts::option_value::OptionValue;
use crate::scnp_error::prot_err;
use crate::ScnpResult;
use byteorder::{ReadBytesExt, WriteBytesExt};
use std::fmt::Debug;

// The key type of an option bag. Keys come from closed per-part enums;
// values the server sends with an unknown key are retained under Unknown
// so that re-emitting a bag is lossless.
pub(crate) trait OptionId: Copy + Debug + Eq + Ord {
    fn from_u8(i: u8) -> Self;
    fn to_u8(self) -> u8;
    fn part_name() -> &'static str;
}

// An option bag: pairs of (key, tagged value), kept sorted by key so that
// encoding is canonical. Parsing tolerates any key order.
#[derive(Clone, Debug)]
pub(crate) struct OptionPart<T: OptionId>(Vec<(T, OptionValue)>);

impl<T: OptionId> Default for OptionPart<T> {
    fn default() -> Self {
        Self(Vec::new())
    }
}

impl<T: OptionId> OptionPart<T> {
    pub fn insert(&mut self, id: T, value: OptionValue) -> Option<OptionValue> {
        match self.0.binary_search_by_key(&id, |(k, _)| *k) {
            Ok(i) => Some(std::mem::replace(&mut self.0[i].1, value)),
            Err(i) => {
                self.0.insert(i, (id, value));
                None
            }
        }
    }

    pub fn get(&self, id: T) -> ScnpResult<&OptionValue> {
        self.get_opt(id)
            .ok_or_else(|| prot_err!("{id:?} not provided in {}", T::part_name()))
    }

    pub fn get_opt(&self, id: T) -> Option<&OptionValue> {
        self.0
            .binary_search_by_key(&id, |(k, _)| *k)
            .ok()
            .map(|i| &self.0[i].1)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn size(&self) -> usize {
        self.0.iter().map(|(_, v)| 1 + v.size()).sum()
    }

    pub fn iter(&self) -> impl Iterator<Item = &(T, OptionValue)> {
        self.0.iter()
    }

    pub fn emit(&self, w: &mut dyn std::io::Write) -> ScnpResult<()> {
        for (id, value) in &self.0 {
            w.write_u8(id.to_u8())?;
            value.emit(w)?;
        }
        Ok(())
    }

    pub fn parse(count: usize, rdr: &mut dyn std::io::Read) -> ScnpResult<Self> {
        let mut result = Self::default();
        for _ in 0..count {
            let id = T::from_u8(rdr.read_u8()?);
            let value = OptionValue::parse(rdr)?;
            trace!("parsed option {id:?} = {value:?}");
            result.insert(id, value);
        }
        Ok(result)
    }
}

impl<T: OptionId> std::fmt::Display for OptionPart<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        for (k, v) in &self.0 {
            writeln!(f, "{k:?} = {v}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Clone, Copy, Debug, Eq, Ord, PartialEq, PartialOrd)]
    enum TestId {
        Alpha,
        Beta,
        Unknown(u8),
    }
    impl OptionId for TestId {
        fn from_u8(i: u8) -> Self {
            match i {
                1 => Self::Alpha,
                2 => Self::Beta,
                i => Self::Unknown(i),
            }
        }
        fn to_u8(self) -> u8 {
            match self {
                Self::Alpha => 1,
                Self::Beta => 2,
                Self::Unknown(i) => i,
            }
        }
        fn part_name() -> &'static str {
            "TestOptions"
        }
    }

    #[test]
    fn encoding_is_canonical_regardless_of_insertion_order() {
        let mut a = OptionPart::<TestId>::default();
        a.insert(TestId::Beta, OptionValue::Int(2));
        a.insert(TestId::Alpha, OptionValue::Boolean(true));

        let mut b = OptionPart::<TestId>::default();
        b.insert(TestId::Alpha, OptionValue::Boolean(true));
        b.insert(TestId::Beta, OptionValue::Int(2));

        let mut buf_a = Vec::new();
        let mut buf_b = Vec::new();
        a.emit(&mut buf_a).unwrap();
        b.emit(&mut buf_b).unwrap();
        assert_eq!(buf_a, buf_b);
        assert_eq!(buf_a.len(), a.size());

        let parsed =
            OptionPart::<TestId>::parse(a.len(), &mut std::io::Cursor::new(buf_a)).unwrap();
        assert_eq!(parsed.get(TestId::Beta).unwrap().get_int().unwrap(), 2);
        assert!(parsed.get(TestId::Alpha).unwrap().get_bool().unwrap());
    }
}
