use crate::protocol::{Part, PartKind};

// The ordered parts of one segment. Wire order is preserved; it matters
// because a ResultSetMetadata part establishes the layout that subsequent
// ResultSet parts of the same reply are decoded with.
#[derive(Debug, Default)]
pub(crate) struct Parts<'a>(Vec<Part<'a>>);

impl<'a> Parts<'a> {
    pub fn push(&mut self, part: Part<'a>) {
        self.0.push(part);
    }

    pub fn pop(&mut self) -> Option<Part<'a>> {
        self.0.pop()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn ref_inner(&self) -> &Vec<Part<'a>> {
        &self.0
    }

    pub fn remove_first_of_kind(&mut self, kind: PartKind) -> Option<Part<'a>> {
        self.0
            .iter()
            .position(|part| part.kind() == kind)
            .map(|index| self.0.remove(index))
    }
}

impl<'a> IntoIterator for Parts<'a> {
    type Item = Part<'a>;
    type IntoIter = std::vec::IntoIter<Part<'a>>;
    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}
