use crate::protocol::parts::TypeId;
use crate::protocol::util;
use crate::ScnpResult;
use byteorder::{LittleEndian, ReadBytesExt};
use std::collections::BTreeMap;
use std::sync::Arc;

// Column, table, schema and display names are not repeated per field on
// the wire; each name appears once in a trailing table and the fields
// reference it by byte offset. The arena retains that sharing in memory.
#[derive(Debug, Default)]
pub(crate) struct NameArena(BTreeMap<u32, String>);

impl NameArena {
    fn get(&self, offset: u32) -> &str {
        if offset == u32::MAX {
            ""
        } else {
            self.0.get(&offset).map_or("", String::as_str)
        }
    }
}

/// Metadata of one field (column) of a result set.
#[derive(Clone, Debug)]
pub struct FieldMetadata {
    schemaname_idx: u32,
    tablename_idx: u32,
    columnname_idx: u32,
    displayname_idx: u32,
    // bit 0: mandatory, 1: optional, 2: default,
    // 4: read-only, 5: auto-increment, 6: array type
    column_options: u8,
    type_id: TypeId,
    scale: i16,
    precision: i16,
    names: Arc<NameArena>,
}

impl FieldMetadata {
    /// Database schema of the field.
    #[must_use]
    pub fn schemaname(&self) -> &str {
        self.names.get(self.schemaname_idx)
    }
    /// Database table of the field.
    #[must_use]
    pub fn tablename(&self) -> &str {
        self.names.get(self.tablename_idx)
    }
    /// Column name.
    #[must_use]
    pub fn columnname(&self) -> &str {
        self.names.get(self.columnname_idx)
    }
    /// Display name of the column.
    #[must_use]
    pub fn displayname(&self) -> &str {
        self.names.get(self.displayname_idx)
    }
    /// The type of the column.
    #[must_use]
    pub fn type_id(&self) -> TypeId {
        self.type_id
    }
    /// True if the column can contain NULL values.
    #[must_use]
    pub fn is_nullable(&self) -> bool {
        (self.column_options & 0b_0000_0010) != 0
    }
    /// True if the column has a default value.
    #[must_use]
    pub fn has_default(&self) -> bool {
        (self.column_options & 0b_0000_0100) != 0
    }
    /// True if the column is auto-incremented.
    #[must_use]
    pub fn is_auto_incremented(&self) -> bool {
        (self.column_options & 0b_0010_0000) != 0
    }
    /// Length or precision of the column; -1 for LOB columns.
    #[must_use]
    pub fn precision(&self) -> i16 {
        self.precision
    }
    /// Scale of the column; 0 where a scale makes no sense.
    #[must_use]
    pub fn scale(&self) -> i16 {
        self.scale
    }
}

/// The field descriptors of a result set.
#[derive(Debug)]
pub struct ResultSetMetadata(Vec<FieldMetadata>);

impl std::ops::Deref for ResultSetMetadata {
    type Target = Vec<FieldMetadata>;
    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl ResultSetMetadata {
    // 24 bytes of fixed descriptor data per field, followed by the name
    // table. The names are laid out back to back; a second pass resolves
    // the offsets collected in the first pass.
    pub(crate) fn parse(count: usize, rdr: &mut dyn std::io::Read) -> ScnpResult<Self> {
        struct RawField {
            column_options: u8,
            type_id: TypeId,
            scale: i16,
            precision: i16,
            tablename_idx: u32,
            schemaname_idx: u32,
            columnname_idx: u32,
            displayname_idx: u32,
        }

        let mut raw_fields = Vec::<RawField>::with_capacity(count);
        let mut referenced = std::collections::BTreeSet::<u32>::new();
        for _ in 0..count {
            let column_options = rdr.read_u8()?;
            let type_code = rdr.read_u8()?;
            let scale = rdr.read_i16::<LittleEndian>()?;
            let precision = rdr.read_i16::<LittleEndian>()?;
            rdr.read_i16::<LittleEndian>()?; // reserved
            let tablename_idx = rdr.read_u32::<LittleEndian>()?;
            let schemaname_idx = rdr.read_u32::<LittleEndian>()?;
            let columnname_idx = rdr.read_u32::<LittleEndian>()?;
            let displayname_idx = rdr.read_u32::<LittleEndian>()?;
            for idx in [tablename_idx, schemaname_idx, columnname_idx, displayname_idx] {
                if idx != u32::MAX {
                    referenced.insert(idx);
                }
            }
            raw_fields.push(RawField {
                column_options,
                type_id: TypeId::try_new(type_code)?,
                scale,
                precision,
                tablename_idx,
                schemaname_idx,
                columnname_idx,
                displayname_idx,
            });
        }

        // the name table: one length-prefixed name per distinct offset
        let mut names = NameArena::default();
        let mut offset = 0_u32;
        for _ in 0..referenced.len() {
            let name_length = rdr.read_u8()?;
            let name = util::string_from_cesu8(util::parse_bytes(name_length as usize, rdr)?)?;
            trace!("name at offset {offset}: {name}");
            names.0.insert(offset, name);
            offset += u32::from(name_length) + 1;
        }
        let names = Arc::new(names);

        Ok(Self(
            raw_fields
                .into_iter()
                .map(|raw| FieldMetadata {
                    schemaname_idx: raw.schemaname_idx,
                    tablename_idx: raw.tablename_idx,
                    columnname_idx: raw.columnname_idx,
                    displayname_idx: raw.displayname_idx,
                    column_options: raw.column_options,
                    type_id: raw.type_id,
                    scale: raw.scale,
                    precision: raw.precision,
                    names: Arc::clone(&names),
                })
                .collect(),
        ))
    }
}

impl std::fmt::Display for ResultSetMetadata {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        for field_metadata in &self.0 {
            write!(f, "{}, ", field_metadata.displayname())?;
        }
        Ok(())
    }
}
