use crate::protocol::parts::TypeId;
use crate::protocol::util;
use crate::scnp_error::prot_err;
use crate::ScnpResult;
use byteorder::{LittleEndian, ReadBytesExt};

/// The IN, INOUT and OUT parameters of a prepared statement. Can be empty.
#[derive(Debug, Default)]
pub struct ParameterDescriptors(Vec<ParameterDescriptor>);

impl ParameterDescriptors {
    /// Iterates over the IN and INOUT parameters.
    pub fn iter_in(&self) -> impl Iterator<Item = &ParameterDescriptor> {
        self.0
            .iter()
            .filter(|d| matches!(d.direction, ParameterDirection::In | ParameterDirection::InOut))
    }

    /// Iterates over the INOUT and OUT parameters.
    pub fn iter_out(&self) -> impl Iterator<Item = &ParameterDescriptor> {
        self.0
            .iter()
            .filter(|d| matches!(d.direction, ParameterDirection::Out | ParameterDirection::InOut))
    }

    /// True if at least one IN or INOUT parameter is contained.
    #[must_use]
    pub fn has_in(&self) -> bool {
        self.iter_in().next().is_some()
    }

    /// Number of contained descriptors.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// True if no descriptor is contained.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    // 16 bytes of fixed data per parameter, followed by the name table.
    pub(crate) fn parse(count: usize, rdr: &mut dyn std::io::Read) -> ScnpResult<Self> {
        let mut descriptors = Vec::<ParameterDescriptor>::with_capacity(count);
        let mut name_offsets = Vec::<u32>::with_capacity(count);
        for _ in 0..count {
            let option = rdr.read_u8()?;
            let type_code = rdr.read_u8()?;
            let direction = ParameterDirection::from_u8(rdr.read_u8()?)?;
            rdr.read_u8()?; // filler
            name_offsets.push(rdr.read_u32::<LittleEndian>()?);
            let length = rdr.read_i16::<LittleEndian>()?;
            let fraction = rdr.read_i16::<LittleEndian>()?;
            rdr.read_u32::<LittleEndian>()?; // filler
            descriptors.push(ParameterDescriptor::new(
                option,
                TypeId::try_new(type_code)?,
                direction,
                length,
                fraction,
            ));
        }
        for (descriptor, name_offset) in descriptors.iter_mut().zip(name_offsets.iter()) {
            if *name_offset != u32::MAX {
                let length = rdr.read_u8()?;
                descriptor.name =
                    Some(util::string_from_cesu8(util::parse_bytes(length as usize, rdr)?)?);
            }
        }
        Ok(Self(descriptors))
    }
}

impl std::ops::Index<usize> for ParameterDescriptors {
    type Output = ParameterDescriptor;
    fn index(&self, index: usize) -> &Self::Output {
        self.0.index(index)
    }
}

/// Metadata of one statement parameter.
#[derive(Clone, Debug)]
pub struct ParameterDescriptor {
    name: Option<String>,
    type_id: TypeId,
    binding: ParameterBinding,
    scale: i16,
    precision: i16,
    direction: ParameterDirection,
    auto_incremented: bool,
}

impl ParameterDescriptor {
    fn new(
        parameter_option: u8,
        type_id: TypeId,
        direction: ParameterDirection,
        precision: i16,
        scale: i16,
    ) -> Self {
        let binding = if parameter_option & 0b_0000_0001 != 0 {
            ParameterBinding::Mandatory
        } else if parameter_option & 0b_0000_0010 != 0 {
            ParameterBinding::Optional
        } else {
            ParameterBinding::HasDefault
        };
        Self {
            name: None,
            type_id,
            binding,
            scale,
            precision,
            direction,
            auto_incremented: (parameter_option & 0b_0010_0000) != 0,
        }
    }

    /// Name of the parameter, if the server provided one.
    #[must_use]
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// The type of the parameter.
    #[must_use]
    pub fn type_id(&self) -> TypeId {
        self.type_id
    }

    /// Nullability / default-value status of the parameter.
    #[must_use]
    pub fn binding(&self) -> ParameterBinding {
        self.binding
    }

    /// True if the parameter may be set to NULL.
    #[must_use]
    pub fn is_nullable(&self) -> bool {
        matches!(self.binding, ParameterBinding::Optional)
    }

    /// Whether the parameter is used for input, output, or both.
    #[must_use]
    pub fn direction(&self) -> ParameterDirection {
        self.direction
    }

    /// True if the parameter is auto-incremented.
    #[must_use]
    pub fn is_auto_incremented(&self) -> bool {
        self.auto_incremented
    }

    /// Scale of the parameter.
    #[must_use]
    pub fn scale(&self) -> i16 {
        self.scale
    }

    /// Length or precision of the parameter.
    #[must_use]
    pub fn precision(&self) -> i16 {
        self.precision
    }
}

impl std::fmt::Display for ParameterDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        if let Some(ref name) = self.name {
            write!(f, "{name} ")?;
        }
        write!(
            f,
            "{:?} {:?} {:?}, scale({}), precision({})",
            self.type_id, self.binding, self.direction, self.scale, self.precision
        )
    }
}

/// Nullability of a parameter.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ParameterBinding {
    /// The parameter may be set to NULL.
    Optional,
    /// The parameter must not be set to NULL.
    Mandatory,
    /// The parameter has a defined default value.
    HasDefault,
}

/// Direction of a parameter.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ParameterDirection {
    /// Input parameter.
    In,
    /// Input and output parameter.
    InOut,
    /// Output parameter.
    Out,
}

impl ParameterDirection {
    // exactly one of three bits is set
    fn from_u8(v: u8) -> ScnpResult<Self> {
        match v {
            1 => Ok(Self::In),
            2 => Ok(Self::InOut),
            4 => Ok(Self::Out),
            _ => Err(prot_err!("invalid parameter direction {v}")),
        }
    }
}
