use crate::conn::SessionRef;
use crate::protocol::parts::{ParameterDescriptor, ParameterDescriptors, Value};
use crate::ScnpResult;

/// The scalar output of a procedure call: the INOUT and OUT parameter
/// values, in declaration order.
#[derive(Debug)]
pub struct OutputParameters {
    descriptors: Vec<ParameterDescriptor>,
    values: Vec<Value<'static>>,
}

impl OutputParameters {
    // The part carries one value per INOUT/OUT descriptor, encoded like a
    // result-set row.
    pub(crate) fn parse(
        session: &SessionRef,
        descriptors: &ParameterDescriptors,
        rdr: &mut dyn std::io::Read,
    ) -> ScnpResult<Self> {
        let mut out_descriptors = Vec::new();
        let mut values = Vec::new();
        for descriptor in descriptors.iter_out() {
            trace!("parsing output value for {descriptor}");
            let value = Value::parse(
                descriptor.type_id(),
                descriptor.scale(),
                descriptor.is_nullable(),
                session,
                None,
                rdr,
            )?;
            out_descriptors.push(descriptor.clone());
            values.push(value);
        }
        Ok(Self {
            descriptors: out_descriptors,
            values,
        })
    }

    /// The descriptors of the output parameters.
    #[must_use]
    pub fn descriptors(&self) -> &[ParameterDescriptor] {
        &self.descriptors
    }

    /// Consumes the output parameters into their values.
    #[must_use]
    pub fn into_values(self) -> Vec<Value<'static>> {
        self.values
    }
}

impl std::fmt::Display for OutputParameters {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        for (descriptor, value) in self.descriptors.iter().zip(self.values.iter()) {
            writeln!(f, "{descriptor} = {value}")?;
        }
        Ok(())
    }
}
