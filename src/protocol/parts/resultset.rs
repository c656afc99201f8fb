use crate::base::{DecodeError, Row, RsRef};
use crate::conn::SessionRef;
use crate::protocol::parts::ResultSetMetadata;
use crate::protocol::parts::Value;
use crate::{ScnpError, ScnpResult};
use std::sync::Arc;

// Decodes the raw cells of one ResultSet part into rows.
//
// Decoding is best-effort: a cell whose wire bytes were consumed but whose
// value cannot be represented (unsupported decimal bit patterns, malformed
// CESU-8 under strict handling) yields NULL plus a decode-error record
// instead of failing the whole fetch.
pub(crate) fn parse_rows(
    session: &SessionRef,
    metadata: &Arc<ResultSetMetadata>,
    no_of_rows: usize,
    o_rs_ref: Option<&RsRef>,
    row_offset: usize,
    decode_errors: &mut Vec<DecodeError>,
    rdr: &mut dyn std::io::Read,
) -> ScnpResult<Vec<Row>> {
    let no_of_cols = metadata.len();
    debug!("parse_rows: {no_of_rows} rows with {no_of_cols} columns");

    let mut rows = Vec::<Row>::with_capacity(no_of_rows);
    for row_index in 0..no_of_rows {
        let mut values = Vec::<Value<'static>>::with_capacity(no_of_cols);
        for (column, field) in metadata.iter().enumerate() {
            match Value::parse(
                field.type_id(),
                field.scale(),
                field.is_nullable(),
                session,
                o_rs_ref,
                rdr,
            ) {
                Ok(value) => values.push(value),
                // the cell's bytes are consumed, the stream stays in sync
                Err(e @ ScnpError::DecimalFormat) => {
                    decode_errors.push(DecodeError::new(
                        row_offset + row_index,
                        column,
                        field.displayname().to_string(),
                        e.to_string(),
                    ));
                    values.push(Value::Null);
                }
                Err(e) => return Err(e),
            }
        }
        rows.push(Row::new(Arc::clone(metadata), values));
    }
    Ok(rows)
}
