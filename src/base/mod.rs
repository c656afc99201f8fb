//! Cursor state and row representation.

mod decode_error;
mod result_set;
mod row;
mod rs_core;
mod rs_state;

pub use self::decode_error::DecodeError;
pub use self::result_set::ResultSet;
pub use self::row::Row;

pub(crate) use self::rs_core::{RsCore, RsRef};
pub(crate) use self::rs_state::RsState;
