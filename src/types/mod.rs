//! Date, time, decimal and LOB types as they travel on the wire.

mod daydate;
pub(crate) mod decimal;
mod julian;
pub(crate) mod lob;
mod longdate;
mod seconddate;
mod secondtime;

pub use self::daydate::DayDate;
pub use self::lob::{Blob, Clob, NClob};
pub use self::longdate::LongDate;
pub use self::seconddate::SecondDate;
pub use self::secondtime::SecondTime;

pub(crate) use self::daydate::parse_daydate;
pub(crate) use self::longdate::parse_longdate;
pub(crate) use self::seconddate::parse_seconddate;
pub(crate) use self::secondtime::parse_secondtime;
