#![forbid(unsafe_code)]

//! Model and binary codec for MARC21 bibliographic records.

pub use self::record::Controlfield;
pub use self::record::Field;
pub use self::record::Record;
pub use self::record::Subfield;

pub mod binary;
pub mod record;
