#![forbid(unsafe_code)]

//! Batch correction of eScholarship URLs in UCLA MARC records.
//!
//! One run discovers binary MARC files in a Google Drive folder,
//! rewrites each record's 856 $u from the cross-reference identifier
//! in its 035 $9 via the eScholarship database, uploads the corrected
//! records as a single file, and moves the inputs to a dated backup
//! folder.

pub use result::FixerError;
pub use result::FixerResult;
pub use result::RecordError;

pub mod batch;
pub mod conf;
pub mod correct;
pub mod db;
pub mod drive;
pub mod lookup;
pub mod result;
