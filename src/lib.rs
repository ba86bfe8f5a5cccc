//! Monthly aggregation of Fiskeridir landings exports.
//!
//! Raw CSV exports of unknown encoding and delimiter are resolved, read,
//! normalized onto a canonical (year, month, tonnes) record and summed per
//! month, then written as CSV and Parquet.

pub mod compare;
pub mod config;
pub mod error;
pub mod output;
pub mod pipeline;
pub mod process;

pub use error::IngestError;
