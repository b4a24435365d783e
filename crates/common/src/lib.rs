//! Shared vocabulary for coinboard: domain types, the error taxonomy and the
//! collaborator traits the data-access layer is written against.

pub mod constants;
pub mod error;
pub mod traits;
pub mod types;
