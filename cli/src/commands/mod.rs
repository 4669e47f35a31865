//! Command implementations

pub mod cleanup;
pub mod run;
pub mod version;
