//! CLI commands module.

pub mod migrate;
pub mod new;
pub mod status;
pub mod validate;
