//! CLI command implementations.

pub mod console;
pub mod run;
pub mod script;
