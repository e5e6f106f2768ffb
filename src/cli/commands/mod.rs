//! CLI command implementations

pub mod completions;
pub mod engine;
pub mod form;
pub mod init;
pub mod schema;
pub mod workflow;
