//! CLI command implementations

pub mod init;
pub mod kinds;
pub mod run;
pub mod validate;
