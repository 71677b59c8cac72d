//! Command implementations that do more than dispatch to the engine.

pub mod init;
