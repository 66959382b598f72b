//! Command implementations that do not go through the engine.

pub mod init;
