//! xnotif Daemon
//!
//! Building blocks of the `xnotif` notification daemon:
//! - [`config`]: TOML configuration and standard file locations
//! - [`fifo`]: the command FIFO reader
//! - [`orchestrator`]: applies orders to the notification queue

pub mod config;
pub mod fifo;
pub mod orchestrator;
