//! CLI command implementations.
//!
//! Each subcommand has its own module with argument definitions and handlers.
//!
//! # Command Modules
//!
//! - [`config`] - Configuration management (show, path, init)
//! - [`simulate`] - Synthetic fleet crossing a watch area

pub mod config;
pub mod simulate;
