//! UG40 CLI library
//!
//! Command definitions, layered configuration and terminal output for the
//! `ug40` binary. The binary itself only parses arguments, sets up logging
//! and dispatches to [`commands`].

pub mod cli;
pub mod commands;
pub mod config;
pub mod output;
pub mod progress;
