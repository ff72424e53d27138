//! Adapters module - user-facing front ends for the agent.
//!
//! - **CLI** - single message or interactive session on the terminal

pub mod cli;

pub use cli::CliChannel;
