//! CLI module for the termap command-line interface.
//!
//! Command handlers build the library components from configuration, run
//! the requested operation and hand results to the output formatters.

mod commands;
mod output;

pub use commands::*;
