//! CLI argument parsing and command handling.

mod args;
pub mod species;

pub use args::{Cli, Command, ConfigAction, RunArgs};
