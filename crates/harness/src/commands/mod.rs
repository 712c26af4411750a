//! Subcommand implementations

pub mod extract;
pub mod run;
pub mod topology;
