//! CLI subcommand implementations for the offprint binary.

pub mod doctor;
pub mod output;
pub mod render_cmd;
pub mod run_cmd;
