//! Argument parsing (`args`) and orchestration (`runner`) for the CLI.
pub mod args;
pub mod runner;

pub use args::CliArgs;
pub use runner::run;
