//! Command line host for the pixelizer.
//!
//! Parses arguments, installs logging and hands each input to
//! `sprite_pixelizer::process_file`.

use clap::Parser;

mod cli;

fn main() -> anyhow::Result<()> {
    let args = cli::CliArgs::parse();
    cli::run(args)
}
