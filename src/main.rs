//! Guess the Songs - a music trivia game for the terminal.
//!
//! Pick an artist and an album (or a whole artist), and name every
//! track before the clock runs out. Track lists come from MusicBrainz;
//! scores are kept locally per user and release.

pub mod catalog;
pub mod cli;
pub mod config;
pub mod db;
pub mod error;
pub mod game;
pub mod identity;
pub mod model;
pub mod normalize;
pub mod score;
#[cfg(test)]
pub mod test_utils;

use clap::{CommandFactory, Parser};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

fn main() -> anyhow::Result<()> {
    let args = cli::Cli::parse();

    // Initialize logging. Diagnostics go to stderr so the game itself
    // stays readable on stdout.
    tracing_subscriber::registry()
        .with(fmt::layer().with_target(true).with_writer(std::io::stderr))
        .with(
            EnvFilter::from_default_env().add_directive("guess_the_songs=warn".parse().unwrap()),
        )
        .init();

    // Try to run a CLI command
    if cli::run_command(&args)? {
        // A command was executed, exit normally
        return Ok(());
    }

    // No command specified: show usage.
    cli::Cli::command().print_help()?;
    println!();
    Ok(())
}
