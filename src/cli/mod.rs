//! Command-line interface for guess-the-songs.
//!
//! This module provides the subcommands (play, artist, resume, scores,
//! history, login) and the interactive terminal play loop.

mod commands;
mod play;

pub use commands::{Cli, Commands, run_command};
