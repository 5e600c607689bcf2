//! CLI module for tiergate - command-line interface and subcommands.

pub mod commands;

pub use commands::Cli;
