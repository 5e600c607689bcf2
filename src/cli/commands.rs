//! CLI command definitions using clap.
//!
//! Subcommands:
//! - run: run all tiers (or one) against the project
//! - check-file: validate a single file
//! - refine: drive the refinement loop
//! - dimensions: list configured dimensions

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Tiergate - tiered validation gate for change sets
#[derive(Parser, Debug)]
#[command(name = "tiergate")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Optional config file path
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    /// Check if verbose mode is enabled
    pub fn is_verbose(&self) -> bool {
        self.verbose
    }
}

fn parse_tier(s: &str) -> Result<u8, String> {
    match s.parse::<u8>() {
        Ok(n @ 1..=3) => Ok(n),
        _ => Err(format!("tier must be 1, 2 or 3, got '{}'", s)),
    }
}

fn parse_unit(s: &str) -> Result<f64, String> {
    let value: f64 = s.parse().map_err(|_| format!("'{}' is not a number", s))?;
    if (0.0..=1.0).contains(&value) {
        Ok(value)
    } else {
        Err(format!("confidence must be within [0, 1], got {}", value))
    }
}

/// Main subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run validators for every tier, or a single tier
    Run {
        /// Only run this tier (1 = blocker, 2 = warning, 3 = monitor)
        #[arg(short, long, value_parser = parse_tier)]
        tier: Option<u8>,

        /// Print the report as JSON
        #[arg(long)]
        json: bool,

        /// Project root (defaults to the current directory)
        #[arg(short, long)]
        root: Option<PathBuf>,
    },

    /// Validate a single file
    CheckFile {
        /// File to validate
        path: PathBuf,

        /// Tier whose validators to apply
        #[arg(short, long, default_value = "1", value_parser = parse_tier)]
        tier: u8,
    },

    /// Run the refinement loop until it terminates
    Refine {
        /// Replay these confidences instead of running validators
        #[arg(long = "confidence", value_parser = parse_unit)]
        confidences: Vec<f64>,
    },

    /// List configured dimensions
    Dimensions,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_requires_subcommand() {
        assert!(Cli::try_parse_from(["tiergate"]).is_err());
    }

    #[test]
    fn test_cli_global_flags() {
        let cli = Cli::try_parse_from(["tiergate", "-v", "-c", "/tmp/t.yml", "dimensions"]).unwrap();
        assert!(cli.is_verbose());
        assert_eq!(cli.config, Some(PathBuf::from("/tmp/t.yml")));
        assert!(matches!(cli.command, Commands::Dimensions));
    }

    #[test]
    fn test_run_defaults() {
        let cli = Cli::try_parse_from(["tiergate", "run"]).unwrap();
        match cli.command {
            Commands::Run { tier, json, root } => {
                assert_eq!(tier, None);
                assert!(!json);
                assert_eq!(root, None);
            }
            _ => panic!("Expected Run command"),
        }
    }

    #[test]
    fn test_run_with_tier_and_json() {
        let cli = Cli::try_parse_from(["tiergate", "run", "--tier", "3", "--json"]).unwrap();
        match cli.command {
            Commands::Run { tier, json, .. } => {
                assert_eq!(tier, Some(3));
                assert!(json);
            }
            _ => panic!("Expected Run command"),
        }
    }

    #[test]
    fn test_run_rejects_bad_tier() {
        assert!(Cli::try_parse_from(["tiergate", "run", "--tier", "4"]).is_err());
        assert!(Cli::try_parse_from(["tiergate", "run", "--tier", "blocker"]).is_err());
    }

    #[test]
    fn test_check_file() {
        let cli = Cli::try_parse_from(["tiergate", "check-file", "src/app.py"]).unwrap();
        match cli.command {
            Commands::CheckFile { path, tier } => {
                assert_eq!(path, PathBuf::from("src/app.py"));
                assert_eq!(tier, 1);
            }
            _ => panic!("Expected CheckFile command"),
        }
    }

    #[test]
    fn test_refine_confidences() {
        let cli = Cli::try_parse_from(["tiergate", "refine", "--confidence", "0.5", "--confidence", "0.9"]).unwrap();
        match cli.command {
            Commands::Refine { confidences } => assert_eq!(confidences, vec![0.5, 0.9]),
            _ => panic!("Expected Refine command"),
        }
        assert!(Cli::try_parse_from(["tiergate", "refine", "--confidence", "1.5"]).is_err());
    }

    #[test]
    fn test_help_works() {
        Cli::command().debug_assert();
    }
}
