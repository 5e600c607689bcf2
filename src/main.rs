use clap::Parser;
use colored::*;
use eyre::{Context, Result};
use log::info;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tiergate::config::{GlobalConfig, load_config};
use tiergate::orchestrator::ValidationOrchestrator;
use tiergate::refinement::{LoopState, ProgressiveRefinementLoop, TerminationResult};
use tiergate::report::{LogReporter, render_file_result, render_report};
use tiergate::validation::{FusedValidator, Tier, TierResult, ValidationContext, ValidationReport};

mod cli;

use cli::Cli;
use cli::commands::Commands;

fn setup_logging(verbose: bool) -> Result<()> {
    let log_dir = dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("tiergate")
        .join("logs");

    fs::create_dir_all(&log_dir).context("Failed to create log directory")?;

    let log_file = log_dir.join("tiergate.log");

    let target = Box::new(
        fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&log_file)
            .context("Failed to open log file")?,
    );

    let default_level = if verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .target(env_logger::Target::Pipe(target))
        .init();

    info!("Logging initialized, writing to: {}", log_file.display());
    Ok(())
}

fn tier_arg(tier: u8) -> Result<Tier> {
    Ok(Tier::try_from(tier)?)
}

async fn run_application(cli: &Cli, config: &GlobalConfig) -> Result<i32> {
    if cli.is_verbose() {
        println!("{}", "Verbose mode enabled".yellow());
    }

    match &cli.command {
        Commands::Run { tier, json, root } => handle_run_command(*tier, *json, root.as_deref(), config).await,
        Commands::CheckFile { path, tier } => handle_check_file_command(path, *tier, config).await,
        Commands::Refine { confidences } => handle_refine_command(confidences, config).await,
        Commands::Dimensions => handle_dimensions_command(config),
    }
}

fn build_orchestrator(config: &GlobalConfig, root: Option<&Path>) -> Result<ValidationOrchestrator> {
    let root = match root {
        Some(root) => root.to_path_buf(),
        None => std::env::current_dir().context("Failed to resolve current directory")?,
    };
    let orchestrator = ValidationOrchestrator::from_config(config, root)
        .context("Failed to build validators from configuration")?
        .with_sink(Arc::new(LogReporter::new()));
    Ok(orchestrator)
}

async fn handle_run_command(tier: Option<u8>, json: bool, root: Option<&Path>, config: &GlobalConfig) -> Result<i32> {
    let orchestrator = build_orchestrator(config, root)?;

    let report = match tier {
        Some(tier) => {
            let tier = tier_arg(tier)?;
            info!("Running {} tier only", tier.name());
            let start = std::time::Instant::now();
            let result: TierResult = orchestrator.run_tier(tier).await;
            ValidationReport::new(orchestrator.project(), vec![result], start.elapsed().as_millis() as u64)
        }
        None => orchestrator.run_all().await,
    };

    if json {
        println!("{}", report.to_json().context("Failed to serialize report")?);
    } else {
        print!("{}", render_report(&report));
    }

    Ok(if report.blocked() { 1 } else { 0 })
}

async fn handle_check_file_command(path: &Path, tier: u8, config: &GlobalConfig) -> Result<i32> {
    let orchestrator = build_orchestrator(config, None)?;
    let result = orchestrator.validate_file(path, tier_arg(tier)?).await;
    print!("{}", render_file_result(&result));
    Ok(if result.passed() { 0 } else { 1 })
}

async fn handle_refine_command(confidences: &[f64], config: &GlobalConfig) -> Result<i32> {
    let refinement = &config.refinement;
    let mut refinement_loop = ProgressiveRefinementLoop::new(refinement.termination(), refinement.stages)
        .context("Invalid refinement configuration")?
        .with_reporter(Arc::new(LogReporter::new()));

    let outcome = if confidences.is_empty() {
        let orchestrator = build_orchestrator(config, None)?;
        let monitors = orchestrator.validators_for(Tier::Monitor);
        if monitors.is_empty() {
            println!("{}", "No monitor-tier dimensions configured; nothing to refine".yellow());
            return Ok(0);
        }

        let fusion = config.fusion.build().context("Invalid fusion weights")?;
        let fused = monitors
            .into_iter()
            .fold(FusedValidator::new("fused", fusion), |fused, entry| fused.add_shared(entry.validator))
            .with_pass_threshold(refinement.pass_threshold);
        let ctx = ValidationContext::for_project(orchestrator.project_root());

        refinement_loop = refinement_loop.with_validator(Arc::new(fused), ctx);
        Some(refinement_loop.run(None).await)
    } else {
        refinement_loop.run_with_confidences(None, confidences.iter().copied())
    };

    match outcome {
        Some((state, result)) => {
            print_termination(&state, &result);
            Ok(0)
        }
        None => {
            println!("{}", "No confidences supplied".yellow());
            Ok(0)
        }
    }
}

fn print_termination(state: &LoopState, result: &TerminationResult) {
    let reason = if result.should_stop {
        result.reason.to_string().green()
    } else {
        result.reason.to_string().yellow()
    };
    println!("{} {}", "Decision:".bold(), reason);
    println!("  confidence: {:.3}", result.confidence);
    println!("  iterations: {}", state.iteration);
    println!("  stage:      {}", state.stage);
    println!("  elapsed:    {}ms", state.elapsed_ms());
}

fn handle_dimensions_command(config: &GlobalConfig) -> Result<i32> {
    if config.dimensions.is_empty() {
        println!("{}", "No dimensions configured".yellow());
        return Ok(0);
    }
    for (name, dimension) in config.dimensions.iter() {
        let state = if dimension.enabled {
            "enabled".green()
        } else {
            "disabled".dimmed()
        };
        println!("{:<16} tier {} ({:<7}) {}", name, dimension.tier.number(), dimension.tier.name(), state);
    }
    Ok(0)
}

#[tokio::main]
async fn main() -> Result<()> {
    // Parse CLI arguments
    let cli = Cli::parse();

    // Setup logging before anything can fail
    setup_logging(cli.is_verbose()).context("Failed to setup logging")?;

    // Load configuration; a config file that exists but is broken is fatal
    let config = load_config(cli.config.as_ref()).context("Failed to load configuration")?;
    info!("Starting with config from: {:?}", cli.config);

    let code = run_application(&cli, &config).await.context("Application failed")?;
    if code != 0 {
        std::process::exit(code);
    }
    Ok(())
}
