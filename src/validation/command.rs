//! Command-backed validator.
//!
//! Executes an external tool (ruff, pyright, bandit, oasdiff, ...) through
//! `sh -c` and maps its exit status to a [`ValidationResult`]. The validator
//! owns its timeout; a missing tool degrades to a skipped pass.

use crate::error::Result;
use crate::validation::traits::{Tier, ValidationContext, ValidationResult, Validator, clamp_unit};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Instant;
use tokio::process::Command;

/// Placeholder replaced by the file under validation (or `.`).
pub const FILE_PLACEHOLDER: &str = "{file}";

/// Default command timeout in milliseconds.
pub const DEFAULT_TIMEOUT_MS: u64 = 120_000;

const MAX_CAPTURED_CHARS: usize = 4000;

/// Configuration for a command validator
#[derive(Debug, Clone)]
pub struct CommandConfig {
    /// The command to execute (may contain `{file}`)
    pub command: String,
    /// Environment variables to set
    pub env: Vec<(String, String)>,
    /// Timeout in milliseconds
    pub timeout_ms: u64,
    /// Whether to capture stderr in the failure message
    pub capture_stderr: bool,
    /// File extensions (without dot) this command can check on its own
    pub extensions: Vec<String>,
}

impl Default for CommandConfig {
    fn default() -> Self {
        Self {
            command: String::new(),
            env: Vec::new(),
            timeout_ms: DEFAULT_TIMEOUT_MS,
            capture_stderr: true,
            extensions: Vec::new(),
        }
    }
}

impl CommandConfig {
    /// Create a new command config with the given command
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            ..Default::default()
        }
    }

    /// Add an environment variable
    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.push((key.into(), value.into()));
        self
    }

    /// Set the timeout in milliseconds
    pub fn timeout_ms(mut self, ms: u64) -> Self {
        self.timeout_ms = ms;
        self
    }

    /// Set whether to capture stderr
    pub fn capture_stderr(mut self, capture: bool) -> Self {
        self.capture_stderr = capture;
        self
    }

    /// Set the file extensions this command handles
    pub fn extensions<I, S>(mut self, extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.extensions = extensions
            .into_iter()
            .map(|e| Into::<String>::into(e).trim_start_matches('.').to_lowercase())
            .collect();
        self
    }

    /// The program name (first word of the command)
    pub fn program(&self) -> Option<&str> {
        self.command.split_whitespace().next()
    }
}

/// Validator that executes a shell command
pub struct CommandValidator {
    dimension: String,
    tier: Tier,
    agent: Option<String>,
    fix_suggestion: Option<String>,
    reliability: Option<f64>,
    config: CommandConfig,
}

impl CommandValidator {
    /// Create a new command validator
    pub fn new(dimension: impl Into<String>, tier: Tier, config: CommandConfig) -> Self {
        Self {
            dimension: dimension.into(),
            tier,
            agent: None,
            fix_suggestion: None,
            reliability: None,
            config,
        }
    }

    /// Create a simple command validator with defaults
    pub fn simple(dimension: impl Into<String>, tier: Tier, command: impl Into<String>) -> Self {
        Self::new(dimension, tier, CommandConfig::new(command))
    }

    /// Set the remediation agent reported on results
    pub fn with_agent(mut self, agent: impl Into<String>) -> Self {
        self.agent = Some(agent.into());
        self
    }

    /// Set the fix suggestion attached to failing results
    pub fn with_fix_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.fix_suggestion = Some(suggestion.into());
        self
    }

    /// Set the reliability reported in `details.reliability`
    pub fn with_reliability(mut self, reliability: f64) -> Self {
        self.reliability = Some(clamp_unit(reliability));
        self
    }

    /// Get the command template
    pub fn command(&self) -> &str {
        &self.config.command
    }

    /// Get the configuration
    pub fn config(&self) -> &CommandConfig {
        &self.config
    }

    /// Expand `{file}` for the given context. The file path is shell-quoted.
    pub fn render_command(&self, ctx: &ValidationContext) -> String {
        let target = ctx
            .file
            .as_ref()
            .map(|f| shell_quote(&f.display().to_string()))
            .unwrap_or_else(|| ".".to_string());
        self.config.command.replace(FILE_PLACEHOLDER, &target)
    }

    /// Whether the program resolves, with relative paths taken from `root`.
    pub fn is_available_in(&self, root: &Path) -> bool {
        self.config.program().is_some_and(|program| program_on_path(program, root))
    }

    /// Execute the command and return the result
    async fn execute(&self, ctx: &ValidationContext) -> std::io::Result<std::process::Output> {
        let mut cmd = Command::new("sh");
        cmd.arg("-c").arg(self.render_command(ctx));
        if !ctx.project_root.as_os_str().is_empty() {
            cmd.current_dir(&ctx.project_root);
        }

        for (key, value) in &self.config.env {
            cmd.env(key, value);
        }

        cmd.stdout(Stdio::piped()).stderr(Stdio::piped()).kill_on_drop(true);

        let child = cmd.spawn()?;

        let timeout = tokio::time::Duration::from_millis(self.config.timeout_ms);
        match tokio::time::timeout(timeout, child.wait_with_output()).await {
            Ok(result) => result,
            Err(_) => Err(std::io::Error::new(
                std::io::ErrorKind::TimedOut,
                format!("Command timed out after {}ms", self.config.timeout_ms),
            )),
        }
    }

    fn decorate(&self, mut result: ValidationResult) -> ValidationResult {
        if let Some(agent) = &self.agent {
            result = result.with_agent(agent.clone());
        }
        if !result.passed
            && let Some(fix) = &self.fix_suggestion
        {
            result = result.with_fix_suggestion(fix.clone());
        }
        if let Some(reliability) = self.reliability {
            result = result.with_detail("reliability", reliability);
        }
        result
    }
}

#[async_trait]
impl Validator for CommandValidator {
    fn dimension(&self) -> &str {
        &self.dimension
    }

    fn tier(&self) -> Tier {
        self.tier
    }

    fn agent(&self) -> Option<&str> {
        self.agent.as_deref()
    }

    fn is_available(&self) -> bool {
        self.is_available_in(Path::new(""))
    }

    fn applies_to(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|e| e.to_str())
            .is_some_and(|ext| self.config.extensions.iter().any(|x| x.eq_ignore_ascii_case(ext)))
    }

    async fn validate(&self, ctx: &ValidationContext) -> Result<ValidationResult> {
        let Some(program) = self.config.program() else {
            return Ok(ValidationResult::skipped(
                &self.dimension,
                self.tier,
                "no command configured",
            ));
        };

        if !self.is_available_in(&ctx.project_root) {
            log::info!("{}: '{}' not installed, skipping", self.dimension, program);
            return Ok(ValidationResult::skipped(
                &self.dimension,
                self.tier,
                format!("{} not installed", program),
            ));
        }

        let start = Instant::now();
        let result = match self.execute(ctx).await {
            Ok(output) => {
                let stdout = truncate(&String::from_utf8_lossy(&output.stdout));
                let stderr = truncate(&String::from_utf8_lossy(&output.stderr));
                let code = output.status.code();

                let result = if output.status.success() {
                    ValidationResult::pass(&self.dimension, self.tier, format!("{} passed", program))
                } else {
                    let mut message = format!("Command '{}' failed with exit code: {:?}", program, code);
                    if self.config.capture_stderr && !stderr.trim().is_empty() {
                        message.push_str(&format!("\nstderr: {}", stderr.trim()));
                    }
                    ValidationResult::fail(&self.dimension, self.tier, message)
                };

                result
                    .with_detail("exit_code", code)
                    .with_detail("stdout", stdout)
                    .with_detail("stderr", stderr)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                ValidationResult::skipped(&self.dimension, self.tier, format!("{} not runnable: {}", program, e))
            }
            Err(e) => ValidationResult::fail(&self.dimension, self.tier, format!("Command '{}' error: {}", program, e))
                .with_detail("timeout", e.kind() == std::io::ErrorKind::TimedOut),
        };

        Ok(self
            .decorate(result)
            .with_duration_ms(start.elapsed().as_millis() as u64))
    }

    fn description(&self) -> &str {
        &self.config.command
    }
}

/// Check whether `program` resolves to an existing file. A program with a
/// path separator is looked up directly, relative paths against `root`
/// (where the command runs); anything else is searched on `PATH`.
pub fn program_on_path(program: &str, root: &Path) -> bool {
    if program.contains(std::path::MAIN_SEPARATOR) {
        return root.join(program).is_file();
    }
    let Some(paths) = std::env::var_os("PATH") else {
        return false;
    };
    std::env::split_paths(&paths).any(|dir: PathBuf| dir.join(program).is_file())
}

/// Single-quote `text` for `sh`, escaping embedded single quotes.
fn shell_quote(text: &str) -> String {
    format!("'{}'", text.replace('\'', "'\\''"))
}

fn truncate(text: &str) -> String {
    if text.chars().count() <= MAX_CAPTURED_CHARS {
        text.to_string()
    } else {
        let mut cut: String = text.chars().take(MAX_CAPTURED_CHARS).collect();
        cut.push_str("\n... (truncated)");
        cut
    }
}
