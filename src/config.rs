use std::time::Duration;

use serde::Deserialize;

use crate::error::{AppError, Result};
use crate::runner::Invocation;

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    /// Tool tried first for every task.
    #[serde(default = "default_primary_command")]
    pub primary_command: String,
    /// Tool tried only when the primary attempt fails.
    #[serde(default = "default_secondary_command")]
    pub secondary_command: String,
    /// Wall-clock budget per attempt, in milliseconds.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
    #[serde(default)]
    pub verbose: bool,
    /// Run tools through the host shell rather than exec'ing them directly.
    #[serde(default = "default_shell")]
    pub shell: bool,
    /// Emit diagnostics as JSON lines instead of human-readable text.
    #[serde(default)]
    pub log_json: bool,
}

/// Values supplied on the command line. They take precedence over every
/// other configuration source.
#[derive(Debug, Default, Clone)]
pub struct ConfigOverrides {
    pub primary_command: Option<String>,
    pub secondary_command: Option<String>,
    pub timeout_ms: Option<u64>,
    pub verbose: bool,
    pub direct: bool,
    pub log_json: bool,
}

/// Environment variable overrides with CODE_FALLBACK_ prefix, e.g.
/// `CODE_FALLBACK_TIMEOUT_MS`. Keys are flat, so no nesting separator.
fn environment() -> config::Environment {
    config::Environment::with_prefix("CODE_FALLBACK").try_parsing(true)
}

fn default_primary_command() -> String {
    "claude-code".to_string()
}

fn default_secondary_command() -> String {
    "codex".to_string()
}

fn default_timeout_ms() -> u64 {
    300_000 // 5 minutes
}

fn default_shell() -> bool {
    true
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            primary_command: default_primary_command(),
            secondary_command: default_secondary_command(),
            timeout_ms: default_timeout_ms(),
            verbose: false,
            shell: default_shell(),
            log_json: false,
        }
    }
}

impl AppConfig {
    pub fn load(config_path: Option<&str>, overrides: &ConfigOverrides) -> Result<Self> {
        Self::load_with_env(config_path, overrides, environment())
    }

    fn load_with_env(
        config_path: Option<&str>,
        overrides: &ConfigOverrides,
        env: config::Environment,
    ) -> Result<Self> {
        let mut builder = config::Config::builder();

        // Load from file if specified
        if let Some(path) = config_path {
            builder = builder.add_source(config::File::with_name(path));
        } else {
            builder = builder.add_source(config::File::with_name("code-fallback").required(false));
        }

        builder = builder.add_source(env);

        builder = builder
            .set_override_option("primary_command", overrides.primary_command.clone())?
            .set_override_option("secondary_command", overrides.secondary_command.clone())?
            .set_override_option(
                "timeout_ms",
                overrides
                    .timeout_ms
                    .map(|ms| i64::try_from(ms).unwrap_or(i64::MAX)),
            )?;

        // Flags only ever switch these on; an absent flag leaves the file value alone.
        if overrides.verbose {
            builder = builder.set_override("verbose", true)?;
        }
        if overrides.direct {
            builder = builder.set_override("shell", false)?;
        }
        if overrides.log_json {
            builder = builder.set_override("log_json", true)?;
        }

        let config: AppConfig = builder.build()?.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.primary_command.trim().is_empty() {
            return Err(AppError::Config(
                "primary command must not be empty".to_string(),
            ));
        }
        if self.secondary_command.trim().is_empty() {
            return Err(AppError::Config(
                "secondary command must not be empty".to_string(),
            ));
        }
        if self.timeout_ms == 0 {
            return Err(AppError::Config(
                "timeout must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn invocation(&self) -> Invocation {
        if self.shell {
            Invocation::Shell
        } else {
            Invocation::Direct
        }
    }
}
