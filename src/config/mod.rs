use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::Read;
use std::path::Path;
use std::time::Duration;

use crate::error::{Error, Result};
use crate::executor::RetryConfig;

/// File name searched for when no explicit config path is given
pub const CONFIG_FILE_NAME: &str = "pm_workflows.config.yaml";

/// Settings for pm-workflows
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    /// Workflow engine settings
    #[serde(default)]
    pub engine: EngineSettings,

    /// Executor settings
    #[serde(default)]
    pub executor: ExecutorSettings,

    /// Breakpoint review settings
    #[serde(default)]
    pub review: ReviewSettings,

    /// Logger settings
    #[serde(default)]
    pub logger: LoggerSettings,
}

/// Settings for the workflow engine
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineSettings {
    /// Upper bound on concurrently running fan-out branches
    #[serde(default = "default_max_parallel_tasks")]
    pub max_parallel_tasks: usize,

    /// Root of the `tasks/<effectId>/...` payload paths
    #[serde(default = "default_tasks_dir")]
    pub tasks_dir: String,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            max_parallel_tasks: default_max_parallel_tasks(),
            tasks_dir: default_tasks_dir(),
        }
    }
}

/// Settings for the executor decorators
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExecutorSettings {
    /// Retry policy; the default makes a single attempt
    #[serde(default)]
    pub retry: RetryConfig,

    /// Per-attempt timeout in seconds
    #[serde(default)]
    pub timeout_secs: Option<u64>,
}

impl ExecutorSettings {
    /// Per-attempt timeout, if any
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_secs.map(Duration::from_secs)
    }
}

/// How breakpoints are resolved
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReviewMode {
    /// Ask on the terminal
    #[default]
    Console,
    /// Approve everything
    Auto,
}

/// Settings for breakpoint review
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReviewSettings {
    /// Reviewer used by the binary
    #[serde(default)]
    pub mode: ReviewMode,
}

/// Logger settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggerSettings {
    /// Log level, overridden by `RUST_LOG`
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggerSettings {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_max_parallel_tasks() -> usize {
    8
}

fn default_tasks_dir() -> String {
    "tasks".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Load settings from a YAML file
pub fn load_settings<P: AsRef<Path>>(path: P) -> Result<Settings> {
    let mut file = File::open(path)
        .map_err(|e| Error::Config(format!("Failed to open config file: {}", e)))?;
    let mut contents = String::new();
    file.read_to_string(&mut contents)
        .map_err(|e| Error::Config(format!("Failed to read config file: {}", e)))?;

    parse_settings(&contents)
}

/// Parse settings from YAML text
pub fn parse_settings(contents: &str) -> Result<Settings> {
    if contents.trim().is_empty() {
        return Ok(Settings::default());
    }
    serde_yaml::from_str(contents)
        .map_err(|e| Error::Config(format!("Failed to parse config file: {}", e)))
}

/// Get settings, optionally from a specific file
pub fn get_settings(config_path: Option<&str>) -> Result<Settings> {
    match config_path {
        Some(path) => load_settings(path),
        None => {
            // Try to find config file in common locations
            let default_paths = [
                CONFIG_FILE_NAME.to_string(),
                format!("config/{}", CONFIG_FILE_NAME),
                format!("../{}", CONFIG_FILE_NAME),
            ];

            for path in &default_paths {
                if Path::new(path).exists() {
                    return load_settings(path);
                }
            }

            Ok(Settings::default())
        }
    }
}
