//! Runtime configuration.
//!
//! Values come from, in increasing precedence: built-in defaults, an
//! optional YAML file, the `SCHEDULA_SOLVER_URL` environment variable and
//! command-line flags (applied by `main`).
//!
//! ```yaml
//! solver:
//!   url: "http://localhost:5000/read_files"
//!   timeout_secs: 30
//! server:
//!   bind: "0.0.0.0"
//!   port: 8080
//!   static_dir: "static"
//! export:
//!   csv_style: quoted
//! strict_duplicates: true
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::Deserialize;
use tracing::{debug, info};

use crate::export::CsvStyle;

pub const SOLVER_URL_ENV: &str = "SCHEDULA_SOLVER_URL";
pub const DEFAULT_SOLVER_URL: &str = "http://localhost:5000/read_files";

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SolverSettings {
    pub url: String,
    /// No timeout unless set; a stalled solver then stalls the submission.
    pub timeout_secs: Option<u64>,
}

impl Default for SolverSettings {
    fn default() -> Self {
        Self {
            url: DEFAULT_SOLVER_URL.to_string(),
            timeout_secs: None,
        }
    }
}

impl SolverSettings {
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_secs.map(Duration::from_secs)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    pub bind: String,
    pub port: u16,
    pub static_dir: PathBuf,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            bind: "0.0.0.0".to_string(),
            port: 8080,
            static_dir: PathBuf::from("static"),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ExportSettings {
    pub csv_style: CsvStyle,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct SchedulaConfig {
    pub solver: SolverSettings,
    pub server: ServerSettings,
    pub export: ExportSettings,
    /// Reject solver output that puts two courses in one room and time
    /// instead of showing the first.
    pub strict_duplicates: bool,
}

impl SchedulaConfig {
    /// Parses a YAML configuration file. Missing keys keep their defaults.
    pub fn from_file(path: &Path) -> Result<Self> {
        info!("Loading configuration from: {}", path.display());
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Cannot open configuration file: {}", path.display()))?;
        Self::from_yaml(&content)
            .with_context(|| format!("Failed to parse YAML file: {}", path.display()))
    }

    pub fn from_yaml(content: &str) -> Result<Self> {
        // An empty document is a valid "all defaults" file.
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml::from_str(content)?)
    }

    /// Defaults, overlaid with `path` when given, then the environment.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        config.apply_env(std::env::var(SOLVER_URL_ENV).ok());
        Ok(config)
    }

    fn apply_env(&mut self, solver_url: Option<String>) {
        if let Some(url) = solver_url.filter(|u| !u.trim().is_empty()) {
            debug!(url = %url, "Solver URL taken from {}", SOLVER_URL_ENV);
            self.solver.url = url;
        }
    }
}
