use std::{
    path::{Path, PathBuf},
    time::Duration,
};

use crate::validation::ConfigGuardRailError;

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(5);
pub const DEFAULT_MAX_CONNECTIONS: u32 = 10;

#[derive(Debug, Clone)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub workers: WorkerConfig,
    pub analyzer: AnalyzerToolConfig,
    pub scanner: ScannerToolConfig,
    pub git: GitConfig,
    pub seed_example_project: bool,
    pub metadata: ConfigMetadata,
}

impl Config {
    pub fn database_url(&self) -> Result<&str, ConfigGuardRailError> {
        self.database
            .url
            .as_deref()
            .ok_or(ConfigGuardRailError::MissingDatabaseUrl)
    }

    /// Create the working directories below the data dir.
    pub fn ensure_directories(&self) -> std::io::Result<()> {
        std::fs::create_dir_all(self.workers.analyzer_download_root())?;
        std::fs::create_dir_all(self.workers.scanner_download_root())?;
        std::fs::create_dir_all(self.workers.scan_output_root())?;
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl ServerConfig {
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub url: Option<String>,
    pub max_connections: u32,
    pub run_migrations: bool,
}

#[derive(Debug, Clone)]
pub struct WorkerConfig {
    pub poll_interval: Duration,
    pub data_dir: PathBuf,
    pub enable_analyzer: bool,
    pub enable_scan_jobs: bool,
    pub enable_scanner: bool,
}

impl WorkerConfig {
    /// Analyzer runs check out sources into `<root>/<run id>`.
    pub fn analyzer_download_root(&self) -> PathBuf {
        self.data_dir.join("download")
    }

    pub fn scanner_download_root(&self) -> PathBuf {
        self.data_dir.join("download-pkg")
    }

    pub fn scan_output_root(&self) -> PathBuf {
        self.data_dir.join("scan-output")
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }
}

/// External dependency analysis tool.
#[derive(Debug, Clone)]
pub struct AnalyzerToolConfig {
    pub program: String,
    pub args: Vec<String>,
    pub backends: Vec<String>,
    pub ignore_tool_versions: bool,
    pub allow_dynamic_versions: bool,
    pub allow_moving_revision: bool,
}

/// External scan tool and the identity recorded on its results.
#[derive(Debug, Clone)]
pub struct ScannerToolConfig {
    pub program: String,
    pub args: Vec<String>,
    pub name: String,
    pub version: String,
    pub configuration: String,
}

#[derive(Debug, Clone)]
pub struct GitConfig {
    pub program: String,
}

#[derive(Debug, Clone, Default)]
pub struct ConfigMetadata {
    pub config_path: Option<PathBuf>,
    pub env_file_loaded: bool,
}

pub fn default_backends() -> Vec<String> {
    ["NPM", "Gradle", "Maven"].map(String::from).to_vec()
}

pub fn default_analyzer_args() -> Vec<String> {
    ["analyze", "--input", "{source_dir}", "--backends", "{backends}"]
        .map(String::from)
        .to_vec()
}

pub fn default_scanner_args() -> Vec<String> {
    [
        "scan",
        "--output",
        "{output_dir}",
        "--download",
        "{download_dir}",
    ]
    .map(String::from)
    .to_vec()
}
