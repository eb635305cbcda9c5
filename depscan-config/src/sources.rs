use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::util::{parse_bool_var, parse_csv_var, string_var};

/// Raw configuration as defined in a TOML file.
#[derive(Debug, Default, Clone, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct FileConfig {
    #[serde(default)]
    pub server: FileServerConfig,
    #[serde(default)]
    pub database: FileDatabaseConfig,
    #[serde(default)]
    pub workers: FileWorkerConfig,
    #[serde(default)]
    pub analyzer: FileAnalyzerConfig,
    #[serde(default)]
    pub scanner: FileScannerConfig,
    #[serde(default)]
    pub git: FileGitConfig,
    pub seed_example_project: Option<bool>,
}

#[derive(Debug, Default, Clone, Deserialize, Serialize)]
pub struct FileServerConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub host: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,
}

#[derive(Debug, Default, Clone, Deserialize, Serialize)]
pub struct FileDatabaseConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_connections: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub run_migrations: Option<bool>,
}

#[derive(Debug, Default, Clone, Deserialize, Serialize)]
pub struct FileWorkerConfig {
    /// Human readable, e.g. `"5s"` or `"1m 30s"`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub poll_interval: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data_dir: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enable_analyzer: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enable_scan_jobs: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enable_scanner: Option<bool>,
}

#[derive(Debug, Default, Clone, Deserialize, Serialize)]
pub struct FileAnalyzerConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub program: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub args: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub backends: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ignore_tool_versions: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub allow_dynamic_versions: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub allow_moving_revision: Option<bool>,
}

#[derive(Debug, Default, Clone, Deserialize, Serialize)]
pub struct FileScannerConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub program: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub args: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub configuration: Option<String>,
}

#[derive(Debug, Default, Clone, Deserialize, Serialize)]
pub struct FileGitConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub program: Option<String>,
}

/// Environment-derived configuration values.
#[derive(Debug, Default, Clone)]
pub struct EnvConfig {
    pub config_path: Option<PathBuf>,
    pub server_host: Option<String>,
    pub server_port: Option<u16>,
    pub database_url: Option<String>,
    pub database_max_connections: Option<u32>,
    pub run_migrations: Option<bool>,
    pub poll_interval: Option<String>,
    pub data_dir: Option<PathBuf>,
    pub enable_analyzer: Option<bool>,
    pub enable_scan_jobs: Option<bool>,
    pub enable_scanner: Option<bool>,
    pub analyzer_program: Option<String>,
    pub analyzer_args: Option<Vec<String>>,
    pub analyzer_backends: Option<Vec<String>>,
    pub scanner_program: Option<String>,
    pub scanner_args: Option<Vec<String>>,
    pub scanner_name: Option<String>,
    pub git_program: Option<String>,
    pub seed_example_project: Option<bool>,
}

impl EnvConfig {
    pub fn gather() -> Self {
        Self {
            config_path: string_var("DEPSCAN_CONFIG").map(PathBuf::from),
            server_host: string_var("SERVER_HOST"),
            server_port: std::env::var("SERVER_PORT")
                .ok()
                .and_then(|s| s.parse().ok()),
            database_url: string_var("DATABASE_URL"),
            database_max_connections: std::env::var("DATABASE_MAX_CONNECTIONS")
                .ok()
                .and_then(|s| s.parse().ok()),
            run_migrations: parse_bool_var("DEPSCAN_RUN_MIGRATIONS"),
            poll_interval: string_var("DEPSCAN_POLL_INTERVAL"),
            data_dir: string_var("DEPSCAN_DATA_DIR").map(PathBuf::from),
            enable_analyzer: parse_bool_var("DEPSCAN_ENABLE_ANALYZER"),
            enable_scan_jobs: parse_bool_var("DEPSCAN_ENABLE_SCAN_JOBS"),
            enable_scanner: parse_bool_var("DEPSCAN_ENABLE_SCANNER"),
            analyzer_program: string_var("DEPSCAN_ANALYZER_PROGRAM"),
            analyzer_args: parse_csv_var("DEPSCAN_ANALYZER_ARGS"),
            analyzer_backends: parse_csv_var("DEPSCAN_ANALYZER_BACKENDS"),
            scanner_program: string_var("DEPSCAN_SCANNER_PROGRAM"),
            scanner_args: parse_csv_var("DEPSCAN_SCANNER_ARGS"),
            scanner_name: string_var("DEPSCAN_SCANNER_NAME"),
            git_program: string_var("DEPSCAN_GIT_PROGRAM"),
            seed_example_project: parse_bool_var(
                "DEPSCAN_SEED_EXAMPLE_PROJECT",
            ),
        }
    }
}
