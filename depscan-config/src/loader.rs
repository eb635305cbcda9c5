use std::{
    fs,
    path::{Path, PathBuf},
    time::Duration,
};
use thiserror::Error;
use url::Url;

use super::{
    models::{
        AnalyzerToolConfig, Config, ConfigMetadata, DEFAULT_MAX_CONNECTIONS,
        DEFAULT_POLL_INTERVAL, DatabaseConfig, GitConfig, ScannerToolConfig,
        ServerConfig, WorkerConfig, default_analyzer_args, default_backends,
        default_scanner_args,
    },
    sources::{EnvConfig, FileConfig},
    validation::{self, ConfigGuardRailError, ConfigWarnings},
};

const DEFAULT_CONFIG_LOCATIONS: [&str; 2] =
    ["depscan.toml", "config/depscan.toml"];

#[derive(Debug, Default, Clone)]
pub struct ConfigLoaderOptions {
    pub config_path: Option<PathBuf>,
    pub env_file: Option<PathBuf>,
}

#[derive(Debug, Default)]
pub struct ConfigLoader {
    options: ConfigLoaderOptions,
}

/// A loaded configuration plus the non-fatal findings of validation.
#[derive(Debug, Clone)]
pub struct ConfigLoad {
    pub config: Config,
    pub warnings: ConfigWarnings,
}

impl ConfigLoader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_options(options: ConfigLoaderOptions) -> Self {
        Self { options }
    }

    pub fn with_config_path<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.options.config_path = Some(path.into());
        self
    }

    pub fn with_env_file<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.options.env_file = Some(path.into());
        self
    }

    pub fn load(&self) -> Result<ConfigLoad, ConfigLoadError> {
        let env_file_loaded = match &self.options.env_file {
            Some(path) => dotenvy::from_path(path).map(|_| true).or_else(
                |err| match err {
                    dotenvy::Error::Io(_) => Ok(false),
                    _ => Err(err),
                },
            )?,
            None => dotenvy::dotenv().map(|_| true).or_else(|err| match err {
                dotenvy::Error::Io(_) => Ok(false),
                _ => Err(err),
            })?,
        };

        let env_config = EnvConfig::gather();
        let (file_config, config_path) = self.load_file_config(&env_config)?;

        compose_config(
            file_config,
            env_config,
            ConfigMetadata {
                config_path,
                env_file_loaded,
            },
        )
    }

    fn load_file_config(
        &self,
        env_config: &EnvConfig,
    ) -> Result<(Option<FileConfig>, Option<PathBuf>), ConfigLoadError> {
        let mut source = ConfigPathSource::default();

        if let Some(explicit) = &self.options.config_path {
            source.explicit = Some(explicit.clone());
        } else if let Some(from_env) = &env_config.config_path {
            source.env = Some(from_env.clone());
        } else {
            source.default = DEFAULT_CONFIG_LOCATIONS
                .iter()
                .map(PathBuf::from)
                .find(|candidate| candidate.exists());
        }

        let Some((path, provenance)) = source.resolved_path() else {
            return Ok((None, None));
        };

        if !path.exists() {
            if provenance.is_explicit() {
                return Err(ConfigLoadError::MissingConfig { path });
            }
            return Ok((None, None));
        }

        let file_config = read_file_config(&path)?;
        Ok((Some(file_config), Some(path)))
    }
}

pub fn read_file_config(path: &Path) -> Result<FileConfig, ConfigLoadError> {
    tracing::debug!(path = %path.display(), "reading configuration file");
    let contents =
        fs::read_to_string(path).map_err(|source| ConfigLoadError::Io {
            path: path.to_path_buf(),
            source,
        })?;
    toml::from_str(&contents).map_err(|source| ConfigLoadError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

/// Merge file and environment values over the defaults. Environment wins.
pub fn compose_config(
    file_config: Option<FileConfig>,
    env: EnvConfig,
    metadata: ConfigMetadata,
) -> Result<ConfigLoad, ConfigLoadError> {
    let mut warnings = ConfigWarnings::default();

    if metadata.config_path.is_none() {
        warnings.push_with_hint(
            "No depscan.toml detected; falling back to environment variables",
            "Pass --config or set DEPSCAN_CONFIG to use a configuration file",
        );
    }

    let FileConfig {
        server: file_server,
        database: file_database,
        workers: file_workers,
        analyzer: file_analyzer,
        scanner: file_scanner,
        git: file_git,
        seed_example_project: file_seed,
    } = file_config.unwrap_or_default();

    let server = ServerConfig {
        host: env
            .server_host
            .or(file_server.host)
            .unwrap_or_else(|| "0.0.0.0".to_string()),
        port: env.server_port.or(file_server.port).unwrap_or(8080),
    };

    let database_url = env
        .database_url
        .or(file_database.url)
        .filter(|value| !value.trim().is_empty());
    if let Some(url) = &database_url {
        Url::parse(url)
            .map_err(|source| ConfigLoadError::InvalidDatabaseUrl { source })?;
    }
    let database = DatabaseConfig {
        url: database_url,
        max_connections: env
            .database_max_connections
            .or(file_database.max_connections)
            .unwrap_or(DEFAULT_MAX_CONNECTIONS),
        run_migrations: env
            .run_migrations
            .or(file_database.run_migrations)
            .unwrap_or(true),
    };

    let poll_interval = match env.poll_interval.or(file_workers.poll_interval) {
        Some(raw) => parse_duration("workers.poll_interval", &raw)?,
        None => DEFAULT_POLL_INTERVAL,
    };
    let workers = WorkerConfig {
        poll_interval,
        data_dir: env
            .data_dir
            .or(file_workers.data_dir)
            .unwrap_or_else(|| PathBuf::from("./data")),
        enable_analyzer: env
            .enable_analyzer
            .or(file_workers.enable_analyzer)
            .unwrap_or(true),
        enable_scan_jobs: env
            .enable_scan_jobs
            .or(file_workers.enable_scan_jobs)
            .unwrap_or(true),
        enable_scanner: env
            .enable_scanner
            .or(file_workers.enable_scanner)
            .unwrap_or(true),
    };

    let analyzer = AnalyzerToolConfig {
        program: env
            .analyzer_program
            .or(file_analyzer.program)
            .unwrap_or_else(|| "ort".to_string()),
        args: env
            .analyzer_args
            .or(file_analyzer.args)
            .unwrap_or_else(default_analyzer_args),
        backends: env
            .analyzer_backends
            .or(file_analyzer.backends)
            .unwrap_or_else(default_backends),
        ignore_tool_versions: file_analyzer
            .ignore_tool_versions
            .unwrap_or(true),
        allow_dynamic_versions: file_analyzer
            .allow_dynamic_versions
            .unwrap_or(true),
        allow_moving_revision: file_analyzer
            .allow_moving_revision
            .unwrap_or(true),
    };

    let scanner = ScannerToolConfig {
        program: env
            .scanner_program
            .or(file_scanner.program)
            .unwrap_or_else(|| "ort".to_string()),
        args: env
            .scanner_args
            .or(file_scanner.args)
            .unwrap_or_else(default_scanner_args),
        name: env
            .scanner_name
            .or(file_scanner.name)
            .unwrap_or_else(|| "ScanCode".to_string()),
        version: file_scanner.version.unwrap_or_default(),
        configuration: file_scanner.configuration.unwrap_or_default(),
    };

    let git = GitConfig {
        program: env
            .git_program
            .or(file_git.program)
            .unwrap_or_else(|| "git".to_string()),
    };

    let config = Config {
        server,
        database,
        workers,
        analyzer,
        scanner,
        git,
        seed_example_project: env
            .seed_example_project
            .or(file_seed)
            .unwrap_or(false),
        metadata,
    };

    warnings.extend(validation::apply_guard_rails(&config)?);
    Ok(ConfigLoad { config, warnings })
}

fn parse_duration(
    field: &'static str,
    raw: &str,
) -> Result<Duration, ConfigLoadError> {
    humantime::parse_duration(raw.trim()).map_err(|source| {
        ConfigLoadError::InvalidDuration {
            field,
            value: raw.to_string(),
            source,
        }
    })
}

#[derive(Debug, Error)]
pub enum ConfigLoadError {
    #[error("configuration file missing: {path}")]
    MissingConfig { path: PathBuf },
    #[error("failed to read configuration {path}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse configuration {path}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("invalid database URL")]
    InvalidDatabaseUrl {
        #[source]
        source: url::ParseError,
    },
    #[error("invalid duration '{value}' for {field}")]
    InvalidDuration {
        field: &'static str,
        value: String,
        #[source]
        source: humantime::DurationError,
    },
    #[error(transparent)]
    GuardRail(#[from] ConfigGuardRailError),
    #[error(transparent)]
    EnvFile(#[from] dotenvy::Error),
}

#[derive(Debug, Default)]
struct ConfigPathSource {
    explicit: Option<PathBuf>,
    env: Option<PathBuf>,
    default: Option<PathBuf>,
}

impl ConfigPathSource {
    fn resolved_path(&self) -> Option<(PathBuf, ConfigPathProvenance)> {
        if let Some(path) = &self.explicit {
            return Some((path.clone(), ConfigPathProvenance::Explicit));
        }
        if let Some(path) = &self.env {
            return Some((path.clone(), ConfigPathProvenance::Env));
        }
        if let Some(path) = &self.default {
            return Some((path.clone(), ConfigPathProvenance::Default));
        }
        None
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ConfigPathProvenance {
    Explicit,
    Env,
    Default,
}

impl ConfigPathProvenance {
    fn is_explicit(self) -> bool {
        matches!(
            self,
            ConfigPathProvenance::Explicit | ConfigPathProvenance::Env
        )
    }
}
