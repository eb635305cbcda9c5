use thiserror::Error;

use super::models::Config;

#[derive(Debug, Error)]
pub enum ConfigGuardRailError {
    #[error("workers.poll_interval must be greater than zero")]
    ZeroPollInterval,
    #[error("analyzer.backends must name at least one package manager")]
    NoAnalyzerBackends,
    #[error("{section}.program must not be blank while the worker is enabled")]
    MissingProgram { section: &'static str },
    #[error("database.max_connections must be at least 1")]
    NoConnections,
    #[error("DATABASE_URL (or database.url) is required")]
    MissingDatabaseUrl,
}

#[derive(Debug, Clone)]
pub struct ConfigWarning {
    pub message: String,
    pub hint: Option<String>,
}

#[derive(Debug, Default, Clone)]
pub struct ConfigWarnings {
    pub items: Vec<ConfigWarning>,
}

impl ConfigWarnings {
    pub fn push<S: Into<String>>(&mut self, message: S) {
        self.items.push(ConfigWarning {
            message: message.into(),
            hint: None,
        });
    }

    pub fn push_with_hint<S: Into<String>, H: Into<String>>(
        &mut self,
        message: S,
        hint: H,
    ) {
        self.items.push(ConfigWarning {
            message: message.into(),
            hint: Some(hint.into()),
        });
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn extend(&mut self, other: ConfigWarnings) {
        self.items.extend(other.items);
    }
}

pub fn apply_guard_rails(
    config: &Config,
) -> Result<ConfigWarnings, ConfigGuardRailError> {
    let mut warnings = ConfigWarnings::default();

    if config.workers.poll_interval.is_zero() {
        return Err(ConfigGuardRailError::ZeroPollInterval);
    }
    if config.database.max_connections == 0 {
        return Err(ConfigGuardRailError::NoConnections);
    }

    if config.workers.enable_analyzer {
        if config.analyzer.backends.is_empty() {
            return Err(ConfigGuardRailError::NoAnalyzerBackends);
        }
        if config.analyzer.program.trim().is_empty() {
            return Err(ConfigGuardRailError::MissingProgram {
                section: "analyzer",
            });
        }
        if config.git.program.trim().is_empty() {
            return Err(ConfigGuardRailError::MissingProgram { section: "git" });
        }
    }
    if config.workers.enable_scanner
        && config.scanner.program.trim().is_empty()
    {
        return Err(ConfigGuardRailError::MissingProgram { section: "scanner" });
    }

    if config.database.url.is_none() {
        warnings.push_with_hint(
            "DATABASE_URL not configured",
            "Set DATABASE_URL or database.url before running `serve` or \
             `db migrate`",
        );
    }

    if !config.workers.enable_analyzer
        && !config.workers.enable_scan_jobs
        && !config.workers.enable_scanner
    {
        warnings.push(
            "All pipeline workers are disabled; queued work will not progress",
        );
    }

    Ok(warnings)
}
