use crate::package::{AnalyzedProject, PackageDescriptor};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize,
    Deserialize,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Severity {
    Error,
    Warning,
    Hint,
}

/// Problem reported by one of the external tools.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Issue {
    pub timestamp: DateTime<Utc>,
    pub source: String,
    pub severity: Severity,
    pub message: String,
}

impl Issue {
    pub fn error(
        source: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            timestamp: Utc::now(),
            source: source.into(),
            severity: Severity::Error,
            message: message.into(),
        }
    }
}

/// Settings handed to the dependency analysis tool.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalyzerConfig {
    pub ignore_tool_versions: bool,
    pub allow_dynamic_versions: bool,
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self {
            ignore_tool_versions: true,
            allow_dynamic_versions: true,
        }
    }
}

/// Structured output of a dependency analysis.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalyzerResult {
    #[serde(default)]
    pub projects: Vec<AnalyzedProject>,
    #[serde(default)]
    pub packages: Vec<PackageDescriptor>,
    #[serde(default)]
    pub issues: Vec<Issue>,
}

impl AnalyzerResult {
    /// Every package the analysis discovered, projects first.
    pub fn discovered_packages(
        &self,
    ) -> impl Iterator<Item = PackageDescriptor> + '_ {
        self.projects
            .iter()
            .map(AnalyzedProject::to_package)
            .chain(self.packages.iter().cloned())
    }
}
