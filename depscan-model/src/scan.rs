use crate::analysis::Issue;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

#[derive(
    Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct TextLocation {
    pub path: String,
    pub start_line: u32,
    pub end_line: u32,
}

#[derive(
    Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct LicenseFinding {
    pub license: String,
    pub location: TextLocation,
}

#[derive(
    Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct CopyrightFinding {
    pub statement: String,
    pub location: TextLocation,
}

/// Identity of the tool that produced a scan.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScannerDetails {
    pub name: String,
    #[serde(default)]
    pub version: String,
    #[serde(default)]
    pub configuration: String,
}

/// Findings of one scan.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanSummary {
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    #[serde(default)]
    pub file_count: u32,
    #[serde(default)]
    pub package_verification_code: String,
    #[serde(default)]
    pub license_findings: BTreeSet<LicenseFinding>,
    #[serde(default)]
    pub copyright_findings: BTreeSet<CopyrightFinding>,
    #[serde(default)]
    pub issues: Vec<Issue>,
}

impl ScanSummary {
    /// Summary recorded when the scan tool fails: no files, no findings and
    /// a single issue naming the scanner that attempted the scan.
    pub fn failed(
        scanner: &ScannerDetails,
        message: impl Into<String>,
        started_at: DateTime<Utc>,
    ) -> Self {
        Self {
            start_time: started_at,
            end_time: Utc::now(),
            file_count: 0,
            package_verification_code: String::new(),
            license_findings: BTreeSet::new(),
            copyright_findings: BTreeSet::new(),
            issues: vec![Issue::error(
                scanner.name.clone(),
                format!("Scan failed: {}", message.into()),
            )],
        }
    }

    pub fn detected_licenses(&self) -> BTreeSet<String> {
        self.license_findings
            .iter()
            .map(|finding| finding.license.clone())
            .collect()
    }
}

/// What a successful scan hands back to the pipeline.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanOutcome {
    pub scanner: ScannerDetails,
    pub summary: ScanSummary,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::Severity;

    #[test]
    fn failure_summary_has_one_issue_from_the_scanner() {
        let scanner = ScannerDetails {
            name: "ScanCode".into(),
            version: "32.0".into(),
            configuration: String::new(),
        };
        let started = Utc::now();
        let summary = ScanSummary::failed(&scanner, "exit status 2", started);

        assert_eq!(summary.file_count, 0);
        assert!(summary.license_findings.is_empty());
        assert!(summary.copyright_findings.is_empty());
        assert_eq!(summary.issues.len(), 1);
        assert_eq!(summary.issues[0].source, "ScanCode");
        assert_eq!(summary.issues[0].severity, Severity::Error);
        assert!(summary.issues[0].timestamp >= started);
        assert_eq!(summary.issues[0].message, "Scan failed: exit status 2");
        assert!(summary.end_time >= started);
    }

    #[test]
    fn detected_licenses_are_distinct() {
        let location = |path: &str| TextLocation {
            path: path.into(),
            start_line: 1,
            end_line: 1,
        };
        let summary: ScanSummary = serde_json::from_value(serde_json::json!({
            "start_time": "2024-01-01T00:00:00Z",
            "end_time": "2024-01-01T00:01:00Z",
            "file_count": 2,
            "license_findings": [
                { "license": "MIT", "location": location("a") },
                { "license": "MIT", "location": location("b") },
                { "license": "Apache-2.0", "location": location("c") }
            ]
        }))
        .unwrap();

        let licenses: Vec<_> =
            summary.detected_licenses().into_iter().collect();
        assert_eq!(licenses, vec!["Apache-2.0".to_string(), "MIT".to_string()]);
    }
}
