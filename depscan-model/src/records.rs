//! Persisted records as read back from the job store.

use crate::{
    analysis::AnalyzerResult,
    ids::{
        AnalyzerRunId, PackageId, ProjectId, ProjectRepositoryId, RepositoryId,
        ScanJobId, ScannerRunId,
    },
    package::{Identifier, PackageDescriptor},
    provenance::Provenance,
    scan::{ScanSummary, ScannerDetails},
    status::{AnalyzerRunStatus, ScanJobStatus, ScannerRunStatus},
    vcs::{RemoteArtifact, RepositoryType, VcsInfo},
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Project {
    pub id: ProjectId,
    pub name: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Repository {
    pub id: RepositoryId,
    #[serde(rename = "type")]
    pub repo_type: RepositoryType,
    pub url: String,
}

/// A repository attached to a project, optionally restricted to a subpath.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectRepository {
    pub id: ProjectRepositoryId,
    pub project_id: ProjectId,
    pub repository: Repository,
    pub path: String,
}

impl ProjectRepository {
    /// Locator for the given revision of this attachment.
    pub fn vcs_info(&self, revision: &str) -> VcsInfo {
        VcsInfo {
            vcs_type: self.repository.repo_type.vcs_type(),
            url: self.repository.url.clone(),
            revision: revision.to_string(),
            resolved_revision: None,
            path: self.path.clone(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalyzerRun {
    pub id: AnalyzerRunId,
    pub project_repository_id: ProjectRepositoryId,
    pub created_at: DateTime<Utc>,
    pub revision: String,
    pub reference: String,
    pub status: AnalyzerRunStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<AnalyzerResult>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failure_message: Option<String>,
}

/// A claimed analyzer run together with the attachment it belongs to.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AnalyzerRunClaim {
    pub run: AnalyzerRun,
    pub project_repository: ProjectRepository,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Package {
    pub id: PackageId,
    pub created_at: DateTime<Utc>,
    pub descriptor: PackageDescriptor,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanJob {
    pub id: ScanJobId,
    pub created_at: DateTime<Utc>,
    pub status: ScanJobStatus,
    pub package_id: PackageId,
}

/// A claimed scan job with the package it asks to scan.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ScanJobClaim {
    pub job: ScanJob,
    pub package: Package,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScannerRun {
    pub id: ScannerRunId,
    pub created_at: DateTime<Utc>,
    pub provenance: Provenance,
    pub status: ScannerRunStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scanner: Option<ScannerDetails>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<ScanSummary>,
}

/// Flattened view of a package for listings.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackageOverview {
    pub package_id: PackageId,
    pub identifier: Identifier,
    pub declared_licenses: BTreeSet<String>,
    pub concluded_license: Option<String>,
    pub detected_licenses: BTreeSet<String>,
    pub vcs: VcsInfo,
    pub source_artifact: RemoteArtifact,
    pub scan_status: Option<ScannerRunStatus>,
    pub scanner_run_id: Option<ScannerRunId>,
}

impl PackageOverview {
    /// Build the overview from a package and its most recent scanner run.
    pub fn new(package: &Package, latest_scan: Option<&ScannerRun>) -> Self {
        let descriptor = &package.descriptor;
        Self {
            package_id: package.id,
            identifier: descriptor.id.clone(),
            declared_licenses: descriptor.declared_licenses.clone(),
            concluded_license: descriptor.concluded_license.clone(),
            detected_licenses: latest_scan
                .and_then(|run| run.summary.as_ref())
                .map(ScanSummary::detected_licenses)
                .unwrap_or_default(),
            vcs: descriptor.vcs.clone(),
            source_artifact: descriptor.source_artifact.clone(),
            scan_status: latest_scan.map(|run| run.status),
            scanner_run_id: latest_scan.map(|run| run.id),
        }
    }
}

/// Counts of items left in a claimed but unfinished status.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StrandedWork {
    pub analyzer_runs: u64,
    pub scan_jobs: u64,
    pub scanner_runs: u64,
}

impl StrandedWork {
    pub fn is_empty(&self) -> bool {
        self.analyzer_runs == 0 && self.scan_jobs == 0 && self.scanner_runs == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn attachment_builds_locator_with_subpath() {
        let attachment = ProjectRepository {
            id: ProjectRepositoryId::new(),
            project_id: ProjectId::new(),
            repository: Repository {
                id: RepositoryId::new(),
                repo_type: RepositoryType::Git,
                url: "https://example.com/repo.git".into(),
            },
            path: "sub/dir".into(),
        };

        let vcs = attachment.vcs_info("main");
        assert_eq!(vcs.vcs_type, crate::vcs::VcsType::Git);
        assert_eq!(vcs.revision, "main");
        assert_eq!(vcs.path, "sub/dir");
    }

    #[test]
    fn overview_without_scan_has_no_status() {
        let package = Package {
            id: PackageId::new(),
            created_at: Utc::now(),
            descriptor: PackageDescriptor::new(Identifier::new(
                "NPM", "", "left-pad", "1.3.0",
            )),
        };
        let overview = PackageOverview::new(&package, None);
        assert_eq!(overview.scan_status, None);
        assert!(overview.detected_licenses.is_empty());
        assert_eq!(overview.identifier.name, "left-pad");
    }
}
