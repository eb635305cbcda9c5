//! Normalized origin of source code, the dedup key for scanner runs.

use crate::{
    package::PackageDescriptor,
    vcs::{RemoteArtifact, VcsInfo},
};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Provenance {
    /// Repository at a revision. The subpath is always empty so packages from
    /// different directories of one repository share a scan.
    Repository { vcs_info: VcsInfo },
    Artifact { source_artifact: RemoteArtifact },
}

impl Provenance {
    /// VCS information wins over the source artifact; `None` when the package
    /// declares neither.
    pub fn for_package(pkg: &PackageDescriptor) -> Option<Provenance> {
        if !pkg.vcs.is_empty() {
            return Some(Provenance::Repository {
                vcs_info: pkg.vcs.normalized().without_path(),
            });
        }

        if !pkg.source_artifact.is_empty() {
            return Some(Provenance::Artifact {
                source_artifact: pkg.source_artifact.clone(),
            });
        }

        None
    }

    /// Minimal descriptor carrying only this provenance, handed to the scan
    /// tool instead of any particular package's metadata.
    pub fn scan_target(&self) -> PackageDescriptor {
        match self {
            Provenance::Repository { vcs_info } => PackageDescriptor {
                vcs: vcs_info.clone(),
                ..PackageDescriptor::default()
            },
            Provenance::Artifact { source_artifact } => PackageDescriptor {
                source_artifact: source_artifact.clone(),
                ..PackageDescriptor::default()
            },
        }
    }
}

impl fmt::Display for Provenance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Provenance::Repository { vcs_info } => {
                let revision = vcs_info
                    .resolved_revision
                    .as_deref()
                    .unwrap_or(&vcs_info.revision);
                write!(f, "{} {}@{}", vcs_info.vcs_type, vcs_info.url, revision)
            }
            Provenance::Artifact { source_artifact } => {
                write!(f, "artifact {}", source_artifact.url)
            }
        }
    }
}
