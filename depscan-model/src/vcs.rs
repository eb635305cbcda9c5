//! Source locators: version control coordinates and remote artifacts.

use crate::error::ModelError;
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

/// Version control system of a [`VcsInfo`].
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash,
    Serialize, Deserialize,
)]
pub enum VcsType {
    #[serde(rename = "Git")]
    Git,
    #[serde(rename = "GitRepo")]
    GitRepo,
    #[serde(rename = "Mercurial")]
    Mercurial,
    #[serde(rename = "Subversion")]
    Subversion,
    #[serde(rename = "CVS")]
    Cvs,
    #[default]
    #[serde(rename = "")]
    Unknown,
}

impl VcsType {
    pub const fn as_str(&self) -> &'static str {
        match self {
            VcsType::Git => "Git",
            VcsType::GitRepo => "GitRepo",
            VcsType::Mercurial => "Mercurial",
            VcsType::Subversion => "Subversion",
            VcsType::Cvs => "CVS",
            VcsType::Unknown => "",
        }
    }
}

impl FromStr for VcsType {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "git" => Ok(VcsType::Git),
            "gitrepo" | "git-repo" | "git_repo" => Ok(VcsType::GitRepo),
            "mercurial" | "hg" => Ok(VcsType::Mercurial),
            "subversion" | "svn" => Ok(VcsType::Subversion),
            "cvs" => Ok(VcsType::Cvs),
            "" | "unknown" => Ok(VcsType::Unknown),
            other => Err(ModelError::UnknownVcsType(other.to_string())),
        }
    }
}

impl fmt::Display for VcsType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Kind of repository a user can attach to a project.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RepositoryType {
    Git,
    Mercurial,
    Subversion,
    Cvs,
}

impl RepositoryType {
    pub const ALL: [RepositoryType; 4] = [
        RepositoryType::Git,
        RepositoryType::Mercurial,
        RepositoryType::Subversion,
        RepositoryType::Cvs,
    ];

    pub const fn as_str(&self) -> &'static str {
        match self {
            RepositoryType::Git => "GIT",
            RepositoryType::Mercurial => "MERCURIAL",
            RepositoryType::Subversion => "SUBVERSION",
            RepositoryType::Cvs => "CVS",
        }
    }

    pub const fn vcs_type(&self) -> VcsType {
        match self {
            RepositoryType::Git => VcsType::Git,
            RepositoryType::Mercurial => VcsType::Mercurial,
            RepositoryType::Subversion => VcsType::Subversion,
            RepositoryType::Cvs => VcsType::Cvs,
        }
    }
}

impl FromStr for RepositoryType {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        RepositoryType::ALL
            .iter()
            .copied()
            .find(|kind| kind.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| ModelError::UnknownRepositoryType(s.to_string()))
    }
}

impl fmt::Display for RepositoryType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Location of source code in a version control system.
#[derive(
    Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize,
    Deserialize,
)]
pub struct VcsInfo {
    #[serde(rename = "type")]
    pub vcs_type: VcsType,
    pub url: String,
    pub revision: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resolved_revision: Option<String>,
    /// Subdirectory inside the repository, empty for the whole tree.
    #[serde(default)]
    pub path: String,
}

impl VcsInfo {
    pub fn is_empty(&self) -> bool {
        self.url.trim().is_empty()
            && self.revision.trim().is_empty()
            && self.vcs_type == VcsType::Unknown
    }

    /// Canonical form used for comparisons: trimmed fields, no trailing
    /// slashes on the url or the path.
    pub fn normalized(&self) -> VcsInfo {
        VcsInfo {
            vcs_type: self.vcs_type,
            url: self.url.trim().trim_end_matches('/').to_string(),
            revision: self.revision.trim().to_string(),
            resolved_revision: self
                .resolved_revision
                .as_deref()
                .map(str::trim)
                .filter(|rev| !rev.is_empty())
                .map(str::to_string),
            path: self.path.trim().trim_matches('/').to_string(),
        }
    }

    pub fn without_path(&self) -> VcsInfo {
        VcsInfo {
            path: String::new(),
            ..self.clone()
        }
    }
}

/// Checksum of a remote artifact.
#[derive(
    Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize,
    Deserialize,
)]
pub struct Hash {
    pub value: String,
    pub algorithm: String,
}

/// A downloadable source or binary archive.
#[derive(
    Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize,
    Deserialize,
)]
pub struct RemoteArtifact {
    pub url: String,
    #[serde(default)]
    pub hash: Hash,
}

impl RemoteArtifact {
    pub fn is_empty(&self) -> bool {
        self.url.trim().is_empty()
    }
}
