use crate::{
    analysis::Issue,
    vcs::{RemoteArtifact, VcsInfo},
};
use serde::{Deserialize, Serialize};
use std::{collections::BTreeSet, fmt, str::FromStr};

/// Package coordinates: `type:namespace:name:version`.
#[derive(
    Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize,
    Deserialize,
)]
pub struct Identifier {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub namespace: String,
    pub name: String,
    #[serde(default)]
    pub version: String,
}

impl Identifier {
    pub fn new(
        kind: impl Into<String>,
        namespace: impl Into<String>,
        name: impl Into<String>,
        version: impl Into<String>,
    ) -> Self {
        Self {
            kind: kind.into(),
            namespace: namespace.into(),
            name: name.into(),
            version: version.into(),
        }
    }

    pub fn to_coordinates(&self) -> String {
        format!(
            "{}:{}:{}:{}",
            self.kind, self.namespace, self.name, self.version
        )
    }
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_coordinates())
    }
}

impl FromStr for Identifier {
    type Err = std::convert::Infallible;

    /// Missing trailing components are left empty.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut parts = s.splitn(4, ':');
        let mut next = || parts.next().unwrap_or_default().to_string();
        Ok(Identifier {
            kind: next(),
            namespace: next(),
            name: next(),
            version: next(),
        })
    }
}

/// Full declared metadata of a dependency.
///
/// Two descriptors with equal coordinates but different metadata are
/// different packages; identity is the whole value.
#[derive(
    Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize,
    Deserialize,
)]
pub struct PackageDescriptor {
    pub id: Identifier,
    #[serde(default)]
    pub authors: BTreeSet<String>,
    #[serde(default)]
    pub declared_licenses: BTreeSet<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub concluded_license: Option<String>,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub homepage_url: String,
    #[serde(default)]
    pub binary_artifact: RemoteArtifact,
    #[serde(default)]
    pub source_artifact: RemoteArtifact,
    #[serde(default)]
    pub vcs: VcsInfo,
}

impl PackageDescriptor {
    pub fn new(id: Identifier) -> Self {
        Self {
            id,
            ..Self::default()
        }
    }
}

/// A project found by the dependency analysis (a definition file such as
/// `package.json` or `pom.xml`).
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalyzedProject {
    pub id: Identifier,
    #[serde(default)]
    pub definition_file_path: String,
    #[serde(default)]
    pub authors: BTreeSet<String>,
    #[serde(default)]
    pub declared_licenses: BTreeSet<String>,
    #[serde(default)]
    pub vcs: VcsInfo,
    #[serde(default)]
    pub homepage_url: String,
    #[serde(default)]
    pub scopes: Vec<Scope>,
}

impl AnalyzedProject {
    /// View the project as a package so it can be scanned like any other
    /// dependency.
    pub fn to_package(&self) -> PackageDescriptor {
        PackageDescriptor {
            id: self.id.clone(),
            authors: self.authors.clone(),
            declared_licenses: self.declared_licenses.clone(),
            homepage_url: self.homepage_url.clone(),
            vcs: self.vcs.clone(),
            ..PackageDescriptor::default()
        }
    }
}

/// Named group of dependencies, e.g. `compile` or `devDependencies`.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Scope {
    pub name: String,
    #[serde(default)]
    pub dependencies: Vec<PackageReference>,
}

/// Edge of the dependency graph pointing at a package by identifier.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackageReference {
    pub id: Identifier,
    #[serde(default)]
    pub dependencies: Vec<PackageReference>,
    #[serde(default)]
    pub issues: Vec<Issue>,
}
