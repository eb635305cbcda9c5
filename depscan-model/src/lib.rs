//! Core data model definitions shared across depscan crates.
#![allow(missing_docs)]

pub mod analysis;
pub mod error;
pub mod ids;
pub mod package;
pub mod provenance;
pub mod records;
pub mod scan;
pub mod status;
pub mod vcs;

pub use analysis::{AnalyzerConfig, AnalyzerResult, Issue, Severity};
pub use error::{ModelError, Result as ModelResult};
pub use ids::{
    AnalyzerRunId, PackageId, ProjectId, ProjectRepositoryId, RepositoryId,
    ScanJobId, ScannerRunId,
};
pub use package::{
    AnalyzedProject, Identifier, PackageDescriptor, PackageReference, Scope,
};
pub use provenance::Provenance;
pub use records::{
    AnalyzerRun, AnalyzerRunClaim, Package, PackageOverview, Project,
    ProjectRepository, Repository, ScanJob, ScanJobClaim, ScannerRun,
    StrandedWork,
};
pub use scan::{
    CopyrightFinding, LicenseFinding, ScanOutcome, ScanSummary, ScannerDetails,
    TextLocation,
};
pub use status::{AnalyzerRunStatus, ScanJobStatus, ScannerRunStatus};
pub use vcs::{Hash, RemoteArtifact, RepositoryType, VcsInfo, VcsType};
