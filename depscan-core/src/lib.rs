//! # depscan core
//!
//! The dependency-scan pipeline: a durable job store and the three workers
//! that move work through it.
//!
//! - The **analyzer worker** downloads a project repository at a revision,
//!   runs dependency analysis and registers every discovered package,
//!   queueing a scan job for each package never scanned before.
//! - The **scan job worker** resolves the provenance of each queued package
//!   and attaches it to the one scanner run for that provenance.
//! - The **scanner worker** scans each provenance once and stores the
//!   summary.
//!
//! Workers never call each other; all coordination goes through the
//! [`database::ports`] traits. [`database::postgres::PostgresJobStore`] is
//! the durable implementation and [`database::memory::InMemoryJobStore`] a
//! single-process one with the same semantics.
//!
//! ## Modules
//!
//! - [`adapters`]: source download, analysis and scan tools
//! - [`worker`]: the polling workers and their loop
//! - [`runtime`]: start-up and shutdown of the worker loops
//! - [`services`]: catalog reads and writes behind the HTTP API
//! - [`api_types`]: request and response types of the HTTP API

#![allow(missing_docs)]

pub mod adapters;
pub mod api_types;
pub mod database;
pub mod error;
pub mod runtime;
pub mod services;
pub mod worker;

pub use database::{
    memory::InMemoryJobStore,
    ports::{
        AnalyzerRunStore, CatalogStore, JobStore, ScanJobStore, ScannerRunStore,
    },
    postgres::PostgresJobStore,
};
pub use error::{PipelineError, Result};
pub use runtime::{PipelineAdapters, PipelineRuntime, RuntimeSettings};
pub use services::CatalogServices;

/// Embedded schema migrations.
pub static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("./migrations");
