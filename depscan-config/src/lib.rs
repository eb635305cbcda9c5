//! Configuration for the depscan server and its pipeline workers.
//!
//! Values come from an optional TOML file, a `.env` file and the process
//! environment, with the environment taking precedence over the file.

pub mod loader;
pub mod models;
pub mod sources;
pub mod util;
pub mod validation;

pub use loader::{
    ConfigLoad, ConfigLoadError, ConfigLoader, ConfigLoaderOptions,
};
pub use models::{
    AnalyzerToolConfig, Config, ConfigMetadata, DatabaseConfig, GitConfig,
    ScannerToolConfig, ServerConfig, WorkerConfig,
};
pub use validation::{ConfigGuardRailError, ConfigWarning, ConfigWarnings};
