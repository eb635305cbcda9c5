pub mod analyzer;
pub mod packages;
pub mod projects;
pub mod scanner;
