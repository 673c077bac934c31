//! Ariadne core library — project API, incremental cache, configuration.
//!
//! The main entry point is [`project::Project`], which tracks source files,
//! rebuilds their scope graphs through the `ariadne-graphs` engine, and
//! answers reference/definition/call-graph queries over the resolved state.

pub mod cache;
pub mod config;
pub mod error;
pub mod project;

pub use config::AnalyzerConfig;
pub use error::{AriadneError, Result};
pub use project::{CancellationFlag, Project, SourceFile};
