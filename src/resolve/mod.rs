//! Dependency resolution
//!
//! The resolver contract only materializes the *dependencies* of a module,
//! never the module's own artifacts. [`fetch_artifacts`] hides that behind a
//! synthetic wrapper module so callers simply ask for "the files of X".

pub mod maven;
pub mod module;
mod wrapper;

pub use maven::MavenResolver;
pub use module::{ModuleDescriptor, ModuleIdentity, ModuleSettings};
pub use wrapper::{fetch_artifacts, is_binary_jar, is_sources_jar, wrap_as_dependency, FetchMiss};

use crate::diagnostics::BuildLog;
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// The module graph could not be satisfied
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("unresolved dependencies of {module}: {}", failures.join("; "))]
pub struct UnresolvedWarning {
    pub module: ModuleIdentity,
    pub failures: Vec<String>,
}

/// Downloads the declared dependencies of a module
#[async_trait]
pub trait DependencyResolver: Send + Sync {
    /// Fetch the artifacts of every dependency declared by `module` into
    /// `destination`, returning the downloaded files.
    async fn resolve(
        &self,
        module: &ModuleDescriptor,
        destination: &Path,
        log: &dyn BuildLog,
    ) -> Result<Vec<PathBuf>, UnresolvedWarning>;
}
