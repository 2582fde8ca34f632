//! Compiling bridge sources
//!
//! Provides a trait for the compile step so the orchestration does not care
//! how the compiler is invoked:
//! - [`ProcessCompiler`]: runs an external compiler command
//! - test doubles in the integration tests

mod process;

pub use process::ProcessCompiler;

use crate::diagnostics::BuildLog;
use crate::error::KilnResult;
use async_trait::async_trait;
use std::path::{Path, PathBuf};

/// A concrete compiler the bridge is built for
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompilerInstance {
    /// Version reported by the compiler itself (e.g. `2.12.8`)
    pub actual_version: String,
    /// Installation directory, if known
    pub home: Option<PathBuf>,
    /// Compiler jars, put on the classpath when compiling the bridge
    pub jars: Vec<PathBuf>,
}

impl CompilerInstance {
    pub fn new(actual_version: impl Into<String>) -> Self {
        Self {
            actual_version: actual_version.into(),
            home: None,
            jars: Vec::new(),
        }
    }

    /// Binary-compatibility version (`major.minor`, e.g. `2.12` for `2.12.8`).
    ///
    /// Pre-release and build suffixes are ignored; versions that are not
    /// semver fall back to their first two dot-separated parts.
    pub fn binary_version(&self) -> String {
        match semver::Version::parse(&self.actual_version) {
            Ok(v) => format!("{}.{}", v.major, v.minor),
            Err(_) => self
                .actual_version
                .splitn(3, '.')
                .take(2)
                .collect::<Vec<_>>()
                .join("."),
        }
    }
}

/// Compiles bridge sources into a single jar
#[async_trait]
pub trait SourceCompiler: Send + Sync {
    /// Compile `sources` against `compiler` and `interface_files`, writing one
    /// self-contained artifact to `output_jar`.
    ///
    /// Compilation errors are returned as-is so the compiler's own diagnostics
    /// reach the user.
    async fn compile_bridge(
        &self,
        sources: &[PathBuf],
        output_jar: &Path,
        interface_files: &[PathBuf],
        display_name: &str,
        compiler: &CompilerInstance,
        log: &dyn BuildLog,
    ) -> KilnResult<()>;
}
