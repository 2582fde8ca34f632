//! Synthetic wrapper modules and filtered artifact fetching

use crate::diagnostics::BuildLog;
use crate::error::KilnError;
use crate::resolve::module::{ModuleDescriptor, ModuleIdentity, ModuleSettings};
use crate::resolve::{DependencyResolver, UnresolvedWarning};
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};

/// Organization of synthetic wrapper modules
const SYNTHETIC_ORGANIZATION: &str = "kiln.temp";

/// Suffix of source artifacts
const SOURCES_SUFFIX: &str = "-sources.jar";

/// Build a throwaway module whose only dependency is `module`.
///
/// Resolving the wrapper makes the resolver download `module` itself. The
/// wrapper name is derived from a hash of the real name, so distinct modules
/// never share a wrapper.
pub fn wrap_as_dependency(module: &ModuleIdentity) -> ModuleDescriptor {
    let mut hasher = Sha256::new();
    hasher.update(module.name.as_bytes());
    let digest = hasher.finalize();

    ModuleDescriptor {
        identity: ModuleIdentity::new(
            SYNTHETIC_ORGANIZATION,
            format!("temp-module-{}", hex::encode(&digest[..8])),
            module.revision.clone(),
        ),
        settings: ModuleSettings::Inline {
            dependencies: vec![module.clone()],
        },
    }
}

/// File name ends with `-sources.jar`
pub fn is_sources_jar(path: &Path) -> bool {
    file_name(path).is_some_and(|name| name.ends_with(SOURCES_SUFFIX))
}

/// A `.jar` that is not a sources jar
pub fn is_binary_jar(path: &Path) -> bool {
    file_name(path).is_some_and(|name| name.ends_with(".jar") && !name.ends_with(SOURCES_SUFFIX))
}

fn file_name(path: &Path) -> Option<&str> {
    path.file_name().and_then(|n| n.to_str())
}

/// Why an artifact fetch came back empty
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchMiss {
    /// The resolver could not satisfy the module graph
    Unresolved(UnresolvedWarning),
    /// Resolution succeeded but no file matched the filter
    NoMatchingFiles { resolved: Vec<PathBuf> },
}

impl FetchMiss {
    /// Log the cause and turn it into the error surfaced to callers.
    ///
    /// Both causes surface identically: the expected artifact is missing.
    pub fn into_error(self, module: &ModuleIdentity, log: &dyn BuildLog) -> KilnError {
        match self {
            Self::Unresolved(warning) => log.error(&warning.to_string()),
            Self::NoMatchingFiles { resolved } => log.error(&format!(
                "Resolved {} file(s) for {} but none matched: {}",
                resolved.len(),
                module,
                resolved
                    .iter()
                    .map(|p| p.display().to_string())
                    .collect::<Vec<_>>()
                    .join(", ")
            )),
        }
        KilnError::InvalidComponent(format!("Could not retrieve {}", module))
    }
}

/// Download `module` into `destination` and keep the files accepted by
/// `filter`.
pub async fn fetch_artifacts(
    resolver: &dyn DependencyResolver,
    module: &ModuleIdentity,
    destination: &Path,
    filter: impl Fn(&Path) -> bool,
    log: &dyn BuildLog,
) -> Result<Vec<PathBuf>, FetchMiss> {
    let wrapper = wrap_as_dependency(module);
    log.debug(&format!(
        "Attempting to fetch {}. Dependencies: {}",
        wrapper.identity,
        wrapper.settings.dependencies_display()
    ));

    let resolved = resolver
        .resolve(&wrapper, destination, log)
        .await
        .map_err(FetchMiss::Unresolved)?;

    let (matched, rejected): (Vec<PathBuf>, Vec<PathBuf>) =
        resolved.into_iter().partition(|f| filter(f.as_path()));

    if matched.is_empty() {
        return Err(FetchMiss::NoMatchingFiles { resolved: rejected });
    }

    log.debug(&format!("Fetched {} file(s) for {}", matched.len(), module));
    Ok(matched)
}
