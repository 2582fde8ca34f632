//! Compiler bridge provisioning
//!
//! [`BridgeProvider`] is the entry point: it maps a compiler instance to the
//! cache key of its bridge and returns the cached jar, running the
//! [`OnDemandBuilder`] under the store's at-most-once primitive on a miss.
//! The builder in turn needs the interface jar, provided the same way by
//! [`InterfaceProvider`].

mod builder;
mod interface;
mod provider;

pub use builder::OnDemandBuilder;
pub use interface::InterfaceProvider;
pub use provider::{BridgeProvider, BridgeSettings};

use crate::cache::ComponentStore;
use crate::compile::SourceCompiler;
use crate::error::{KilnError, KilnResult};
use crate::resolve::DependencyResolver;
use std::path::Path;
use std::sync::Arc;
use tempfile::TempDir;

/// External collaborators shared by the providers
#[derive(Clone)]
pub struct Collaborators {
    pub store: Arc<dyn ComponentStore>,
    pub resolver: Arc<dyn DependencyResolver>,
    pub compiler: Arc<dyn SourceCompiler>,
}

/// Scratch directory under `root` (system temp dir if unset), removed on drop
async fn scratch_workspace(prefix: &str, root: Option<&Path>) -> KilnResult<TempDir> {
    let mut builder = tempfile::Builder::new();
    builder.prefix(prefix);
    let result = match root {
        Some(root) => {
            tokio::fs::create_dir_all(root)
                .await
                .map_err(|e| KilnError::io(format!("creating {}", root.display()), e))?;
            builder.tempdir_in(root)
        }
        None => builder.tempdir(),
    };
    result.map_err(|e| KilnError::io("creating build workspace", e))
}
