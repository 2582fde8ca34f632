//! Interface jar provisioning

use crate::cache::{interface_key, CacheKey, ComponentBuilder, ComponentStore};
use crate::diagnostics::{self, BuildLog};
use crate::error::KilnResult;
use crate::metadata::VersionMetadata;
use crate::resolve::{fetch_artifacts, is_binary_jar, DependencyResolver, ModuleIdentity};
use futures_util::FutureExt;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::debug;

/// Provides the interface jar every bridge is compiled against.
///
/// Cached under `interface-<incremental version>`; fetched from the resolver
/// on first use.
#[derive(Clone)]
pub struct InterfaceProvider {
    store: Arc<dyn ComponentStore>,
    resolver: Arc<dyn DependencyResolver>,
    module: ModuleIdentity,
    key: CacheKey,
    workspace_root: Option<PathBuf>,
}

impl InterfaceProvider {
    pub fn new(
        store: Arc<dyn ComponentStore>,
        resolver: Arc<dyn DependencyResolver>,
        organization: &str,
        name: &str,
        metadata: &VersionMetadata,
    ) -> Self {
        Self {
            store,
            resolver,
            module: ModuleIdentity::new(organization, name, metadata.version.clone()),
            key: interface_key(&metadata.version),
            workspace_root: None,
        }
    }

    /// Fetch into workspaces under `root` instead of the system temp dir
    pub fn with_workspace_root(mut self, root: PathBuf) -> Self {
        self.workspace_root = Some(root);
        self
    }

    /// Interface jar(s), fetching and caching them if needed
    pub async fn provide(&self, log: Arc<dyn BuildLog>) -> KilnResult<Vec<PathBuf>> {
        if self.store.has(&self.key).await? {
            debug!("Interface {} cached", self.key);
            return self.store.get(&self.key).await;
        }

        let this = self.clone();
        let builder: ComponentBuilder = Box::new(move || async move { this.fetch(log).await }.boxed());
        self.store.define_if_missing(&self.key, builder).await
    }

    async fn fetch(&self, log: Arc<dyn BuildLog>) -> KilnResult<()> {
        let workspace =
            super::scratch_workspace("kiln-interface-", self.workspace_root.as_deref()).await?;
        let destination = workspace.path().join("resolved");

        let files = diagnostics::buffered(&*log, |scoped| async move {
            fetch_artifacts(
                &*self.resolver,
                &self.module,
                &destination,
                is_binary_jar,
                &*scoped,
            )
            .await
            .map_err(|miss| miss.into_error(&self.module, &*scoped))
        })
        .await?;

        self.store.define(&self.key, &files).await
    }
}
