//! Bridge provider entry point

use crate::bridge::builder::OnDemandBuilder;
use crate::bridge::interface::InterfaceProvider;
use crate::bridge::Collaborators;
use crate::cache::{build_key, CacheKey, ComponentBuilder, ComponentStore};
use crate::compile::CompilerInstance;
use crate::diagnostics::BuildLog;
use crate::error::{KilnError, KilnResult};
use crate::metadata::VersionMetadata;
use crate::resolve::ModuleIdentity;
use futures_util::FutureExt;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::debug;

/// What to build and for which runtime
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BridgeSettings {
    /// Module whose sources jar holds the bridge sources
    pub sources: ModuleIdentity,
    /// Organization of the interface module
    pub interface_organization: String,
    /// Name of the interface module
    pub interface_name: String,
    /// Runtime class-file version the bridge targets
    pub runtime_version: String,
    /// Parent directory for build workspaces (system temp dir if unset)
    pub workspace_root: Option<PathBuf>,
}

/// Produces the compiled bridge jar for a compiler instance
pub struct BridgeProvider {
    store: Arc<dyn ComponentStore>,
    builder: Arc<OnDemandBuilder>,
    sources: ModuleIdentity,
    runtime_version: String,
}

impl BridgeProvider {
    pub fn new(
        settings: BridgeSettings,
        metadata: &VersionMetadata,
        collaborators: Collaborators,
    ) -> Self {
        let mut interface = InterfaceProvider::new(
            collaborators.store.clone(),
            collaborators.resolver.clone(),
            &settings.interface_organization,
            &settings.interface_name,
            metadata,
        );
        if let Some(ref root) = settings.workspace_root {
            interface = interface.with_workspace_root(root.clone());
        }

        let mut builder = OnDemandBuilder::new(
            collaborators.store.clone(),
            collaborators.resolver,
            collaborators.compiler,
            interface,
            settings.sources.clone(),
        );
        if let Some(root) = settings.workspace_root {
            builder = builder.with_workspace_root(root);
        }

        Self {
            store: collaborators.store,
            builder: Arc::new(builder),
            sources: settings.sources,
            runtime_version: settings.runtime_version,
        }
    }

    /// Cache key of the bridge for `compiler`
    pub fn cache_key(&self, compiler: &CompilerInstance) -> CacheKey {
        build_key(&self.sources, &compiler.actual_version, &self.runtime_version)
    }

    /// Path to the compiled bridge jar for `compiler`, building it if needed.
    ///
    /// A cached bridge is returned without touching the resolver or compiler.
    pub async fn provide(
        &self,
        compiler: &CompilerInstance,
        log: Arc<dyn BuildLog>,
    ) -> KilnResult<PathBuf> {
        let key = self.cache_key(compiler);

        let files = if self.store.has(&key).await? {
            debug!("Bridge {} cached", key);
            self.store.get(&key).await?
        } else {
            let builder = self.builder.clone();
            let target = key.clone();
            let compiler = compiler.clone();
            let build: ComponentBuilder = Box::new(move || {
                async move { builder.build(&target, &compiler, log).await }.boxed()
            });
            self.store.define_if_missing(&key, build).await?
        };

        single_jar(&key, files)
    }
}

/// A bridge entry must hold exactly one jar
fn single_jar(key: &CacheKey, files: Vec<PathBuf>) -> KilnResult<PathBuf> {
    let mut jars = files
        .into_iter()
        .filter(|f| f.extension().is_some_and(|ext| ext == "jar"));

    match (jars.next(), jars.next()) {
        (Some(jar), None) => Ok(jar),
        (None, _) => Err(KilnError::fetch_failure(key.as_str(), "entry holds no jar")),
        (Some(_), Some(_)) => Err(KilnError::fetch_failure(
            key.as_str(),
            "entry holds more than one jar",
        )),
    }
}
