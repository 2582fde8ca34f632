//! Cache-miss path: fetch bridge sources, compile, register

use crate::bridge::interface::InterfaceProvider;
use crate::cache::{CacheKey, ComponentStore};
use crate::compile::{CompilerInstance, SourceCompiler};
use crate::diagnostics::{self, BuildLog};
use crate::error::KilnResult;
use crate::resolve::{fetch_artifacts, is_sources_jar, DependencyResolver, ModuleIdentity};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, info};

/// Builds a missing bridge and defines it in the store
pub struct OnDemandBuilder {
    store: Arc<dyn ComponentStore>,
    resolver: Arc<dyn DependencyResolver>,
    compiler: Arc<dyn SourceCompiler>,
    interface: InterfaceProvider,
    sources: ModuleIdentity,
    workspace_root: Option<PathBuf>,
}

impl OnDemandBuilder {
    pub fn new(
        store: Arc<dyn ComponentStore>,
        resolver: Arc<dyn DependencyResolver>,
        compiler: Arc<dyn SourceCompiler>,
        interface: InterfaceProvider,
        sources: ModuleIdentity,
    ) -> Self {
        Self {
            store,
            resolver,
            compiler,
            interface,
            sources,
            workspace_root: None,
        }
    }

    /// Create scratch workspaces under `root` instead of the system temp dir
    pub fn with_workspace_root(mut self, root: PathBuf) -> Self {
        self.workspace_root = Some(root);
        self
    }

    /// Build the bridge for `compiler` and register it under `target`.
    ///
    /// Everything lives in a scratch workspace that is removed when this
    /// returns, whether the build succeeded or not. The store is only touched
    /// by the final `define`.
    pub async fn build(
        &self,
        target: &CacheKey,
        compiler: &CompilerInstance,
        log: Arc<dyn BuildLog>,
    ) -> KilnResult<()> {
        let workspace =
            super::scratch_workspace("kiln-build-", self.workspace_root.as_deref()).await?;
        debug!("Building {} in {}", target, workspace.path().display());

        let interface_files = self.interface.provide(log.clone()).await?;

        let sources_dir = workspace.path().join("sources");
        let sources = diagnostics::buffered(&*log, |scoped| async move {
            fetch_artifacts(
                &*self.resolver,
                &self.sources,
                &sources_dir,
                is_sources_jar,
                &*scoped,
            )
            .await
            .map_err(|miss| miss.into_error(&self.sources, &*scoped))
        })
        .await?;

        let output_jar = workspace.path().join(format!("{}.jar", target));
        let display_name = self.sources.name.clone();
        diagnostics::buffered(&*log, |scoped| async move {
            self.compiler
                .compile_bridge(
                    &sources,
                    &output_jar,
                    &interface_files,
                    &display_name,
                    compiler,
                    &*scoped,
                )
                .await?;
            self.store.define(target, &[output_jar]).await
        })
        .await?;

        info!("Built {} for compiler {}", self.sources, compiler.actual_version);
        Ok(())
    }
}
