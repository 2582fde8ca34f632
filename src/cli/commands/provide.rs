//! Provide command - print the compiled bridge jar, building it on a miss

use crate::bridge::{BridgeProvider, BridgeSettings, Collaborators};
use crate::cache::LocalComponentStore;
use crate::cli::args::{BridgeArgs, ProvideArgs};
use crate::compile::{CompilerInstance, ProcessCompiler};
use crate::config::{Config, ConfigManager};
use crate::diagnostics::{BuildLog, TracingLog};
use crate::error::{KilnError, KilnResult};
use crate::metadata::VersionMetadata;
use crate::resolve::{MavenResolver, ModuleIdentity};
use crate::runtime::runtime_class_version;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// Execute the provide command
pub async fn execute(args: ProvideArgs, config: &Config) -> KilnResult<()> {
    let metadata = VersionMetadata::packaged()?;
    debug!("Incremental compiler {}", metadata.full_version());

    let compiler = CompilerInstance {
        actual_version: args.bridge.compiler_version.clone(),
        home: args.compiler_home,
        jars: args.compiler_jar,
    };

    let settings = bridge_settings(&args.bridge, config, &metadata, &compiler).await?;

    let collaborators = Collaborators {
        store: Arc::new(LocalComponentStore::new(ConfigManager::store_dir(config))),
        resolver: Arc::new(MavenResolver::new(
            config.resolver.repositories.clone(),
            Duration::from_secs(config.resolver.timeout_secs),
        )),
        compiler: Arc::new(ProcessCompiler::new(
            config.compiler.command.clone(),
            config.compiler.extra_args.clone(),
        )),
    };

    let provider = BridgeProvider::new(settings, &metadata, collaborators);
    let log: Arc<dyn BuildLog> = Arc::new(TracingLog);
    let jar = provider.provide(&compiler, log).await?;

    println!("{}", jar.display());
    Ok(())
}

/// Bridge settings from the config, with command-line overrides applied
pub(crate) async fn bridge_settings(
    args: &BridgeArgs,
    config: &Config,
    metadata: &VersionMetadata,
    compiler: &CompilerInstance,
) -> KilnResult<BridgeSettings> {
    if args.compiler_version.trim().is_empty() {
        return Err(KilnError::User("--compiler-version must not be empty".to_string()));
    }

    let sources = match args.bridge {
        Some(ref coordinates) => coordinates.parse::<ModuleIdentity>()?,
        None => config.bridge.sources_module(compiler, metadata),
    };

    let configured = args
        .runtime_version
        .as_deref()
        .or(config.runtime.class_version.as_deref());
    let runtime_version = runtime_class_version(&config.runtime.java, configured).await?;

    Ok(BridgeSettings {
        sources,
        interface_organization: config.bridge.interface_organization.clone(),
        interface_name: config.bridge.interface_name.clone(),
        runtime_version,
        workspace_root: config.cache.workspace_dir.clone(),
    })
}
