//! Key command - print the cache key of a bridge

use crate::cache::build_key;
use crate::cli::args::KeyArgs;
use crate::cli::commands::provide::bridge_settings;
use crate::compile::CompilerInstance;
use crate::config::Config;
use crate::error::KilnResult;
use crate::metadata::VersionMetadata;

/// Execute the key command
pub async fn execute(args: KeyArgs, config: &Config) -> KilnResult<()> {
    let metadata = VersionMetadata::packaged()?;
    let compiler = CompilerInstance::new(args.bridge.compiler_version.clone());
    let settings = bridge_settings(&args.bridge, config, &metadata, &compiler).await?;

    let key = build_key(
        &settings.sources,
        &compiler.actual_version,
        &settings.runtime_version,
    );
    println!("{}", key);
    Ok(())
}
