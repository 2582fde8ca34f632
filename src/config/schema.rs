//! Configuration schema for Kiln
//!
//! Configuration is stored at `~/.config/kiln/config.toml`

use crate::compile::CompilerInstance;
use crate::metadata::VersionMetadata;
use crate::resolve::maven::MAVEN_CENTRAL;
use crate::resolve::ModuleIdentity;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Root configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// General settings
    pub general: GeneralConfig,

    /// Component store settings
    pub cache: CacheConfig,

    /// Repository settings
    pub resolver: ResolverConfig,

    /// Compiler command settings
    pub compiler: CompilerConfig,

    /// Target runtime settings
    pub runtime: RuntimeConfig,

    /// Bridge and interface modules
    pub bridge: BridgeConfig,
}

/// General application settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Log format: "text" or "json"
    pub log_format: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_format: "text".to_string(),
        }
    }
}

/// Component store configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Store root (defaults to the user cache directory)
    pub dir: Option<PathBuf>,

    /// Parent directory for build workspaces (defaults to the system temp dir)
    pub workspace_dir: Option<PathBuf>,
}

/// Repository configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ResolverConfig {
    /// Maven-layout repositories, tried in order
    pub repositories: Vec<String>,

    /// Per-request timeout in seconds
    pub timeout_secs: u64,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            repositories: vec![MAVEN_CENTRAL.to_string()],
            timeout_secs: 60,
        }
    }
}

/// Compiler command configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CompilerConfig {
    /// Compiler program (looked up in the compiler home's `bin/` first)
    pub command: String,

    /// Arguments placed before the generated ones
    pub extra_args: Vec<String>,
}

impl Default for CompilerConfig {
    fn default() -> Self {
        Self {
            command: "scalac".to_string(),
            extra_args: vec!["-nowarn".to_string()],
        }
    }
}

/// Target runtime configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    /// Java binary probed for the class-file version
    pub java: String,

    /// Class-file version override (skips probing)
    pub class_version: Option<String>,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            java: "java".to_string(),
            class_version: None,
        }
    }
}

/// Bridge and interface module coordinates
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BridgeConfig {
    /// Organization of the bridge sources module
    pub organization: String,

    /// Bridge module name; `{binary}` expands to the compiler binary version
    pub name: String,

    /// Bridge revision (defaults to the incremental compiler version)
    pub revision: Option<String>,

    /// Organization of the interface module
    pub interface_organization: String,

    /// Interface module name
    pub interface_name: String,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            organization: "org.scala-sbt".to_string(),
            name: "compiler-bridge_{binary}".to_string(),
            revision: None,
            interface_organization: "org.scala-sbt".to_string(),
            interface_name: "compiler-interface".to_string(),
        }
    }
}

impl BridgeConfig {
    /// Sources module of the bridge for `compiler`
    pub fn sources_module(
        &self,
        compiler: &CompilerInstance,
        metadata: &VersionMetadata,
    ) -> ModuleIdentity {
        ModuleIdentity::new(
            self.organization.clone(),
            self.name.replace("{binary}", &compiler.binary_version()),
            self.revision
                .clone()
                .unwrap_or_else(|| metadata.version.clone()),
        )
    }
}
