//! CLI argument definitions using clap derive

use clap::{ArgAction, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Kiln - compiler bridge cache
///
/// Provides compiled compiler bridges, building each one on demand the
/// first time a compiler/runtime combination needs it.
#[derive(Parser, Debug)]
#[command(name = "kiln")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,

    /// Increase verbosity (-v info, -vv debug)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,

    /// Configuration file path
    #[arg(short, long, global = true, env = "KILN_CONFIG")]
    pub config: Option<PathBuf>,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Print the path of the compiled bridge, building it if needed
    Provide(ProvideArgs),

    /// Print the cache key of a bridge without building it
    Key(KeyArgs),

    /// Manage cached components
    Cache(CacheArgs),

    /// Show or edit configuration
    Config(ConfigArgs),
}

/// Compiler and bridge selection shared by `provide` and `key`
#[derive(Parser, Debug)]
pub struct BridgeArgs {
    /// Actual version of the compiler (e.g. 2.12.8)
    #[arg(long)]
    pub compiler_version: String,

    /// Bridge sources module (org:name:rev), overrides [bridge] config
    #[arg(long)]
    pub bridge: Option<String>,

    /// Runtime class-file version (e.g. 52.0), skips probing java
    #[arg(long)]
    pub runtime_version: Option<String>,
}

/// Arguments for the provide command
#[derive(Parser, Debug)]
pub struct ProvideArgs {
    #[command(flatten)]
    pub bridge: BridgeArgs,

    /// Compiler installation directory
    #[arg(long)]
    pub compiler_home: Option<PathBuf>,

    /// Compiler jars for the bridge classpath (comma-separated)
    #[arg(long, value_delimiter = ',')]
    pub compiler_jar: Vec<PathBuf>,
}

/// Arguments for the key command
#[derive(Parser, Debug)]
pub struct KeyArgs {
    #[command(flatten)]
    pub bridge: BridgeArgs,
}

/// Output format for list command
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable table
    Table,
    /// JSON output
    Json,
    /// Simple text (one per line)
    Plain,
}

/// Arguments for the cache command
#[derive(Parser, Debug)]
pub struct CacheArgs {
    /// Subcommand for cache
    #[command(subcommand)]
    pub action: CacheAction,
}

/// Cache subcommands
#[derive(Subcommand, Debug)]
pub enum CacheAction {
    /// List cached components
    List {
        /// Output format
        #[arg(short, long, default_value = "table")]
        format: OutputFormat,
    },

    /// Show the component store directory
    Path,

    /// Remove one cached component
    Remove {
        /// Cache key as printed by `kiln cache list`
        key: String,
    },

    /// Remove all cached components
    Clear {
        /// Skip confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },
}

/// Arguments for the config command
#[derive(Parser, Debug)]
pub struct ConfigArgs {
    /// Subcommand for config
    #[command(subcommand)]
    pub action: Option<ConfigAction>,
}

/// Config subcommands
#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Show current configuration
    Show,

    /// Show configuration file path
    Path,

    /// Initialize default configuration
    Init {
        /// Overwrite existing configuration
        #[arg(short, long)]
        force: bool,
    },

    /// Set a configuration value
    Set {
        /// Configuration key (e.g., runtime.class_version)
        key: String,
        /// Value to set
        value: String,
    },
}
