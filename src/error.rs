//! Error types for Kiln
//!
//! All modules use `KilnResult<T>` as their return type.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for Kiln operations
pub type KilnResult<T> = Result<T, KilnError>;

/// All errors that can occur in Kiln
#[derive(Error, Debug)]
pub enum KilnError {
    // Component errors
    #[error("Invalid component: {0}")]
    InvalidComponent(String),

    #[error("Could not fetch component {key}: {reason}")]
    ComponentFetchFailure { key: String, reason: String },

    #[error("Component not found in store: {0}")]
    ComponentNotFound(String),

    // Compilation errors
    #[error("Error compiling {display_name} ({}):\n{output}", exit_status(.code))]
    Compilation {
        display_name: String,
        code: Option<i32>,
        output: String,
    },

    #[error("Compiler not found: {program}")]
    CompilerNotFound {
        program: String,
        #[source]
        source: std::io::Error,
    },

    // Store errors
    #[error("Component store error at {path}: {source}")]
    Store {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // Resolution errors
    #[error("Invalid module identifier '{input}': {reason}")]
    InvalidModule { input: String, reason: String },

    // Runtime errors
    #[error("Could not determine runtime class version from {program}: {reason}")]
    RuntimeProbe { program: String, reason: String },

    // Configuration errors
    #[error("Invalid configuration at {path}: {reason}")]
    ConfigInvalid { path: PathBuf, reason: String },

    #[error("Failed to create config directory {path}: {source}")]
    ConfigDirCreate {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid version metadata: {0}")]
    VersionMetadata(String),

    // IO errors
    #[error("IO error: {context}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    // Serialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("TOML serialize error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    // General errors
    #[error("Internal error: {0}")]
    Internal(String),

    #[error("{0}")]
    User(String),
}

/// Same kind and message as `source`, for handing one failure to several callers
fn copy_io(source: &std::io::Error) -> std::io::Error {
    std::io::Error::new(source.kind(), source.to_string())
}

fn exit_status(code: &Option<i32>) -> String {
    match code {
        Some(code) => format!("exit code {}", code),
        None => "terminated by signal".to_string(),
    }
}

impl KilnError {
    /// Create an IO error with context
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }

    /// Create a store error for the given path
    pub fn store(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Store {
            path: path.into(),
            source,
        }
    }

    /// Create a component fetch failure
    pub fn fetch_failure(key: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::ComponentFetchFailure {
            key: key.into(),
            reason: reason.into(),
        }
    }

    /// An equivalent error with the same variant and message.
    ///
    /// Used when callers waiting on one build all observe its failure.
    /// Serialization errors keep their message but not their source.
    pub fn replicate(&self) -> Self {
        match self {
            Self::InvalidComponent(m) => Self::InvalidComponent(m.clone()),
            Self::ComponentFetchFailure { key, reason } => Self::ComponentFetchFailure {
                key: key.clone(),
                reason: reason.clone(),
            },
            Self::ComponentNotFound(k) => Self::ComponentNotFound(k.clone()),
            Self::Compilation {
                display_name,
                code,
                output,
            } => Self::Compilation {
                display_name: display_name.clone(),
                code: *code,
                output: output.clone(),
            },
            Self::CompilerNotFound { program, source } => Self::CompilerNotFound {
                program: program.clone(),
                source: copy_io(source),
            },
            Self::Store { path, source } => Self::Store {
                path: path.clone(),
                source: copy_io(source),
            },
            Self::InvalidModule { input, reason } => Self::InvalidModule {
                input: input.clone(),
                reason: reason.clone(),
            },
            Self::RuntimeProbe { program, reason } => Self::RuntimeProbe {
                program: program.clone(),
                reason: reason.clone(),
            },
            Self::ConfigInvalid { path, reason } => Self::ConfigInvalid {
                path: path.clone(),
                reason: reason.clone(),
            },
            Self::ConfigDirCreate { path, source } => Self::ConfigDirCreate {
                path: path.clone(),
                source: copy_io(source),
            },
            Self::VersionMetadata(m) => Self::VersionMetadata(m.clone()),
            Self::Io { context, source } => Self::Io {
                context: context.clone(),
                source: copy_io(source),
            },
            Self::Json(_) | Self::TomlParse(_) | Self::TomlSerialize(_) => {
                Self::User(self.to_string())
            }
            Self::Internal(m) => Self::Internal(m.clone()),
            Self::User(m) => Self::User(m.clone()),
        }
    }

    /// Get actionable hint for the error
    pub fn hint(&self) -> Option<&'static str> {
        match self {
            Self::InvalidComponent(_) => {
                Some("Check the [resolver] repositories in your config and your network, then rerun")
            }
            Self::CompilerNotFound { .. } => Some("Set [compiler] command in your config"),
            Self::RuntimeProbe { .. } => {
                Some("Set [runtime] class_version in your config, or point [runtime] java at a JDK")
            }
            Self::Store { .. } => Some("Run: kiln cache path, and check the directory permissions"),
            _ => None,
        }
    }
}
