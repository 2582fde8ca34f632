//! Packaged version metadata
//!
//! `resources/incremental.properties` is compiled into the binary. It is
//! parsed once at startup and handed to the providers as an immutable value.

use crate::error::{KilnError, KilnResult};
use std::collections::HashMap;

const PACKAGED_PROPERTIES: &str = include_str!("../resources/incremental.properties");

/// Incremental compiler version information
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionMetadata {
    /// Incremental compiler version, keys the interface artifact
    pub version: String,
    /// Build timestamp of the metadata, if recorded
    pub timestamp: Option<String>,
}

impl VersionMetadata {
    /// Load the metadata packaged with this binary
    pub fn packaged() -> KilnResult<Self> {
        Self::parse(PACKAGED_PROPERTIES)
    }

    /// Parse metadata from properties text
    pub fn parse(content: &str) -> KilnResult<Self> {
        let mut props = parse_properties(content);

        let version = props
            .remove("version")
            .filter(|v| !v.is_empty())
            .ok_or_else(|| KilnError::VersionMetadata("missing 'version' property".to_string()))?;

        Ok(Self {
            version,
            timestamp: props.remove("timestamp").filter(|t| !t.is_empty()),
        })
    }

    /// Version string shown in diagnostics
    pub fn full_version(&self) -> String {
        match self.timestamp {
            Some(ref ts) => format!("{}-{}", self.version, ts),
            None => self.version.clone(),
        }
    }
}

/// Parse `key=value` / `key: value` lines, skipping `#` and `!` comments
fn parse_properties(content: &str) -> HashMap<String, String> {
    content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#') && !line.starts_with('!'))
        .filter_map(|line| {
            let idx = line.find(['=', ':'])?;
            let (key, value) = line.split_at(idx);
            Some((key.trim().to_string(), value[1..].trim().to_string()))
        })
        .collect()
}
