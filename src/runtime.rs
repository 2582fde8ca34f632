//! Runtime class-file version detection
//!
//! Bridges compiled for one class-file version must not be reused on another,
//! so the version is part of every bridge cache key.

use crate::error::{KilnError, KilnResult};
use std::io::ErrorKind;
use tokio::process::Command;
use tracing::debug;

/// Property printed by `-XshowSettings:properties`
const CLASS_VERSION_PROPERTY: &str = "java.class.version";

/// Resolve the runtime class version: an explicit override wins, otherwise
/// the `java` binary is probed.
pub async fn runtime_class_version(java: &str, configured: Option<&str>) -> KilnResult<String> {
    if let Some(version) = configured.filter(|v| !v.trim().is_empty()) {
        debug!("Using configured runtime class version {}", version);
        return Ok(version.trim().to_string());
    }
    detect_class_version(java).await
}

/// Probe `java -XshowSettings:properties -version` for `java.class.version`
pub async fn detect_class_version(java: &str) -> KilnResult<String> {
    let probe_error = |reason: String| KilnError::RuntimeProbe {
        program: java.to_string(),
        reason,
    };

    let output = Command::new(java)
        .args(["-XshowSettings:properties", "-version"])
        .output()
        .await
        .map_err(|e| {
            if e.kind() == ErrorKind::NotFound {
                probe_error("program not found".to_string())
            } else {
                probe_error(e.to_string())
            }
        })?;

    // The JVM prints settings on stderr
    let stderr = String::from_utf8_lossy(&output.stderr);
    let stdout = String::from_utf8_lossy(&output.stdout);

    let version = parse_class_version(&stderr)
        .or_else(|| parse_class_version(&stdout))
        .ok_or_else(|| probe_error(format!("no {} in output", CLASS_VERSION_PROPERTY)))?;

    debug!("Detected runtime class version {} from {}", version, java);
    Ok(version)
}

/// Extract the `java.class.version` value from settings output
pub fn parse_class_version(output: &str) -> Option<String> {
    output.lines().find_map(|line| {
        let (key, value) = line.trim().split_once('=')?;
        if key.trim() != CLASS_VERSION_PROPERTY {
            return None;
        }
        let value = value.trim();
        (!value.is_empty()).then(|| value.to_string())
    })
}
