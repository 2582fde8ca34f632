//! Cache key derivation for compiled components
//!
//! A key combines the module identity, the compiler's actual version and the
//! runtime class-file version. Same inputs = same key; any change on one of the
//! three axes yields a different key, so artifacts are never shared across
//! incompatible compiler/runtime combinations.

use crate::error::{KilnError, KilnResult};
use crate::resolve::ModuleIdentity;
use std::fmt;

/// Separator between module coordinates
const FIELD_SEPARATOR: &str = "-";

/// Separator between the module, compiler and runtime axes
const AXIS_SEPARATOR: &str = "__";

/// Identity of a cached component. Always a single valid path segment.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CacheKey(String);

impl CacheKey {
    /// Wrap a raw key, escaping anything that could not appear in a path segment
    pub fn new(raw: &str) -> Self {
        Self(escape(raw))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Parse a key in its stored form, as printed by `kiln cache list`
    pub fn parse(stored: &str) -> KilnResult<Self> {
        let valid_byte =
            |b: u8| b.is_ascii_alphanumeric() || matches!(b, b'.' | b'+' | b'%' | b'-' | b'_');
        if stored.is_empty()
            || stored.chars().all(|c| c == '.')
            || !stored.bytes().all(valid_byte)
        {
            return Err(KilnError::User(format!("Invalid cache key: {}", stored)));
        }
        Ok(Self(stored.to_string()))
    }

    /// Reconstruct a key read back from the store's directory listing
    pub(crate) fn from_stored(stored: String) -> Self {
        Self(stored)
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Build the key for a compiled bridge
pub fn build_key(
    module: &ModuleIdentity,
    compiler_version: &str,
    runtime_version: &str,
) -> CacheKey {
    let mut fields = vec![
        escape(&module.organization),
        escape(&module.name),
        escape(&module.revision),
    ];
    if let Some(ref classifier) = module.classifier {
        fields.push(escape(classifier));
    }

    let key = [
        fields.join(FIELD_SEPARATOR),
        escape(compiler_version),
        escape(runtime_version),
    ]
    .join(AXIS_SEPARATOR);

    CacheKey(key)
}

/// Key of the interface artifact for an incremental compiler version
pub fn interface_key(incremental_version: &str) -> CacheKey {
    CacheKey(format!("interface-{}", escape(incremental_version)))
}

/// Percent-escape every byte outside `[A-Za-z0-9.+]`.
///
/// Separators (`-`, `_`) are always escaped inside a component, which keeps
/// joined keys unambiguous.
fn escape(component: &str) -> String {
    let mut out = String::with_capacity(component.len());
    for byte in component.bytes() {
        if byte.is_ascii_alphanumeric() || byte == b'.' || byte == b'+' {
            out.push(byte as char);
        } else {
            out.push_str(&format!("%{:02X}", byte));
        }
    }
    // "." and ".." are not usable directory names
    if out.chars().all(|c| c == '.') {
        return out.replace('.', "%2E");
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bridge() -> ModuleIdentity {
        ModuleIdentity::new("org.x", "bridge", "1.0")
    }

    #[test]
    fn parse_accepts_printed_keys_only() {
        let key = build_key(&bridge().with_classifier("a b"), "2.12.8", "50.0");
        assert_eq!(CacheKey::parse(key.as_str()).unwrap(), key);
        assert!(CacheKey::parse("").is_err());
        assert!(CacheKey::parse("..").is_err());
        assert!(CacheKey::parse("../etc").is_err());
        assert!(CacheKey::parse("a/b").is_err());
    }

    #[test]
    fn key_deterministic() {
        let k1 = build_key(&bridge(), "2.12.8", "50.0");
        let k2 = build_key(&bridge(), "2.12.8", "50.0");
        assert_eq!(k1, k2);
        assert_eq!(k1.as_str(), "org.x-bridge-1.0__2.12.8__50.0");
    }

    #[test]
    fn key_changes_with_compiler_version() {
        assert_ne!(
            build_key(&bridge(), "2.12.8", "50.0"),
            build_key(&bridge(), "2.12.9", "50.0")
        );
    }

    #[test]
    fn key_changes_with_runtime_version() {
        assert_ne!(
            build_key(&bridge(), "2.12.8", "50.0"),
            build_key(&bridge(), "2.12.8", "52.0")
        );
    }

    #[test]
    fn key_changes_with_module() {
        let other = ModuleIdentity::new("org.x", "bridge", "1.1");
        assert_ne!(
            build_key(&bridge(), "2.12.8", "50.0"),
            build_key(&other, "2.12.8", "50.0")
        );
        assert_ne!(
            build_key(&bridge(), "2.12.8", "50.0"),
            build_key(&bridge().with_classifier("sources"), "2.12.8", "50.0")
        );
    }

    #[test]
    fn separators_inside_components_do_not_collide() {
        let a = ModuleIdentity::new("org", "a-b", "1");
        let b = ModuleIdentity::new("org-a", "b", "1");
        assert_ne!(build_key(&a, "v", "r"), build_key(&b, "v", "r"));

        let m = ModuleIdentity::new("o", "n", "1");
        assert_ne!(build_key(&m, "2_", "_3"), build_key(&m, "2__", "3"));
    }

    #[test]
    fn escaped_key_is_single_path_segment() {
        let m = ModuleIdentity::new("org/evil", "..", "1\\2");
        let key = build_key(&m, "a:b", "c d");
        assert!(!key.as_str().contains('/'));
        assert!(!key.as_str().contains('\\'));
        assert!(!key.as_str().contains(':'));
        assert!(!key.as_str().contains(' '));
    }

    #[test]
    fn dot_only_components_are_escaped() {
        assert_eq!(escape(".."), "%2E%2E");
        assert_eq!(escape("1.0"), "1.0");
    }

    #[test]
    fn interface_key_format() {
        assert_eq!(interface_key("1.9.3").as_str(), "interface-1.9.3");
    }

    #[test]
    fn raw_key_is_escaped() {
        assert_eq!(CacheKey::new("a/b").as_str(), "a%2Fb");
    }
}
