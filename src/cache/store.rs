//! Component store abstraction

use crate::cache::key::CacheKey;
use crate::error::KilnResult;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures_util::future::BoxFuture;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Build step run by [`ComponentStore::define_if_missing`] on a miss.
///
/// The builder is expected to call [`ComponentStore::define`] for the key
/// before it returns.
pub type ComponentBuilder = Box<dyn FnOnce() -> BoxFuture<'static, KilnResult<()>> + Send>;

/// Manifest of a published component
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComponentEntry {
    /// Cache key the files are registered under
    pub key: String,
    /// File names inside the entry directory
    pub files: Vec<String>,
    /// When the entry was published
    pub defined_at: DateTime<Utc>,
}

/// Key to file(s) mapping with an at-most-once build primitive
#[async_trait]
pub trait ComponentStore: Send + Sync {
    /// Whether a complete entry exists for `key`
    async fn has(&self, key: &CacheKey) -> KilnResult<bool>;

    /// Files registered under `key`; fails if absent
    async fn get(&self, key: &CacheKey) -> KilnResult<Vec<PathBuf>>;

    /// Return the files for `key`, running `builder` first if the entry is
    /// missing.
    ///
    /// Concurrent callers for the same key are serialized: exactly one runs
    /// the builder, the rest wait and then observe its result. A failed build
    /// is not remembered.
    async fn define_if_missing(
        &self,
        key: &CacheKey,
        builder: ComponentBuilder,
    ) -> KilnResult<Vec<PathBuf>>;

    /// Register `files` under `key`, replacing any existing entry wholesale
    async fn define(&self, key: &CacheKey, files: &[PathBuf]) -> KilnResult<()>;

    /// All published entries
    async fn list(&self) -> KilnResult<Vec<ComponentEntry>>;

    /// Remove the entry for `key`; returns whether one existed
    async fn remove(&self, key: &CacheKey) -> KilnResult<bool>;
}
