//! Filesystem-backed component store
//!
//! Layout under the store root:
//!
//! - `<key>/component.json` + the registered files: published entries
//! - `.tmp/<uuid>/`: entries being staged, or retired entries being deleted
//! - `.locks/<key>.lock`: per-key build locks

use crate::cache::key::CacheKey;
use crate::cache::lock::{BuildSlot, ComponentLock};
use crate::cache::store::{ComponentBuilder, ComponentEntry, ComponentStore};
use crate::error::{KilnError, KilnResult};
use async_trait::async_trait;
use chrono::Utc;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::fs;
use tracing::{debug, info};
use uuid::Uuid;

const MANIFEST_FILE: &str = "component.json";
const TMP_DIR: &str = ".tmp";
const LOCKS_DIR: &str = ".locks";

/// Scratch directories older than this belong to no live operation
const STALE_SCRATCH_AGE: Duration = Duration::from_secs(60 * 60);

/// Attempts at swapping an entry into place before giving up
const MAX_PUBLISH_ATTEMPTS: usize = 16;

/// Component store rooted at a local directory
#[derive(Debug, Clone)]
pub struct LocalComponentStore {
    root: PathBuf,
    scratch_ttl: Duration,
}

impl LocalComponentStore {
    /// Create a store rooted at `root` (created lazily)
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            scratch_ttl: STALE_SCRATCH_AGE,
        }
    }

    /// Age after which leftover scratch directories are swept
    pub fn with_scratch_ttl(mut self, ttl: Duration) -> Self {
        self.scratch_ttl = ttl;
        self
    }

    /// Store root directory
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn entry_dir(&self, key: &CacheKey) -> PathBuf {
        self.root.join(key.as_str())
    }

    fn lock_path(&self, key: &CacheKey) -> PathBuf {
        self.root.join(LOCKS_DIR).join(format!("{}.lock", key))
    }

    fn scratch_dir(&self) -> PathBuf {
        self.root.join(TMP_DIR).join(Uuid::new_v4().to_string())
    }

    async fn read_manifest(&self, key: &CacheKey) -> KilnResult<Option<ComponentEntry>> {
        let path = self.entry_dir(key).join(MANIFEST_FILE);
        match fs::read_to_string(&path).await {
            Ok(content) => Ok(Some(serde_json::from_str(&content)?)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(KilnError::store(path, e)),
        }
    }

    /// Run `builder` under the cross-process key lock unless another process
    /// defined the key while we waited
    async fn build_locked(
        &self,
        key: &CacheKey,
        lock_path: &Path,
        builder: ComponentBuilder,
    ) -> KilnResult<Vec<PathBuf>> {
        let _lock = ComponentLock::acquire(lock_path).await?;

        if self.has(key).await? {
            debug!("Component {} defined by a concurrent builder", key);
            return self.get(key).await;
        }

        info!("Component {} missing, building", key);
        builder().await?;

        if !self.has(key).await? {
            return Err(KilnError::fetch_failure(
                key.as_str(),
                "build finished without defining the component",
            ));
        }
        self.get(key).await
    }

    /// Delete scratch directories older than the scratch TTL, left behind by
    /// interrupted processes
    async fn sweep_scratch(&self) {
        let tmp = self.root.join(TMP_DIR);
        let Ok(mut dir) = fs::read_dir(&tmp).await else {
            return;
        };

        while let Ok(Some(item)) = dir.next_entry().await {
            let age = match item.metadata().await.and_then(|m| m.modified()) {
                Ok(modified) => modified.elapsed().unwrap_or_default(),
                Err(_) => continue,
            };
            if age >= self.scratch_ttl {
                debug!("Sweeping stale scratch {}", item.path().display());
                remove_dir_best_effort(&item.path()).await;
            }
        }
    }

    /// Copy `files` into a fresh private directory and write the manifest last
    async fn stage(&self, key: &CacheKey, files: &[PathBuf]) -> KilnResult<PathBuf> {
        let staging = self.scratch_dir();
        fs::create_dir_all(&staging)
            .await
            .map_err(|e| KilnError::store(&staging, e))?;

        let result = fill_staging(&staging, key, files).await;
        if result.is_err() {
            remove_dir_best_effort(&staging).await;
        }
        result.map(|()| staging)
    }

    /// Rename `staging` to `target`, retiring whatever entry is already there
    async fn publish(&self, staging: &Path, target: &Path) -> KilnResult<()> {
        let mut retired = Vec::new();
        let mut published = false;

        for _ in 0..MAX_PUBLISH_ATTEMPTS {
            match fs::rename(staging, target).await {
                Ok(()) => {
                    published = true;
                    break;
                }
                Err(e) => {
                    if !fs::try_exists(target).await.unwrap_or(false) {
                        remove_dir_best_effort(staging).await;
                        return Err(KilnError::store(target, e));
                    }

                    debug!("Retiring existing entry {} ({})", target.display(), e);
                    let aside = self.scratch_dir();
                    match fs::rename(target, &aside).await {
                        Ok(()) => retired.push(aside),
                        Err(e) if e.kind() == ErrorKind::NotFound => {}
                        Err(e) => {
                            remove_dir_best_effort(staging).await;
                            return Err(KilnError::store(target, e));
                        }
                    }
                }
            }
        }

        for dir in &retired {
            remove_dir_best_effort(dir).await;
        }

        if published {
            Ok(())
        } else {
            remove_dir_best_effort(staging).await;
            Err(KilnError::store(
                target,
                std::io::Error::other("entry kept being replaced concurrently"),
            ))
        }
    }
}

async fn fill_staging(staging: &Path, key: &CacheKey, files: &[PathBuf]) -> KilnResult<()> {
    let mut names: Vec<String> = Vec::with_capacity(files.len());

    for file in files {
        let name = file
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| KilnError::User(format!("Not a component file: {}", file.display())))?
            .to_string();

        if name == MANIFEST_FILE || names.contains(&name) {
            return Err(KilnError::User(format!(
                "Duplicate or reserved component file name '{}' for {}",
                name, key
            )));
        }

        fs::copy(file, staging.join(&name))
            .await
            .map_err(|e| KilnError::store(file, e))?;
        names.push(name);
    }

    let entry = ComponentEntry {
        key: key.to_string(),
        files: names,
        defined_at: Utc::now(),
    };
    let manifest_path = staging.join(MANIFEST_FILE);
    fs::write(&manifest_path, serde_json::to_string_pretty(&entry)?)
        .await
        .map_err(|e| KilnError::store(manifest_path, e))
}

async fn remove_dir_best_effort(path: &Path) {
    if let Err(e) = fs::remove_dir_all(path).await {
        if e.kind() != ErrorKind::NotFound {
            debug!("Failed to remove {}: {}", path.display(), e);
        }
    }
}

#[async_trait]
impl ComponentStore for LocalComponentStore {
    async fn has(&self, key: &CacheKey) -> KilnResult<bool> {
        Ok(self.read_manifest(key).await?.is_some())
    }

    async fn get(&self, key: &CacheKey) -> KilnResult<Vec<PathBuf>> {
        let entry = self
            .read_manifest(key)
            .await?
            .ok_or_else(|| KilnError::ComponentNotFound(key.to_string()))?;

        let dir = self.entry_dir(key);
        Ok(entry.files.iter().map(|name| dir.join(name)).collect())
    }

    async fn define_if_missing(
        &self,
        key: &CacheKey,
        builder: ComponentBuilder,
    ) -> KilnResult<Vec<PathBuf>> {
        let lock_path = self.lock_path(key);
        let mut builder = Some(builder);

        loop {
            if self.has(key).await? {
                return self.get(key).await;
            }

            let leader = match BuildSlot::join(&lock_path) {
                BuildSlot::Leader(leader) => leader,
                BuildSlot::Follower(follower) => match follower.outcome().await {
                    Some(Ok(())) => continue,
                    Some(Err(e)) => {
                        debug!("Concurrent build of {} failed", key);
                        return Err(e.replicate());
                    }
                    // leader went away without a result
                    None => continue,
                },
            };

            let Some(build) = builder.take() else {
                return Err(KilnError::Internal(format!("builder for {} already used", key)));
            };
            let result = self.build_locked(key, &lock_path, build).await;
            match result {
                Ok(files) => {
                    leader.finish(Ok(()));
                    return Ok(files);
                }
                Err(e) => {
                    let shared = Arc::new(e.replicate());
                    leader.finish(Err(shared));
                    return Err(e);
                }
            }
        }
    }

    async fn define(&self, key: &CacheKey, files: &[PathBuf]) -> KilnResult<()> {
        self.sweep_scratch().await;
        let staging = self.stage(key, files).await?;
        self.publish(&staging, &self.entry_dir(key)).await?;
        debug!("Defined component {} ({} files)", key, files.len());
        Ok(())
    }

    async fn list(&self) -> KilnResult<Vec<ComponentEntry>> {
        let mut dir = match fs::read_dir(&self.root).await {
            Ok(dir) => dir,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(KilnError::store(&self.root, e)),
        };

        let mut entries = Vec::new();
        while let Some(item) = dir
            .next_entry()
            .await
            .map_err(|e| KilnError::store(&self.root, e))?
        {
            let Some(name) = item.file_name().to_str().map(str::to_string) else {
                continue;
            };
            if name.starts_with('.') {
                continue;
            }
            if let Some(entry) = self.read_manifest(&CacheKey::from_stored(name)).await? {
                entries.push(entry);
            }
        }

        entries.sort_by(|a, b| a.key.cmp(&b.key));
        Ok(entries)
    }

    async fn remove(&self, key: &CacheKey) -> KilnResult<bool> {
        let _lock = ComponentLock::acquire(&self.lock_path(key)).await?;

        let target = self.entry_dir(key);
        let aside = self.scratch_dir();
        if let Some(parent) = aside.parent() {
            fs::create_dir_all(parent)
                .await
                .map_err(|e| KilnError::store(parent, e))?;
        }

        match fs::rename(&target, &aside).await {
            Ok(()) => {
                remove_dir_best_effort(&aside).await;
                info!("Removed component {}", key);
                Ok(true)
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(KilnError::store(target, e)),
        }
    }
}
