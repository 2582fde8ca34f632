//! Per-key build locks and in-flight build tracking

use crate::error::{KilnError, KilnResult};
use fs2::FileExt;
use std::collections::HashMap;
use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, OnceLock};
use tokio::sync::{watch, OwnedMutexGuard};

type ProcessLock = Arc<tokio::sync::Mutex<()>>;

/// Exclusive lock on one component key, shared across tasks and processes.
///
/// Released on drop.
#[derive(Debug)]
pub(crate) struct ComponentLock {
    path: PathBuf,
    file: File,
    // flock only coordinates processes reliably; the async mutex serializes
    // tasks in this process without parking a runtime thread.
    guard: Option<OwnedMutexGuard<()>>,
}

impl ComponentLock {
    /// Acquire the lock at `path`, creating the lockfile if needed.
    ///
    /// Waits until the lock is available.
    pub(crate) async fn acquire(path: &Path) -> KilnResult<Self> {
        let guard = process_lock_for_path(path).lock_owned().await;

        let lock_path = path.to_path_buf();
        let file = tokio::task::spawn_blocking(move || -> std::io::Result<File> {
            if let Some(parent) = lock_path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            let file = OpenOptions::new()
                .create(true)
                .truncate(false)
                .read(true)
                .write(true)
                .open(&lock_path)?;
            FileExt::lock_exclusive(&file)?;
            Ok(file)
        })
        .await
        .map_err(|e| KilnError::Internal(format!("lock task failed: {}", e)))?
        .map_err(|e| KilnError::store(path, e))?;

        Ok(Self {
            path: path.to_path_buf(),
            file,
            guard: Some(guard),
        })
    }
}

impl Drop for ComponentLock {
    fn drop(&mut self) {
        let _ = FileExt::unlock(&self.file);
        drop(self.guard.take());
        release_process_lock(&self.path);
    }
}

fn process_locks() -> &'static Mutex<HashMap<PathBuf, ProcessLock>> {
    static PROCESS_LOCKS: OnceLock<Mutex<HashMap<PathBuf, ProcessLock>>> = OnceLock::new();
    PROCESS_LOCKS.get_or_init(|| Mutex::new(HashMap::new()))
}

fn process_lock_for_path(path: &Path) -> ProcessLock {
    let mut map = process_locks()
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner());
    map.entry(path.to_path_buf())
        .or_insert_with(|| Arc::new(tokio::sync::Mutex::new(())))
        .clone()
}

/// Forget the mutex for `path` once nobody holds or awaits it.
///
/// Handles are only cloned under the map lock, so a count of one means the
/// map is the last owner.
fn release_process_lock(path: &Path) {
    let mut map = process_locks()
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner());
    if map.get(path).is_some_and(|lock| Arc::strong_count(lock) == 1) {
        map.remove(path);
    }
}

/// Result of one build, as seen by every caller that waited on it
pub(crate) type BuildOutcome = Result<(), Arc<KilnError>>;

type OutcomeReceiver = watch::Receiver<Option<BuildOutcome>>;

fn in_flight() -> &'static Mutex<HashMap<PathBuf, OutcomeReceiver>> {
    static IN_FLIGHT: OnceLock<Mutex<HashMap<PathBuf, OutcomeReceiver>>> = OnceLock::new();
    IN_FLIGHT.get_or_init(|| Mutex::new(HashMap::new()))
}

/// Role of a caller that found a key missing
pub(crate) enum BuildSlot {
    /// Runs the build and reports through the handle
    Leader(BuildLeader),
    /// Waits for the running build in this process
    Follower(BuildFollower),
}

impl BuildSlot {
    /// Join the build running for `key`, or become its leader
    pub(crate) fn join(key: &Path) -> Self {
        let mut map = in_flight()
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        if let Some(receiver) = map.get(key) {
            return Self::Follower(BuildFollower {
                receiver: receiver.clone(),
            });
        }

        let (sender, receiver) = watch::channel(None);
        map.insert(key.to_path_buf(), receiver);
        Self::Leader(BuildLeader {
            key: key.to_path_buf(),
            sender,
        })
    }
}

/// Owner of an in-flight build.
///
/// Dropping it without [`BuildLeader::finish`] (e.g. a cancelled build)
/// releases the followers so they can try again.
pub(crate) struct BuildLeader {
    key: PathBuf,
    sender: watch::Sender<Option<BuildOutcome>>,
}

impl BuildLeader {
    /// Publish the outcome to every follower and close the slot.
    ///
    /// The slot is gone before followers wake, so later callers start a fresh
    /// build instead of seeing this outcome.
    pub(crate) fn finish(self, outcome: BuildOutcome) {
        self.clear();
        self.sender.send_replace(Some(outcome));
    }

    fn clear(&self) {
        let mut map = in_flight()
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        if map
            .get(&self.key)
            .is_some_and(|receiver| receiver.same_channel(&self.sender.subscribe()))
        {
            map.remove(&self.key);
        }
    }
}

impl Drop for BuildLeader {
    fn drop(&mut self) {
        self.clear();
    }
}

/// Waiter on a build started by another caller in this process
pub(crate) struct BuildFollower {
    receiver: OutcomeReceiver,
}

impl BuildFollower {
    /// Outcome of the leader's build, or `None` if it was abandoned
    pub(crate) async fn outcome(mut self) -> Option<BuildOutcome> {
        match self.receiver.wait_for(Option::is_some).await {
            Ok(outcome) => outcome.clone(),
            Err(_) => None,
        }
    }
}
