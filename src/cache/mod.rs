//! Persistent component store for compiled bridges
//!
//! Provides content-addressed caching keyed by module identity, compiler
//! version and runtime class version. Entries are immutable once published.
//!
//! # Consistency Model
//!
//! - Entries are assembled in a private `.tmp/` directory, then renamed into
//!   place, so readers never observe a partial entry
//! - `define_if_missing` holds a per-key lock (in-process mutex + file lock)
//!   so concurrent builders for one key run the build exactly once
//! - Callers that queue behind an in-process build receive that build's
//!   outcome, failures included. Waiters in other processes re-check the
//!   store once they take the file lock
//! - Failed builds leave nothing behind and can be retried
//! - Scratch directories abandoned by crashed builds are swept by `define`
//!   once they are older than the scratch TTL
//!
//! # Entry States
//!
//! | State | On disk | Description |
//! |-------|---------|-------------|
//! | Unbuilt | nothing | No entry, next caller builds |
//! | Building | `.locks/<key>.lock` held | A builder owns the key |
//! | Built | `<key>/component.json` | Published, read-only |

pub mod key;
pub mod local;
mod lock;
pub mod store;

pub use key::{build_key, interface_key, CacheKey};
pub use local::LocalComponentStore;
pub use store::{ComponentBuilder, ComponentEntry, ComponentStore};
