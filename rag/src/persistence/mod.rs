//! Persistence backends for the vector store.
//!
//! This module provides the [`Persistence`] trait and the [`DirectoryPersistence`]
//! implementation that writes a store as a small set of files in one directory.

mod directory;

pub use directory::{DirectoryPersistence, EXCERPT_FILE, INDEX_FILE, METADATA_FILE};

use crate::error::Result;
use crate::store::StoreSnapshot;
use std::path::Path;

/// Trait for persistence backends.
///
/// Backends save and load whole snapshots; there is no incremental update.
pub trait Persistence: Send + Sync {
    /// Saves a snapshot, replacing whatever was stored before.
    ///
    /// # Errors
    ///
    /// Returns an error if any artifact cannot be serialized or written.
    fn save(&self, snapshot: &StoreSnapshot) -> Result<()>;

    /// Loads the stored snapshot.
    ///
    /// Returns `Ok(None)` if nothing has been stored yet.
    ///
    /// # Errors
    ///
    /// Returns an error if stored artifacts are unreadable, corrupt or inconsistent.
    fn load(&self) -> Result<Option<StoreSnapshot>>;

    /// Removes every stored artifact.
    ///
    /// # Errors
    ///
    /// Returns an error if an existing artifact cannot be removed.
    fn clear(&self) -> Result<()>;

    /// Returns the storage location.
    fn path(&self) -> &Path;
}
