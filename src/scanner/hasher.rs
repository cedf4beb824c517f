//! Lazy content hasher.
//!
//! Digests are computed only for records whose size collides with another
//! record's size — files of different length cannot have equal content, so
//! hashing work is proportional to same-size collisions rather than to the
//! inventory as a whole.
//!
//! Files are streamed through BLAKE3 in fixed-size chunks, bounding memory
//! to a small constant regardless of file size.

use std::fs::File;
use std::io::Read;
use std::path::Path;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use super::{is_cancelled, HashError, NullObserver, ScanObserver};
use crate::inventory::InventoryStore;

/// Read buffer size for streaming digests.
const CHUNK_SIZE: usize = 64 * 1024;

/// Streaming BLAKE3 hasher over the inventory's candidate records.
pub struct Hasher<'a> {
    root: &'a Path,
    store: &'a InventoryStore,
    cancel: Option<Arc<AtomicBool>>,
    observer: &'a dyn ScanObserver,
}

impl<'a> Hasher<'a> {
    /// Create a hasher resolving record paths under `root`.
    #[must_use]
    pub fn new(root: &'a Path, store: &'a InventoryStore) -> Self {
        Self {
            root,
            store,
            cancel: None,
            observer: &NullObserver,
        }
    }

    /// Set a cancellation flag checked between files.
    #[must_use]
    pub fn with_cancel_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.cancel = Some(flag);
        self
    }

    /// Set a progress observer notified per hashed file.
    #[must_use]
    pub fn with_observer(mut self, observer: &'a dyn ScanObserver) -> Self {
        self.observer = observer;
        self
    }

    /// Run one hashing pass over the current inventory snapshot.
    ///
    /// Returns the count of records newly hashed. Files that fail to read
    /// (unreadable, removed mid-pass) are logged and skipped, leaving their
    /// digest absent so the next pass retries them; one bad file never fails
    /// the pass.
    pub fn hash_pending(&self) -> Result<u64, HashError> {
        let candidates = self.store.hash_candidates()?;
        if candidates.is_empty() {
            log::debug!("No size-colliding records awaiting a digest");
            return Ok(0);
        }
        log::info!(
            "Hashing {} size-colliding candidate file(s)",
            candidates.len()
        );

        let mut hashed = 0u64;
        for record in candidates {
            if is_cancelled(self.cancel.as_ref()) {
                log::info!("Hashing cancelled after {} files", hashed);
                return Err(HashError::Cancelled);
            }

            self.observer.on_file(&record.name);
            let absolute = record.absolute_path(self.root);
            match hash_file(&absolute) {
                Ok(digest) => {
                    self.store.set_hash(&record.path, &digest)?;
                    hashed += 1;
                    log::trace!("Hashed {}: {}", record.path, digest);
                }
                Err(e) => {
                    log::warn!("Failed to hash {}: {}", record.path, e);
                }
            }
        }

        log::debug!("Hashing pass complete: {} digests computed", hashed);
        Ok(hashed)
    }
}

/// Stream a file through BLAKE3 and return the hex digest.
pub fn hash_file(path: &Path) -> std::io::Result<String> {
    let mut file = File::open(path)?;
    let mut hasher = blake3::Hasher::new();
    let mut buf = vec![0u8; CHUNK_SIZE];
    loop {
        let n = file.read(&mut buf)?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    Ok(hasher.finalize().to_hex().to_string())
}
