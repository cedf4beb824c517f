//! Duplicate grouping and wasted-space accounting.
//!
//! Side-effect-free: callable at any time, including while a scan/hash job
//! is running, in which case it simply reflects the snapshot the inventory
//! currently holds.

use std::collections::HashMap;

use serde::Serialize;

use crate::inventory::{FileRecord, InventoryError, InventoryStore};

/// A set of records sharing one content digest, cardinality > 1.
///
/// Members share `size` by construction: equal digest implies equal size
/// under the no-adversarial-collision assumption of the hasher.
#[derive(Debug, Clone, Serialize)]
pub struct DuplicateGroup {
    /// Shared content digest (hex).
    pub digest: String,
    /// Size of each member in bytes.
    pub size: u64,
    /// Members, most recently modified first. The first member is presented
    /// as "the one to keep" — a display convention, not a constraint.
    pub members: Vec<FileRecord>,
    /// Bytes reclaimable by deleting all but one member.
    pub wasted_space: u64,
}

impl DuplicateGroup {
    /// Number of members.
    #[must_use]
    pub fn len(&self) -> usize {
        self.members.len()
    }

    /// Groups are never materialized empty, but the predicate keeps callers
    /// honest.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Total bytes occupied by all members.
    #[must_use]
    pub fn total_size(&self) -> u64 {
        self.size * self.members.len() as u64
    }
}

/// Materialize duplicate groups from the current inventory snapshot.
///
/// Groups all records with a computed digest by that digest, keeps groups
/// with two or more members, and returns them ordered by `size * count`
/// descending — biggest reclaim opportunity first.
pub fn duplicate_groups(store: &InventoryStore) -> Result<Vec<DuplicateGroup>, InventoryError> {
    let records = store.hashed_duplicates()?;

    let mut by_digest: HashMap<String, Vec<FileRecord>> = HashMap::new();
    for record in records {
        // hashed_duplicates only returns records with a digest.
        if let Some(digest) = record.hash.clone() {
            by_digest.entry(digest).or_default().push(record);
        }
    }

    let mut groups: Vec<DuplicateGroup> = by_digest
        .into_iter()
        .filter(|(_, members)| members.len() > 1)
        .map(|(digest, mut members)| {
            members.sort_by(|a, b| b.mtime.cmp(&a.mtime));
            let size = members[0].size;
            let wasted_space = size * (members.len() as u64 - 1);
            DuplicateGroup {
                digest,
                size,
                members,
                wasted_space,
            }
        })
        .collect();

    groups.sort_by(|a, b| b.total_size().cmp(&a.total_size()));

    log::debug!(
        "Materialized {} duplicate group(s), {} reclaimable bytes",
        groups.len(),
        groups.iter().map(|g| g.wasted_space).sum::<u64>()
    );
    Ok(groups)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};

    fn seed(store: &InventoryStore, path: &str, size: u64, hash: Option<&str>, age_secs: i64) {
        let mtime = Utc::now() - Duration::seconds(age_secs);
        store.upsert(path, path, size, mtime).unwrap();
        if let Some(h) = hash {
            store.set_hash(path, h).unwrap();
        }
    }

    #[test]
    fn groups_require_shared_digest_not_just_size() {
        let store = InventoryStore::open_in_memory().unwrap();
        seed(&store, "a.txt", 1000, Some("h1"), 10);
        seed(&store, "b.txt", 1000, Some("h1"), 20);
        seed(&store, "c.txt", 1000, Some("h2"), 30);

        let groups = duplicate_groups(&store).unwrap();

        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].digest, "h1");
        assert_eq!(groups[0].len(), 2);
        assert_eq!(groups[0].wasted_space, 1000);
        assert!(groups[0].members.iter().all(|m| m.path != "c.txt"));
    }

    #[test]
    fn members_share_size_and_waste_is_size_times_count_minus_one() {
        let store = InventoryStore::open_in_memory().unwrap();
        for path in ["x", "y", "z"] {
            seed(&store, path, 2048, Some("h"), 0);
        }

        let groups = duplicate_groups(&store).unwrap();
        let g = &groups[0];
        assert!(g.members.iter().all(|m| m.size == g.size));
        assert_eq!(g.wasted_space, 2048 * 2);
        assert_eq!(g.total_size(), 2048 * 3);
    }

    #[test]
    fn members_ordered_most_recent_first() {
        let store = InventoryStore::open_in_memory().unwrap();
        seed(&store, "old.txt", 10, Some("h"), 300);
        seed(&store, "new.txt", 10, Some("h"), 5);
        seed(&store, "mid.txt", 10, Some("h"), 100);

        let groups = duplicate_groups(&store).unwrap();
        let names: Vec<_> = groups[0].members.iter().map(|m| m.path.as_str()).collect();
        assert_eq!(names, ["new.txt", "mid.txt", "old.txt"]);
    }

    #[test]
    fn groups_ordered_by_reclaim_opportunity() {
        let store = InventoryStore::open_in_memory().unwrap();
        // Small group: 100 * 3 = 300 total.
        for path in ["s1", "s2", "s3"] {
            seed(&store, path, 100, Some("small"), 0);
        }
        // Large group: 5000 * 2 = 10000 total.
        for path in ["l1", "l2"] {
            seed(&store, path, 5000, Some("large"), 0);
        }

        let groups = duplicate_groups(&store).unwrap();
        assert_eq!(groups[0].digest, "large");
        assert_eq!(groups[1].digest, "small");
    }

    #[test]
    fn unhashed_and_unique_records_yield_no_groups() {
        let store = InventoryStore::open_in_memory().unwrap();
        seed(&store, "plain.txt", 10, None, 0);
        seed(&store, "lonely.txt", 20, Some("solo"), 0);

        assert!(duplicate_groups(&store).unwrap().is_empty());
    }
}
