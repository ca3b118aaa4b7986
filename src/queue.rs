use std::fmt;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{RegistrarError, RegistrarResult};

/// The seven queue categories a name can occupy a row in, one `sled::Tree`
/// each — generalising `tos_wallet::storage`'s "one tree per logical
/// category" layout from a single `extra` tree to seven.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Category {
    Preorder,
    Register,
    Update,
    Transfer,
    Renew,
    Revoke,
    NameImport,
}

impl Category {
    pub const ALL: [Category; 7] = [
        Category::Preorder,
        Category::Register,
        Category::Update,
        Category::Transfer,
        Category::Renew,
        Category::Revoke,
        Category::NameImport,
    ];

    /// Categories the worker's `ClearConfirmed` step is allowed to drop
    /// purely by confirmation count. `preorder`/`register`/`update` rows
    /// are excluded: they're only ever removed by the precondition chain
    /// in steps 1/2/4 transitioning them to the next category, never by
    /// confirmation count alone (spec.md §4.7 step 6, Invariant 3).
    pub const CLEARABLE: [Category; 4] = [
        Category::Transfer,
        Category::Renew,
        Category::Revoke,
        Category::NameImport,
    ];

    fn tree_name(self) -> &'static str {
        match self {
            Category::Preorder => "preorder",
            Category::Register => "register",
            Category::Update => "update",
            Category::Transfer => "transfer",
            Category::Renew => "renew",
            Category::Revoke => "revoke",
            Category::NameImport => "name_import",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tree_name())
    }
}

/// One row of the durable queue: a single operation in flight for a single
/// `fqu`, keyed by `(category, fqu)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueueEntry {
    pub fqu: String,
    pub category: Category,
    /// Broadcast transaction hash, once the operation has been sent to the
    /// chain adapter. `None` until the first successful broadcast.
    pub tx_hash: Option<String>,
    /// Confirmations last observed for `tx_hash`. The worker's
    /// `ClearConfirmed` step removes rows once this crosses the
    /// embedder-defined confirmation threshold.
    pub confirmations: u32,
    /// Raw zone file payload, for `update` rows only.
    pub zonefile: Option<String>,
    /// `sha256(zonefile)`, set once the zone file is known.
    pub zonefile_hash: Option<String>,
    /// Token file payload replicated alongside the zone file, if any.
    pub token_file: Option<String>,
    /// Destination address. Carried from `preorder`/`update` through to a
    /// confirmed `transfer` row once the `update → transfer` transition
    /// fires.
    pub transfer_address: Option<String>,
    /// Caller-requested confirmation threshold for this row, overriding
    /// the worker's default. `None` means use the worker's default
    /// (`REQUIRED_CONFIRMATIONS`).
    pub min_confirmations: Option<u32>,
    /// Last error message recorded against this row by `AddErrorMessage`.
    pub error: Option<String>,
}

impl QueueEntry {
    pub fn new(fqu: impl Into<String>, category: Category) -> Self {
        Self {
            fqu: fqu.into(),
            category,
            tx_hash: None,
            confirmations: 0,
            zonefile: None,
            zonefile_hash: None,
            token_file: None,
            transfer_address: None,
            min_confirmations: None,
            error: None,
        }
    }
}

/// The durable, crash-safe multi-category FIFO queue backing the
/// registration pipeline. Every mutation is a single `sled` row write, so a
/// crash mid-operation leaves the queue in the state of the last completed
/// write, never partially applied.
#[derive(Debug)]
pub struct Queue {
    db: sled::Db,
}

impl Queue {
    pub fn open(path: impl AsRef<Path>) -> RegistrarResult<Self> {
        let db = sled::open(path)?;
        Ok(Self { db })
    }

    fn tree(&self, category: Category) -> RegistrarResult<sled::Tree> {
        Ok(self.db.open_tree(category.tree_name())?)
    }

    /// Insert a new row. Returns `AlreadyQueued` if one already exists for
    /// this `(category, fqu)` pair — callers are expected to check
    /// `contains` first via the operation issuers, but `append` itself
    /// stays safe to call blind.
    pub fn append(&self, entry: QueueEntry) -> RegistrarResult<()> {
        let tree = self.tree(entry.category)?;
        if tree.contains_key(entry.fqu.as_bytes())? {
            return Err(RegistrarError::AlreadyQueued);
        }
        let bytes = bincode::serialize(&entry)?;
        tree.insert(entry.fqu.as_bytes(), bytes)?;
        Ok(())
    }

    /// Overwrite an existing row (or insert if absent). Used by the worker
    /// to record progress (tx hash, confirmations, errors) without treating
    /// that update as a fresh append.
    pub fn put(&self, entry: &QueueEntry) -> RegistrarResult<()> {
        let tree = self.tree(entry.category)?;
        let bytes = bincode::serialize(entry)?;
        tree.insert(entry.fqu.as_bytes(), bytes)?;
        Ok(())
    }

    pub fn contains(&self, category: Category, fqu: &str) -> RegistrarResult<bool> {
        Ok(self.tree(category)?.contains_key(fqu.as_bytes())?)
    }

    pub fn find(&self, category: Category, fqu: &str) -> RegistrarResult<Option<QueueEntry>> {
        match self.tree(category)?.get(fqu.as_bytes())? {
            Some(bytes) => Ok(Some(bincode::deserialize(&bytes)?)),
            None => Ok(None),
        }
    }

    /// All rows in `category` that have a broadcast transaction with at
    /// least `min_confirmations` confirmations — accepted by the chain and
    /// safe to act on. Mirrors the original registrar's "accepted" scan
    /// used by `set_zonefiles`/`transfer_names`.
    pub fn find_accepted(
        &self,
        category: Category,
        min_confirmations: u32,
    ) -> RegistrarResult<Vec<QueueEntry>> {
        let mut out = Vec::new();
        for row in self.tree(category)?.iter() {
            let (_, bytes) = row?;
            let entry: QueueEntry = bincode::deserialize(&bytes)?;
            if entry.tx_hash.is_some() && entry.confirmations >= min_confirmations {
                out.push(entry);
            }
        }
        Ok(out)
    }

    /// All rows currently in `category`, for steps that must walk the
    /// whole category every cycle (`RegisterPreorders`, `ClearConfirmed`).
    pub fn scan(&self, category: Category) -> RegistrarResult<Vec<QueueEntry>> {
        let mut out = Vec::new();
        for row in self.tree(category)?.iter() {
            let (_, bytes) = row?;
            out.push(bincode::deserialize(&bytes)?);
        }
        Ok(out)
    }

    /// Remove every row across every category for `fqu`. Used once an
    /// operation is confirmed and done, and by the worker's skip-list
    /// cleanup when a name fails irrecoverably.
    pub fn remove_all(&self, fqu: &str) -> RegistrarResult<()> {
        for category in Category::ALL {
            self.tree(category)?.remove(fqu.as_bytes())?;
        }
        Ok(())
    }

    pub fn remove(&self, category: Category, fqu: &str) -> RegistrarResult<()> {
        self.tree(category)?.remove(fqu.as_bytes())?;
        Ok(())
    }

    pub fn add_error_message(&self, category: Category, fqu: &str, message: impl Into<String>) -> RegistrarResult<()> {
        let tree = self.tree(category)?;
        let Some(bytes) = tree.get(fqu.as_bytes())? else {
            return Err(RegistrarError::InconsistentQueue(format!(
                "no {category} row for {fqu} to attach an error to"
            )));
        };
        let mut entry: QueueEntry = bincode::deserialize(&bytes)?;
        entry.error = Some(message.into());
        let bytes = bincode::serialize(&entry)?;
        tree.insert(fqu.as_bytes(), bytes)?;
        Ok(())
    }

    /// Drop preorder rows older than `max_age_confirmations`' worth of
    /// polling that never got picked up by `RegisterPreorders` — the
    /// underlying preorder transaction's window to register has expired
    /// on-chain. Mirrors the original `cleanup_preorder_queue`.
    pub fn cleanup_preorder_expired(&self, max_confirmations: u32) -> RegistrarResult<Vec<String>> {
        let mut expired = Vec::new();
        for entry in self.scan(Category::Preorder)? {
            if entry.confirmations >= max_confirmations {
                self.remove(Category::Preorder, &entry.fqu)?;
                expired.push(entry.fqu);
            }
        }
        Ok(expired)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn open_temp() -> (tempfile::TempDir, Queue) {
        let dir = tempfile::tempdir().unwrap();
        let queue = Queue::open(dir.path()).unwrap();
        (dir, queue)
    }

    #[test]
    fn append_then_contains_then_find() {
        let (_dir, queue) = open_temp();
        let entry = QueueEntry::new("alice.id", Category::Preorder);
        queue.append(entry.clone()).unwrap();
        assert!(queue.contains(Category::Preorder, "alice.id").unwrap());
        assert_eq!(queue.find(Category::Preorder, "alice.id").unwrap(), Some(entry));
    }

    #[test]
    fn append_twice_is_already_queued() {
        let (_dir, queue) = open_temp();
        queue.append(QueueEntry::new("alice.id", Category::Preorder)).unwrap();
        let err = queue
            .append(QueueEntry::new("alice.id", Category::Preorder))
            .unwrap_err();
        assert!(matches!(err, RegistrarError::AlreadyQueued));
    }

    #[test]
    fn categories_are_independent() {
        let (_dir, queue) = open_temp();
        queue.append(QueueEntry::new("alice.id", Category::Preorder)).unwrap();
        queue.append(QueueEntry::new("alice.id", Category::Register)).unwrap();
        assert!(queue.contains(Category::Preorder, "alice.id").unwrap());
        assert!(queue.contains(Category::Register, "alice.id").unwrap());
    }

    #[test]
    fn remove_all_clears_every_category() {
        let (_dir, queue) = open_temp();
        queue.append(QueueEntry::new("alice.id", Category::Preorder)).unwrap();
        queue.append(QueueEntry::new("alice.id", Category::Register)).unwrap();
        queue.remove_all("alice.id").unwrap();
        assert!(!queue.contains(Category::Preorder, "alice.id").unwrap());
        assert!(!queue.contains(Category::Register, "alice.id").unwrap());
    }

    #[test]
    fn cleanup_preorder_expired_removes_only_stale_rows() {
        let (_dir, queue) = open_temp();
        let mut fresh = QueueEntry::new("alice.id", Category::Preorder);
        fresh.confirmations = 1;
        let mut stale = QueueEntry::new("bob.id", Category::Preorder);
        stale.confirmations = 10;
        queue.append(fresh).unwrap();
        queue.append(stale).unwrap();

        let expired = queue.cleanup_preorder_expired(10).unwrap();
        assert_eq!(expired, vec!["bob.id".to_string()]);
        assert!(queue.contains(Category::Preorder, "alice.id").unwrap());
        assert!(!queue.contains(Category::Preorder, "bob.id").unwrap());
    }
}
