use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use log::{debug, info, warn};
use rand::Rng;
use tokio::task::JoinHandle;
use tokio::time::{sleep, Duration};

use crate::adapters::ChainClient;
use crate::config::Config;
use crate::crypto::sha256_hex;
use crate::error::RegistrarError;
use crate::issuer::Issuer;
use crate::queue::{Category, Queue, QueueEntry};
use crate::replicator::Replicator;
use crate::wallet::WalletCache;

/// A lightweight stop switch handed back to `Engine::shutdown`. Checked at
/// 1-second granularity during backoff sleeps so a shutdown request is
/// never left waiting out a multi-minute backoff window.
#[derive(Clone)]
#[derive(Debug)]
pub struct WorkerHandle {
    stop: Arc<AtomicBool>,
}

impl WorkerHandle {
    pub fn stop(&self) {
        self.stop.store(true, Ordering::SeqCst);
    }
}

/// Confirmation threshold the worker waits for before clearing a row or
/// promoting a preorder. Chain-specific, but fixed here rather than made
/// configurable because the spec treats it as an engine constant, not a
/// tunable.
const REQUIRED_CONFIRMATIONS: u32 = 6;

/// Preorder rows older than this many confirmations without ever being
/// promoted to a register row are assumed to have fallen outside their
/// on-chain registration window and are dropped.
const PREORDER_EXPIRY_CONFIRMATIONS: u32 = 144;

pub struct PipelineWorker {
    config: Config,
    queue: Arc<Queue>,
    wallet: Arc<WalletCache>,
    issuer: Arc<Issuer>,
    chain: Arc<dyn ChainClient>,
    replicator: Arc<Replicator>,
}

impl PipelineWorker {
    pub fn new(
        config: Config,
        queue: Arc<Queue>,
        wallet: Arc<WalletCache>,
        issuer: Arc<Issuer>,
        chain: Arc<dyn ChainClient>,
        replicator: Arc<Replicator>,
    ) -> Self {
        Self {
            config,
            queue,
            wallet,
            issuer,
            chain,
            replicator,
        }
    }

    pub fn spawn(self) -> (WorkerHandle, JoinHandle<()>) {
        let stop = Arc::new(AtomicBool::new(false));
        let handle = WorkerHandle { stop: stop.clone() };
        let join = tokio::spawn(async move {
            self.run(stop).await;
        });
        (handle, join)
    }

    async fn run(self, stop: Arc<AtomicBool>) {
        let mut poll_interval = self.config.poll_interval_secs;
        let max_interval = self.config.max_poll_interval_secs;

        loop {
            if stop.load(Ordering::SeqCst) {
                return;
            }

            // Step 0: wallet gate. Nothing else in the cycle can proceed
            // without an owner address to register names against.
            if !self.wallet.is_set() {
                if !self.wait(&stop, 1).await {
                    return;
                }
                continue;
            }

            match self.run_cycle().await {
                Ok(()) => {
                    poll_interval = self.config.poll_interval_secs;
                }
                Err(e) => {
                    if !e.is_transient() {
                        warn!("pipeline worker stopping: inconsistent queue: {e}");
                        return;
                    }
                    warn!("pipeline cycle failed, backing off: {e}");
                    // Full-jitter exponential backoff: next = 2*prev + rand()*prev.
                    let jitter: f64 = rand::thread_rng().gen_range(0.0..1.0);
                    let next = (poll_interval as f64) * (2.0 + jitter);
                    poll_interval = (next as u64).min(max_interval).max(1);
                }
            }

            if !self.wait(&stop, poll_interval).await {
                return;
            }
        }
    }

    /// Sleep `seconds`, in 1-second increments, returning `false` the
    /// moment `stop` is observed so a shutdown isn't stuck behind a long
    /// backoff window.
    async fn wait(&self, stop: &Arc<AtomicBool>, seconds: u64) -> bool {
        for _ in 0..seconds.max(1) {
            if stop.load(Ordering::SeqCst) {
                return false;
            }
            sleep(Duration::from_secs(1)).await;
        }
        true
    }

    async fn run_cycle(&self) -> Result<(), crate::error::RegistrarError> {
        let mut failed_names: HashSet<String> = HashSet::new();

        self.register_preorders().await?;
        self.set_zonefiles().await?;
        self.replicate_updates(&mut failed_names).await;
        self.transfer_names(&failed_names).await?;
        self.replicate_name_imports(&failed_names).await;
        self.clear_confirmed().await?;

        Ok(())
    }

    /// Step 1: promote any preorder row that has enough confirmations to a
    /// register transaction, and drop preorder rows that expired before
    /// ever being picked up. A preorder that turns out to already be
    /// queued or registered is dropped rather than retried — there's
    /// nothing further this row can accomplish.
    async fn register_preorders(&self) -> Result<(), crate::error::RegistrarError> {
        for entry in self.queue.find_accepted(Category::Preorder, REQUIRED_CONFIRMATIONS)? {
            match self.issuer.register(&entry).await {
                Ok(outcome) => debug!(
                    "promoted preorder {} to register, tx {:?}",
                    entry.fqu, outcome.transaction_hash
                ),
                Err(e @ (RegistrarError::AlreadyQueued | RegistrarError::AlreadyRegistered)) => {
                    warn!("dropping preorder for {}: {e}", entry.fqu);
                    self.queue.remove(Category::Preorder, &entry.fqu)?;
                }
                Err(e) if e.is_transient() => {
                    warn!("failed to register preordered name {}: {e}", entry.fqu);
                }
                Err(e) => return Err(e),
            }
        }
        let expired = self
            .queue
            .cleanup_preorder_expired(PREORDER_EXPIRY_CONFIRMATIONS)?;
        for fqu in expired {
            warn!("preorder for {fqu} expired before registration");
        }
        Ok(())
    }

    /// Step 2: once a register row has confirmed, synthesize and broadcast
    /// the update transaction for the zonefile/token-file/transfer_address
    /// carried on it since `preorder`, enqueue the new `update` row, and
    /// drop the `register` row. A register row carrying no zonefile has
    /// nothing further to do and is simply dropped.
    async fn set_zonefiles(&self) -> Result<(), crate::error::RegistrarError> {
        for entry in self.queue.find_accepted(Category::Register, REQUIRED_CONFIRMATIONS)? {
            let Some(zonefile) = entry.zonefile.clone() else {
                self.queue.remove(Category::Register, &entry.fqu)?;
                continue;
            };
            let zonefile_hash = entry
                .zonefile_hash
                .clone()
                .unwrap_or_else(|| sha256_hex(zonefile.as_bytes()));

            match self.chain.broadcast_update(&entry.fqu, &zonefile_hash).await {
                Ok(tx_hash) => {
                    let mut update_entry = QueueEntry::new(entry.fqu.clone(), Category::Update);
                    update_entry.tx_hash = Some(tx_hash);
                    update_entry.zonefile = Some(zonefile);
                    update_entry.zonefile_hash = Some(zonefile_hash);
                    update_entry.token_file = entry.token_file.clone();
                    update_entry.transfer_address = entry.transfer_address.clone();
                    self.queue.append(update_entry)?;
                    self.queue.remove(Category::Register, &entry.fqu)?;
                    info!("broadcast zonefile update for {}", entry.fqu);
                }
                Err(e) => warn!("failed to broadcast zonefile update for {}: {e}", entry.fqu),
            }
        }
        Ok(())
    }

    /// Step 3: replicate every confirmed update row's zone file (and token
    /// file, if any) to the peer fleet and storage backend. Names whose
    /// replication fails are recorded in `failed_names` so steps 4 and 5
    /// skip them this cycle rather than compounding the failure.
    async fn replicate_updates(&self, failed_names: &mut HashSet<String>) {
        let Ok(rows) = self.queue.scan(Category::Update) else {
            return;
        };
        for entry in rows {
            match self
                .replicator
                .replicate(&entry.fqu, entry.zonefile.as_deref(), entry.token_file.as_deref())
                .await
            {
                Ok(()) => debug!("replicated update data for {}", entry.fqu),
                Err(e) => {
                    warn!("failed to replicate update data for {}: {e}", entry.fqu);
                    failed_names.insert(entry.fqu);
                }
            }
        }
    }

    /// Step 4: the `update → transfer` transition (Invariant 4). Every
    /// confirmed `update` row carrying a `transfer_address` is eligible to
    /// transfer; one with no `transfer_address` was never meant to move
    /// and its row is simply dropped. If the name is already owned by the
    /// transfer destination on-chain, "declare victory" and drop the row
    /// without re-broadcasting — the same idempotence shortcut the
    /// original registrar takes.
    async fn transfer_names(&self, failed_names: &HashSet<String>) -> Result<(), crate::error::RegistrarError> {
        for entry in self.queue.find_accepted(Category::Update, REQUIRED_CONFIRMATIONS)? {
            if failed_names.contains(&entry.fqu) {
                continue;
            }
            let Some(destination) = entry.transfer_address.clone() else {
                self.queue.remove(Category::Update, &entry.fqu)?;
                continue;
            };
            match self.chain.name_owner(&entry.fqu).await {
                Ok(Some(owner)) if owner == destination => {
                    debug!("{} already transferred to {destination}, declaring victory", entry.fqu);
                    self.queue.remove(Category::Update, &entry.fqu)?;
                }
                Ok(_) => match self.chain.broadcast_transfer(&entry.fqu, &destination).await {
                    Ok(tx_hash) => {
                        let mut transfer_entry = QueueEntry::new(entry.fqu.clone(), Category::Transfer);
                        transfer_entry.tx_hash = Some(tx_hash);
                        transfer_entry.transfer_address = Some(destination);
                        self.queue.append(transfer_entry)?;
                        self.queue.remove(Category::Update, &entry.fqu)?;
                        info!("broadcast transfer for {}", entry.fqu);
                    }
                    Err(e) => warn!("failed to broadcast transfer for {}: {e}", entry.fqu),
                },
                Err(e) => warn!("failed to query owner for {}: {e}", entry.fqu),
            }
        }
        Ok(())
    }

    /// Step 5: replicate name-import rows not already skipped by step 3,
    /// same replication algorithm as an update.
    async fn replicate_name_imports(&self, failed_names: &HashSet<String>) {
        let Ok(rows) = self.queue.scan(Category::NameImport) else {
            return;
        };
        for entry in rows {
            if failed_names.contains(&entry.fqu) {
                continue;
            }
            if let Err(e) = self
                .replicator
                .replicate(&entry.fqu, entry.zonefile.as_deref(), entry.token_file.as_deref())
                .await
            {
                warn!("failed to replicate name-import data for {}: {e}", entry.fqu);
            }
        }
    }

    /// Step 6: drop any row in a terminal category once its transaction
    /// has crossed the confirmation threshold. `preorder`/`register`/
    /// `update` rows are excluded — they only ever leave their category
    /// via the precondition chain in steps 1/2/4 (Invariant 3).
    async fn clear_confirmed(&self) -> Result<(), crate::error::RegistrarError> {
        for category in Category::CLEARABLE {
            for entry in self.queue.scan(category)? {
                if entry.confirmations >= REQUIRED_CONFIRMATIONS {
                    self.queue.remove(category, &entry.fqu)?;
                    info!("cleared confirmed {category} row for {}", entry.fqu);
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::fakes::{NullChainClient, NullPeerDirectory, NullStorageDriver};
    use crate::crypto::KeyInfo;

    fn sample_pubkey() -> &'static str {
        "04\
         79be667ef9dcbbac55a06295ce870b07029bfcdb2dce28d959f2815b16f81798\
         483ada7726a3c4655da4fbfc0e1108a8fd17b448a68554199c47d08ffb10d4b8"
    }

    fn build() -> (tempfile::TempDir, PipelineWorker) {
        let dir = tempfile::tempdir().unwrap();
        let config = Config {
            dir_path: dir.path().to_path_buf(),
            skip_default_peer: true,
            ..Config::default()
        };
        let queue = Arc::new(Queue::open(config.queue_path()).unwrap());
        let wallet = Arc::new(WalletCache::new());
        wallet
            .set_wallet(
                KeyInfo::singlesig("aa").unwrap(),
                KeyInfo::singlesig("bb").unwrap(),
                "pay1",
                "own1",
                "cc",
                sample_pubkey(),
            )
            .unwrap();
        let chain: Arc<dyn ChainClient> = Arc::new(NullChainClient::default());
        let issuer = Arc::new(Issuer::new(queue.clone(), wallet.clone(), chain.clone()));
        let peers = Arc::new(NullPeerDirectory::default());
        let storage = Arc::new(NullStorageDriver::default());
        let replicator = Arc::new(Replicator::new(chain.clone(), peers, storage, &config));
        let worker = PipelineWorker::new(config, queue, wallet, issuer, chain, replicator);
        (dir, worker)
    }

    #[tokio::test]
    async fn clear_confirmed_removes_fully_confirmed_rows() {
        let (_dir, worker) = build();
        let mut entry = QueueEntry::new("alice.id", Category::Renew);
        entry.confirmations = REQUIRED_CONFIRMATIONS;
        worker.queue.append(entry).unwrap();

        worker.clear_confirmed().await.unwrap();
        assert!(!worker.queue.contains(Category::Renew, "alice.id").unwrap());
    }

    #[tokio::test]
    async fn clear_confirmed_keeps_rows_below_threshold() {
        let (_dir, worker) = build();
        let mut entry = QueueEntry::new("alice.id", Category::Renew);
        entry.confirmations = 1;
        worker.queue.append(entry).unwrap();

        worker.clear_confirmed().await.unwrap();
        assert!(worker.queue.contains(Category::Renew, "alice.id").unwrap());
    }

    #[tokio::test]
    async fn transfer_names_declares_victory_when_already_transferred() {
        let (_dir, worker) = build();
        worker
            .chain
            .broadcast_register("alice.id", "own1")
            .await
            .unwrap();
        worker
            .chain
            .broadcast_transfer("alice.id", "destination")
            .await
            .unwrap();
        let mut entry = QueueEntry::new("alice.id", Category::Update);
        entry.tx_hash = Some("update-tx-alice.id".to_string());
        entry.confirmations = REQUIRED_CONFIRMATIONS;
        entry.transfer_address = Some("destination".to_string());
        worker.queue.append(entry).unwrap();

        worker.transfer_names(&HashSet::new()).await.unwrap();
        assert!(!worker.queue.contains(Category::Update, "alice.id").unwrap());
        assert!(!worker.queue.contains(Category::Transfer, "alice.id").unwrap());
    }

    #[tokio::test]
    async fn transfer_names_broadcasts_and_transitions_update_to_transfer() {
        let (_dir, worker) = build();
        let mut entry = QueueEntry::new("alice.id", Category::Update);
        entry.tx_hash = Some("update-tx-alice.id".to_string());
        entry.confirmations = REQUIRED_CONFIRMATIONS;
        entry.transfer_address = Some("destination".to_string());
        worker.queue.append(entry).unwrap();

        worker.transfer_names(&HashSet::new()).await.unwrap();
        assert!(!worker.queue.contains(Category::Update, "alice.id").unwrap());
        assert!(worker.queue.contains(Category::Transfer, "alice.id").unwrap());
    }

    #[tokio::test]
    async fn register_preorders_drops_row_when_already_registered() {
        let (_dir, worker) = build();
        worker
            .chain
            .broadcast_register("alice.id", "own1")
            .await
            .unwrap();
        let mut entry = QueueEntry::new("alice.id", Category::Preorder);
        entry.tx_hash = Some("preorder-tx-alice.id".to_string());
        entry.confirmations = REQUIRED_CONFIRMATIONS;
        worker.queue.append(entry).unwrap();

        worker.register_preorders().await.unwrap();
        assert!(!worker.queue.contains(Category::Preorder, "alice.id").unwrap());
    }
}
