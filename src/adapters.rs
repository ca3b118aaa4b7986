use async_trait::async_trait;

/// On-chain facts and actions the pipeline needs, kept behind a trait
/// because the chain client itself is an out-of-scope collaborator (see
/// `SPEC_FULL.md` §1). Shaped like `tos_wallet::daemon_api::DaemonAPI`: a
/// thin async facade, one method per remote call, `anyhow::Result` return.
#[async_trait]
pub trait ChainClient: Send + Sync {
    /// Whether `fqu` is already registered on-chain, and if so, to whom.
    async fn name_owner(&self, fqu: &str) -> anyhow::Result<Option<String>>;

    /// The zone file hash currently recorded on-chain for `fqu`, if any.
    async fn name_value_hash(&self, fqu: &str) -> anyhow::Result<Option<String>>;

    /// Broadcast a preorder transaction for `cost_sats`, returning its
    /// transaction hash.
    async fn broadcast_preorder(&self, fqu: &str, payment_address: &str, cost_sats: u64) -> anyhow::Result<String>;

    /// Broadcast a register transaction, returning its transaction hash.
    async fn broadcast_register(&self, fqu: &str, owner_address: &str) -> anyhow::Result<String>;

    /// Broadcast an update transaction setting `zonefile_hash` for `fqu`.
    async fn broadcast_update(&self, fqu: &str, zonefile_hash: &str) -> anyhow::Result<String>;

    /// Broadcast a transfer transaction moving `fqu` to `new_owner`.
    async fn broadcast_transfer(&self, fqu: &str, new_owner: &str) -> anyhow::Result<String>;

    /// Broadcast a renewal transaction for `fqu`, paying `renewal_fee`.
    async fn broadcast_renew(&self, fqu: &str, renewal_fee: u64) -> anyhow::Result<String>;

    /// Broadcast a revocation transaction for `fqu`.
    async fn broadcast_revoke(&self, fqu: &str) -> anyhow::Result<String>;

    /// Confirmation count for a previously-broadcast transaction.
    async fn confirmations(&self, tx_hash: &str) -> anyhow::Result<u32>;
}

/// Peer discovery for zone file / token file replication, kept separate
/// from `ChainClient` because it talks to the peer-gossip fleet rather than
/// the chain itself (spec §4.5/§4.6).
#[async_trait]
pub trait PeerDirectory: Send + Sync {
    /// Peers this node currently knows about, beyond the configured node
    /// and the hard-coded default (`crate::config::DEFAULT_PEER_NODE`).
    async fn known_peers(&self) -> anyhow::Result<Vec<String>>;

    /// Push a zone file to `peer`. Idempotent from the caller's
    /// perspective: pushing the same zone file twice is not an error.
    async fn push_zonefile(&self, peer: &str, fqu: &str, zonefile: &str) -> anyhow::Result<()>;
}

/// Off-chain storage for token files (profile tokens), separate from the
/// peer-gossip `PeerDirectory` because token files live in a storage
/// backend (S3-alike, IPFS, etc.) rather than being gossiped.
#[async_trait]
pub trait StorageDriver: Send + Sync {
    async fn put_token_file(&self, fqu: &str, token_file_id: &str, payload: &str) -> anyhow::Result<()>;
}

/// Deterministic in-memory fakes for the pipeline worker's own tests,
/// grounded on the daemon test suite's "fake collaborator behind the
/// trait" shape.
#[cfg(any(test, feature = "test-support"))]
pub mod fakes {
    use super::*;
    use std::collections::HashMap;
    use tokio::sync::Mutex;

    #[derive(Default)]
    pub struct NullChainClient {
        pub owners: Mutex<HashMap<String, String>>,
        pub value_hashes: Mutex<HashMap<String, String>>,
        pub confirmations: Mutex<HashMap<String, u32>>,
    }

    #[async_trait]
    impl ChainClient for NullChainClient {
        async fn name_owner(&self, fqu: &str) -> anyhow::Result<Option<String>> {
            Ok(self.owners.lock().await.get(fqu).cloned())
        }

        async fn name_value_hash(&self, fqu: &str) -> anyhow::Result<Option<String>> {
            Ok(self.value_hashes.lock().await.get(fqu).cloned())
        }

        async fn broadcast_preorder(
            &self,
            fqu: &str,
            _payment_address: &str,
            _cost_sats: u64,
        ) -> anyhow::Result<String> {
            Ok(format!("preorder-tx-{fqu}"))
        }

        async fn broadcast_register(&self, fqu: &str, owner_address: &str) -> anyhow::Result<String> {
            self.owners
                .lock()
                .await
                .insert(fqu.to_string(), owner_address.to_string());
            Ok(format!("register-tx-{fqu}"))
        }

        async fn broadcast_update(&self, fqu: &str, zonefile_hash: &str) -> anyhow::Result<String> {
            self.value_hashes
                .lock()
                .await
                .insert(fqu.to_string(), zonefile_hash.to_string());
            Ok(format!("update-tx-{fqu}"))
        }

        async fn broadcast_transfer(&self, fqu: &str, new_owner: &str) -> anyhow::Result<String> {
            self.owners
                .lock()
                .await
                .insert(fqu.to_string(), new_owner.to_string());
            Ok(format!("transfer-tx-{fqu}"))
        }

        async fn broadcast_renew(&self, fqu: &str, _renewal_fee: u64) -> anyhow::Result<String> {
            Ok(format!("renew-tx-{fqu}"))
        }

        async fn broadcast_revoke(&self, fqu: &str) -> anyhow::Result<String> {
            self.owners.lock().await.remove(fqu);
            Ok(format!("revoke-tx-{fqu}"))
        }

        async fn confirmations(&self, tx_hash: &str) -> anyhow::Result<u32> {
            Ok(*self.confirmations.lock().await.get(tx_hash).unwrap_or(&0))
        }
    }

    #[derive(Default)]
    pub struct NullPeerDirectory {
        pub peers: Vec<String>,
        pub pushed: Mutex<Vec<(String, String)>>,
    }

    #[async_trait]
    impl PeerDirectory for NullPeerDirectory {
        async fn known_peers(&self) -> anyhow::Result<Vec<String>> {
            Ok(self.peers.clone())
        }

        async fn push_zonefile(&self, peer: &str, fqu: &str, _zonefile: &str) -> anyhow::Result<()> {
            self.pushed
                .lock()
                .await
                .push((peer.to_string(), fqu.to_string()));
            Ok(())
        }
    }

    #[derive(Default)]
    pub struct NullStorageDriver {
        pub stored: Mutex<HashMap<String, String>>,
    }

    #[async_trait]
    impl StorageDriver for NullStorageDriver {
        async fn put_token_file(&self, _fqu: &str, token_file_id: &str, payload: &str) -> anyhow::Result<()> {
            self.stored
                .lock()
                .await
                .insert(token_file_id.to_string(), payload.to_string());
            Ok(())
        }
    }
}
