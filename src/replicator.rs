use std::collections::HashSet;
use std::sync::Arc;

use log::{info, warn};
use parking_lot::Mutex;

use crate::adapters::{ChainClient, PeerDirectory, StorageDriver};
use crate::config::{Config, DEFAULT_PEER_NODE};
use crate::crypto::{sha256_hex, token_file_id};
use crate::error::{RegistrarError, RegistrarResult};
use crate::zonefile::parse_user_zonefile;

/// Replicates a name's zone file to the peer fleet and its token file (if
/// any) to the storage backend. Idempotent across retries via two
/// in-memory dedup sets private to this replicator instance, exactly as
/// the original registrar keeps `replicated_zonefiles` /
/// `replicated_token_file_hashes` lists private to the worker process.
pub struct Replicator {
    chain: Arc<dyn ChainClient>,
    peers: Arc<dyn PeerDirectory>,
    storage: Arc<dyn StorageDriver>,
    peer_node: Option<String>,
    skip_default_peer: bool,
    replicated_zonefiles: Mutex<HashSet<(String, String)>>,
    replicated_token_files: Mutex<HashSet<String>>,
}

impl Replicator {
    pub fn new(
        chain: Arc<dyn ChainClient>,
        peers: Arc<dyn PeerDirectory>,
        storage: Arc<dyn StorageDriver>,
        config: &Config,
    ) -> Self {
        Self {
            chain,
            peers,
            storage,
            peer_node: config.peer_node.clone(),
            skip_default_peer: config.skip_default_peer,
            replicated_zonefiles: Mutex::new(HashSet::new()),
            replicated_token_files: Mutex::new(HashSet::new()),
        }
    }

    async fn peer_list(&self) -> RegistrarResult<Vec<String>> {
        let mut peers: Vec<String> = Vec::new();
        if let Some(p) = &self.peer_node {
            peers.push(p.clone());
        }
        let discovered = self
            .peers
            .known_peers()
            .await
            .map_err(|e| RegistrarError::TransientChain(e.to_string()))?;
        for peer in discovered {
            if !peers.contains(&peer) {
                peers.push(peer);
            }
        }
        if !self.skip_default_peer && !peers.contains(&DEFAULT_PEER_NODE.to_string()) {
            peers.push(DEFAULT_PEER_NODE.to_string());
        }
        Ok(peers)
    }

    /// Replicate `fqu`'s zone file (and `token_file`, if the zone file is a
    /// recognised user zone file carrying one) to every known peer and the
    /// storage backend.
    ///
    /// A `None` zone file is a pure deletion: nothing to replicate, and
    /// this short-circuits to success without contacting any peer — the
    /// same shortcut `replicate_name_data` takes when `zonefile is None`.
    pub async fn replicate(
        &self,
        fqu: &str,
        zonefile: Option<&str>,
        token_file: Option<&str>,
    ) -> RegistrarResult<()> {
        let Some(zonefile) = zonefile else {
            return Ok(());
        };

        let zonefile_hash = sha256_hex(zonefile.as_bytes());

        let on_chain_hash = self
            .chain
            .name_value_hash(fqu)
            .await
            .map_err(|e| RegistrarError::TransientChain(e.to_string()))?;
        if on_chain_hash.as_deref() != Some(zonefile_hash.as_str()) {
            // The update transaction hasn't confirmed yet; nothing to push.
            return Err(RegistrarError::TransientChain(format!(
                "{fqu}: on-chain value hash not yet {zonefile_hash}"
            )));
        }

        let dedup_key = (fqu.to_string(), zonefile_hash.clone());
        if !self.replicated_zonefiles.lock().contains(&dedup_key) {
            for peer in self.peer_list().await? {
                match self.peers.push_zonefile(&peer, fqu, zonefile).await {
                    Ok(()) => info!("replicated zonefile for {fqu} to {peer}"),
                    Err(e) => warn!("failed to replicate {fqu} to {peer}: {e}"),
                }
            }
            self.replicated_zonefiles.lock().insert(dedup_key);
        }

        if parse_user_zonefile(zonefile).is_some() {
            if let Some(token_file) = token_file {
                let id = token_file_id(fqu, &zonefile_hash, token_file);
                if !self.replicated_token_files.lock().contains(&id) {
                    self.storage
                        .put_token_file(fqu, &id, token_file)
                        .await
                        .map_err(|e| RegistrarError::ReplicationFailed(e.to_string()))?;
                    self.replicated_token_files.lock().insert(id);
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

    fn config() -> Config {
        let mut c = Config::default();
        c.skip_default_peer = true;
        c
    }

    #[tokio::test]
    async fn none_zonefile_is_a_noop_success() {
        let chain = Arc::new(NullChainClient::default());
        let peers = Arc::new(NullPeerDirectory::default());
        let storage = Arc::new(NullStorageDriver::default());
        let replicator = Replicator::new(chain, peers, storage, &config());
        replicator.replicate("alice.id", None, None).await.unwrap();
    }

    #[tokio::test]
    async fn mismatched_on_chain_hash_is_transient() {
        let chain = Arc::new(NullChainClient::default());
        let peers = Arc::new(NullPeerDirectory::default());
        let storage = Arc::new(NullStorageDriver::default());
        let replicator = Replicator::new(chain, peers, storage, &config());
        let err = replicator
            .replicate("alice.id", Some("zonefile-body"), None)
            .await
            .unwrap_err();
        assert!(matches!(err, RegistrarError::TransientChain(_)));
    }

    #[tokio::test]
    async fn matching_hash_replicates_to_peers() {
        let chain = Arc::new(NullChainClient::default());
        let zonefile = "zonefile with no uri record";
        let hash = sha256_hex(zonefile.as_bytes());
        chain
            .value_hashes
            .lock()
            .await
            .insert("alice.id".to_string(), hash);
        let peers = Arc::new(NullPeerDirectory {
            peers: vec!["peer-a:1234".to_string()],
            ..Default::default()
        });
        let storage = Arc::new(NullStorageDriver::default());
        let replicator = Replicator::new(chain, peers.clone(), storage, &config());
        replicator.replicate("alice.id", Some(zonefile), None).await.unwrap();
        assert_eq!(peers.pushed.lock().await.len(), 1);
    }

    #[tokio::test]
    async fn user_zonefile_replicates_token_file_to_storage() {
        let chain = Arc::new(NullChainClient::default());
        let zonefile = "_https._tcp URI 10 1 \"https://example.com/profile.json\"\n";
        let hash = sha256_hex(zonefile.as_bytes());
        chain
            .value_hashes
            .lock()
            .await
            .insert("alice.id".to_string(), hash);
        let peers = Arc::new(NullPeerDirectory::default());
        let storage = Arc::new(NullStorageDriver::default());
        let replicator = Replicator::new(chain, peers, storage.clone(), &config());
        replicator
            .replicate("alice.id", Some(zonefile), Some("token-file-body"))
            .await
            .unwrap();
        assert_eq!(storage.stored.lock().await.len(), 1);
    }
}
