use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use log::info;

use name_registrar::adapters::{ChainClient, PeerDirectory, StorageDriver};
use name_registrar::config::Config;
use name_registrar::engine::Engine;
use name_registrar::logging;

/// Placeholder adapters used when no embedder has wired in real ones. A
/// production deployment links this binary against its own chain client,
/// peer directory and storage driver; this crate only defines the traits
/// and the pipeline that drives them (see `SPEC_FULL.md` §1).
mod unconfigured {
    use super::*;
    use async_trait::async_trait;

    pub struct Unconfigured;

    #[async_trait]
    impl ChainClient for Unconfigured {
        async fn name_owner(&self, _fqu: &str) -> anyhow::Result<Option<String>> {
            anyhow::bail!("no chain client configured")
        }
        async fn name_value_hash(&self, _fqu: &str) -> anyhow::Result<Option<String>> {
            anyhow::bail!("no chain client configured")
        }
        async fn broadcast_preorder(
            &self,
            _fqu: &str,
            _payment_address: &str,
            _cost_sats: u64,
        ) -> anyhow::Result<String> {
            anyhow::bail!("no chain client configured")
        }
        async fn broadcast_register(&self, _fqu: &str, _owner_address: &str) -> anyhow::Result<String> {
            anyhow::bail!("no chain client configured")
        }
        async fn broadcast_update(&self, _fqu: &str, _zonefile_hash: &str) -> anyhow::Result<String> {
            anyhow::bail!("no chain client configured")
        }
        async fn broadcast_transfer(&self, _fqu: &str, _new_owner: &str) -> anyhow::Result<String> {
            anyhow::bail!("no chain client configured")
        }
        async fn broadcast_renew(&self, _fqu: &str, _renewal_fee: u64) -> anyhow::Result<String> {
            anyhow::bail!("no chain client configured")
        }
        async fn broadcast_revoke(&self, _fqu: &str) -> anyhow::Result<String> {
            anyhow::bail!("no chain client configured")
        }
        async fn confirmations(&self, _tx_hash: &str) -> anyhow::Result<u32> {
            Ok(0)
        }
    }

    #[async_trait]
    impl PeerDirectory for Unconfigured {
        async fn known_peers(&self) -> anyhow::Result<Vec<String>> {
            Ok(Vec::new())
        }
        async fn push_zonefile(&self, _peer: &str, _fqu: &str, _zonefile: &str) -> anyhow::Result<()> {
            anyhow::bail!("no peer directory configured")
        }
    }

    #[async_trait]
    impl StorageDriver for Unconfigured {
        async fn put_token_file(&self, _fqu: &str, _token_file_id: &str, _payload: &str) -> anyhow::Result<()> {
            anyhow::bail!("no storage driver configured")
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::parse();
    logging::init(&config.log);

    let chain: Arc<dyn ChainClient> = Arc::new(unconfigured::Unconfigured);
    let peers: Arc<dyn PeerDirectory> = Arc::new(unconfigured::Unconfigured);
    let storage: Arc<dyn StorageDriver> = Arc::new(unconfigured::Unconfigured);

    let engine = Engine::initialize(config.clone(), chain, peers, storage)
        .await
        .context("failed to initialize registration pipeline engine")?;

    info!("registrar engine running, waiting for shutdown signal");

    #[cfg(feature = "api_server")]
    {
        if !config.no_api_server {
            let api_engine = engine.clone();
            let bind_address = config.api_bind_address.clone();
            std::thread::spawn(move || {
                let result = actix_web::rt::System::new()
                    .block_on(name_registrar::api::serve(api_engine, &bind_address));
                if let Err(e) = result {
                    log::error!("state API server exited: {e}");
                }
            });
        }
    }

    tokio::signal::ctrl_c()
        .await
        .context("failed to listen for shutdown signal")?;

    engine.shutdown().await;
    Ok(())
}
