use std::sync::Arc;

use name_registrar::adapters::fakes::{NullChainClient, NullPeerDirectory, NullStorageDriver};
use name_registrar::adapters::{ChainClient, PeerDirectory, StorageDriver};
use name_registrar::config::Config;
use name_registrar::crypto::KeyInfo;
use name_registrar::engine::Engine;
use name_registrar::error::RegistrarError;

const SAMPLE_PUBKEY: &str = "0479be667ef9dcbbac55a06295ce870b07029bfcdb2dce28d959f2815b16f81798483ada7726a3c4655da4fbfc0e1108a8fd17b448a68554199c47d08ffb10d4b8";

fn adapters() -> (Arc<dyn ChainClient>, Arc<dyn PeerDirectory>, Arc<dyn StorageDriver>) {
    (
        Arc::new(NullChainClient::default()),
        Arc::new(NullPeerDirectory::default()),
        Arc::new(NullStorageDriver::default()),
    )
}

async fn running_engine(dir: &std::path::Path) -> Arc<Engine> {
    let config = Config {
        dir_path: dir.to_path_buf(),
        skip_default_peer: true,
        poll_interval_secs: 3600,
        ..Config::default()
    };
    let (chain, peers, storage) = adapters();
    Engine::initialize(config, chain, peers, storage).await.unwrap()
}

/// A second engine on the same directory must fail to start while the
/// first is running — the singleton lockfile invariant (spec §4.1).
#[tokio::test]
async fn only_one_engine_per_directory() {
    let dir = tempfile::tempdir().unwrap();
    let engine = running_engine(dir.path()).await;

    let config = Config {
        dir_path: dir.path().to_path_buf(),
        ..Config::default()
    };
    let (chain, peers, storage) = adapters();
    let err = Engine::initialize(config, chain, peers, storage).await.unwrap_err();
    assert!(matches!(err, RegistrarError::AlreadyRunning(_)));

    engine.shutdown().await;
}

/// Once released, the same directory can be reused by a fresh engine.
#[tokio::test]
async fn lockfile_released_on_shutdown_allows_restart() {
    let dir = tempfile::tempdir().unwrap();
    let engine = running_engine(dir.path()).await;
    engine.shutdown().await;

    let engine2 = running_engine(dir.path()).await;
    engine2.shutdown().await;
}

/// Preordering the same name twice must fail the second time: the
/// uniqueness invariant on in-flight operations (spec §3 invariant,
/// spec §8 idempotence laws).
#[tokio::test]
async fn preorder_uniqueness_invariant() {
    let dir = tempfile::tempdir().unwrap();
    let engine = running_engine(dir.path()).await;

    engine
        .wallet
        .set_wallet(
            KeyInfo::singlesig("aa").unwrap(),
            KeyInfo::singlesig("bb").unwrap(),
            "pay1",
            "own1",
            "cc",
            SAMPLE_PUBKEY,
        )
        .unwrap();

    engine.issuer.preorder("alice.id", 5000, None, None, None).await.unwrap();
    let err = engine
        .issuer
        .preorder("alice.id", 5000, None, None, None)
        .await
        .unwrap_err();
    assert!(matches!(err, RegistrarError::AlreadyQueued));

    engine.shutdown().await;
}

/// An update for a name that was never registered to this wallet's owner
/// address must be rejected: register-implies-preorder-style dependency
/// carried forward to update/transfer (spec §8).
#[tokio::test]
async fn update_requires_prior_registration() {
    let dir = tempfile::tempdir().unwrap();
    let engine = running_engine(dir.path()).await;

    engine
        .wallet
        .set_wallet(
            KeyInfo::singlesig("aa").unwrap(),
            KeyInfo::singlesig("bb").unwrap(),
            "pay1",
            "own1",
            "cc",
            SAMPLE_PUBKEY,
        )
        .unwrap();

    let err = engine
        .issuer
        .update("alice.id", Some("zonefile-body"), None, None, None, 6)
        .await
        .unwrap_err();
    assert!(matches!(err, RegistrarError::NotPreordered));

    engine.shutdown().await;
}

/// Calling any issuer before a wallet has been set must report
/// `WalletLocked`, never silently proceed.
#[tokio::test]
async fn operations_require_a_wallet() {
    let dir = tempfile::tempdir().unwrap();
    let engine = running_engine(dir.path()).await;

    assert!(matches!(
        engine.issuer.preorder("alice.id", 5000, None, None, None).await.unwrap_err(),
        RegistrarError::WalletLocked
    ));
    assert!(matches!(
        engine.issuer.renew("alice.id", 5000).await.unwrap_err(),
        RegistrarError::WalletLocked
    ));

    engine.shutdown().await;
}
