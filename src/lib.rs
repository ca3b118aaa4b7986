pub mod adapters;
pub mod config;
pub mod crypto;
pub mod engine;
pub mod error;
pub mod issuer;
pub mod logging;
pub mod names;
pub mod queue;
pub mod replicator;
pub mod wallet;
pub mod worker;
pub mod zonefile;

#[cfg(feature = "api_server")]
pub mod api;
