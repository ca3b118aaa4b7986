use std::path::PathBuf;

use serde::{Deserialize, Serialize};

#[cfg(feature = "cli")]
use clap::Parser;

/// Default directory the registrar stores its queue, lockfile and logs in.
pub const DEFAULT_DIR_PATH: &str = ".registrar";

/// Lockfile name within the configured directory.
pub const LOCKFILE_NAME: &str = "registrar.lock";

/// Fallback atlas/peer node used when neither the configuration nor the
/// chain's own peer list name one, skippable under `skip_default_peer`.
///
/// This mirrors the original registrar's hard-coded fallback node, renamed
/// away from any real production hostname.
pub const DEFAULT_PEER_NODE: &str = "seed.nameregistry.example:16264";

fn default_dir_path() -> PathBuf {
    PathBuf::from(DEFAULT_DIR_PATH)
}

fn default_poll_interval_secs() -> u64 {
    60
}

fn default_max_poll_interval_secs() -> u64 {
    600
}

fn default_api_bind_address() -> String {
    "127.0.0.1:6270".to_string()
}

/// Flat configuration for the registration pipeline, parsed from either the
/// CLI (when the `cli` feature is enabled) or a config file loaded with
/// serde, exactly as `tos_wallet::config::Config` is parsed.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "cli", derive(Parser))]
#[cfg_attr(feature = "cli", command(name = "registrar", about = "Name registration pipeline engine"))]
pub struct Config {
    /// Directory holding the lockfile, the durable queue and log output.
    #[cfg_attr(feature = "cli", arg(long, default_value = DEFAULT_DIR_PATH))]
    #[serde(default = "default_dir_path")]
    pub dir_path: PathBuf,

    /// Base poll interval, in seconds, between pipeline worker cycles
    /// when nothing is failing.
    #[cfg_attr(feature = "cli", arg(long, default_value_t = default_poll_interval_secs()))]
    #[serde(default = "default_poll_interval_secs")]
    pub poll_interval_secs: u64,

    /// Ceiling the full-jitter exponential backoff is clamped to.
    #[cfg_attr(feature = "cli", arg(long, default_value_t = default_max_poll_interval_secs()))]
    #[serde(default = "default_max_poll_interval_secs")]
    pub max_poll_interval_secs: u64,

    /// Configured chain node endpoint, passed through to the `ChainClient`
    /// implementation the embedder supplies; opaque to this crate.
    #[cfg_attr(feature = "cli", arg(long))]
    pub chain_node: Option<String>,

    /// Configured atlas/peer node, unioned with the adapter's own reported
    /// peer list and the hard-coded default at replication time.
    #[cfg_attr(feature = "cli", arg(long))]
    pub peer_node: Option<String>,

    /// Skip unioning in `DEFAULT_PEER_NODE` — set by integration tests so
    /// they don't reach out to a node that doesn't exist.
    #[cfg_attr(feature = "cli", arg(long))]
    #[serde(default)]
    pub skip_default_peer: bool,

    /// Bind address for the informational `/state` HTTP endpoint.
    #[cfg_attr(feature = "cli", arg(long, default_value = "127.0.0.1:6270"))]
    #[serde(default = "default_api_bind_address")]
    pub api_bind_address: String,

    /// Disable the informational `/state` HTTP endpoint entirely.
    #[cfg_attr(feature = "cli", arg(long))]
    #[serde(default)]
    pub no_api_server: bool,

    #[cfg_attr(feature = "cli", command(flatten))]
    #[serde(default)]
    pub log: LogConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            dir_path: default_dir_path(),
            poll_interval_secs: default_poll_interval_secs(),
            max_poll_interval_secs: default_max_poll_interval_secs(),
            chain_node: None,
            peer_node: None,
            skip_default_peer: false,
            api_bind_address: default_api_bind_address(),
            no_api_server: false,
            log: LogConfig::default(),
        }
    }
}

impl Config {
    pub fn lockfile_path(&self) -> PathBuf {
        self.dir_path.join(LOCKFILE_NAME)
    }

    pub fn queue_path(&self) -> PathBuf {
        self.dir_path.join("queue.sled")
    }
}

/// Logging configuration, mirroring `tos_wallet::config::LogConfig`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "cli", derive(clap::Args))]
pub struct LogConfig {
    /// Set the log level (error, warn, info, debug, trace).
    #[cfg_attr(feature = "cli", arg(long, default_value = "info"))]
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Disable ANSI color codes in log output.
    #[cfg_attr(feature = "cli", arg(long))]
    #[serde(default)]
    pub disable_log_color: bool,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            disable_log_color: false,
        }
    }
}
