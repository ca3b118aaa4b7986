use std::path::PathBuf;

use thiserror::Error;

/// Errors surfaced by the registration pipeline.
///
/// Every variant is either something a caller of an operation issuer needs
/// to branch on (`WalletLocked`, `AlreadyQueued`, ...) or something the
/// pipeline worker uses to decide whether a failure should be absorbed into
/// the backoff loop or should stop the current cycle outright
/// (`is_transient`).
#[derive(Debug, Error)]
pub enum RegistrarError {
    #[error("wallet is not set")]
    WalletLocked,

    #[error("name is already queued for this operation")]
    AlreadyQueued,

    #[error("name is already registered")]
    AlreadyRegistered,

    #[error("name has not been preordered")]
    NotPreordered,

    #[error("failed to broadcast transaction: {0}")]
    BroadcastFailed(String),

    #[error("failed to replicate zone file or token file: {0}")]
    ReplicationFailed(String),

    #[error("transient chain error: {0}")]
    TransientChain(String),

    #[error("queue is in an inconsistent state: {0}")]
    InconsistentQueue(String),

    #[error("invalid name format: {0}")]
    InvalidName(String),

    #[error("update requires either zonefile_data or a precomputed zonefile_hash")]
    MissingZonefileData,

    #[error("lockfile held by another process (pid {0})")]
    AlreadyRunning(u32),

    #[error("i/o error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Queue(#[from] sled::Error),

    #[error(transparent)]
    Encoding(#[from] bincode::Error),
}

impl RegistrarError {
    /// True when the pipeline worker should absorb this failure into the
    /// backoff loop and keep going next cycle, rather than propagate it.
    ///
    /// Every kind is transient except a corrupt queue: an inconsistent
    /// queue can't be trusted to retry safely, so it stops the worker.
    pub fn is_transient(&self) -> bool {
        !matches!(self, RegistrarError::InconsistentQueue(_))
    }
}

pub type RegistrarResult<T> = Result<T, RegistrarError>;
