use std::fs::{self, File};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use std::process;
use std::sync::Arc;

use log::{info, warn};
use tokio::sync::Mutex as AsyncMutex;
use tokio::task::JoinHandle;

use crate::adapters::{ChainClient, PeerDirectory, StorageDriver};
use crate::config::Config;
use crate::error::{RegistrarError, RegistrarResult};
use crate::issuer::Issuer;
use crate::queue::Queue;
use crate::replicator::Replicator;
use crate::wallet::WalletCache;
use crate::worker::{PipelineWorker, WorkerHandle};

/// Acquire the crash-safe singleton lockfile at `path`.
///
/// Protocol: write this process's pid into a uniquely-named temp file in
/// the same directory, then atomically hard-link it onto `path`. A
/// hard-link only succeeds if `path` doesn't already exist, so this is the
/// same atomicity trick `os.link` gives the original registrar — two
/// processes racing to acquire the lock can't both succeed.
///
/// If `path` already exists, the lock is considered stale only when the
/// pid recorded in it isn't this process's own pid — there is no actual
/// liveness probe. A live, unrelated process holding the lock is reclaimed
/// just the same as a genuinely dead one; that weakness is preserved
/// deliberately, not fixed here.
#[derive(Debug)]
pub struct Lockfile {
    path: PathBuf,
}

impl Lockfile {
    pub fn acquire(path: impl Into<PathBuf>) -> RegistrarResult<Self> {
        let path = path.into();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|source| RegistrarError::Io {
                path: parent.to_path_buf(),
                source,
            })?;
        }

        if let Some(existing_pid) = read_lockfile_pid(&path)? {
            if is_lockfile_stale(existing_pid) {
                warn!("removing stale lockfile at {} (pid {existing_pid} is gone)", path.display());
                fs::remove_file(&path).map_err(|source| RegistrarError::Io {
                    path: path.clone(),
                    source,
                })?;
            } else {
                return Err(RegistrarError::AlreadyRunning(existing_pid));
            }
        }

        let pid = process::id();
        let tmp_path = path.with_extension(format!("{pid}.tmp"));
        {
            let mut tmp = File::create(&tmp_path).map_err(|source| RegistrarError::Io {
                path: tmp_path.clone(),
                source,
            })?;
            write!(tmp, "{pid}").map_err(|source| RegistrarError::Io {
                path: tmp_path.clone(),
                source,
            })?;
        }

        let link_result = fs::hard_link(&tmp_path, &path);
        let _ = fs::remove_file(&tmp_path);

        match link_result {
            Ok(()) => Ok(Self { path }),
            Err(_) => {
                // Someone else won the race; report whichever pid is there now.
                let winner = read_lockfile_pid(&path)?.unwrap_or(0);
                Err(RegistrarError::AlreadyRunning(winner))
            }
        }
    }

    pub fn release(self) {
        let _ = fs::remove_file(&self.path);
    }
}

fn read_lockfile_pid(path: &Path) -> RegistrarResult<Option<u32>> {
    match File::open(path) {
        Ok(mut f) => {
            let mut contents = String::new();
            f.read_to_string(&mut contents).map_err(|source| RegistrarError::Io {
                path: path.to_path_buf(),
                source,
            })?;
            Ok(contents.trim().parse::<u32>().ok())
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(source) => Err(RegistrarError::Io {
            path: path.to_path_buf(),
            source,
        }),
    }
}

fn is_lockfile_stale(pid: u32) -> bool {
    pid != process::id()
}

/// The one process-global engine instance for a configured directory:
/// holds the lockfile, the durable queue, the wallet cache, and the
/// pipeline worker's join handle.
#[derive(Debug)]
pub struct Engine {
    config: Config,
    lockfile: AsyncMutex<Option<Lockfile>>,
    pub queue: Arc<Queue>,
    pub wallet: Arc<WalletCache>,
    pub issuer: Arc<Issuer>,
    worker_handle: AsyncMutex<Option<(WorkerHandle, JoinHandle<()>)>>,
}

impl Engine {
    pub async fn initialize(
        config: Config,
        chain: Arc<dyn ChainClient>,
        peers: Arc<dyn PeerDirectory>,
        storage: Arc<dyn StorageDriver>,
    ) -> RegistrarResult<Arc<Self>> {
        let lockfile = Lockfile::acquire(config.lockfile_path())?;
        let queue = Arc::new(Queue::open(config.queue_path())?);
        let wallet = Arc::new(WalletCache::new());
        let issuer = Arc::new(Issuer::new(queue.clone(), wallet.clone(), chain.clone()));
        let replicator = Arc::new(Replicator::new(chain.clone(), peers, storage, &config));

        let engine = Arc::new(Self {
            config: config.clone(),
            lockfile: AsyncMutex::new(Some(lockfile)),
            queue: queue.clone(),
            wallet: wallet.clone(),
            issuer: issuer.clone(),
            worker_handle: AsyncMutex::new(None),
        });

        let worker = PipelineWorker::new(config, queue, wallet, issuer, chain, replicator);
        let (handle, join) = worker.spawn();
        *engine.worker_handle.lock().await = Some((handle, join));

        info!("engine initialized at {}", engine.config.dir_path.display());
        Ok(engine)
    }

    pub async fn shutdown(self: &Arc<Self>) {
        if let Some((handle, join)) = self.worker_handle.lock().await.take() {
            handle.stop();
            let _ = join.await;
        }
        if let Some(lockfile) = self.lockfile.lock().await.take() {
            lockfile.release();
        }
        info!("engine shut down");
    }
}
