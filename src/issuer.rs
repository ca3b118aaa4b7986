use std::sync::Arc;

use log::info;

use crate::adapters::ChainClient;
use crate::crypto::sha256_hex;
use crate::error::{RegistrarError, RegistrarResult};
use crate::names::validate_name_format;
use crate::queue::{Category, Queue, QueueEntry};
use crate::wallet::WalletCache;

/// Result of a successful operation issuer call. `transaction_hash` is
/// `None` only for the "unchanged zonefile" short-circuit in `update`,
/// which declares victory without ever broadcasting.
#[derive(Debug, Clone, PartialEq)]
pub struct OperationOutcome {
    pub success: bool,
    pub transaction_hash: Option<String>,
    pub warning: Option<String>,
}

impl OperationOutcome {
    fn broadcast(tx_hash: impl Into<String>) -> Self {
        Self {
            success: true,
            transaction_hash: Some(tx_hash.into()),
            warning: None,
        }
    }
}

/// The operation issuers (spec §4.3). Each public method is safe to call
/// concurrently by multiple callers: the queue's `append` is the single
/// point of truth for "is this name already in flight for this
/// operation", so two racing callers for the same `fqu` see one succeed
/// and one get `AlreadyQueued`.
pub struct Issuer {
    queue: Arc<Queue>,
    wallet: Arc<WalletCache>,
    chain: Arc<dyn ChainClient>,
}

impl std::fmt::Debug for Issuer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Issuer")
            .field("queue", &self.queue)
            .field("wallet", &self.wallet)
            .field("chain", &"<dyn ChainClient>")
            .finish()
    }
}

impl Issuer {
    pub fn new(queue: Arc<Queue>, wallet: Arc<WalletCache>, chain: Arc<dyn ChainClient>) -> Self {
        Self {
            queue,
            wallet,
            chain,
        }
    }

    fn validate_fqu(fqu: &str) -> RegistrarResult<String> {
        let result = validate_name_format(fqu);
        if !result.valid {
            return Err(RegistrarError::InvalidName(
                result.error.unwrap_or_else(|| "invalid name".to_string()),
            ));
        }
        Ok(result.normalized.expect("valid result always has a normalized name"))
    }

    /// Queue `fqu` for preorder, paying `cost_sats`. `zonefile_data`,
    /// `token_file` and `transfer_address` aren't broadcast yet — they ride
    /// along on the preorder row so the worker's `SetZonefiles`/
    /// `TransferNames` steps can synthesize the follow-on update/transfer
    /// once the preorder and register transactions have confirmed.
    pub async fn preorder(
        &self,
        fqu: &str,
        cost_sats: u64,
        zonefile_data: Option<&str>,
        token_file: Option<&str>,
        transfer_address: Option<&str>,
    ) -> RegistrarResult<OperationOutcome> {
        let wallet = self.wallet.get_wallet()?;
        let fqu = Self::validate_fqu(fqu)?;

        if self.queue.contains(Category::Preorder, &fqu)?
            || self.queue.contains(Category::Register, &fqu)?
        {
            return Err(RegistrarError::AlreadyQueued);
        }
        if (self.chain.name_owner(&fqu).await).map_err(|e| RegistrarError::TransientChain(e.to_string()))?.is_some() {
            return Err(RegistrarError::AlreadyRegistered);
        }

        let tx_hash = self
            .chain
            .broadcast_preorder(&fqu, &wallet.payment_address, cost_sats)
            .await
            .map_err(|e| RegistrarError::BroadcastFailed(e.to_string()))?;

        let mut entry = QueueEntry::new(fqu.clone(), Category::Preorder);
        entry.tx_hash = Some(tx_hash.clone());
        entry.zonefile = zonefile_data.map(str::to_string);
        entry.zonefile_hash = zonefile_data.map(|z| sha256_hex(z.as_bytes()));
        entry.token_file = token_file.map(str::to_string);
        entry.transfer_address = transfer_address.map(str::to_string);
        self.queue.append(entry)?;
        info!("queued preorder for {fqu}, tx {tx_hash}");
        Ok(OperationOutcome::broadcast(tx_hash))
    }

    /// Promote a confirmed preorder to a register transaction, carrying the
    /// preorder's `zonefile`/`token_file`/`transfer_address` forward onto
    /// the new register row. Called only by the worker's
    /// `RegisterPreorders` step, never directly by an external caller —
    /// this mirrors `register_preordered_name` in the original registrar,
    /// whose precondition order checks on-chain ownership before the
    /// preorder row, so a name registered out of band always reports
    /// `AlreadyRegistered` even if a stray preorder row still exists.
    pub(crate) async fn register(&self, preorder: &QueueEntry) -> RegistrarResult<OperationOutcome> {
        let wallet = self.wallet.get_wallet()?;
        let fqu = &preorder.fqu;

        if (self.chain.name_owner(fqu).await).map_err(|e| RegistrarError::TransientChain(e.to_string()))?.is_some() {
            return Err(RegistrarError::AlreadyRegistered);
        }
        if self.queue.contains(Category::Register, fqu)? {
            return Err(RegistrarError::AlreadyQueued);
        }

        let tx_hash = self
            .chain
            .broadcast_register(fqu, &wallet.owner_address)
            .await
            .map_err(|e| RegistrarError::BroadcastFailed(e.to_string()))?;

        let mut entry = QueueEntry::new(fqu.clone(), Category::Register);
        entry.tx_hash = Some(tx_hash.clone());
        entry.zonefile = preorder.zonefile.clone();
        entry.zonefile_hash = preorder.zonefile_hash.clone();
        entry.token_file = preorder.token_file.clone();
        entry.transfer_address = preorder.transfer_address.clone();
        self.queue.append(entry)?;
        self.queue.remove(Category::Preorder, fqu)?;
        info!("registered {fqu}, tx {tx_hash}");
        Ok(OperationOutcome::broadcast(tx_hash))
    }

    /// Queue a zone file update for `fqu`. Requires the name to already be
    /// owned by this wallet's owner address.
    ///
    /// Either `zonefile_data` or a precomputed `zonefile_hash` must be
    /// given. If the effective hash already matches what's on-chain, this
    /// declares victory without broadcasting anything, returning
    /// `{success: true, warning: Some("unchanged")}` — the same shortcut
    /// `transfer_names` takes when a transfer has already landed.
    pub async fn update(
        &self,
        fqu: &str,
        zonefile_data: Option<&str>,
        zonefile_hash: Option<&str>,
        token_file: Option<&str>,
        transfer_address: Option<&str>,
        min_confirmations: u32,
    ) -> RegistrarResult<OperationOutcome> {
        let wallet = self.wallet.get_wallet()?;
        let fqu = Self::validate_fqu(fqu)?;

        if self.queue.contains(Category::Update, &fqu)? {
            return Err(RegistrarError::AlreadyQueued);
        }
        let owner = (self.chain.name_owner(&fqu).await)
            .map_err(|e| RegistrarError::TransientChain(e.to_string()))?;
        if owner.as_deref() != Some(wallet.owner_address.as_str()) {
            return Err(RegistrarError::NotPreordered);
        }

        let effective_hash = zonefile_hash
            .map(str::to_string)
            .or_else(|| zonefile_data.map(|z| sha256_hex(z.as_bytes())))
            .ok_or(RegistrarError::MissingZonefileData)?;

        let on_chain_hash = (self.chain.name_value_hash(&fqu).await)
            .map_err(|e| RegistrarError::TransientChain(e.to_string()))?;
        if on_chain_hash.as_deref() == Some(effective_hash.as_str()) {
            info!("{fqu} zonefile unchanged, declaring victory without broadcasting");
            return Ok(OperationOutcome {
                success: true,
                transaction_hash: None,
                warning: Some("unchanged".to_string()),
            });
        }

        let tx_hash = self
            .chain
            .broadcast_update(&fqu, &effective_hash)
            .await
            .map_err(|e| RegistrarError::BroadcastFailed(e.to_string()))?;

        let mut entry = QueueEntry::new(fqu.clone(), Category::Update);
        entry.tx_hash = Some(tx_hash.clone());
        entry.zonefile = zonefile_data.map(str::to_string);
        entry.zonefile_hash = Some(effective_hash);
        entry.token_file = token_file.map(str::to_string);
        entry.transfer_address = transfer_address.map(str::to_string);
        entry.min_confirmations = Some(min_confirmations);
        self.queue.append(entry)?;
        info!("queued update for {fqu}, tx {tx_hash}");
        Ok(OperationOutcome::broadcast(tx_hash))
    }

    /// Queue a transfer of `fqu` to `new_owner`.
    pub async fn transfer(&self, fqu: &str, new_owner: &str) -> RegistrarResult<OperationOutcome> {
        let wallet = self.wallet.get_wallet()?;
        let fqu = Self::validate_fqu(fqu)?;

        if self.queue.contains(Category::Transfer, &fqu)? {
            return Err(RegistrarError::AlreadyQueued);
        }
        let owner = (self.chain.name_owner(&fqu).await)
            .map_err(|e| RegistrarError::TransientChain(e.to_string()))?;
        if owner.as_deref() != Some(wallet.owner_address.as_str()) {
            return Err(RegistrarError::NotPreordered);
        }

        let tx_hash = self
            .chain
            .broadcast_transfer(&fqu, new_owner)
            .await
            .map_err(|e| RegistrarError::BroadcastFailed(e.to_string()))?;

        let mut entry = QueueEntry::new(fqu.clone(), Category::Transfer);
        entry.tx_hash = Some(tx_hash.clone());
        entry.transfer_address = Some(new_owner.to_string());
        self.queue.append(entry)?;
        info!("queued transfer of {fqu} to {new_owner}, tx {tx_hash}");
        Ok(OperationOutcome::broadcast(tx_hash))
    }

    /// Queue a renewal of `fqu`, paying `renewal_fee`.
    pub async fn renew(&self, fqu: &str, renewal_fee: u64) -> RegistrarResult<OperationOutcome> {
        self.wallet.get_wallet()?;
        let fqu = Self::validate_fqu(fqu)?;

        if self.queue.contains(Category::Renew, &fqu)? {
            return Err(RegistrarError::AlreadyQueued);
        }
        let tx_hash = self
            .chain
            .broadcast_renew(&fqu, renewal_fee)
            .await
            .map_err(|e| RegistrarError::BroadcastFailed(e.to_string()))?;

        let mut entry = QueueEntry::new(fqu.clone(), Category::Renew);
        entry.tx_hash = Some(tx_hash.clone());
        self.queue.append(entry)?;
        info!("queued renewal for {fqu}, tx {tx_hash}");
        Ok(OperationOutcome::broadcast(tx_hash))
    }

    /// Queue a revocation of `fqu`.
    pub async fn revoke(&self, fqu: &str) -> RegistrarResult<OperationOutcome> {
        self.wallet.get_wallet()?;
        let fqu = Self::validate_fqu(fqu)?;

        if self.queue.contains(Category::Revoke, &fqu)? {
            return Err(RegistrarError::AlreadyQueued);
        }
        let tx_hash = self
            .chain
            .broadcast_revoke(&fqu)
            .await
            .map_err(|e| RegistrarError::BroadcastFailed(e.to_string()))?;

        let mut entry = QueueEntry::new(fqu.clone(), Category::Revoke);
        entry.tx_hash = Some(tx_hash.clone());
        self.queue.append(entry)?;
        info!("queued revocation for {fqu}, tx {tx_hash}");
        Ok(OperationOutcome::broadcast(tx_hash))
    }
}
