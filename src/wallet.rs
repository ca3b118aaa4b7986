use parking_lot::Mutex;

use crate::crypto::{normalize_pubkey_hex, KeyFormatError, KeyInfo};
use crate::error::{RegistrarError, RegistrarResult};

/// The three key slots a configured wallet carries. The data key is always
/// singlesig — only payment and owner keys may be multisig descriptors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WalletKeys {
    pub payment: KeyInfo,
    pub owner: KeyInfo,
    pub payment_address: String,
    pub owner_address: String,
    pub data_privkey: String,
    /// Data public key, normalized to uncompressed hex at `SetWallet` time.
    pub data_pubkey: String,
}

/// In-memory, never-persisted wallet cache (spec §4.2). A single mutex
/// guards the whole slot because reads copy out a small struct and writes
/// replace it wholesale — the short-critical-section shape `parking_lot`
/// is built for, rather than the long-held async locks `tokio::sync::Mutex`
/// is for.
#[derive(Default)]
#[derive(Debug)]
pub struct WalletCache {
    inner: Mutex<Option<WalletKeys>>,
}

impl WalletCache {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(None),
        }
    }

    /// Validate and install a new wallet, replacing whatever was cached
    /// before. The data key must be singlesig; the data pubkey is
    /// normalized from compressed to uncompressed hex if needed.
    pub fn set_wallet(
        &self,
        payment: KeyInfo,
        owner: KeyInfo,
        payment_address: impl Into<String>,
        owner_address: impl Into<String>,
        data_privkey: impl Into<String>,
        data_pubkey: &str,
    ) -> RegistrarResult<()> {
        let data_pubkey = normalize_pubkey_hex(data_pubkey)
            .map_err(|e: KeyFormatError| RegistrarError::InvalidName(e.to_string()))?;
        let keys = WalletKeys {
            payment,
            owner,
            payment_address: payment_address.into(),
            owner_address: owner_address.into(),
            data_privkey: data_privkey.into(),
            data_pubkey,
        };
        *self.inner.lock() = Some(keys);
        Ok(())
    }

    pub fn get_wallet(&self) -> RegistrarResult<WalletKeys> {
        self.inner
            .lock()
            .clone()
            .ok_or(RegistrarError::WalletLocked)
    }

    pub fn get_payment_privkey(&self) -> RegistrarResult<KeyInfo> {
        Ok(self.get_wallet()?.payment)
    }

    pub fn get_owner_privkey(&self) -> RegistrarResult<KeyInfo> {
        Ok(self.get_wallet()?.owner)
    }

    pub fn get_data_privkey(&self) -> RegistrarResult<String> {
        Ok(self.get_wallet()?.data_privkey)
    }

    pub fn is_set(&self) -> bool {
        self.inner.lock().is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_pubkey() -> &'static str {
        "04\
         79be667ef9dcbbac55a06295ce870b07029bfcdb2dce28d959f2815b16f81798\
         483ada7726a3c4655da4fbfc0e1108a8fd17b448a68554199c47d08ffb10d4b8"
    }

    #[test]
    fn get_wallet_before_set_is_wallet_locked() {
        let cache = WalletCache::new();
        assert!(matches!(cache.get_wallet(), Err(RegistrarError::WalletLocked)));
    }

    #[test]
    fn set_then_get_round_trips() {
        let cache = WalletCache::new();
        cache
            .set_wallet(
                KeyInfo::singlesig("aa").unwrap(),
                KeyInfo::singlesig("bb").unwrap(),
                "pay1",
                "own1",
                "cc",
                sample_pubkey(),
            )
            .unwrap();
        let wallet = cache.get_wallet().unwrap();
        assert_eq!(wallet.payment_address, "pay1");
        assert_eq!(wallet.owner_address, "own1");
        assert_eq!(wallet.data_pubkey, sample_pubkey());
    }

    #[test]
    fn set_wallet_rejects_malformed_data_pubkey() {
        let cache = WalletCache::new();
        let err = cache
            .set_wallet(
                KeyInfo::singlesig("aa").unwrap(),
                KeyInfo::singlesig("bb").unwrap(),
                "pay1",
                "own1",
                "cc",
                "not-hex",
            )
            .unwrap_err();
        assert!(matches!(err, RegistrarError::InvalidName(_)));
    }
}
