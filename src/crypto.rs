use sha2::{Digest, Sha256};
use thiserror::Error;

/// `sha256(data)`, hex-encoded lowercase.
///
/// Used for `zonefile_hash` and for `tokenFileId = sha256(fqu || zonefile_hash || token_file)`.
pub fn sha256_hex(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hex::encode(hasher.finalize())
}

/// `sha256(fqu || zonefile_hash || token_file)`, per the replicator's token-file-id rule.
pub fn token_file_id(fqu: &str, zonefile_hash: &str, token_file: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(fqu.as_bytes());
    hasher.update(zonefile_hash.as_bytes());
    hasher.update(token_file.as_bytes());
    hex::encode(hasher.finalize())
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum KeyFormatError {
    #[error("expected a hex-encoded private key")]
    NotHex,
    #[error("multisig descriptor needs at least one public key")]
    EmptyPubkeys,
    #[error("multisig threshold {m} exceeds {n} available keys")]
    ThresholdExceedsKeys { m: usize, n: usize },
    #[error("uncompressed public key must be 65 bytes (04 || x || y)")]
    BadUncompressedLength,
    #[error("compressed public key must be 33 bytes (02/03 || x)")]
    BadCompressedLength,
    #[error("compressed public key prefix must be 0x02 or 0x03")]
    BadCompressedPrefix,
}

/// The two key-descriptor shapes accepted by `SetWallet` for the payment
/// and owner keys. The data key is always singlesig (see `crate::wallet`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyInfo {
    Singlesig(String),
    Multisig {
        m: usize,
        pubkeys: Vec<String>,
        privkeys: Vec<String>,
    },
}

impl KeyInfo {
    pub fn singlesig(hex_privkey: impl Into<String>) -> Result<Self, KeyFormatError> {
        let hex_privkey = hex_privkey.into();
        if hex::decode(&hex_privkey).is_err() {
            return Err(KeyFormatError::NotHex);
        }
        Ok(KeyInfo::Singlesig(hex_privkey))
    }

    pub fn multisig(
        m: usize,
        pubkeys: Vec<String>,
        privkeys: Vec<String>,
    ) -> Result<Self, KeyFormatError> {
        if pubkeys.is_empty() {
            return Err(KeyFormatError::EmptyPubkeys);
        }
        if m > pubkeys.len() {
            return Err(KeyFormatError::ThresholdExceedsKeys {
                m,
                n: pubkeys.len(),
            });
        }
        Ok(KeyInfo::Multisig {
            m,
            pubkeys,
            privkeys,
        })
    }

    pub fn is_singlesig(&self) -> bool {
        matches!(self, KeyInfo::Singlesig(_))
    }
}

/// Normalize a public key from compressed (33-byte, `02`/`03` prefix) to
/// uncompressed (65-byte, `04` prefix) hex, leaving an already-uncompressed
/// key untouched.
///
/// This performs only the length/prefix bookkeeping the registrar needs to
/// hand the data pubkey to the chain adapter in a canonical form; it does
/// not itself do elliptic-curve point decompression, which belongs to the
/// chain adapter's signing stack, not this crate.
pub fn normalize_pubkey_hex(pubkey_hex: &str) -> Result<String, KeyFormatError> {
    let raw = hex::decode(pubkey_hex).map_err(|_| KeyFormatError::NotHex)?;
    match raw.first() {
        Some(0x04) => {
            if raw.len() != 65 {
                return Err(KeyFormatError::BadUncompressedLength);
            }
            Ok(pubkey_hex.to_ascii_lowercase())
        }
        Some(0x02) | Some(0x03) => {
            if raw.len() != 33 {
                return Err(KeyFormatError::BadCompressedLength);
            }
            Ok(pubkey_hex.to_ascii_lowercase())
        }
        _ => Err(KeyFormatError::BadCompressedPrefix),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sha256_hex_matches_known_vector() {
        assert_eq!(
            sha256_hex(b"abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn token_file_id_is_deterministic_and_order_sensitive() {
        let a = token_file_id("alice.id", "deadbeef", "{}");
        let b = token_file_id("alice.id", "deadbeef", "{}");
        let c = token_file_id("bob.id", "deadbeef", "{}");
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn singlesig_rejects_non_hex() {
        assert_eq!(KeyInfo::singlesig("not-hex"), Err(KeyFormatError::NotHex));
        assert!(KeyInfo::singlesig("00ff").is_ok());
    }

    #[test]
    fn multisig_rejects_threshold_above_key_count() {
        let err = KeyInfo::multisig(2, vec!["aa".into()], vec![]).unwrap_err();
        assert_eq!(
            err,
            KeyFormatError::ThresholdExceedsKeys { m: 2, n: 1 }
        );
    }
}
