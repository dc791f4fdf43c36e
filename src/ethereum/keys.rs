//! Key derivation from seed phrases and address recovery from raw keys.
//!
//! Everything here is local cryptography: no RPC access, nothing persisted.

use alloy::primitives::Address;
use alloy::signers::local::coins_bip39::{English, Mnemonic};
use alloy::signers::local::{MnemonicBuilder, PrivateKeySigner};

use super::KeyPair;
use crate::error::{WalletError, WalletResult};

/// BIP-44 path prefix for account-based EVM chains (coin type 60).
pub const DERIVATION_PATH_PREFIX: &str = "m/44'/60'/0'/0";

/// Word count of freshly generated phrases.
const GENERATED_WORD_COUNT: usize = 12;

pub fn derivation_path(index: u32) -> String {
    format!("{}/{}", DERIVATION_PATH_PREFIX, index)
}

/// Derive the key pair at `m/44'/60'/0'/0/{index}` for a seed phrase.
pub fn derive_address(seed_phrase: &str, index: Option<u32>) -> WalletResult<KeyPair> {
    let index = index.unwrap_or(0);
    let signer = MnemonicBuilder::<English>::default()
        .phrase(seed_phrase.trim())
        .derivation_path(derivation_path(index))
        .map_err(|e| WalletError::KeyDerivation(e.to_string()))?
        .build()
        .map_err(|e| WalletError::KeyDerivation(e.to_string()))?;

    Ok(key_pair(&signer))
}

/// Validate a phrase against the English word list and its checksum.
pub fn validate_mnemonic(seed_phrase: &str) -> bool {
    Mnemonic::<English>::new_from_phrase(seed_phrase.trim()).is_ok()
}

/// Generate a fresh 12-word phrase and the key pair at index 0.
pub fn generate_wallet() -> WalletResult<(String, KeyPair)> {
    let mut rng = rand::thread_rng();
    let mnemonic = Mnemonic::<English>::new_with_count(&mut rng, GENERATED_WORD_COUNT)
        .map_err(|e| WalletError::KeyDerivation(e.to_string()))?;
    let phrase = mnemonic.to_phrase();
    let key_pair = derive_address(&phrase, Some(0))?;
    Ok((phrase, key_pair))
}

/// Parse a raw private key, with or without `0x`.
///
/// Exactly 64 hex characters are required after the prefix. Longer input is
/// rejected rather than truncated.
pub fn parse_private_key(private_key_hex: &str) -> WalletResult<PrivateKeySigner> {
    let trimmed = private_key_hex.trim();
    let key_hex = trimmed
        .strip_prefix("0x")
        .or_else(|| trimmed.strip_prefix("0X"))
        .unwrap_or(trimmed);

    if key_hex.len() != 64 {
        return Err(WalletError::InvalidPrivateKey(format!(
            "expected 64 hex characters, got {}",
            key_hex.len()
        )));
    }

    let bytes = hex::decode(key_hex)
        .map_err(|e| WalletError::InvalidPrivateKey(format!("malformed hex: {}", e)))?;

    PrivateKeySigner::from_slice(&bytes)
        .map_err(|e| WalletError::InvalidPrivateKey(e.to_string()))
}

/// Recover the checksummed address that owns a raw private key.
pub fn recover_address(private_key_hex: &str) -> WalletResult<Address> {
    parse_private_key(private_key_hex).map(|signer| signer.address())
}

fn key_pair(signer: &PrivateKeySigner) -> KeyPair {
    KeyPair {
        address: signer.address().to_checksum(None),
        private_key: format!("0x{}", hex::encode(signer.to_bytes())),
    }
}
