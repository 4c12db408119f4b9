//! Signing identity of a connection

use crate::error::{ClientError, ClientResult};

use cosmrs::crypto::secp256k1::SigningKey;
use cosmrs::crypto::PublicKey;
use cosmrs::AccountId;
use std::fmt;

/// secp256k1 key pair and the bech32 address derived from it
pub struct Wallet {
    signing_key: SigningKey,
    public_key: PublicKey,
    address: AccountId,
}

impl Wallet {
    /// Create a wallet from raw 32-byte private key material
    pub fn from_bytes(key_bytes: &[u8], bech32_prefix: &str) -> ClientResult<Self> {
        let signing_key = SigningKey::from_slice(key_bytes)
            .map_err(|e| ClientError::Wallet(format!("Invalid private key: {}", e)))?;
        let public_key = signing_key.public_key();
        let address = public_key
            .account_id(bech32_prefix)
            .map_err(|e| ClientError::Wallet(format!("Failed to derive address: {}", e)))?;

        Ok(Self {
            signing_key,
            public_key,
            address,
        })
    }

    /// Create a wallet from a hex encoded private key, with or without `0x`
    pub fn from_hex(hex_key: &str, bech32_prefix: &str) -> ClientResult<Self> {
        let trimmed = hex_key.trim();
        let trimmed = trimmed.strip_prefix("0x").unwrap_or(trimmed);
        let key_bytes = hex::decode(trimmed)
            .map_err(|e| ClientError::Wallet(format!("Private key is not valid hex: {}", e)))?;
        if key_bytes.len() != 32 {
            return Err(ClientError::Wallet(format!(
                "Private key must be 32 bytes, got {}",
                key_bytes.len()
            )));
        }

        Self::from_bytes(&key_bytes, bech32_prefix)
    }

    /// Load the private key from the named environment variable
    pub fn from_env(var_name: &str, bech32_prefix: &str) -> ClientResult<Self> {
        let key = std::env::var(var_name).map_err(|_| {
            ClientError::Wallet(format!(
                "No wallet configured. Set {} to a hex encoded private key",
                var_name
            ))
        })?;

        Self::from_hex(&key, bech32_prefix)
    }

    /// Bech32 account address
    pub fn address(&self) -> &AccountId {
        &self.address
    }

    /// Public key embedded into signer info
    pub fn public_key(&self) -> PublicKey {
        self.public_key.clone()
    }

    pub(crate) fn signing_key(&self) -> &SigningKey {
        &self.signing_key
    }
}

impl fmt::Debug for Wallet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Wallet")
            .field("address", &self.address.to_string())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const KEY_HEX: &str = "1111111111111111111111111111111111111111111111111111111111111111";

    #[test]
    fn test_address_uses_prefix() {
        let wallet = Wallet::from_hex(KEY_HEX, "wormhole").unwrap();
        assert!(wallet.address().to_string().starts_with("wormhole1"));
    }

    #[test]
    fn test_hex_prefix_is_accepted() {
        let plain = Wallet::from_hex(KEY_HEX, "wormhole").unwrap();
        let prefixed = Wallet::from_hex(&format!("0x{}", KEY_HEX), "wormhole").unwrap();
        assert_eq!(plain.address(), prefixed.address());
    }

    #[test]
    fn test_rejects_short_key() {
        let err = Wallet::from_hex("abcd", "wormhole").unwrap_err();
        assert!(matches!(err, ClientError::Wallet(_)));
    }

    #[test]
    fn test_rejects_non_hex_key() {
        assert!(Wallet::from_hex("not-a-key", "wormhole").is_err());
    }

    #[test]
    fn test_missing_env_var_is_wallet_error() {
        let err = Wallet::from_env("WORMCHAIN_TEST_UNSET_KEY", "wormhole").unwrap_err();
        assert!(err.to_string().contains("WORMCHAIN_TEST_UNSET_KEY"));
    }

    #[test]
    fn test_debug_hides_key_material() {
        let wallet = Wallet::from_hex(KEY_HEX, "wormhole").unwrap();
        let debug = format!("{:?}", wallet);
        assert!(debug.contains("wormhole1"));
        assert!(!debug.contains(KEY_HEX));
    }
}
