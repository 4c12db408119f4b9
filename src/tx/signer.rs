//! Two-phase transaction signing
//!
//! The bytes to sign include the transaction's own signer info, so signing
//! happens in two passes:
//! - `install_placeholder` embeds public key, sign mode and sequence with an
//!   empty signature
//! - `sign` computes the signature over the sign doc and replaces the
//!   placeholder

use super::builder::UnsignedTx;
use crate::chain::AccountState;
use crate::config::SignModeConfig;
use crate::error::{Stage, SubmitError, SubmitResult};
use crate::wallet::Wallet;

use cosmrs::proto::cosmos::tx::v1beta1::SignDoc;
use cosmrs::tx::{ModeInfo, SignMode, SignerInfo};
use prost::Message;
use tracing::debug;

/// Context bound into the signature
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignerData {
    pub chain_id: String,
    pub account_number: u64,
    pub sequence: u64,
}

impl SignerData {
    /// Signer data for the account state fetched in the current submission
    pub fn new(chain_id: impl Into<String>, account: &AccountState) -> Self {
        Self {
            chain_id: chain_id.into(),
            account_number: account.account_number,
            sequence: account.sequence,
        }
    }
}

/// Transaction with signer info installed and an empty signature
#[derive(Debug, Clone)]
pub struct PlaceholderTx {
    body_bytes: Vec<u8>,
    auth_info_bytes: Vec<u8>,
    signatures: Vec<Vec<u8>>,
    account_number: u64,
    sequence: u64,
}

impl PlaceholderTx {
    /// Sequence embedded in the signer info
    pub fn sequence(&self) -> u64 {
        self.sequence
    }

    pub fn signatures(&self) -> &[Vec<u8>] {
        &self.signatures
    }
}

/// Transaction carrying its real signature
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedTx {
    pub(crate) body_bytes: Vec<u8>,
    pub(crate) auth_info_bytes: Vec<u8>,
    pub(crate) signatures: Vec<Vec<u8>>,
    pub(crate) sequence: u64,
}

impl SignedTx {
    pub fn sequence(&self) -> u64 {
        self.sequence
    }

    /// Signature of the single signer
    pub fn signature(&self) -> &[u8] {
        self.signatures.first().map(Vec::as_slice).unwrap_or_default()
    }

    pub fn body_bytes(&self) -> &[u8] {
        &self.body_bytes
    }

    pub fn auth_info_bytes(&self) -> &[u8] {
        &self.auth_info_bytes
    }
}

/// Canonical sign bytes for the given body, signer info and signer data
pub fn sign_doc_bytes(body_bytes: &[u8], auth_info_bytes: &[u8], signer_data: &SignerData) -> Vec<u8> {
    SignDoc {
        body_bytes: body_bytes.to_vec(),
        auth_info_bytes: auth_info_bytes.to_vec(),
        chain_id: signer_data.chain_id.clone(),
        account_number: signer_data.account_number,
    }
    .encode_to_vec()
}

/// Signs transactions with a borrowed wallet
#[derive(Clone, Copy)]
pub struct TxSigner<'wallet> {
    wallet: &'wallet Wallet,
    sign_mode: SignMode,
}

impl<'wallet> TxSigner<'wallet> {
    pub fn new(wallet: &'wallet Wallet, sign_mode: SignModeConfig) -> Self {
        let sign_mode = match sign_mode {
            SignModeConfig::Direct => SignMode::Direct,
            SignModeConfig::AminoJson => SignMode::LegacyAminoJson,
        };
        Self { wallet, sign_mode }
    }

    /// Phase 1: install signer info with an empty signature
    pub fn install_placeholder(&self, unsigned: UnsignedTx) -> SubmitResult<PlaceholderTx> {
        if self.sign_mode != SignMode::Direct {
            return Err(signing_error(
                Stage::SigningPlaceholder,
                format!(
                    "sign mode {:?} is not supported by secp256k1 keys",
                    self.sign_mode
                ),
            ));
        }

        let (body, fee, account) = unsigned.into_parts();
        let signer_info = SignerInfo {
            public_key: Some(self.wallet.public_key().into()),
            mode_info: ModeInfo::single(self.sign_mode),
            sequence: account.sequence,
        };

        let body_bytes = body.into_bytes().map_err(|e| {
            signing_error(
                Stage::SigningPlaceholder,
                format!("failed to encode body: {}", e),
            )
        })?;
        let auth_info_bytes = signer_info.auth_info(fee).into_bytes().map_err(|e| {
            signing_error(
                Stage::SigningPlaceholder,
                format!("failed to set SignerInfo: {}", e),
            )
        })?;

        debug!(
            "Installed signer info for account {} at sequence {}",
            account.account_number, account.sequence
        );

        Ok(PlaceholderTx {
            body_bytes,
            auth_info_bytes,
            signatures: vec![Vec::new()],
            account_number: account.account_number,
            sequence: account.sequence,
        })
    }

    /// Phase 2: sign the transaction and replace the placeholder signature
    pub fn sign(&self, tx: PlaceholderTx, signer_data: &SignerData) -> SubmitResult<SignedTx> {
        if signer_data.sequence != tx.sequence {
            return Err(signing_error(
                Stage::Signing,
                format!(
                    "signer data sequence {} does not match signer info sequence {}",
                    signer_data.sequence, tx.sequence
                ),
            ));
        }
        if signer_data.account_number != tx.account_number {
            return Err(signing_error(
                Stage::Signing,
                format!(
                    "signer data account number {} does not match fetched account number {}",
                    signer_data.account_number, tx.account_number
                ),
            ));
        }

        let sign_bytes = sign_doc_bytes(&tx.body_bytes, &tx.auth_info_bytes, signer_data);
        let signature = self
            .wallet
            .signing_key()
            .sign(&sign_bytes)
            .map_err(|e| signing_error(Stage::Signing, format!("failed to sign tx: {}", e)))?;

        Ok(SignedTx {
            body_bytes: tx.body_bytes,
            auth_info_bytes: tx.auth_info_bytes,
            signatures: vec![signature.to_bytes().to_vec()],
            sequence: tx.sequence,
        })
    }
}

fn signing_error(stage: Stage, message: String) -> SubmitError {
    SubmitError::Signing { stage, message }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tx::builder::{MessageRegistry, TxBuilder};

    use cosmrs::proto::cosmos::tx::v1beta1::AuthInfo;
    use cosmrs::Any;
    use k256::ecdsa::signature::Verifier;
    use k256::ecdsa::{Signature, VerifyingKey};

    const KEY_HEX: &str = "1111111111111111111111111111111111111111111111111111111111111111";

    fn wallet() -> Wallet {
        Wallet::from_hex(KEY_HEX, "wormhole").unwrap()
    }

    fn account() -> AccountState {
        AccountState {
            address: "wormhole1test".to_string(),
            account_number: 7,
            sequence: 3,
        }
    }

    fn unsigned() -> UnsignedTx {
        let message = Any {
            type_url: "/cosmwasm.wasm.v1.MsgExecuteContract".to_string(),
            value: b"submit_observations".to_vec(),
        };
        TxBuilder::new(MessageRegistry::permissive())
            .build(vec![message], &account())
            .unwrap()
    }

    fn sign_once(wallet: &Wallet) -> SignedTx {
        let signer = TxSigner::new(wallet, SignModeConfig::Direct);
        let placeholder = signer.install_placeholder(unsigned()).unwrap();
        signer
            .sign(placeholder, &SignerData::new("testchain", &account()))
            .unwrap()
    }

    #[test]
    fn test_placeholder_has_one_empty_signature() {
        let wallet = wallet();
        let signer = TxSigner::new(&wallet, SignModeConfig::Direct);
        let placeholder = signer.install_placeholder(unsigned()).unwrap();

        assert_eq!(placeholder.signatures(), &[Vec::<u8>::new()]);
        assert_eq!(placeholder.sequence(), 3);

        let auth_info = AuthInfo::decode(placeholder.auth_info_bytes.as_slice()).unwrap();
        assert_eq!(auth_info.signer_infos.len(), 1);
        assert_eq!(auth_info.signer_infos[0].sequence, 3);
        assert!(auth_info.signer_infos[0].public_key.is_some());
        assert_eq!(auth_info.fee.unwrap().gas_limit, 200_000);
    }

    #[test]
    fn test_signature_is_deterministic() {
        let wallet = wallet();
        let first = sign_once(&wallet);
        let second = sign_once(&wallet);

        assert_eq!(first.signature().len(), 64);
        assert_eq!(first.signature(), second.signature());
        assert_eq!(first, second);
    }

    #[test]
    fn test_signature_verifies_against_sign_doc() {
        let wallet = wallet();
        let signed = sign_once(&wallet);

        let sign_bytes = sign_doc_bytes(
            signed.body_bytes(),
            signed.auth_info_bytes(),
            &SignerData::new("testchain", &account()),
        );
        let verifying_key = VerifyingKey::from_sec1_bytes(&wallet.public_key().to_bytes()).unwrap();
        let signature = Signature::from_slice(signed.signature()).unwrap();

        assert!(verifying_key.verify(&sign_bytes, &signature).is_ok());
    }

    #[test]
    fn test_chain_id_changes_signature() {
        let wallet = wallet();
        let signer = TxSigner::new(&wallet, SignModeConfig::Direct);

        let testchain = signer
            .sign(
                signer.install_placeholder(unsigned()).unwrap(),
                &SignerData::new("testchain", &account()),
            )
            .unwrap();
        let otherchain = signer
            .sign(
                signer.install_placeholder(unsigned()).unwrap(),
                &SignerData::new("otherchain", &account()),
            )
            .unwrap();

        assert_ne!(testchain.signature(), otherchain.signature());
    }

    #[test]
    fn test_sequence_mismatch_is_refused() {
        let wallet = wallet();
        let signer = TxSigner::new(&wallet, SignModeConfig::Direct);
        let placeholder = signer.install_placeholder(unsigned()).unwrap();

        let stale = SignerData {
            chain_id: "testchain".to_string(),
            account_number: 7,
            sequence: 4,
        };
        let err = signer.sign(placeholder, &stale).unwrap_err();
        assert!(matches!(
            err,
            SubmitError::Signing {
                stage: Stage::Signing,
                ..
            }
        ));
    }

    #[test]
    fn test_unsupported_sign_mode_fails_in_first_phase() {
        let wallet = wallet();
        let signer = TxSigner::new(&wallet, SignModeConfig::AminoJson);
        let err = signer.install_placeholder(unsigned()).unwrap_err();
        assert!(matches!(
            err,
            SubmitError::Signing {
                stage: Stage::SigningPlaceholder,
                ..
            }
        ));
    }
}
