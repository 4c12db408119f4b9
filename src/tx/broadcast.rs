//! Wire encoding and broadcast result handling

use super::signer::SignedTx;
use crate::error::{Stage, SubmitError, SubmitResult};

use cosmrs::proto::cosmos::base::abci::v1beta1::TxResponse;
use cosmrs::proto::cosmos::tx::v1beta1::TxRaw;
use prost::Message;
use tracing::{info, warn};

/// Result code reported by the node for an accepted transaction
pub const CODE_OK: u32 = 0;

/// Inclusion report for a successfully broadcast transaction
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BroadcastOutcome {
    pub tx_hash: String,
    pub height: i64,
    pub gas_wanted: i64,
    pub gas_used: i64,
    pub code: u32,
    pub log: String,
    /// Sequence the transaction was signed with
    pub sequence: u64,
}

/// Encode a signed transaction into its canonical wire form
pub fn encode_tx(tx: &SignedTx) -> SubmitResult<Vec<u8>> {
    if tx.signatures.is_empty() || tx.signatures.iter().any(Vec::is_empty) {
        return Err(SubmitError::Encode {
            message: "transaction still carries a placeholder signature".to_string(),
        });
    }

    let raw = TxRaw {
        body_bytes: tx.body_bytes.clone(),
        auth_info_bytes: tx.auth_info_bytes.clone(),
        signatures: tx.signatures.clone(),
    };

    let mut tx_bytes = Vec::with_capacity(raw.encoded_len());
    raw.encode(&mut tx_bytes).map_err(|e| SubmitError::Encode {
        message: format!("failed to marshal tx: {}", e),
    })?;

    Ok(tx_bytes)
}

/// Turn the node's broadcast response into an outcome, rejecting non-zero codes
pub fn check_response(response: Option<TxResponse>, sequence: u64) -> SubmitResult<BroadcastOutcome> {
    let response = response.ok_or_else(|| SubmitError::Decode {
        stage: Stage::Broadcasting,
        message: "broadcast response carried no tx_response".to_string(),
    })?;

    if response.code != CODE_OK {
        warn!(
            "Broadcast of {} rejected: code {} codespace '{}' log '{}'",
            response.txhash, response.code, response.codespace, response.raw_log
        );
        return Err(SubmitError::Broadcast {
            code: response.code,
            codespace: response.codespace,
            log: response.raw_log,
            tx_hash: response.txhash,
        });
    }

    info!(
        "Broadcasted transaction {} at height {} (sequence {}, gas used {}/{})",
        response.txhash, response.height, sequence, response.gas_used, response.gas_wanted
    );

    Ok(BroadcastOutcome {
        tx_hash: response.txhash,
        height: response.height,
        gas_wanted: response.gas_wanted,
        gas_used: response.gas_used,
        code: response.code,
        log: response.raw_log,
        sequence,
    })
}
