//! Error types for the Wormchain client

use std::fmt;
use thiserror::Error;

/// Stage of the submission pathway at which a failure occurred
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    /// Waiting for the connection guard
    Locking,
    /// Querying account number and sequence
    Fetching,
    /// Attaching messages to the unsigned transaction
    Building,
    /// Installing signer metadata with an empty signature
    SigningPlaceholder,
    /// Computing and installing the real signature
    Signing,
    /// Serializing the signed transaction
    Encoding,
    /// Submitting and waiting for block inclusion
    Broadcasting,
}

impl Stage {
    /// Short label used for metrics
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Locking => "locking",
            Stage::Fetching => "fetching",
            Stage::Building => "building",
            Stage::SigningPlaceholder => "signing_placeholder",
            Stage::Signing => "signing",
            Stage::Encoding => "encoding",
            Stage::Broadcasting => "broadcasting",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Stage::Locking => "acquiring connection guard",
            Stage::Fetching => "fetching account",
            Stage::Building => "building transaction",
            Stage::SigningPlaceholder => "installing signer info",
            Stage::Signing => "signing transaction",
            Stage::Encoding => "encoding transaction",
            Stage::Broadcasting => "broadcasting transaction",
        };
        f.write_str(label)
    }
}

/// Failures of a single submission, returned to the caller verbatim
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SubmitError {
    #[error("Network error while {stage}: {message}")]
    Network { stage: Stage, message: String },

    #[error("Decode error while {stage}: {message}")]
    Decode { stage: Stage, message: String },

    #[error("Failed to add message to transaction: {message}")]
    Build { message: String },

    #[error("Signing error while {stage}: {message}")]
    Signing { stage: Stage, message: String },

    #[error("Failed to encode transaction: {message}")]
    Encode { message: String },

    #[error("Broadcast of {tx_hash} failed with code {code} (codespace '{codespace}'): {log}")]
    Broadcast {
        code: u32,
        codespace: String,
        log: String,
        tx_hash: String,
    },

    #[error("Submission cancelled while {stage}")]
    Cancelled { stage: Stage },
}

impl SubmitError {
    /// Stage at which the submission stopped
    pub fn stage(&self) -> Stage {
        match self {
            SubmitError::Network { stage, .. }
            | SubmitError::Decode { stage, .. }
            | SubmitError::Signing { stage, .. }
            | SubmitError::Cancelled { stage } => *stage,
            SubmitError::Build { .. } => Stage::Building,
            SubmitError::Encode { .. } => Stage::Encoding,
            SubmitError::Broadcast { .. } => Stage::Broadcasting,
        }
    }

    /// Check if the same submission may succeed when simply re-invoked
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            SubmitError::Network { .. } | SubmitError::Cancelled { .. }
        )
    }
}

/// Transport-level failures reported by a [`crate::chain::ChainRpc`] implementation
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RpcError {
    #[error("Endpoint unreachable: {0}")]
    Unreachable(String),

    #[error("Request failed with status {code}: {message}")]
    Status { code: String, message: String },
}

/// Errors raised while setting up or running the client
#[derive(Error, Debug)]
pub enum ClientError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Wallet error: {0}")]
    Wallet(String),

    #[error("Connection to {endpoint} failed: {message}")]
    Connection { endpoint: String, message: String },

    #[error("Server error: {0}")]
    Server(String),

    #[error(transparent)]
    Submit(#[from] SubmitError),
}

/// Result type for submission operations
pub type SubmitResult<T> = Result<T, SubmitError>;

/// Result type for client setup operations
pub type ClientResult<T> = Result<T, ClientError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stage_is_reported_for_every_kind() {
        let build = SubmitError::Build {
            message: "empty".to_string(),
        };
        assert_eq!(build.stage(), Stage::Building);

        let broadcast = SubmitError::Broadcast {
            code: 32,
            codespace: "sdk".to_string(),
            log: "account sequence mismatch".to_string(),
            tx_hash: "ABCD".to_string(),
        };
        assert_eq!(broadcast.stage(), Stage::Broadcasting);

        let cancelled = SubmitError::Cancelled {
            stage: Stage::Fetching,
        };
        assert_eq!(cancelled.stage(), Stage::Fetching);
    }

    #[test]
    fn test_only_transient_failures_are_retryable() {
        assert!(SubmitError::Network {
            stage: Stage::Broadcasting,
            message: "timeout".to_string(),
        }
        .is_retryable());
        assert!(SubmitError::Cancelled {
            stage: Stage::Broadcasting
        }
        .is_retryable());
        assert!(!SubmitError::Encode {
            message: "missing signature".to_string(),
        }
        .is_retryable());
        assert!(!SubmitError::Broadcast {
            code: 5,
            codespace: "sdk".to_string(),
            log: "insufficient funds".to_string(),
            tx_hash: String::new(),
        }
        .is_retryable());
    }

    #[test]
    fn test_broadcast_error_message_carries_code_and_log() {
        let err = SubmitError::Broadcast {
            code: 32,
            codespace: "sdk".to_string(),
            log: "account sequence mismatch".to_string(),
            tx_hash: "ABCD".to_string(),
        };
        let text = err.to_string();
        assert!(text.contains("code 32"));
        assert!(text.contains("account sequence mismatch"));
    }
}
