//! Unsigned transaction assembly with a fixed gas budget

use crate::chain::AccountState;
use crate::error::{SubmitError, SubmitResult};

use cosmrs::tx::{Body, Fee, Msg};
use cosmrs::Any;
use std::collections::BTreeSet;

/// Gas limit attached to every transaction; no simulation is performed
pub const DEFAULT_GAS_LIMIT: u64 = 200_000;

/// Message type URLs accepted by the builder
#[derive(Debug, Clone, Default)]
pub struct MessageRegistry {
    type_urls: BTreeSet<String>,
}

impl MessageRegistry {
    /// Registry that accepts any well-formed type URL
    pub fn permissive() -> Self {
        Self::default()
    }

    /// Registry restricted to the given type URLs
    pub fn from_type_urls<I, S>(type_urls: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            type_urls: type_urls.into_iter().map(Into::into).collect(),
        }
    }

    /// Register one more type URL
    pub fn register(mut self, type_url: impl Into<String>) -> Self {
        self.type_urls.insert(type_url.into());
        self
    }

    pub fn is_permissive(&self) -> bool {
        self.type_urls.is_empty()
    }

    /// Check that a message may be attached to a transaction
    pub fn check(&self, message: &Any) -> SubmitResult<()> {
        let type_url = message.type_url.as_str();
        if type_url.len() < 2 || !type_url.starts_with('/') {
            return Err(SubmitError::Build {
                message: format!("malformed message type URL '{}'", type_url),
            });
        }
        if !self.is_permissive() && !self.type_urls.contains(type_url) {
            return Err(SubmitError::Build {
                message: format!("unregistered message type {}", type_url),
            });
        }
        Ok(())
    }
}

/// Transaction shell bound to the account state it was built for
#[derive(Debug, Clone)]
pub struct UnsignedTx {
    body: Body,
    fee: Fee,
    account: AccountState,
}

impl UnsignedTx {
    pub fn body(&self) -> &Body {
        &self.body
    }

    pub fn messages(&self) -> &[Any] {
        &self.body.messages
    }

    pub fn gas_limit(&self) -> u64 {
        self.fee.gas_limit
    }

    /// Account state fetched for this submission
    pub fn account(&self) -> &AccountState {
        &self.account
    }

    pub(crate) fn into_parts(self) -> (Body, Fee, AccountState) {
        (self.body, self.fee, self.account)
    }
}

/// Builder for unsigned transactions
#[derive(Debug, Clone)]
pub struct TxBuilder {
    registry: MessageRegistry,
    gas_limit: u64,
    memo: String,
}

impl TxBuilder {
    /// Create a builder using the default gas limit and an empty memo
    pub fn new(registry: MessageRegistry) -> Self {
        Self {
            registry,
            gas_limit: DEFAULT_GAS_LIMIT,
            memo: String::new(),
        }
    }

    pub fn with_gas_limit(mut self, gas_limit: u64) -> Self {
        self.gas_limit = gas_limit;
        self
    }

    pub fn with_memo(mut self, memo: impl Into<String>) -> Self {
        self.memo = memo.into();
        self
    }

    /// Attach messages to a fresh transaction shell for the given account
    pub fn build(&self, messages: Vec<Any>, account: &AccountState) -> SubmitResult<UnsignedTx> {
        if messages.is_empty() {
            return Err(SubmitError::Build {
                message: "transaction must carry at least one message".to_string(),
            });
        }
        for message in &messages {
            self.registry.check(message)?;
        }

        let body = Body::new(messages, self.memo.clone(), 0u32);
        let fee = Fee {
            amount: vec![],
            gas_limit: self.gas_limit,
            payer: None,
            granter: None,
        };

        Ok(UnsignedTx {
            body,
            fee,
            account: account.clone(),
        })
    }
}

/// Encode a typed message into the `Any` form accepted by [`TxBuilder::build`]
pub fn encode_msg<M: Msg>(message: &M) -> SubmitResult<Any> {
    message.to_any().map_err(|e| SubmitError::Build {
        message: format!("failed to encode message: {}", e),
    })
}
