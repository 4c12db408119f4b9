//! Chain module - remote collaborator used by the submission pathway
//!
//! This module provides:
//! - The `ChainRpc` seam (account query, blocking broadcast)
//! - A tonic gRPC implementation against a Cosmos SDK node
//! - Decoding of type-tagged account payloads into `AccountState`

pub mod account;
pub mod provider;

pub use account::{decode_account, AccountState};
pub use provider::GrpcChainProvider;

use crate::error::RpcError;

use async_trait::async_trait;
use cosmrs::proto::cosmos::base::abci::v1beta1::TxResponse;
use cosmrs::Any;
use std::sync::Arc;

/// Remote node operations needed to submit transactions
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ChainRpc: Send + Sync {
    /// Query the type-tagged account payload for an address
    async fn query_account(&self, address: &str) -> Result<Option<Any>, RpcError>;

    /// Submit encoded transaction bytes and wait until the node reports block inclusion
    async fn broadcast_tx(&self, tx_bytes: Vec<u8>) -> Result<Option<TxResponse>, RpcError>;
}

#[async_trait]
impl<T: ChainRpc + ?Sized> ChainRpc for Arc<T> {
    async fn query_account(&self, address: &str) -> Result<Option<Any>, RpcError> {
        (**self).query_account(address).await
    }

    async fn broadcast_tx(&self, tx_bytes: Vec<u8>) -> Result<Option<TxResponse>, RpcError> {
        (**self).broadcast_tx(tx_bytes).await
    }
}
