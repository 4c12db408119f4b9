//! gRPC chain provider backed by a tonic channel

use super::ChainRpc;
use crate::error::{ClientError, ClientResult, RpcError};

use async_trait::async_trait;
use cosmrs::proto::cosmos::auth::v1beta1::query_client::QueryClient;
use cosmrs::proto::cosmos::auth::v1beta1::QueryAccountRequest;
use cosmrs::proto::cosmos::base::abci::v1beta1::TxResponse;
use cosmrs::proto::cosmos::tx::v1beta1::service_client::ServiceClient;
use cosmrs::proto::cosmos::tx::v1beta1::{BroadcastMode, BroadcastTxRequest};
use cosmrs::Any;
use std::time::Duration;
use tonic::transport::{Channel, Endpoint};
use tonic::Code;
use tracing::{debug, info};

/// Connection to a Cosmos SDK node's gRPC endpoint
#[derive(Debug, Clone)]
pub struct GrpcChainProvider {
    /// Endpoint URL, kept for diagnostics
    endpoint: String,
    /// Shared HTTP/2 channel; clients are cheap clones over it
    channel: Channel,
}

impl GrpcChainProvider {
    /// Connect eagerly, failing if the node cannot be reached
    pub async fn connect(grpc_url: &str, connect_timeout: Duration) -> ClientResult<Self> {
        let endpoint = Self::endpoint(grpc_url, connect_timeout)?;
        let channel = endpoint
            .connect()
            .await
            .map_err(|e| ClientError::Connection {
                endpoint: grpc_url.to_string(),
                message: e.to_string(),
            })?;

        info!("Connected to gRPC endpoint {}", grpc_url);

        Ok(Self {
            endpoint: grpc_url.to_string(),
            channel,
        })
    }

    /// Create a provider that connects on first use
    pub fn connect_lazy(grpc_url: &str, connect_timeout: Duration) -> ClientResult<Self> {
        let channel = Self::endpoint(grpc_url, connect_timeout)?.connect_lazy();

        Ok(Self {
            endpoint: grpc_url.to_string(),
            channel,
        })
    }

    /// Endpoint URL
    pub fn endpoint_url(&self) -> &str {
        &self.endpoint
    }

    fn endpoint(grpc_url: &str, connect_timeout: Duration) -> ClientResult<Endpoint> {
        Endpoint::from_shared(grpc_url.to_string())
            .map(|endpoint| endpoint.connect_timeout(connect_timeout))
            .map_err(|e| ClientError::Connection {
                endpoint: grpc_url.to_string(),
                message: format!("Invalid endpoint: {}", e),
            })
    }
}

#[async_trait]
impl ChainRpc for GrpcChainProvider {
    async fn query_account(&self, address: &str) -> Result<Option<Any>, RpcError> {
        let mut client = QueryClient::new(self.channel.clone());
        let response = client
            .account(QueryAccountRequest {
                address: address.to_string(),
            })
            .await
            .map_err(status_to_rpc_error)?;

        debug!("Fetched account payload for {}", address);
        Ok(response.into_inner().account)
    }

    #[allow(deprecated)]
    async fn broadcast_tx(&self, tx_bytes: Vec<u8>) -> Result<Option<TxResponse>, RpcError> {
        let mut client = ServiceClient::new(self.channel.clone());
        let response = client
            .broadcast_tx(BroadcastTxRequest {
                tx_bytes,
                mode: BroadcastMode::Block as i32,
            })
            .await
            .map_err(status_to_rpc_error)?;

        Ok(response.into_inner().tx_response)
    }
}

fn status_to_rpc_error(status: tonic::Status) -> RpcError {
    match status.code() {
        Code::Unavailable | Code::DeadlineExceeded | Code::Cancelled => {
            RpcError::Unreachable(status.message().to_string())
        }
        code => RpcError::Status {
            code: format!("{:?}", code),
            message: status.message().to_string(),
        },
    }
}
