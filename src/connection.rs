//! Connection-scoped submission pathway
//!
//! A `ChainConnection` owns the signing wallet, the remote handle and the
//! guard that serializes every fetch -> build -> sign -> broadcast sequence
//! for its account.

use crate::chain::{decode_account, AccountState, ChainRpc, GrpcChainProvider};
use crate::config::{ClientConfig, SignModeConfig};
use crate::error::{ClientResult, RpcError, Stage, SubmitError, SubmitResult};
use crate::metrics;
use crate::tx::{
    check_response, encode_tx, BroadcastOutcome, MessageRegistry, SignerData, TxBuilder, TxSigner,
};
use crate::wallet::Wallet;

use cosmrs::Any;
use std::future::Future;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// State protected by the submission guard
#[derive(Debug, Default)]
struct SubmitState {
    /// Sequence of the last transaction this connection got included
    last_signed_sequence: Option<u64>,
}

/// Submission handle for one account on one chain
pub struct ChainConnection<R = GrpcChainProvider> {
    rpc: R,
    wallet: Wallet,
    builder: TxBuilder,
    chain_id: String,
    sign_mode: SignModeConfig,
    request_timeout: Duration,
    guard: Mutex<SubmitState>,
}

impl ChainConnection<GrpcChainProvider> {
    /// Connect to the configured gRPC endpoint
    pub async fn connect(config: &ClientConfig, wallet: Wallet) -> ClientResult<Self> {
        let rpc = GrpcChainProvider::connect(&config.grpc_url, config.request_timeout()).await?;
        Ok(Self::new(rpc, wallet, config))
    }
}

impl<R: ChainRpc> ChainConnection<R> {
    /// Create a connection over an existing RPC handle
    pub fn new(rpc: R, wallet: Wallet, config: &ClientConfig) -> Self {
        let builder = TxBuilder::new(MessageRegistry::from_type_urls(
            config.allowed_message_types.iter().cloned(),
        ))
        .with_gas_limit(config.gas_limit)
        .with_memo(config.memo.clone());

        Self {
            rpc,
            wallet,
            builder,
            chain_id: config.chain_id.clone(),
            sign_mode: config.sign_mode,
            request_timeout: config.request_timeout(),
            guard: Mutex::new(SubmitState::default()),
        }
    }

    /// Override the deadline applied to each remote call
    pub fn with_request_timeout(mut self, request_timeout: Duration) -> Self {
        self.request_timeout = request_timeout;
        self
    }

    /// Bech32 address of the signing account
    pub fn address(&self) -> String {
        self.wallet.address().to_string()
    }

    pub fn chain_id(&self) -> &str {
        &self.chain_id
    }

    /// True when no submission holds the guard
    pub fn is_idle(&self) -> bool {
        self.guard.try_lock().is_ok()
    }

    /// Query the account's current number and sequence without taking the guard
    pub async fn account_state(&self, cancel: &CancellationToken) -> SubmitResult<AccountState> {
        self.fetch_account(cancel).await
    }

    /// Sign and broadcast a single message
    pub async fn sign_and_broadcast(
        &self,
        message: Any,
        cancel: &CancellationToken,
    ) -> SubmitResult<BroadcastOutcome> {
        self.submit(vec![message], cancel).await
    }

    /// Sign and broadcast messages as one transaction, waiting for block inclusion
    pub async fn submit(
        &self,
        messages: Vec<Any>,
        cancel: &CancellationToken,
    ) -> SubmitResult<BroadcastOutcome> {
        let started = Instant::now();
        metrics::record_submission_started(&self.chain_id);

        let result = self.submit_guarded(messages, cancel).await;

        match &result {
            Ok(outcome) => metrics::record_submission_succeeded(
                &self.chain_id,
                outcome.sequence,
                started.elapsed().as_secs_f64(),
            ),
            Err(err) => metrics::record_submission_failed(&self.chain_id, err),
        }

        result
    }

    async fn submit_guarded(
        &self,
        messages: Vec<Any>,
        cancel: &CancellationToken,
    ) -> SubmitResult<BroadcastOutcome> {
        // Held until this function returns, on every path
        let mut state = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                return Err(SubmitError::Cancelled { stage: Stage::Locking });
            }
            state = self.guard.lock() => state,
        };

        debug!("{}", Stage::Fetching);
        let account = self.fetch_account(cancel).await?;
        if let Some(last) = state.last_signed_sequence {
            if account.sequence != last + 1 {
                warn!(
                    "Sequence gap for {}: last signed {}, chain reports {}",
                    account.address, last, account.sequence
                );
            }
        }

        debug!("{} at sequence {}", Stage::Building, account.sequence);
        let unsigned = self.builder.build(messages, &account)?;

        let signer = TxSigner::new(&self.wallet, self.sign_mode);
        let placeholder = signer.install_placeholder(unsigned)?;
        let signer_data = SignerData::new(self.chain_id.clone(), &account);
        let signed = signer.sign(placeholder, &signer_data)?;

        debug!("{}", Stage::Encoding);
        let tx_bytes = encode_tx(&signed)?;

        debug!("{} ({} bytes)", Stage::Broadcasting, tx_bytes.len());
        let response = self
            .call_remote(Stage::Broadcasting, cancel, self.rpc.broadcast_tx(tx_bytes))
            .await?;
        let outcome = check_response(response, signed.sequence())?;

        state.last_signed_sequence = Some(outcome.sequence);
        Ok(outcome)
    }

    async fn fetch_account(&self, cancel: &CancellationToken) -> SubmitResult<AccountState> {
        let address = self.address();
        let payload = self
            .call_remote(Stage::Fetching, cancel, self.rpc.query_account(&address))
            .await?
            .ok_or_else(|| SubmitError::Decode {
                stage: Stage::Fetching,
                message: format!("account query for {} returned no account", address),
            })?;

        let account = decode_account(&payload)?;
        if account.address != address {
            return Err(SubmitError::Decode {
                stage: Stage::Fetching,
                message: format!(
                    "account query for {} returned account {}",
                    address, account.address
                ),
            });
        }

        Ok(account)
    }

    /// Run one remote call under the request deadline and the caller's cancellation token
    async fn call_remote<T, F>(
        &self,
        stage: Stage,
        cancel: &CancellationToken,
        call: F,
    ) -> SubmitResult<T>
    where
        F: Future<Output = Result<T, RpcError>>,
    {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(SubmitError::Cancelled { stage }),
            result = tokio::time::timeout(self.request_timeout, call) => match result {
                Ok(Ok(value)) => Ok(value),
                Ok(Err(e)) => Err(SubmitError::Network {
                    stage,
                    message: e.to_string(),
                }),
                Err(_) => Err(SubmitError::Network {
                    stage,
                    message: format!("timed out after {:?}", self.request_timeout),
                }),
            },
        }
    }
}
