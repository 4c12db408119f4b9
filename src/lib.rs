//! Wormchain client - transaction submission for a single signing account
//!
//! Fetches the account's number and sequence, builds and signs a transaction
//! in two passes, and broadcasts it in block mode, holding a per-connection
//! guard across the whole sequence so concurrent callers never sign with the
//! same sequence.

pub mod chain;
pub mod config;
pub mod connection;
pub mod error;
pub mod metrics;
pub mod tx;
pub mod wallet;

pub use chain::{AccountState, ChainRpc, GrpcChainProvider};
pub use config::Settings;
pub use connection::ChainConnection;
pub use error::{ClientError, ClientResult, RpcError, Stage, SubmitError, SubmitResult};
pub use tx::{BroadcastOutcome, MessageRegistry, SignerData, DEFAULT_GAS_LIMIT};
pub use wallet::Wallet;
