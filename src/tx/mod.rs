//! Transaction assembly, two-phase signing and broadcast handling

pub mod broadcast;
pub mod builder;
pub mod signer;

pub use broadcast::{check_response, encode_tx, BroadcastOutcome};
pub use builder::{encode_msg, MessageRegistry, TxBuilder, UnsignedTx, DEFAULT_GAS_LIMIT};
pub use signer::{sign_doc_bytes, PlaceholderTx, SignedTx, SignerData, TxSigner};
