//! Account payload decoding

use crate::error::{Stage, SubmitError, SubmitResult};

use cosmrs::proto::cosmos::auth::v1beta1::{BaseAccount, ModuleAccount};
use cosmrs::proto::cosmos::vesting::v1beta1::{ContinuousVestingAccount, DelayedVestingAccount};
use cosmrs::Any;
use prost::Message;

pub const BASE_ACCOUNT_TYPE_URL: &str = "/cosmos.auth.v1beta1.BaseAccount";
pub const MODULE_ACCOUNT_TYPE_URL: &str = "/cosmos.auth.v1beta1.ModuleAccount";
pub const CONTINUOUS_VESTING_ACCOUNT_TYPE_URL: &str =
    "/cosmos.vesting.v1beta1.ContinuousVestingAccount";
pub const DELAYED_VESTING_ACCOUNT_TYPE_URL: &str = "/cosmos.vesting.v1beta1.DelayedVestingAccount";

/// Account position in the chain's ordering scheme, fetched fresh per submission
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccountState {
    pub address: String,
    pub account_number: u64,
    pub sequence: u64,
}

impl From<BaseAccount> for AccountState {
    fn from(account: BaseAccount) -> Self {
        Self {
            address: account.address,
            account_number: account.account_number,
            sequence: account.sequence,
        }
    }
}

/// Unpack a type-tagged account payload into an `AccountState`
pub fn decode_account(payload: &Any) -> SubmitResult<AccountState> {
    let base = match payload.type_url.as_str() {
        BASE_ACCOUNT_TYPE_URL => Some(decode::<BaseAccount>(payload)?),
        MODULE_ACCOUNT_TYPE_URL => decode::<ModuleAccount>(payload)?.base_account,
        CONTINUOUS_VESTING_ACCOUNT_TYPE_URL => decode::<ContinuousVestingAccount>(payload)?
            .base_vesting_account
            .and_then(|vesting| vesting.base_account),
        DELAYED_VESTING_ACCOUNT_TYPE_URL => decode::<DelayedVestingAccount>(payload)?
            .base_vesting_account
            .and_then(|vesting| vesting.base_account),
        other => {
            return Err(decode_error(format!("unknown account type {}", other)));
        }
    };

    base.map(AccountState::from).ok_or_else(|| {
        decode_error(format!(
            "{} payload has no base account",
            payload.type_url
        ))
    })
}

fn decode<M: Message + Default>(payload: &Any) -> SubmitResult<M> {
    M::decode(payload.value.as_slice()).map_err(|e| {
        decode_error(format!(
            "failed to unmarshal {}: {}",
            payload.type_url, e
        ))
    })
}

fn decode_error(message: String) -> SubmitError {
    SubmitError::Decode {
        stage: Stage::Fetching,
        message,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cosmrs::proto::cosmos::vesting::v1beta1::BaseVestingAccount;

    fn base_account(account_number: u64, sequence: u64) -> BaseAccount {
        BaseAccount {
            address: "wormhole1test".to_string(),
            pub_key: None,
            account_number,
            sequence,
        }
    }

    #[test]
    fn test_decodes_base_account() {
        let payload = Any {
            type_url: BASE_ACCOUNT_TYPE_URL.to_string(),
            value: base_account(7, 3).encode_to_vec(),
        };

        let state = decode_account(&payload).unwrap();
        assert_eq!(
            state,
            AccountState {
                address: "wormhole1test".to_string(),
                account_number: 7,
                sequence: 3,
            }
        );
    }

    #[test]
    fn test_decodes_module_account() {
        let module = ModuleAccount {
            base_account: Some(base_account(12, 40)),
            name: "bookkeeping".to_string(),
            permissions: vec![],
        };
        let payload = Any {
            type_url: MODULE_ACCOUNT_TYPE_URL.to_string(),
            value: module.encode_to_vec(),
        };

        let state = decode_account(&payload).unwrap();
        assert_eq!(state.account_number, 12);
        assert_eq!(state.sequence, 40);
    }

    #[test]
    fn test_decodes_vesting_account() {
        let vesting = DelayedVestingAccount {
            base_vesting_account: Some(BaseVestingAccount {
                base_account: Some(base_account(2, 9)),
                ..Default::default()
            }),
        };
        let payload = Any {
            type_url: DELAYED_VESTING_ACCOUNT_TYPE_URL.to_string(),
            value: vesting.encode_to_vec(),
        };

        let state = decode_account(&payload).unwrap();
        assert_eq!(state.sequence, 9);
    }

    #[test]
    fn test_unknown_type_is_decode_error() {
        let payload = Any {
            type_url: "/ethermint.types.v1.EthAccount".to_string(),
            value: vec![],
        };

        let err = decode_account(&payload).unwrap_err();
        assert!(matches!(
            err,
            SubmitError::Decode {
                stage: Stage::Fetching,
                ..
            }
        ));
        assert!(err.to_string().contains("EthAccount"));
    }

    #[test]
    fn test_corrupt_payload_is_decode_error() {
        let payload = Any {
            type_url: BASE_ACCOUNT_TYPE_URL.to_string(),
            value: vec![0xff, 0xff, 0xff],
        };

        assert!(matches!(
            decode_account(&payload),
            Err(SubmitError::Decode { .. })
        ));
    }

    #[test]
    fn test_module_account_without_base_is_decode_error() {
        let module = ModuleAccount {
            base_account: None,
            name: "empty".to_string(),
            permissions: vec![],
        };
        let payload = Any {
            type_url: MODULE_ACCOUNT_TYPE_URL.to_string(),
            value: module.encode_to_vec(),
        };

        assert!(decode_account(&payload).is_err());
    }
}
