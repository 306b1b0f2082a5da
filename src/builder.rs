// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Transaction intent builder.
//!
//! Turns an operation request into a durable PENDING record: validates the
//! parameters, draws a fresh replay nonce, signs the matching EIP-712 digest
//! with the authorizer's key, and persists the record. No chain access
//! happens here; the digest domain is derived from stored token metadata, so
//! intents can be accepted while the RPC endpoint is down.

use std::str::FromStr;
use std::sync::Arc;

use alloy::primitives::{Address, B256, U256};
use rand::RngCore;

use crate::chain::wst;
use crate::credentials::{sign_authorization, CredentialError, CredentialProvider};
use crate::model::{WstTx, WstTxParams};
use crate::store::{StoreError, WstTxStore};

/// Upper bound on trade memo text, matching the contract's storage cost cap.
const MAX_MEMO_LEN: usize = 1000;

#[derive(Debug, thiserror::Error)]
pub enum BuilderError {
    #[error("validation failed: {0}")]
    Validation(String),

    #[error("no token registered for WST contract {0}")]
    UnknownToken(String),

    #[error("duplicate tx_id: {0}")]
    DuplicateTxId(String),

    #[error("credential error: {0}")]
    Credential(#[from] CredentialError),

    #[error("store error: {0}")]
    Store(StoreError),
}

impl From<StoreError> for BuilderError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::DuplicateTxId(id) => BuilderError::DuplicateTxId(id),
            other => BuilderError::Store(other),
        }
    }
}

/// Builds and persists PENDING transaction records.
pub struct TxIntentBuilder {
    store: Arc<WstTxStore>,
    credentials: Arc<dyn CredentialProvider>,
    chain_id: u64,
}

impl TxIntentBuilder {
    pub fn new(
        store: Arc<WstTxStore>,
        credentials: Arc<dyn CredentialProvider>,
        chain_id: u64,
    ) -> Self {
        Self {
            store,
            credentials,
            chain_id,
        }
    }

    /// Create a deployment intent for a registered token.
    ///
    /// The WST name and initial owner come from the token record; no
    /// authorization is attached because the contract constructor takes the
    /// owner directly.
    pub fn create_deploy_intent(&self, token_address: &str) -> Result<WstTx, BuilderError> {
        let token = self
            .store
            .get_token(token_address)?
            .ok_or_else(|| BuilderError::Validation(format!("unknown token {token_address}")))?;

        parse_address(&token.issuer_address)?;

        let tx = WstTx::new_pending(
            uuid::Uuid::new_v4().to_string(),
            None,
            WstTxParams::Deploy {
                name: token.name.clone(),
                initial_owner: token.issuer_address.clone(),
                token_address: token.token_address.clone(),
            },
            format!("{:?}", self.credentials.relayer().address()),
            None,
            None,
        );
        self.store.insert_tx(&tx)?;
        Ok(tx)
    }

    /// Create an authorized operation intent against a deployed WST contract.
    ///
    /// `authorizer` is the account whose EIP-712 signature the contract will
    /// verify; its digest is computed here and signed with the account's
    /// registered key.
    pub fn create_intent(
        &self,
        ibet_wst_address: &str,
        authorizer: &str,
        params: WstTxParams,
    ) -> Result<WstTx, BuilderError> {
        let wst_address = parse_address(ibet_wst_address)?;
        parse_address(authorizer)?;
        validate_params(&params)?;

        // The WST contract's ERC-20 name is part of its EIP-712 domain, so
        // the contract must be known before intents can be signed for it.
        let token = self
            .store
            .get_token_by_wst(ibet_wst_address)?
            .ok_or_else(|| BuilderError::UnknownToken(ibet_wst_address.to_string()))?;

        let domain = wst::domain_separator(&token.name, self.chain_id, wst_address);
        let nonce = fresh_nonce();
        let digest = digest_for(&params, domain, nonce)?;

        let signer = self.credentials.signer_for(authorizer)?;
        let authorization = sign_authorization(&signer, nonce, digest)?;

        let tx = WstTx::new_pending(
            uuid::Uuid::new_v4().to_string(),
            Some(ibet_wst_address.to_string()),
            params,
            format!("{:?}", self.credentials.relayer().address()),
            Some(authorizer.to_string()),
            Some(authorization),
        );
        self.store.insert_tx(&tx)?;
        Ok(tx)
    }
}

fn fresh_nonce() -> B256 {
    let mut bytes = [0u8; 32];
    rand::thread_rng().fill_bytes(&mut bytes);
    B256::from(bytes)
}

fn parse_address(raw: &str) -> Result<Address, BuilderError> {
    Address::from_str(raw).map_err(|_| BuilderError::Validation(format!("invalid address {raw}")))
}

/// Structural parameter checks that do not require store access.
fn validate_params(params: &WstTxParams) -> Result<(), BuilderError> {
    match params {
        WstTxParams::Deploy { .. } => Err(BuilderError::Validation(
            "deploy intents are created from the token record".to_string(),
        )),
        WstTxParams::Mint { to_address, value } => {
            parse_address(to_address)?;
            nonzero(*value)
        }
        WstTxParams::Burn {
            from_address,
            value,
        } => {
            parse_address(from_address)?;
            nonzero(*value)
        }
        WstTxParams::AddWhitelist {
            st_account_address,
            sc_account_in_address,
            sc_account_out_address,
        } => {
            parse_address(st_account_address)?;
            parse_address(sc_account_in_address)?;
            parse_address(sc_account_out_address)?;
            Ok(())
        }
        WstTxParams::DeleteWhitelist { st_account_address } => {
            parse_address(st_account_address)?;
            Ok(())
        }
        WstTxParams::RequestTrade {
            seller_st_account_address,
            buyer_st_account_address,
            sc_token_address,
            seller_sc_account_address,
            buyer_sc_account_address,
            st_value,
            sc_value,
            memo,
        } => {
            parse_address(seller_st_account_address)?;
            parse_address(buyer_st_account_address)?;
            parse_address(sc_token_address)?;
            parse_address(seller_sc_account_address)?;
            parse_address(buyer_sc_account_address)?;
            nonzero(*st_value)?;
            nonzero(*sc_value)?;
            if memo.len() > MAX_MEMO_LEN {
                return Err(BuilderError::Validation(format!(
                    "memo exceeds {MAX_MEMO_LEN} bytes"
                )));
            }
            Ok(())
        }
        WstTxParams::CancelTrade { .. } | WstTxParams::AcceptTrade { .. } => Ok(()),
    }
}

fn nonzero(value: u128) -> Result<(), BuilderError> {
    if value == 0 {
        Err(BuilderError::Validation("value must be non-zero".to_string()))
    } else {
        Ok(())
    }
}

/// EIP-712 digest for the parameter payload under the given domain.
fn digest_for(
    params: &WstTxParams,
    domain: B256,
    nonce: B256,
) -> Result<B256, BuilderError> {
    let digest = match params {
        WstTxParams::Deploy { .. } => unreachable!("rejected by validate_params"),
        WstTxParams::Mint { to_address, value } => wst::mint_digest(
            domain,
            parse_address(to_address)?,
            U256::from(*value),
            nonce,
        ),
        WstTxParams::Burn {
            from_address,
            value,
        } => wst::burn_digest(
            domain,
            parse_address(from_address)?,
            U256::from(*value),
            nonce,
        ),
        WstTxParams::AddWhitelist {
            st_account_address,
            sc_account_in_address,
            sc_account_out_address,
        } => wst::add_whitelist_digest(
            domain,
            parse_address(st_account_address)?,
            parse_address(sc_account_in_address)?,
            parse_address(sc_account_out_address)?,
            nonce,
        ),
        WstTxParams::DeleteWhitelist { st_account_address } => {
            wst::delete_whitelist_digest(domain, parse_address(st_account_address)?, nonce)
        }
        WstTxParams::RequestTrade {
            seller_st_account_address,
            buyer_st_account_address,
            sc_token_address,
            st_value,
            sc_value,
            memo,
            ..
        } => wst::request_trade_digest(
            domain,
            parse_address(seller_st_account_address)?,
            parse_address(buyer_st_account_address)?,
            parse_address(sc_token_address)?,
            U256::from(*st_value),
            U256::from(*sc_value),
            memo,
            nonce,
        ),
        WstTxParams::CancelTrade { index } => {
            wst::cancel_trade_digest(domain, U256::from(*index), nonce)
        }
        WstTxParams::AcceptTrade { index } => {
            wst::accept_trade_digest(domain, U256::from(*index), nonce)
        }
    };
    Ok(digest)
}
