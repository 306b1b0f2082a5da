// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Signing keys for relayed submission and issuer authorizations.
//!
//! Two kinds of keys exist: the relayer key that pays gas on every
//! submission, and per-issuer keys that produce the EIP-712 authorizations
//! the contract verifies. Issuer keys live in the store. The relayer doubles
//! as the platform's master account and is the only address allowed to sign
//! without a registered credential; any other unregistered account is
//! rejected before a record exists, since an authorization signed by the
//! wrong key would only fail on-chain after gas is spent.

use std::sync::Arc;

use alloy::{
    primitives::B256,
    signers::{local::PrivateKeySigner, SignerSync},
};

use crate::chain::EthRpcClient;
use crate::model::WstAuthorization;
use crate::store::{StoreError, WstTxStore};

#[derive(Debug, thiserror::Error)]
pub enum CredentialError {
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    #[error("invalid signing key for {0}")]
    InvalidKey(String),

    #[error("no signing key registered for {0}")]
    UnknownAccount(String),

    #[error("signing failed: {0}")]
    Signing(String),
}

/// Source of signing keys.
///
/// A trait so monitor tests can hand out deterministic keys without a store.
pub trait CredentialProvider: Send + Sync {
    /// The relayer key used as `from` for every chain submission.
    fn relayer(&self) -> &PrivateKeySigner;

    /// Signing key for an account. Only the relayer's own address may
    /// resolve without a registered credential.
    fn signer_for(&self, account: &str) -> Result<PrivateKeySigner, CredentialError>;
}

/// Store-backed credential provider.
pub struct StoreCredentials {
    store: Arc<WstTxStore>,
    relayer: PrivateKeySigner,
}

impl StoreCredentials {
    pub fn new(store: Arc<WstTxStore>, relayer: PrivateKeySigner) -> Self {
        Self { store, relayer }
    }
}

impl CredentialProvider for StoreCredentials {
    fn relayer(&self) -> &PrivateKeySigner {
        &self.relayer
    }

    fn signer_for(&self, account: &str) -> Result<PrivateKeySigner, CredentialError> {
        if let Some(key_hex) = self.store.get_credential(account)? {
            return EthRpcClient::create_signer(&key_hex)
                .map_err(|_| CredentialError::InvalidKey(account.to_string()));
        }
        // The master account signs with the relayer key directly
        let relayer_address = format!("{:?}", self.relayer.address());
        if account.eq_ignore_ascii_case(&relayer_address) {
            return Ok(self.relayer.clone());
        }
        Err(CredentialError::UnknownAccount(account.to_string()))
    }
}

/// Sign an EIP-712 digest and package the result as the `{nonce, v, r, s}`
/// payload the contract expects. `v` uses the legacy 27/28 convention.
pub fn sign_authorization(
    signer: &PrivateKeySigner,
    nonce: B256,
    digest: B256,
) -> Result<WstAuthorization, CredentialError> {
    let signature = signer
        .sign_hash_sync(&digest)
        .map_err(|e| CredentialError::Signing(e.to_string()))?;

    Ok(WstAuthorization {
        nonce: alloy::hex::encode(nonce),
        v: 27 + signature.v() as u8,
        r: alloy::hex::encode(signature.r().to_be_bytes::<32>()),
        s: alloy::hex::encode(signature.s().to_be_bytes::<32>()),
    })
}
