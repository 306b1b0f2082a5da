// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Domain model for IbetWST transaction lifecycle management.
//!
//! The central entity is [`WstTx`]: a durable transaction-intent record that
//! mirrors one Ethereum transaction from creation (PENDING) through relayed
//! submission (SENT) and receipt confirmation (SUCCEEDED/FAILED) to
//! finalization. Projection rows (token deployment flags, whitelist entries,
//! trade rows, balances) are updated exactly once when a record finalizes.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Transaction type. One reconciliation handler exists per variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WstTxType {
    /// Deploy a new AuthIbetWST contract
    Deploy,
    /// Mint tokens with issuer authorization
    Mint,
    /// Burn tokens with issuer authorization
    Burn,
    /// Add an account to the contract whitelist
    AddWhitelist,
    /// Remove an account from the contract whitelist
    DeleteWhitelist,
    /// Open a DVP trade (ST against SC)
    RequestTrade,
    /// Cancel a previously requested trade
    CancelTrade,
    /// Accept (settle) a previously requested trade
    AcceptTrade,
}

/// Transaction status. Transitions are forward-only:
/// Pending → Sent → {Succeeded, Failed}. A record may stay Sent indefinitely
/// while its receipt is unavailable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WstTxStatus {
    /// Record created but not yet submitted to the chain
    Pending,
    /// Submitted; transaction hash assigned
    Sent,
    /// Mined with receipt status 1
    Succeeded,
    /// Reverted on chain, or dead-lettered after submission retry exhaustion
    Failed,
}

impl Default for WstTxStatus {
    fn default() -> Self {
        Self::Pending
    }
}

/// IbetWST contract version tag. Immutable once set on a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WstVersion {
    #[serde(rename = "1")]
    V1,
}

/// Off-chain EIP-712 authorization produced by the issuer's key.
///
/// The relayer submits the transaction and pays gas; the contract verifies
/// this signature to prove the issuer consented to the operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WstAuthorization {
    /// 32-byte replay-protection nonce (hex, no 0x prefix)
    pub nonce: String,
    /// Recovery id (27 or 28)
    pub v: u8,
    /// Signature r value (hex, no 0x prefix)
    pub r: String,
    /// Signature s value (hex, no 0x prefix)
    pub s: String,
}

/// Type-specific transaction parameters.
///
/// Serialized with an explicit tag so stored JSON stays self-describing even
/// when read without the surrounding record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum WstTxParams {
    Deploy {
        /// ERC-20 name of the new WST contract
        name: String,
        /// Initial contract owner (the issuer)
        initial_owner: String,
        /// Address of the owning ibet token record, flipped to
        /// wst-deployed when this transaction finalizes
        token_address: String,
    },
    Mint {
        to_address: String,
        value: u128,
    },
    Burn {
        from_address: String,
        value: u128,
    },
    AddWhitelist {
        st_account_address: String,
        sc_account_in_address: String,
        sc_account_out_address: String,
    },
    DeleteWhitelist {
        st_account_address: String,
    },
    RequestTrade {
        seller_st_account_address: String,
        buyer_st_account_address: String,
        sc_token_address: String,
        seller_sc_account_address: String,
        buyer_sc_account_address: String,
        st_value: u128,
        sc_value: u128,
        memo: String,
    },
    CancelTrade {
        index: u64,
    },
    AcceptTrade {
        index: u64,
    },
}

impl WstTxParams {
    /// The transaction type these parameters belong to.
    pub fn tx_type(&self) -> WstTxType {
        match self {
            WstTxParams::Deploy { .. } => WstTxType::Deploy,
            WstTxParams::Mint { .. } => WstTxType::Mint,
            WstTxParams::Burn { .. } => WstTxType::Burn,
            WstTxParams::AddWhitelist { .. } => WstTxType::AddWhitelist,
            WstTxParams::DeleteWhitelist { .. } => WstTxType::DeleteWhitelist,
            WstTxParams::RequestTrade { .. } => WstTxType::RequestTrade,
            WstTxParams::CancelTrade { .. } => WstTxType::CancelTrade,
            WstTxParams::AcceptTrade { .. } => WstTxType::AcceptTrade,
        }
    }
}

/// Durable IbetWST transaction record.
///
/// Created once by the intent builder; after that, mutated exclusively by
/// the monitor loop. Never deleted (append-only audit trail).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WstTx {
    /// Client-generated UUID4. Idempotency key and primary key.
    pub tx_id: String,
    /// Transaction type
    pub tx_type: WstTxType,
    /// Contract version used for the transaction
    pub version: WstVersion,
    /// Current status
    pub status: WstTxStatus,
    /// Target AuthIbetWST contract address (None for Deploy)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ibet_wst_address: Option<String>,
    /// Type-specific parameter payload
    pub tx_params: WstTxParams,
    /// Relayer address that pays gas for the submission
    pub tx_sender: String,
    /// Issuer address whose signature authorizes the operation
    #[serde(skip_serializing_if = "Option::is_none")]
    pub authorizer: Option<String>,
    /// Off-chain authorization payload; required for every type except Deploy
    #[serde(skip_serializing_if = "Option::is_none")]
    pub authorization: Option<WstAuthorization>,
    /// Chain transaction hash, set at submission
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tx_hash: Option<String>,
    /// Block number from the receipt
    #[serde(skip_serializing_if = "Option::is_none")]
    pub block_number: Option<u64>,
    /// True once the containing block is at or below the chain's finalized
    /// block number and reconciliation effects have been applied
    pub finalized: bool,
    /// Number of failed submission attempts (bounded-retry dead-letter)
    #[serde(default)]
    pub submission_attempts: u32,
    /// When the record was created
    pub created_at: DateTime<Utc>,
    /// When the record was last mutated
    pub updated_at: DateTime<Utc>,
}

impl WstTx {
    /// Create a new PENDING record. The transaction type is derived from the
    /// parameter payload so the two can never disagree.
    pub fn new_pending(
        tx_id: String,
        ibet_wst_address: Option<String>,
        tx_params: WstTxParams,
        tx_sender: String,
        authorizer: Option<String>,
        authorization: Option<WstAuthorization>,
    ) -> Self {
        let now = Utc::now();
        Self {
            tx_id,
            tx_type: tx_params.tx_type(),
            version: WstVersion::V1,
            status: WstTxStatus::Pending,
            ibet_wst_address,
            tx_params,
            tx_sender,
            authorizer,
            authorization,
            tx_hash: None,
            block_number: None,
            finalized: false,
            submission_attempts: 0,
            created_at: now,
            updated_at: now,
        }
    }

    /// Mark the record as submitted.
    pub fn mark_sent(&mut self, tx_hash: String) {
        self.status = WstTxStatus::Sent;
        self.tx_hash = Some(tx_hash);
        self.updated_at = Utc::now();
    }

    /// Apply a mined receipt: status from the receipt flag, block number
    /// from the inclusion block.
    pub fn apply_receipt(&mut self, success: bool, block_number: u64) {
        self.status = if success {
            WstTxStatus::Succeeded
        } else {
            WstTxStatus::Failed
        };
        self.block_number = Some(block_number);
        self.updated_at = Utc::now();
    }

    /// Count a failed submission attempt. The record stays Pending until
    /// the retry bound is reached.
    pub fn record_submission_failure(&mut self) {
        self.submission_attempts += 1;
        self.updated_at = Utc::now();
    }

    /// Dead-letter the record: terminal failure that never reached the
    /// chain, so there is no receipt or finality to wait for.
    pub fn mark_failed_unsent(&mut self) {
        self.status = WstTxStatus::Failed;
        self.finalized = true;
        self.updated_at = Utc::now();
    }

    /// Mark the record finalized. Must be persisted in the same store
    /// transaction as the reconciliation effects.
    pub fn mark_finalized(&mut self) {
        self.finalized = true;
        self.updated_at = Utc::now();
    }
}

// =============================================================================
// Projection rows (reconciliation targets)
// =============================================================================

/// Issued token record. `ibet_wst_deployed` and `ibet_wst_address` are
/// flipped exactly once when the Deploy transaction finalizes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenRecord {
    /// Token contract address on the ibet network (primary key)
    pub token_address: String,
    /// Issuer who owns the token
    pub issuer_address: String,
    /// Token name; also the ERC-20 name of the WST contract, which makes it
    /// part of the EIP-712 domain
    pub name: String,
    /// True once the WST deployment transaction has finalized
    pub ibet_wst_deployed: bool,
    /// Deployed AuthIbetWST contract address
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ibet_wst_address: Option<String>,
    /// tx_id of the deployment transaction, linked at intent creation
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ibet_wst_tx_id: Option<String>,
}

/// Whitelist projection row, keyed by (WST address, ST account).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WhitelistEntry {
    pub st_account_address: String,
    pub sc_account_in_address: String,
    pub sc_account_out_address: String,
}

/// DVP trade state as mirrored from the contract lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TradeState {
    Pending,
    Executed,
    Cancelled,
}

/// DVP trade projection row, keyed by (WST address, trade index).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TradeRow {
    pub seller_st_account_address: String,
    pub buyer_st_account_address: String,
    pub sc_token_address: String,
    pub seller_sc_account_address: String,
    pub buyer_sc_account_address: String,
    pub st_value: u128,
    pub sc_value: u128,
    pub state: TradeState,
    pub memo: String,
}

/// A single projection-table mutation computed by a reconciliation handler.
///
/// Handlers are pure: they return effects, and the store applies them in the
/// same write transaction that flips the record's `finalized` flag. A crash
/// between handler run and commit therefore re-runs the handler, never
/// double-applies the effect.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProjectionEffect {
    /// Mark the owning token as WST-deployed and record the contract address
    MarkTokenDeployed {
        token_address: String,
        wst_address: String,
    },
    /// Insert or replace a whitelist row
    UpsertWhitelist {
        ibet_wst_address: String,
        entry: WhitelistEntry,
    },
    /// Delete a whitelist row
    RemoveWhitelist {
        ibet_wst_address: String,
        st_account_address: String,
    },
    /// Increase a balance projection
    CreditBalance {
        ibet_wst_address: String,
        account_address: String,
        value: u128,
    },
    /// Decrease a balance projection (saturating at zero)
    DebitBalance {
        ibet_wst_address: String,
        account_address: String,
        value: u128,
    },
    /// Append a trade row at the next sequential index for the contract
    AppendTrade {
        ibet_wst_address: String,
        seller_st_account_address: String,
        buyer_st_account_address: String,
        sc_token_address: String,
        seller_sc_account_address: String,
        buyer_sc_account_address: String,
        st_value: u128,
        sc_value: u128,
        memo: String,
    },
    /// Transition an existing trade row's state
    SetTradeState {
        ibet_wst_address: String,
        index: u64,
        state: TradeState,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mint_params() -> WstTxParams {
        WstTxParams::Mint {
            to_address: "0x2222222222222222222222222222222222222222".to_string(),
            value: 1000,
        }
    }

    #[test]
    fn tx_type_derived_from_params() {
        let tx = WstTx::new_pending(
            "tx-1".to_string(),
            Some("0x1111111111111111111111111111111111111111".to_string()),
            mint_params(),
            "0x3333333333333333333333333333333333333333".to_string(),
            Some("0x4444444444444444444444444444444444444444".to_string()),
            None,
        );
        assert_eq!(tx.tx_type, WstTxType::Mint);
        assert_eq!(tx.status, WstTxStatus::Pending);
        assert!(tx.tx_hash.is_none());
        assert!(!tx.finalized);
    }

    #[test]
    fn status_transitions() {
        let mut tx = WstTx::new_pending(
            "tx-2".to_string(),
            None,
            WstTxParams::Deploy {
                name: "Token".to_string(),
                initial_owner: "0x4444444444444444444444444444444444444444".to_string(),
                token_address: "0x5555555555555555555555555555555555555555".to_string(),
            },
            "0x3333333333333333333333333333333333333333".to_string(),
            None,
            None,
        );

        tx.mark_sent("0xabc".to_string());
        assert_eq!(tx.status, WstTxStatus::Sent);
        assert_eq!(tx.tx_hash.as_deref(), Some("0xabc"));

        tx.apply_receipt(true, 100);
        assert_eq!(tx.status, WstTxStatus::Succeeded);
        assert_eq!(tx.block_number, Some(100));

        tx.mark_finalized();
        assert!(tx.finalized);
    }

    #[test]
    fn submission_failures_are_counted() {
        let mut tx = WstTx::new_pending(
            "tx-5".to_string(),
            Some("0x1111111111111111111111111111111111111111".to_string()),
            mint_params(),
            "0x3333333333333333333333333333333333333333".to_string(),
            Some("0x4444444444444444444444444444444444444444".to_string()),
            None,
        );
        tx.record_submission_failure();
        tx.record_submission_failure();
        assert_eq!(tx.submission_attempts, 2);
        assert_eq!(tx.status, WstTxStatus::Pending);
        assert!(tx.updated_at >= tx.created_at);
    }

    #[test]
    fn dead_letter_has_no_hash_but_is_terminal() {
        let mut tx = WstTx::new_pending(
            "tx-3".to_string(),
            Some("0x1111111111111111111111111111111111111111".to_string()),
            mint_params(),
            "0x3333333333333333333333333333333333333333".to_string(),
            Some("0x4444444444444444444444444444444444444444".to_string()),
            None,
        );
        tx.mark_failed_unsent();
        assert_eq!(tx.status, WstTxStatus::Failed);
        assert!(tx.tx_hash.is_none());
        assert!(tx.finalized);
    }

    #[test]
    fn record_json_round_trip() {
        let tx = WstTx::new_pending(
            "tx-4".to_string(),
            Some("0x1111111111111111111111111111111111111111".to_string()),
            WstTxParams::RequestTrade {
                seller_st_account_address: "0xaaa1111111111111111111111111111111111111"
                    .to_string(),
                buyer_st_account_address: "0xbbb1111111111111111111111111111111111111"
                    .to_string(),
                sc_token_address: "0xccc1111111111111111111111111111111111111".to_string(),
                seller_sc_account_address: "0xddd1111111111111111111111111111111111111"
                    .to_string(),
                buyer_sc_account_address: "0xeee1111111111111111111111111111111111111"
                    .to_string(),
                st_value: 50,
                sc_value: 5000,
                memo: "settlement".to_string(),
            },
            "0x3333333333333333333333333333333333333333".to_string(),
            Some("0x4444444444444444444444444444444444444444".to_string()),
            Some(WstAuthorization {
                nonce: "00".repeat(32),
                v: 27,
                r: "11".repeat(32),
                s: "22".repeat(32),
            }),
        );

        let json = serde_json::to_string(&tx).unwrap();
        let back: WstTx = serde_json::from_str(&json).unwrap();
        assert_eq!(back.tx_id, tx.tx_id);
        assert_eq!(back.tx_type, WstTxType::RequestTrade);
        assert_eq!(back.tx_params, tx.tx_params);
        assert_eq!(back.authorization, tx.authorization);
    }

    #[test]
    fn params_tag_is_snake_case() {
        let json = serde_json::to_string(&WstTxParams::DeleteWhitelist {
            st_account_address: "0x1111111111111111111111111111111111111111".to_string(),
        })
        .unwrap();
        assert!(json.contains(r#""kind":"delete_whitelist""#));
    }

    #[test]
    fn version_serializes_as_contract_tag() {
        assert_eq!(serde_json::to_string(&WstVersion::V1).unwrap(), r#""1""#);
    }
}
