// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Reconciliation handlers: one per transaction type.
//!
//! A handler maps a finalized, succeeded record plus its receipt to the
//! projection mutations it implies. Handlers are pure and never touch the
//! store; the monitor hands their effects to
//! [`WstTxStore::finalize_tx`](crate::store::WstTxStore::finalize_tx), which
//! applies them in the same write transaction that flips the record's
//! `finalized` flag. A handler error therefore leaves the record
//! unfinalized and the next monitor cycle retries it.

use std::collections::HashMap;

use crate::chain::ChainReceipt;
use crate::model::{ProjectionEffect, TradeState, WhitelistEntry, WstTx, WstTxParams, WstTxType};

#[derive(Debug, thiserror::Error)]
pub enum ReconcileError {
    #[error("no handler registered for {0:?}")]
    MissingHandler(WstTxType),

    #[error("deploy receipt for {0} carries no contract address")]
    MissingContractAddress(String),

    #[error("malformed record {0}: {1}")]
    MalformedRecord(String, String),
}

/// Computes projection effects for one transaction type.
pub trait Reconciler: Send + Sync {
    fn effects(
        &self,
        tx: &WstTx,
        receipt: &ChainReceipt,
    ) -> Result<Vec<ProjectionEffect>, ReconcileError>;
}

/// Handler lookup by transaction type.
pub struct ReconcilerRegistry {
    handlers: HashMap<WstTxType, Box<dyn Reconciler>>,
}

impl ReconcilerRegistry {
    /// Registry with the standard handler for every transaction type.
    pub fn standard() -> Self {
        let mut handlers: HashMap<WstTxType, Box<dyn Reconciler>> = HashMap::new();
        handlers.insert(WstTxType::Deploy, Box::new(DeployReconciler));
        handlers.insert(WstTxType::Mint, Box::new(MintReconciler));
        handlers.insert(WstTxType::Burn, Box::new(BurnReconciler));
        handlers.insert(WstTxType::AddWhitelist, Box::new(AddWhitelistReconciler));
        handlers.insert(
            WstTxType::DeleteWhitelist,
            Box::new(DeleteWhitelistReconciler),
        );
        handlers.insert(WstTxType::RequestTrade, Box::new(RequestTradeReconciler));
        handlers.insert(WstTxType::CancelTrade, Box::new(CancelTradeReconciler));
        handlers.insert(WstTxType::AcceptTrade, Box::new(AcceptTradeReconciler));
        Self { handlers }
    }

    pub fn effects(
        &self,
        tx: &WstTx,
        receipt: &ChainReceipt,
    ) -> Result<Vec<ProjectionEffect>, ReconcileError> {
        self.handlers
            .get(&tx.tx_type)
            .ok_or(ReconcileError::MissingHandler(tx.tx_type))?
            .effects(tx, receipt)
    }
}

fn wst_address(tx: &WstTx) -> Result<String, ReconcileError> {
    tx.ibet_wst_address.clone().ok_or_else(|| {
        ReconcileError::MalformedRecord(tx.tx_id.clone(), "missing WST address".to_string())
    })
}

struct DeployReconciler;

impl Reconciler for DeployReconciler {
    fn effects(
        &self,
        tx: &WstTx,
        receipt: &ChainReceipt,
    ) -> Result<Vec<ProjectionEffect>, ReconcileError> {
        let WstTxParams::Deploy { token_address, .. } = &tx.tx_params else {
            return Err(ReconcileError::MalformedRecord(
                tx.tx_id.clone(),
                "deploy record without deploy params".to_string(),
            ));
        };
        let contract = receipt
            .contract_address
            .clone()
            .ok_or_else(|| ReconcileError::MissingContractAddress(tx.tx_id.clone()))?;
        Ok(vec![ProjectionEffect::MarkTokenDeployed {
            token_address: token_address.clone(),
            wst_address: contract,
        }])
    }
}

struct MintReconciler;

impl Reconciler for MintReconciler {
    fn effects(
        &self,
        tx: &WstTx,
        _receipt: &ChainReceipt,
    ) -> Result<Vec<ProjectionEffect>, ReconcileError> {
        let WstTxParams::Mint { to_address, value } = &tx.tx_params else {
            return Err(malformed(tx));
        };
        Ok(vec![ProjectionEffect::CreditBalance {
            ibet_wst_address: wst_address(tx)?,
            account_address: to_address.clone(),
            value: *value,
        }])
    }
}

struct BurnReconciler;

impl Reconciler for BurnReconciler {
    fn effects(
        &self,
        tx: &WstTx,
        _receipt: &ChainReceipt,
    ) -> Result<Vec<ProjectionEffect>, ReconcileError> {
        let WstTxParams::Burn {
            from_address,
            value,
        } = &tx.tx_params
        else {
            return Err(malformed(tx));
        };
        Ok(vec![ProjectionEffect::DebitBalance {
            ibet_wst_address: wst_address(tx)?,
            account_address: from_address.clone(),
            value: *value,
        }])
    }
}

struct AddWhitelistReconciler;

impl Reconciler for AddWhitelistReconciler {
    fn effects(
        &self,
        tx: &WstTx,
        _receipt: &ChainReceipt,
    ) -> Result<Vec<ProjectionEffect>, ReconcileError> {
        let WstTxParams::AddWhitelist {
            st_account_address,
            sc_account_in_address,
            sc_account_out_address,
        } = &tx.tx_params
        else {
            return Err(malformed(tx));
        };
        Ok(vec![ProjectionEffect::UpsertWhitelist {
            ibet_wst_address: wst_address(tx)?,
            entry: WhitelistEntry {
                st_account_address: st_account_address.clone(),
                sc_account_in_address: sc_account_in_address.clone(),
                sc_account_out_address: sc_account_out_address.clone(),
            },
        }])
    }
}

struct DeleteWhitelistReconciler;

impl Reconciler for DeleteWhitelistReconciler {
    fn effects(
        &self,
        tx: &WstTx,
        _receipt: &ChainReceipt,
    ) -> Result<Vec<ProjectionEffect>, ReconcileError> {
        let WstTxParams::DeleteWhitelist { st_account_address } = &tx.tx_params else {
            return Err(malformed(tx));
        };
        Ok(vec![ProjectionEffect::RemoveWhitelist {
            ibet_wst_address: wst_address(tx)?,
            st_account_address: st_account_address.clone(),
        }])
    }
}

struct RequestTradeReconciler;

impl Reconciler for RequestTradeReconciler {
    fn effects(
        &self,
        tx: &WstTx,
        _receipt: &ChainReceipt,
    ) -> Result<Vec<ProjectionEffect>, ReconcileError> {
        let WstTxParams::RequestTrade {
            seller_st_account_address,
            buyer_st_account_address,
            sc_token_address,
            seller_sc_account_address,
            buyer_sc_account_address,
            st_value,
            sc_value,
            memo,
        } = &tx.tx_params
        else {
            return Err(malformed(tx));
        };
        Ok(vec![ProjectionEffect::AppendTrade {
            ibet_wst_address: wst_address(tx)?,
            seller_st_account_address: seller_st_account_address.clone(),
            buyer_st_account_address: buyer_st_account_address.clone(),
            sc_token_address: sc_token_address.clone(),
            seller_sc_account_address: seller_sc_account_address.clone(),
            buyer_sc_account_address: buyer_sc_account_address.clone(),
            st_value: *st_value,
            sc_value: *sc_value,
            memo: memo.clone(),
        }])
    }
}

struct CancelTradeReconciler;

impl Reconciler for CancelTradeReconciler {
    fn effects(
        &self,
        tx: &WstTx,
        _receipt: &ChainReceipt,
    ) -> Result<Vec<ProjectionEffect>, ReconcileError> {
        let WstTxParams::CancelTrade { index } = &tx.tx_params else {
            return Err(malformed(tx));
        };
        Ok(vec![ProjectionEffect::SetTradeState {
            ibet_wst_address: wst_address(tx)?,
            index: *index,
            state: TradeState::Cancelled,
        }])
    }
}

struct AcceptTradeReconciler;

impl Reconciler for AcceptTradeReconciler {
    fn effects(
        &self,
        tx: &WstTx,
        _receipt: &ChainReceipt,
    ) -> Result<Vec<ProjectionEffect>, ReconcileError> {
        let WstTxParams::AcceptTrade { index } = &tx.tx_params else {
            return Err(malformed(tx));
        };
        Ok(vec![ProjectionEffect::SetTradeState {
            ibet_wst_address: wst_address(tx)?,
            index: *index,
            state: TradeState::Executed,
        }])
    }
}

fn malformed(tx: &WstTx) -> ReconcileError {
    ReconcileError::MalformedRecord(
        tx.tx_id.clone(),
        "params do not match record type".to_string(),
    )
}
