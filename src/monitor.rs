// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Transaction Monitor
//!
//! Background task that drives every stored record through its lifecycle:
//!
//! 1. **Submission**: PENDING records are encoded, signed with the relayer
//!    key and sent to the chain. Submission failures retry with a bounded
//!    attempt count; exhausted records are dead-lettered (FAILED with no
//!    hash, finalized immediately).
//! 2. **Receipt + finality**: submitted records are matched against their
//!    receipt, and once the containing block is at or below the chain's
//!    finalized block, reconciliation effects and the `finalized` flag are
//!    committed in one store transaction.
//!
//! A record that was mined but not yet finalized is re-read from the chain
//! every cycle, so a re-org before finality simply produces a fresh receipt
//! on a later pass.

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::chain::{ChainClient, ChainError};
use crate::chain::wst::{self, CallBuildError};
use crate::credentials::CredentialProvider;
use crate::model::{WstTx, WstTxStatus};
use crate::reconcile::ReconcilerRegistry;
use crate::store::{StoreError, WstTxStore};

/// Default cycle interval.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(10);

/// Default per-receipt lookup timeout.
pub const DEFAULT_RECEIPT_TIMEOUT: Duration = Duration::from_secs(1);

/// Default submission attempts before a record is dead-lettered.
pub const DEFAULT_MAX_SUBMISSION_ATTEMPTS: u32 = 5;

#[derive(Debug, thiserror::Error)]
pub enum MonitorError {
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    #[error("chain error: {0}")]
    Chain(#[from] ChainError),
}

/// Monitor tuning knobs.
#[derive(Debug, Clone)]
pub struct MonitorConfig {
    /// Sleep between cycles
    pub poll_interval: Duration,
    /// Upper bound on a single receipt lookup
    pub receipt_timeout: Duration,
    /// Submission attempts before dead-lettering
    pub max_submission_attempts: u32,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            poll_interval: DEFAULT_POLL_INTERVAL,
            receipt_timeout: DEFAULT_RECEIPT_TIMEOUT,
            max_submission_attempts: DEFAULT_MAX_SUBMISSION_ATTEMPTS,
        }
    }
}

/// Lifecycle monitor that runs as a background tokio task.
///
/// Exactly one monitor may run against a store; submission and finalization
/// assume no concurrent writer.
pub struct TxMonitor<C: ChainClient> {
    store: Arc<WstTxStore>,
    chain: C,
    credentials: Arc<dyn CredentialProvider>,
    reconcilers: ReconcilerRegistry,
    config: MonitorConfig,
    deploy_bytecode: Vec<u8>,
}

impl<C: ChainClient> TxMonitor<C> {
    pub fn new(
        store: Arc<WstTxStore>,
        chain: C,
        credentials: Arc<dyn CredentialProvider>,
        config: MonitorConfig,
        deploy_bytecode: Vec<u8>,
    ) -> Self {
        Self {
            store,
            chain,
            credentials,
            reconcilers: ReconcilerRegistry::standard(),
            config,
            deploy_bytecode,
        }
    }

    /// Run the monitor loop until the cancellation token is triggered.
    ///
    /// This should be spawned as a background task:
    /// ```rust,ignore
    /// tokio::spawn(monitor.run(shutdown.clone()));
    /// ```
    pub async fn run(self, shutdown: CancellationToken) {
        tracing::info!("Transaction monitor starting");

        loop {
            if shutdown.is_cancelled() {
                tracing::info!("Transaction monitor shutting down");
                return;
            }

            if let Err(e) = self.poll_cycle().await {
                tracing::warn!(error = %e, "Monitor cycle failed, will retry");
            }

            tokio::select! {
                _ = tokio::time::sleep(self.config.poll_interval) => {},
                _ = shutdown.cancelled() => {
                    tracing::info!("Transaction monitor shutting down");
                    return;
                }
            }
        }
    }

    /// Execute one full cycle: submit PENDING records, then advance
    /// submitted records against receipts and chain finality.
    pub async fn poll_cycle(&self) -> Result<(), MonitorError> {
        for tx in self.store.list_pending()? {
            let tx_id = tx.tx_id.clone();
            if let Err(e) = self.submit_record(tx).await {
                tracing::warn!(tx_id = %tx_id, error = %e, "Submission pass failed for record");
            }
        }

        let unfinalized = self.store.list_unfinalized()?;
        if unfinalized.is_empty() {
            return Ok(());
        }

        // One finality read per cycle, shared by every record
        let finalized_block = self.chain.finalized_block_number().await?;

        for tx in unfinalized {
            let tx_id = tx.tx_id.clone();
            if let Err(e) = self.advance_record(tx, finalized_block).await {
                tracing::warn!(tx_id = %tx_id, error = %e, "Receipt pass failed for record");
            }
        }
        Ok(())
    }

    /// Submit one PENDING record, updating its status in the store.
    async fn submit_record(&self, mut tx: WstTx) -> Result<(), MonitorError> {
        let relayer = self.credentials.relayer();

        let request = match wst::build_submit_request(&tx, relayer.address(), &self.deploy_bytecode)
        {
            Ok(req) => req,
            // Missing creation code is a deployment problem, not a record
            // problem; leave the record PENDING until the operator fixes it
            Err(CallBuildError::MissingDeployBytecode) => {
                tracing::error!(tx_id = %tx.tx_id, "No WST creation code configured, deferring deploy");
                return Ok(());
            }
            // A record that cannot be encoded will never succeed; dead-letter
            Err(e) => {
                tracing::error!(tx_id = %tx.tx_id, error = %e, "Record cannot be encoded, dead-lettering");
                tx.mark_failed_unsent();
                self.store.update_tx(&tx)?;
                return Ok(());
            }
        };

        match self.chain.submit(request, relayer.clone()).await {
            Ok(tx_hash) => {
                tracing::info!(tx_id = %tx.tx_id, tx_hash = %tx_hash, "Record submitted");
                tx.mark_sent(tx_hash);
                self.store.update_tx(&tx)?;
            }
            Err(e) => {
                tx.record_submission_failure();
                if tx.submission_attempts >= self.config.max_submission_attempts {
                    tracing::error!(
                        tx_id = %tx.tx_id,
                        attempts = tx.submission_attempts,
                        error = %e,
                        "Submission retries exhausted, dead-lettering"
                    );
                    tx.mark_failed_unsent();
                } else {
                    tracing::warn!(
                        tx_id = %tx.tx_id,
                        attempts = tx.submission_attempts,
                        error = %e,
                        "Submission failed, will retry"
                    );
                }
                self.store.update_tx(&tx)?;
            }
        }
        Ok(())
    }

    /// Advance one submitted record: fetch its receipt, and finalize it once
    /// the containing block is covered by chain finality.
    async fn advance_record(&self, mut tx: WstTx, finalized_block: u64) -> Result<(), MonitorError> {
        let Some(tx_hash) = tx.tx_hash.clone() else {
            return Ok(());
        };

        // Re-fetched every cycle until finalized so a pre-finality re-org is
        // observed as an updated receipt
        let receipt = match self
            .chain
            .get_receipt(&tx_hash, self.config.receipt_timeout)
            .await?
        {
            Some(receipt) => receipt,
            None => return Ok(()),
        };

        let prev_status = tx.status;
        let prev_block = tx.block_number;
        tx.apply_receipt(receipt.status, receipt.block_number);
        // A re-org before finality can move or revert the transaction, so
        // the stored outcome follows the latest receipt
        let receipt_changed =
            tx.status != prev_status || prev_block != Some(receipt.block_number);

        if receipt.block_number > finalized_block {
            // Mined but not yet final; persist the receipt outcome and wait
            if receipt_changed {
                self.store.update_tx(&tx)?;
            }
            return Ok(());
        }

        let effects = if tx.status == WstTxStatus::Succeeded {
            match self.reconcilers.effects(&tx, &receipt) {
                Ok(effects) => effects,
                // Leave the record unfinalized; the next cycle retries
                Err(e) => {
                    tracing::warn!(tx_id = %tx.tx_id, error = %e, "Reconciliation failed, deferring finalization");
                    self.store.update_tx(&tx)?;
                    return Ok(());
                }
            }
        } else {
            // Reverted transactions finalize with no projection effects
            Vec::new()
        };

        tx.mark_finalized();
        self.store.finalize_tx(&tx, &effects)?;
        tracing::info!(
            tx_id = %tx.tx_id,
            status = ?tx.status,
            block = receipt.block_number,
            effects = effects.len(),
            "Record finalized"
        );
        Ok(())
    }
}
