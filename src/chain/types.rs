// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Chain client types and the adapter trait consumed by the monitor.

use std::future::Future;
use std::time::Duration;

use alloy::primitives::{Address, Bytes};

/// Ethereum network configuration.
#[derive(Debug, Clone)]
pub struct NetworkConfig {
    /// Network name for display
    pub name: String,
    /// Chain ID (part of the EIP-712 domain)
    pub chain_id: u64,
    /// RPC endpoint URL
    pub rpc_url: String,
}

/// A fully built transaction ready for relayed submission.
#[derive(Debug, Clone)]
pub struct SubmitRequest {
    /// Sender (relayer) address; pays gas
    pub from: Address,
    /// Target contract, or None for contract creation
    pub to: Option<Address>,
    /// Calldata (or creation code for deployments)
    pub input: Bytes,
    /// Gas limit for the call
    pub gas_limit: u64,
}

/// Transaction receipt as seen by the lifecycle manager.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChainReceipt {
    /// Receipt status flag (true = succeeded, false = reverted)
    pub status: bool,
    /// Block the transaction was mined in
    pub block_number: u64,
    /// Created contract address, present for deployments
    pub contract_address: Option<String>,
}

/// Errors from chain interactions.
#[derive(Debug, thiserror::Error)]
pub enum ChainError {
    #[error("Invalid RPC URL: {0}")]
    InvalidRpcUrl(String),

    #[error("Invalid address: {0}")]
    InvalidAddress(String),

    #[error("RPC error: {0}")]
    Rpc(String),

    #[error("Transaction submission failed: {0}")]
    Submission(String),
}

/// Facade over the JSON-RPC calls the monitor needs.
///
/// Kept as a trait so the monitor loop can be driven by a scripted
/// implementation in tests; the production implementation is
/// [`EthRpcClient`](super::client::EthRpcClient).
pub trait ChainClient: Send + Sync {
    /// Submit a signed transaction on behalf of the relayer. Returns the
    /// transaction hash.
    fn submit(
        &self,
        req: SubmitRequest,
        signer: alloy::signers::local::PrivateKeySigner,
    ) -> impl Future<Output = Result<String, ChainError>> + Send;

    /// Fetch the receipt for a transaction hash, bounded by `timeout`.
    ///
    /// `Ok(None)` means "not mined yet or lookup timed out" and is an
    /// expected outcome, not an error.
    fn get_receipt(
        &self,
        tx_hash: &str,
        timeout: Duration,
    ) -> impl Future<Output = Result<Option<ChainReceipt>, ChainError>> + Send;

    /// Latest finalized block number per the chain's consensus.
    fn finalized_block_number(&self) -> impl Future<Output = Result<u64, ChainError>> + Send;
}
