// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Ethereum JSON-RPC client for IbetWST transaction relaying.

use std::time::Duration;

use alloy::{
    eips::BlockNumberOrTag,
    network::{Ethereum, EthereumWallet, TransactionBuilder},
    providers::{
        fillers::{BlobGasFiller, ChainIdFiller, FillProvider, GasFiller, JoinFill, NonceFiller},
        Identity, Provider, ProviderBuilder, RootProvider,
    },
    rpc::types::TransactionRequest,
    signers::local::PrivateKeySigner,
};

use super::types::{ChainClient, ChainError, ChainReceipt, NetworkConfig, SubmitRequest};

/// HTTP provider type (with all fillers).
type HttpProvider = FillProvider<
    JoinFill<
        Identity,
        JoinFill<GasFiller, JoinFill<BlobGasFiller, JoinFill<NonceFiller, ChainIdFiller>>>,
    >,
    RootProvider<Ethereum>,
>;

/// Ethereum RPC client used for receipt monitoring and relayed submission.
pub struct EthRpcClient {
    /// Network configuration
    network: NetworkConfig,
    /// Parsed RPC endpoint, reused for per-submission wallet providers
    url: url::Url,
    /// Alloy HTTP provider for unsigned reads
    provider: HttpProvider,
}

impl EthRpcClient {
    /// Create a new client for the specified network.
    pub fn new(network: NetworkConfig) -> Result<Self, ChainError> {
        let url: url::Url = network
            .rpc_url
            .parse()
            .map_err(|e: url::ParseError| ChainError::InvalidRpcUrl(e.to_string()))?;

        let provider = ProviderBuilder::new().connect_http(url.clone());

        Ok(Self {
            network,
            url,
            provider,
        })
    }

    /// Get the network configuration.
    pub fn network(&self) -> &NetworkConfig {
        &self.network
    }

    /// Create a signer from a private key (hex string, 0x prefix optional).
    pub fn create_signer(private_key_hex: &str) -> Result<PrivateKeySigner, ChainError> {
        let trimmed = private_key_hex.trim_start_matches("0x");
        let key_bytes = alloy::hex::decode(trimmed)
            .map_err(|e| ChainError::InvalidAddress(format!("Invalid private key: {e}")))?;

        PrivateKeySigner::from_slice(&key_bytes)
            .map_err(|e| ChainError::InvalidAddress(format!("Invalid private key: {e}")))
    }
}

impl ChainClient for EthRpcClient {
    /// Submit a transaction signed with the relayer key.
    ///
    /// A wallet-filled provider is built per submission because the sender
    /// key varies per record (master relayer or issuer account).
    async fn submit(
        &self,
        req: SubmitRequest,
        signer: PrivateKeySigner,
    ) -> Result<String, ChainError> {
        let wallet = EthereumWallet::from(signer);
        let provider = ProviderBuilder::new()
            .wallet(wallet)
            .connect_http(self.url.clone());

        let tx = match req.to {
            Some(to) => TransactionRequest::default()
                .from(req.from)
                .to(to)
                .input(req.input.into())
                .gas_limit(req.gas_limit),
            // Contract creation: calldata is the creation code
            None => TransactionRequest::default()
                .from(req.from)
                .with_deploy_code(req.input)
                .gas_limit(req.gas_limit),
        };

        let pending = provider
            .send_transaction(tx)
            .await
            .map_err(|e| ChainError::Submission(format!("Failed to send: {e}")))?;

        Ok(format!("{:?}", pending.tx_hash()))
    }

    /// Fetch a receipt with a short timeout so one stalled lookup cannot
    /// stall the whole monitor cycle.
    async fn get_receipt(
        &self,
        tx_hash: &str,
        timeout: Duration,
    ) -> Result<Option<ChainReceipt>, ChainError> {
        let hash = tx_hash
            .parse()
            .map_err(|e| ChainError::InvalidAddress(format!("Invalid tx hash: {e}")))?;

        let lookup = self.provider.get_transaction_receipt(hash);
        match tokio::time::timeout(timeout, lookup).await {
            // Timed out: treat the same as "receipt not available yet"
            Err(_) => Ok(None),
            Ok(Ok(None)) => Ok(None),
            Ok(Ok(Some(receipt))) => Ok(Some(ChainReceipt {
                status: receipt.status(),
                block_number: receipt.block_number.unwrap_or(0),
                contract_address: receipt.contract_address.map(|a| format!("{a:?}")),
            })),
            Ok(Err(e)) => Err(ChainError::Rpc(format!("Failed to get receipt: {e}"))),
        }
    }

    /// Latest finalized block number (post-merge finality tag).
    async fn finalized_block_number(&self) -> Result<u64, ChainError> {
        let block = self
            .provider
            .get_block_by_number(BlockNumberOrTag::Finalized)
            .await
            .map_err(|e| ChainError::Rpc(format!("Failed to get finalized block: {e}")))?
            .ok_or_else(|| ChainError::Rpc("No finalized block available".to_string()))?;

        Ok(block.header.number)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_signer_accepts_prefixed_and_bare_hex() {
        let key = "4c0883a69102937d6231471b5dbb6204fe5129617082792ae468d01a3f362318";
        let bare = EthRpcClient::create_signer(key).unwrap();
        let prefixed = EthRpcClient::create_signer(&format!("0x{key}")).unwrap();
        assert_eq!(bare.address(), prefixed.address());
    }

    #[test]
    fn create_signer_rejects_garbage() {
        assert!(EthRpcClient::create_signer("not-hex").is_err());
        assert!(EthRpcClient::create_signer("0xdeadbeef").is_err());
    }

    #[test]
    fn new_rejects_invalid_rpc_url() {
        let result = EthRpcClient::new(NetworkConfig {
            name: "test".to_string(),
            chain_id: 1,
            rpc_url: "not a url".to_string(),
        });
        assert!(matches!(result, Err(ChainError::InvalidRpcUrl(_))));
    }
}
