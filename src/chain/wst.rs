// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! AuthIbetWST contract encoding: calldata builders for every relayed
//! operation and the EIP-712 digests the issuer signs off-chain.
//!
//! The contract verifies a `{nonce, v, r, s}` authorization on each call, so
//! a relayer can pay gas while the issuer merely signs a typed digest. Type
//! hash strings below must match the deployed contract byte for byte.

use std::str::FromStr;

use alloy::{
    primitives::{keccak256, Address, Bytes, B256, U256},
    sol,
    sol_types::{SolCall, SolValue},
};

use super::types::SubmitRequest;
use crate::model::{WstTx, WstTxParams};

sol! {
    interface IAuthIbetWST {
        function mintWithAuthorization(address to, uint256 value, bytes32 nonce, uint8 v, bytes32 r, bytes32 s);
        function burnWithAuthorization(address from, uint256 value, bytes32 nonce, uint8 v, bytes32 r, bytes32 s);
        function addAccountWhiteListWithAuthorization(address stAccountAddress, address scAccountAddressIn, address scAccountAddressOut, bytes32 nonce, uint8 v, bytes32 r, bytes32 s);
        function deleteAccountWhiteListWithAuthorization(address stAccountAddress, bytes32 nonce, uint8 v, bytes32 r, bytes32 s);
        function requestTradeWithAuthorization(address sellerSTAccountAddress, address buyerSTAccountAddress, address scTokenAddress, uint256 stValue, uint256 scValue, string memo, bytes32 nonce, uint8 v, bytes32 r, bytes32 s);
        function cancelTradeWithAuthorization(uint256 index, bytes32 nonce, uint8 v, bytes32 r, bytes32 s);
        function acceptTradeWithAuthorization(uint256 index, bytes32 nonce, uint8 v, bytes32 r, bytes32 s);
    }
}

// Per-function gas limits, matching the contract's worst-case costs.
const GAS_DEPLOY: u64 = 6_000_000;
const GAS_MINT: u64 = 125_000;
const GAS_BURN: u64 = 82_000;
const GAS_ADD_WHITELIST: u64 = 150_000;
const GAS_DELETE_WHITELIST: u64 = 80_000;
const GAS_REQUEST_TRADE: u64 = 324_000;
const GAS_CANCEL_TRADE: u64 = 113_000;
const GAS_ACCEPT_TRADE: u64 = 182_000;

/// Errors while turning a stored record into submittable calldata.
#[derive(Debug, thiserror::Error)]
pub enum CallBuildError {
    #[error("Invalid address in record: {0}")]
    InvalidAddress(String),

    #[error("Record requires an authorization payload but has none")]
    MissingAuthorization,

    #[error("Record requires a contract address but has none")]
    MissingContractAddress,

    #[error("Malformed authorization payload: {0}")]
    InvalidAuthorization(String),

    #[error("Deploy requested but no contract creation code is configured")]
    MissingDeployBytecode,
}

// =============================================================================
// EIP-712 digests
// =============================================================================

/// Compute the contract's EIP-712 domain separator.
///
/// The WST contract declares `EIP712Domain(string name, string version,
/// uint256 chainId, address verifyingContract)` with version "1" and its
/// ERC-20 name, so the separator can be derived without an RPC call.
pub fn domain_separator(name: &str, chain_id: u64, verifying_contract: Address) -> B256 {
    let type_hash = keccak256(
        b"EIP712Domain(string name,string version,uint256 chainId,address verifyingContract)",
    );
    keccak256(
        (
            type_hash,
            keccak256(name.as_bytes()),
            keccak256(b"1"),
            U256::from(chain_id),
            verifying_contract,
        )
            .abi_encode_params(),
    )
}

/// `keccak256("\x19\x01" || domainSeparator || structHash)`
fn eip712_digest(domain_separator: B256, struct_hash: B256) -> B256 {
    let mut buf = [0u8; 66];
    buf[0] = 0x19;
    buf[1] = 0x01;
    buf[2..34].copy_from_slice(domain_separator.as_slice());
    buf[34..66].copy_from_slice(struct_hash.as_slice());
    keccak256(buf)
}

/// Digest for `mintWithAuthorization`.
pub fn mint_digest(domain_separator: B256, to: Address, value: U256, nonce: B256) -> B256 {
    let type_hash = keccak256(b"MintWithAuthorization(address to,uint256 value,bytes32 nonce)");
    let struct_hash = keccak256((type_hash, to, value, nonce).abi_encode_params());
    eip712_digest(domain_separator, struct_hash)
}

/// Digest for `burnWithAuthorization`.
pub fn burn_digest(domain_separator: B256, from: Address, value: U256, nonce: B256) -> B256 {
    let type_hash = keccak256(b"BurnWithAuthorization(address from,uint256 value,bytes32 nonce)");
    let struct_hash = keccak256((type_hash, from, value, nonce).abi_encode_params());
    eip712_digest(domain_separator, struct_hash)
}

/// Digest for `addAccountWhiteListWithAuthorization`.
pub fn add_whitelist_digest(
    domain_separator: B256,
    st_account: Address,
    sc_account_in: Address,
    sc_account_out: Address,
    nonce: B256,
) -> B256 {
    let type_hash = keccak256(
        b"AddAccountWhiteListWithAuthorization(address STAccountAddress,address SCAccountAddressIn,address SCAccountAddressOut,bytes32 nonce)",
    );
    let struct_hash = keccak256(
        (type_hash, st_account, sc_account_in, sc_account_out, nonce).abi_encode_params(),
    );
    eip712_digest(domain_separator, struct_hash)
}

/// Digest for `deleteAccountWhiteListWithAuthorization`.
pub fn delete_whitelist_digest(domain_separator: B256, st_account: Address, nonce: B256) -> B256 {
    let type_hash = keccak256(
        b"DeleteAccountWhiteListWithAuthorization(address STAccountAddress,bytes32 nonce)",
    );
    let struct_hash = keccak256((type_hash, st_account, nonce).abi_encode_params());
    eip712_digest(domain_separator, struct_hash)
}

/// Digest for `requestTradeWithAuthorization`.
///
/// The `string memory memo` spelling inside the type string is unusual but
/// is what the deployed contract hashes.
#[allow(clippy::too_many_arguments)]
pub fn request_trade_digest(
    domain_separator: B256,
    seller_st_account: Address,
    buyer_st_account: Address,
    sc_token_address: Address,
    st_value: U256,
    sc_value: U256,
    memo: &str,
    nonce: B256,
) -> B256 {
    let type_hash = keccak256(
        b"RequestTradeWithAuthorization(address sellerSTAccountAddress,address buyerSTAccountAddress,address SCTokenAddress,uint256 STValue,uint256 SCValue,string memory memo,bytes32 nonce)",
    );
    let struct_hash = keccak256(
        (
            type_hash,
            seller_st_account,
            buyer_st_account,
            sc_token_address,
            st_value,
            sc_value,
            memo.to_string(),
            nonce,
        )
            .abi_encode_params(),
    );
    eip712_digest(domain_separator, struct_hash)
}

/// Digest for `cancelTradeWithAuthorization`.
pub fn cancel_trade_digest(domain_separator: B256, index: U256, nonce: B256) -> B256 {
    let type_hash = keccak256(b"CancelTradeWithAuthorization(uint256 index,bytes32 nonce)");
    let struct_hash = keccak256((type_hash, index, nonce).abi_encode_params());
    eip712_digest(domain_separator, struct_hash)
}

/// Digest for `acceptTradeWithAuthorization`.
pub fn accept_trade_digest(domain_separator: B256, index: U256, nonce: B256) -> B256 {
    let type_hash = keccak256(b"AcceptTradeWithAuthorization(uint256 index,bytes32 nonce)");
    let struct_hash = keccak256((type_hash, index, nonce).abi_encode_params());
    eip712_digest(domain_separator, struct_hash)
}

// =============================================================================
// Calldata builders
// =============================================================================

/// Build the submittable transaction for a stored record.
///
/// `deploy_bytecode` is the AuthIbetWST creation code, only consulted for
/// Deploy records.
pub fn build_submit_request(
    tx: &WstTx,
    from: Address,
    deploy_bytecode: &[u8],
) -> Result<SubmitRequest, CallBuildError> {
    match &tx.tx_params {
        WstTxParams::Deploy {
            name,
            initial_owner,
            ..
        } => {
            if deploy_bytecode.is_empty() {
                return Err(CallBuildError::MissingDeployBytecode);
            }
            let owner = parse_address(initial_owner)?;
            // Creation code followed by the abi-encoded constructor args
            let mut input = deploy_bytecode.to_vec();
            input.extend_from_slice(&(name.clone(), owner).abi_encode_params());
            Ok(SubmitRequest {
                from,
                to: None,
                input: Bytes::from(input),
                gas_limit: GAS_DEPLOY,
            })
        }
        WstTxParams::Mint { to_address, value } => {
            let (nonce, v, r, s) = parse_authorization(tx)?;
            let call = IAuthIbetWST::mintWithAuthorizationCall {
                to: parse_address(to_address)?,
                value: U256::from(*value),
                nonce,
                v,
                r,
                s,
            };
            contract_call(tx, call.abi_encode(), from, GAS_MINT)
        }
        WstTxParams::Burn {
            from_address,
            value,
        } => {
            let (nonce, v, r, s) = parse_authorization(tx)?;
            let call = IAuthIbetWST::burnWithAuthorizationCall {
                from: parse_address(from_address)?,
                value: U256::from(*value),
                nonce,
                v,
                r,
                s,
            };
            contract_call(tx, call.abi_encode(), from, GAS_BURN)
        }
        WstTxParams::AddWhitelist {
            st_account_address,
            sc_account_in_address,
            sc_account_out_address,
        } => {
            let (nonce, v, r, s) = parse_authorization(tx)?;
            let call = IAuthIbetWST::addAccountWhiteListWithAuthorizationCall {
                stAccountAddress: parse_address(st_account_address)?,
                scAccountAddressIn: parse_address(sc_account_in_address)?,
                scAccountAddressOut: parse_address(sc_account_out_address)?,
                nonce,
                v,
                r,
                s,
            };
            contract_call(tx, call.abi_encode(), from, GAS_ADD_WHITELIST)
        }
        WstTxParams::DeleteWhitelist { st_account_address } => {
            let (nonce, v, r, s) = parse_authorization(tx)?;
            let call = IAuthIbetWST::deleteAccountWhiteListWithAuthorizationCall {
                stAccountAddress: parse_address(st_account_address)?,
                nonce,
                v,
                r,
                s,
            };
            contract_call(tx, call.abi_encode(), from, GAS_DELETE_WHITELIST)
        }
        WstTxParams::RequestTrade {
            seller_st_account_address,
            buyer_st_account_address,
            sc_token_address,
            st_value,
            sc_value,
            memo,
            ..
        } => {
            let (nonce, v, r, s) = parse_authorization(tx)?;
            let call = IAuthIbetWST::requestTradeWithAuthorizationCall {
                sellerSTAccountAddress: parse_address(seller_st_account_address)?,
                buyerSTAccountAddress: parse_address(buyer_st_account_address)?,
                scTokenAddress: parse_address(sc_token_address)?,
                stValue: U256::from(*st_value),
                scValue: U256::from(*sc_value),
                memo: memo.clone(),
                nonce,
                v,
                r,
                s,
            };
            contract_call(tx, call.abi_encode(), from, GAS_REQUEST_TRADE)
        }
        WstTxParams::CancelTrade { index } => {
            let (nonce, v, r, s) = parse_authorization(tx)?;
            let call = IAuthIbetWST::cancelTradeWithAuthorizationCall {
                index: U256::from(*index),
                nonce,
                v,
                r,
                s,
            };
            contract_call(tx, call.abi_encode(), from, GAS_CANCEL_TRADE)
        }
        WstTxParams::AcceptTrade { index } => {
            let (nonce, v, r, s) = parse_authorization(tx)?;
            let call = IAuthIbetWST::acceptTradeWithAuthorizationCall {
                index: U256::from(*index),
                nonce,
                v,
                r,
                s,
            };
            contract_call(tx, call.abi_encode(), from, GAS_ACCEPT_TRADE)
        }
    }
}

fn contract_call(
    tx: &WstTx,
    calldata: Vec<u8>,
    from: Address,
    gas_limit: u64,
) -> Result<SubmitRequest, CallBuildError> {
    let wst_address = tx
        .ibet_wst_address
        .as_deref()
        .ok_or(CallBuildError::MissingContractAddress)?;
    Ok(SubmitRequest {
        from,
        to: Some(parse_address(wst_address)?),
        input: Bytes::from(calldata),
        gas_limit,
    })
}

fn parse_address(raw: &str) -> Result<Address, CallBuildError> {
    Address::from_str(raw).map_err(|e| CallBuildError::InvalidAddress(format!("{raw}: {e}")))
}

/// Decode the stored `{nonce, v, r, s}` hex payload into signature parts.
fn parse_authorization(tx: &WstTx) -> Result<(B256, u8, B256, B256), CallBuildError> {
    let auth = tx
        .authorization
        .as_ref()
        .ok_or(CallBuildError::MissingAuthorization)?;
    Ok((
        parse_b256(&auth.nonce)?,
        auth.v,
        parse_b256(&auth.r)?,
        parse_b256(&auth.s)?,
    ))
}

fn parse_b256(hex: &str) -> Result<B256, CallBuildError> {
    let bytes = alloy::hex::decode(hex.trim_start_matches("0x"))
        .map_err(|e| CallBuildError::InvalidAuthorization(e.to_string()))?;
    if bytes.len() != 32 {
        return Err(CallBuildError::InvalidAuthorization(format!(
            "expected 32 bytes, got {}",
            bytes.len()
        )));
    }
    Ok(B256::from_slice(&bytes))
}
