// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Ethereum chain access: RPC client, contract encoding, EIP-712 digests.

pub mod client;
pub mod types;
pub mod wst;

pub use client::EthRpcClient;
pub use types::{ChainClient, ChainError, ChainReceipt, NetworkConfig, SubmitRequest};
