// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! WST Relay - IbetWST Transaction Lifecycle Manager
//!
//! This crate builds, relays and reconciles AuthIbetWST transactions for a
//! securities-token issuance platform. Operations are captured as durable
//! PENDING records carrying issuer-signed EIP-712 authorizations, submitted
//! by a gas-paying relayer, and driven to finalization against the chain's
//! finalized block so no projection is updated on a block that can re-org.
//!
//! ## Modules
//!
//! - `builder` - Validated, signed transaction intents
//! - `chain` - Ethereum RPC client and AuthIbetWST contract encoding
//! - `credentials` - Relayer and issuer signing keys
//! - `monitor` - Background submission / receipt / finality loop
//! - `reconcile` - Per-type projection handlers (exactly-once)
//! - `store` - Embedded redb store for records and projections

pub mod builder;
pub mod chain;
pub mod config;
pub mod credentials;
pub mod model;
pub mod monitor;
pub mod reconcile;
pub mod store;
