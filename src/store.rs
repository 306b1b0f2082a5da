// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Embedded lifecycle store backed by redb (pure Rust, ACID).
//!
//! ## Table Layout
//!
//! - `wst_transactions`: tx_id → serialized WstTx
//! - `tokens`: token_address → serialized TokenRecord
//! - `wst_token_index`: wst_address → token_address
//! - `whitelist`: composite key (wst_address|st_account) → WhitelistEntry
//! - `trades`: composite key (wst_address|index_be) → TradeRow
//! - `trade_seq`: wst_address → next trade index (u64 big-endian)
//! - `balances`: composite key (wst_address|account) → u128 big-endian
//! - `credentials`: account address → private key hex
//!
//! Reconciliation effects and the record's `finalized` flag are committed in
//! a single write transaction, which is what makes finalization exactly-once.

use std::path::Path;

use redb::{Database, ReadableDatabase, ReadableTable, TableDefinition};

use crate::model::{ProjectionEffect, TokenRecord, TradeRow, TradeState, WhitelistEntry, WstTx, WstTxStatus};

// =============================================================================
// Table Definitions
// =============================================================================

/// Primary table: tx_id → serialized WstTx (JSON bytes).
const WST_TRANSACTIONS: TableDefinition<&str, &[u8]> = TableDefinition::new("wst_transactions");

/// Issued tokens: ibet token address → serialized TokenRecord.
const TOKENS: TableDefinition<&str, &[u8]> = TableDefinition::new("tokens");

/// Reverse index: deployed WST contract address → ibet token address.
const WST_TOKEN_INDEX: TableDefinition<&str, &str> = TableDefinition::new("wst_token_index");

/// Whitelist projection: `wst_address|st_account` → WhitelistEntry JSON.
const WHITELIST: TableDefinition<&str, &[u8]> = TableDefinition::new("whitelist");

/// Trade projection: `wst_address|index_padded` → TradeRow JSON.
const TRADES: TableDefinition<&str, &[u8]> = TableDefinition::new("trades");

/// Next trade index per contract: wst_address → u64 big-endian.
const TRADE_SEQ: TableDefinition<&str, &[u8]> = TableDefinition::new("trade_seq");

/// Balance projection: `wst_address|account` → u128 big-endian.
const BALANCES: TableDefinition<&str, &[u8]> = TableDefinition::new("balances");

/// Issuer signing keys: account address → private key hex.
const CREDENTIALS: TableDefinition<&str, &str> = TableDefinition::new("credentials");

// =============================================================================
// Error Type
// =============================================================================

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("redb error: {0}")]
    Redb(#[from] redb::Error),

    #[error("redb database error: {0}")]
    RedbDatabase(#[from] redb::DatabaseError),

    #[error("redb transaction error: {0}")]
    RedbTransaction(#[from] redb::TransactionError),

    #[error("redb table error: {0}")]
    RedbTable(#[from] redb::TableError),

    #[error("redb storage error: {0}")]
    RedbStorage(#[from] redb::StorageError),

    #[error("redb commit error: {0}")]
    RedbCommit(#[from] redb::CommitError),

    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("duplicate tx_id: {0}")]
    DuplicateTxId(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

// =============================================================================
// Composite Key Helpers
// =============================================================================

/// `lowercase_wst_address|lowercase_account`
fn account_key(wst_address: &str, account: &str) -> String {
    format!("{}|{}", wst_address.to_lowercase(), account.to_lowercase())
}

/// `lowercase_wst_address|zero_padded_index` so trades range-scan in order.
fn trade_key(wst_address: &str, index: u64) -> String {
    format!("{}|{index:020}", wst_address.to_lowercase())
}

// =============================================================================
// WstTxStore
// =============================================================================

/// Embedded ACID store for transaction records and projection tables.
pub struct WstTxStore {
    db: Database,
}

impl WstTxStore {
    /// Open (or create) the store at the given path.
    pub fn open(path: &Path) -> StoreResult<Self> {
        // Ensure parent directory exists
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).ok();
        }
        let db = Database::create(path)?;

        // Pre-create all tables so later read transactions don't fail
        let write_txn = db.begin_write()?;
        {
            let _ = write_txn.open_table(WST_TRANSACTIONS)?;
            let _ = write_txn.open_table(TOKENS)?;
            let _ = write_txn.open_table(WST_TOKEN_INDEX)?;
            let _ = write_txn.open_table(WHITELIST)?;
            let _ = write_txn.open_table(TRADES)?;
            let _ = write_txn.open_table(TRADE_SEQ)?;
            let _ = write_txn.open_table(BALANCES)?;
            let _ = write_txn.open_table(CREDENTIALS)?;
        }
        write_txn.commit()?;

        Ok(Self { db })
    }

    // =========================================================================
    // Transaction records
    // =========================================================================

    /// Insert a freshly built PENDING record.
    ///
    /// The tx_id is the idempotency key: inserting an existing id fails with
    /// [`StoreError::DuplicateTxId`] and leaves the store untouched. For
    /// Deploy records the owning token row is linked to the new record in the
    /// same transaction.
    pub fn insert_tx(&self, tx: &WstTx) -> StoreResult<()> {
        let json = serde_json::to_vec(tx)?;

        let write_txn = self.db.begin_write()?;
        {
            let mut tx_table = write_txn.open_table(WST_TRANSACTIONS)?;
            if tx_table.get(tx.tx_id.as_str())?.is_some() {
                return Err(StoreError::DuplicateTxId(tx.tx_id.clone()));
            }
            tx_table.insert(tx.tx_id.as_str(), json.as_slice())?;
        }

        if let crate::model::WstTxParams::Deploy { token_address, .. } = &tx.tx_params {
            let mut token_table = write_txn.open_table(TOKENS)?;
            let key = token_address.to_lowercase();
            let existing = token_table
                .get(key.as_str())?
                .map(|v| v.value().to_vec());
            if let Some(bytes) = existing {
                let mut token: TokenRecord = serde_json::from_slice(&bytes)?;
                token.ibet_wst_tx_id = Some(tx.tx_id.clone());
                let json = serde_json::to_vec(&token)?;
                token_table.insert(key.as_str(), json.as_slice())?;
            }
        }

        write_txn.commit()?;
        Ok(())
    }

    /// Look up a single record by tx_id.
    pub fn get_tx(&self, tx_id: &str) -> StoreResult<Option<WstTx>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(WST_TRANSACTIONS)?;
        match table.get(tx_id)? {
            Some(value) => Ok(Some(serde_json::from_slice(value.value())?)),
            None => Ok(None),
        }
    }

    /// Persist a mutated record.
    pub fn update_tx(&self, tx: &WstTx) -> StoreResult<()> {
        let json = serde_json::to_vec(tx)?;
        let write_txn = self.db.begin_write()?;
        {
            let mut table = write_txn.open_table(WST_TRANSACTIONS)?;
            if table.get(tx.tx_id.as_str())?.is_none() {
                return Err(StoreError::NotFound(format!("Record {}", tx.tx_id)));
            }
            table.insert(tx.tx_id.as_str(), json.as_slice())?;
        }
        write_txn.commit()?;
        Ok(())
    }

    /// Records awaiting submission: PENDING with no transaction hash.
    pub fn list_pending(&self) -> StoreResult<Vec<WstTx>> {
        self.scan(|tx| tx.status == WstTxStatus::Pending && tx.tx_hash.is_none() && !tx.finalized)
    }

    /// Records awaiting finality: submitted (hash present) but not finalized.
    pub fn list_unfinalized(&self) -> StoreResult<Vec<WstTx>> {
        self.scan(|tx| tx.tx_hash.is_some() && !tx.finalized)
    }

    fn scan(&self, keep: impl Fn(&WstTx) -> bool) -> StoreResult<Vec<WstTx>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(WST_TRANSACTIONS)?;
        let mut out = Vec::new();
        for entry in table.iter()? {
            let entry = entry?;
            let tx: WstTx = serde_json::from_slice(entry.1.value())?;
            if keep(&tx) {
                out.push(tx);
            }
        }
        // Oldest intents first so submission order follows creation order
        out.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(out)
    }

    /// Commit a finalized record together with its reconciliation effects.
    ///
    /// Everything lands in one write transaction: either the record shows
    /// `finalized = true` and every projection mutation is applied, or none
    /// of it is. Callers must pass the record with `finalized` already set.
    pub fn finalize_tx(&self, tx: &WstTx, effects: &[ProjectionEffect]) -> StoreResult<()> {
        let json = serde_json::to_vec(tx)?;

        let write_txn = self.db.begin_write()?;
        {
            let mut table = write_txn.open_table(WST_TRANSACTIONS)?;
            if table.get(tx.tx_id.as_str())?.is_none() {
                return Err(StoreError::NotFound(format!("Record {}", tx.tx_id)));
            }
            table.insert(tx.tx_id.as_str(), json.as_slice())?;
        }
        for effect in effects {
            apply_effect(&write_txn, effect)?;
        }
        write_txn.commit()?;
        Ok(())
    }

    // =========================================================================
    // Token records
    // =========================================================================

    /// Insert or replace an issued-token row.
    pub fn upsert_token(&self, token: &TokenRecord) -> StoreResult<()> {
        let json = serde_json::to_vec(token)?;
        let key = token.token_address.to_lowercase();

        let write_txn = self.db.begin_write()?;
        {
            let mut table = write_txn.open_table(TOKENS)?;
            table.insert(key.as_str(), json.as_slice())?;

            if let Some(wst) = &token.ibet_wst_address {
                let mut index = write_txn.open_table(WST_TOKEN_INDEX)?;
                index.insert(wst.to_lowercase().as_str(), key.as_str())?;
            }
        }
        write_txn.commit()?;
        Ok(())
    }

    /// Look up a token by its ibet token address.
    pub fn get_token(&self, token_address: &str) -> StoreResult<Option<TokenRecord>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(TOKENS)?;
        match table.get(token_address.to_lowercase().as_str())? {
            Some(v) => Ok(Some(serde_json::from_slice(v.value())?)),
            None => Ok(None),
        }
    }

    /// Look up a token by its deployed WST contract address.
    pub fn get_token_by_wst(&self, wst_address: &str) -> StoreResult<Option<TokenRecord>> {
        let read_txn = self.db.begin_read()?;
        let index = read_txn.open_table(WST_TOKEN_INDEX)?;
        let token_address = match index.get(wst_address.to_lowercase().as_str())? {
            Some(v) => v.value().to_string(),
            None => return Ok(None),
        };
        let table = read_txn.open_table(TOKENS)?;
        match table.get(token_address.as_str())? {
            Some(v) => Ok(Some(serde_json::from_slice(v.value())?)),
            None => Ok(None),
        }
    }

    // =========================================================================
    // Projection reads
    // =========================================================================

    /// Whitelist row for an ST account, if present.
    pub fn get_whitelist(
        &self,
        wst_address: &str,
        st_account: &str,
    ) -> StoreResult<Option<WhitelistEntry>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(WHITELIST)?;
        match table.get(account_key(wst_address, st_account).as_str())? {
            Some(v) => Ok(Some(serde_json::from_slice(v.value())?)),
            None => Ok(None),
        }
    }

    /// Trade row at a contract-assigned index, if present.
    pub fn get_trade(&self, wst_address: &str, index: u64) -> StoreResult<Option<TradeRow>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(TRADES)?;
        match table.get(trade_key(wst_address, index).as_str())? {
            Some(v) => Ok(Some(serde_json::from_slice(v.value())?)),
            None => Ok(None),
        }
    }

    /// Mirrored token balance for an account (zero when absent).
    pub fn get_balance(&self, wst_address: &str, account: &str) -> StoreResult<u128> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(BALANCES)?;
        match table.get(account_key(wst_address, account).as_str())? {
            Some(v) => Ok(decode_u128(v.value())),
            None => Ok(0),
        }
    }

    // =========================================================================
    // Issuer credentials
    // =========================================================================

    /// Register (or rotate) an issuer signing key.
    pub fn put_credential(&self, account: &str, private_key_hex: &str) -> StoreResult<()> {
        let key = account.to_lowercase();
        let write_txn = self.db.begin_write()?;
        {
            let mut table = write_txn.open_table(CREDENTIALS)?;
            table.insert(key.as_str(), private_key_hex)?;
        }
        write_txn.commit()?;
        Ok(())
    }

    /// Look up the signing key for an account.
    pub fn get_credential(&self, account: &str) -> StoreResult<Option<String>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(CREDENTIALS)?;
        match table.get(account.to_lowercase().as_str())? {
            Some(v) => Ok(Some(v.value().to_string())),
            None => Ok(None),
        }
    }
}

// =============================================================================
// Effect application
// =============================================================================

fn decode_u128(bytes: &[u8]) -> u128 {
    if bytes.len() >= 16 {
        u128::from_be_bytes(bytes[..16].try_into().unwrap())
    } else {
        0
    }
}

/// Apply one projection mutation inside an open write transaction.
fn apply_effect(write_txn: &redb::WriteTransaction, effect: &ProjectionEffect) -> StoreResult<()> {
    match effect {
        ProjectionEffect::MarkTokenDeployed {
            token_address,
            wst_address,
        } => {
            let key = token_address.to_lowercase();
            let mut table = write_txn.open_table(TOKENS)?;
            let bytes = {
                let existing = table
                    .get(key.as_str())?
                    .ok_or_else(|| StoreError::NotFound(format!("Token {token_address}")))?;
                existing.value().to_vec()
            };
            let mut token: TokenRecord = serde_json::from_slice(&bytes)?;
            token.ibet_wst_deployed = true;
            token.ibet_wst_address = Some(wst_address.clone());
            let json = serde_json::to_vec(&token)?;
            table.insert(key.as_str(), json.as_slice())?;
            drop(table);

            let mut index = write_txn.open_table(WST_TOKEN_INDEX)?;
            index.insert(wst_address.to_lowercase().as_str(), key.as_str())?;
        }
        ProjectionEffect::UpsertWhitelist {
            ibet_wst_address,
            entry,
        } => {
            let json = serde_json::to_vec(entry)?;
            let key = account_key(ibet_wst_address, &entry.st_account_address);
            let mut table = write_txn.open_table(WHITELIST)?;
            table.insert(key.as_str(), json.as_slice())?;
        }
        ProjectionEffect::RemoveWhitelist {
            ibet_wst_address,
            st_account_address,
        } => {
            let key = account_key(ibet_wst_address, st_account_address);
            let mut table = write_txn.open_table(WHITELIST)?;
            table.remove(key.as_str())?;
        }
        ProjectionEffect::CreditBalance {
            ibet_wst_address,
            account_address,
            value,
        } => {
            adjust_balance(write_txn, ibet_wst_address, account_address, |b| {
                b.saturating_add(*value)
            })?;
        }
        ProjectionEffect::DebitBalance {
            ibet_wst_address,
            account_address,
            value,
        } => {
            adjust_balance(write_txn, ibet_wst_address, account_address, |b| {
                b.saturating_sub(*value)
            })?;
        }
        ProjectionEffect::AppendTrade {
            ibet_wst_address,
            seller_st_account_address,
            buyer_st_account_address,
            sc_token_address,
            seller_sc_account_address,
            buyer_sc_account_address,
            st_value,
            sc_value,
            memo,
        } => {
            let wst_key = ibet_wst_address.to_lowercase();

            let mut seq_table = write_txn.open_table(TRADE_SEQ)?;
            let index = match seq_table.get(wst_key.as_str())? {
                Some(v) => {
                    let bytes = v.value();
                    if bytes.len() >= 8 {
                        u64::from_be_bytes(bytes[..8].try_into().unwrap())
                    } else {
                        0
                    }
                }
                None => 0,
            };
            let next = (index + 1).to_be_bytes();
            seq_table.insert(wst_key.as_str(), next.as_slice())?;
            drop(seq_table);

            let row = TradeRow {
                seller_st_account_address: seller_st_account_address.clone(),
                buyer_st_account_address: buyer_st_account_address.clone(),
                sc_token_address: sc_token_address.clone(),
                seller_sc_account_address: seller_sc_account_address.clone(),
                buyer_sc_account_address: buyer_sc_account_address.clone(),
                st_value: *st_value,
                sc_value: *sc_value,
                state: TradeState::Pending,
                memo: memo.clone(),
            };
            let json = serde_json::to_vec(&row)?;
            let key = trade_key(ibet_wst_address, index);
            let mut table = write_txn.open_table(TRADES)?;
            table.insert(key.as_str(), json.as_slice())?;
        }
        ProjectionEffect::SetTradeState {
            ibet_wst_address,
            index,
            state,
        } => {
            let key = trade_key(ibet_wst_address, *index);
            let mut table = write_txn.open_table(TRADES)?;
            let bytes = {
                let existing = table.get(key.as_str())?.ok_or_else(|| {
                    StoreError::NotFound(format!("Trade {ibet_wst_address}#{index}"))
                })?;
                existing.value().to_vec()
            };
            let mut row: TradeRow = serde_json::from_slice(&bytes)?;
            row.state = *state;
            let json = serde_json::to_vec(&row)?;
            table.insert(key.as_str(), json.as_slice())?;
        }
    }
    Ok(())
}

fn adjust_balance(
    write_txn: &redb::WriteTransaction,
    wst_address: &str,
    account: &str,
    f: impl Fn(u128) -> u128,
) -> StoreResult<()> {
    let key = account_key(wst_address, account);
    let mut table = write_txn.open_table(BALANCES)?;
    let current = match table.get(key.as_str())? {
        Some(v) => decode_u128(v.value()),
        None => 0,
    };
    let updated = f(current).to_be_bytes();
    table.insert(key.as_str(), updated.as_slice())?;
    Ok(())
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{WstTxParams, WstTxStatus};

    const WST: &str = "0x1000000000000000000000000000000000000001";
    const RELAYER: &str = "0x2000000000000000000000000000000000000002";
    const ISSUER: &str = "0x3000000000000000000000000000000000000003";
    const TOKEN: &str = "0x4000000000000000000000000000000000000004";

    fn temp_store() -> (WstTxStore, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let store = WstTxStore::open(&dir.path().join("test.redb")).unwrap();
        (store, dir)
    }

    fn mint_tx(tx_id: &str) -> WstTx {
        WstTx::new_pending(
            tx_id.to_string(),
            Some(WST.to_string()),
            WstTxParams::Mint {
                to_address: ISSUER.to_string(),
                value: 1000,
            },
            RELAYER.to_string(),
            Some(ISSUER.to_string()),
            None,
        )
    }

    fn sample_token() -> TokenRecord {
        TokenRecord {
            token_address: TOKEN.to_string(),
            issuer_address: ISSUER.to_string(),
            name: "Bond 2026".to_string(),
            ibet_wst_deployed: false,
            ibet_wst_address: None,
            ibet_wst_tx_id: None,
        }
    }

    #[test]
    fn insert_and_get_record() {
        let (store, _dir) = temp_store();
        store.insert_tx(&mint_tx("tx-1")).unwrap();

        let got = store.get_tx("tx-1").unwrap().unwrap();
        assert_eq!(got.tx_id, "tx-1");
        assert_eq!(got.status, WstTxStatus::Pending);
    }

    #[test]
    fn duplicate_tx_id_is_rejected() {
        let (store, _dir) = temp_store();
        store.insert_tx(&mint_tx("tx-1")).unwrap();
        let result = store.insert_tx(&mint_tx("tx-1"));
        assert!(matches!(result, Err(StoreError::DuplicateTxId(_))));
    }

    #[test]
    fn deploy_insert_links_token_record() {
        let (store, _dir) = temp_store();
        store.upsert_token(&sample_token()).unwrap();

        let tx = WstTx::new_pending(
            "tx-deploy".to_string(),
            None,
            WstTxParams::Deploy {
                name: "Bond 2026".to_string(),
                initial_owner: ISSUER.to_string(),
                token_address: TOKEN.to_string(),
            },
            RELAYER.to_string(),
            None,
            None,
        );
        store.insert_tx(&tx).unwrap();

        let token = store.get_token(TOKEN).unwrap().unwrap();
        assert_eq!(token.ibet_wst_tx_id.as_deref(), Some("tx-deploy"));
        assert!(!token.ibet_wst_deployed);
    }

    #[test]
    fn listings_filter_on_status_and_finality() {
        let (store, _dir) = temp_store();

        let pending = mint_tx("tx-pending");
        store.insert_tx(&pending).unwrap();

        let mut sent = mint_tx("tx-sent");
        sent.mark_sent("0xaaa".to_string());
        store.insert_tx(&sent).unwrap();

        let mut done = mint_tx("tx-done");
        done.mark_sent("0xbbb".to_string());
        done.apply_receipt(true, 10);
        done.mark_finalized();
        store.insert_tx(&done).unwrap();

        let pending_ids: Vec<_> = store
            .list_pending()
            .unwrap()
            .into_iter()
            .map(|t| t.tx_id)
            .collect();
        assert_eq!(pending_ids, vec!["tx-pending"]);

        let unfinalized_ids: Vec<_> = store
            .list_unfinalized()
            .unwrap()
            .into_iter()
            .map(|t| t.tx_id)
            .collect();
        assert_eq!(unfinalized_ids, vec!["tx-sent"]);
    }

    #[test]
    fn finalize_applies_effects_atomically() {
        let (store, _dir) = temp_store();
        store.upsert_token(&sample_token()).unwrap();

        let mut tx = mint_tx("tx-1");
        store.insert_tx(&tx).unwrap();
        tx.mark_sent("0xaaa".to_string());
        tx.apply_receipt(true, 10);
        tx.mark_finalized();

        let effects = vec![
            ProjectionEffect::MarkTokenDeployed {
                token_address: TOKEN.to_string(),
                wst_address: WST.to_string(),
            },
            ProjectionEffect::CreditBalance {
                ibet_wst_address: WST.to_string(),
                account_address: ISSUER.to_string(),
                value: 1000,
            },
        ];
        store.finalize_tx(&tx, &effects).unwrap();

        let stored = store.get_tx("tx-1").unwrap().unwrap();
        assert!(stored.finalized);

        let token = store.get_token(TOKEN).unwrap().unwrap();
        assert!(token.ibet_wst_deployed);
        assert_eq!(token.ibet_wst_address.as_deref(), Some(WST));

        // Reverse index written alongside the flip
        let by_wst = store.get_token_by_wst(WST).unwrap().unwrap();
        assert_eq!(by_wst.token_address, TOKEN);

        assert_eq!(store.get_balance(WST, ISSUER).unwrap(), 1000);
    }

    #[test]
    fn finalize_missing_token_rolls_back() {
        let (store, _dir) = temp_store();

        let mut tx = mint_tx("tx-1");
        store.insert_tx(&tx).unwrap();
        tx.mark_sent("0xaaa".to_string());
        tx.apply_receipt(true, 10);
        tx.mark_finalized();

        let effects = vec![ProjectionEffect::MarkTokenDeployed {
            token_address: TOKEN.to_string(),
            wst_address: WST.to_string(),
        }];
        assert!(store.finalize_tx(&tx, &effects).is_err());

        // The record must still be unfinalized so the monitor retries
        let stored = store.get_tx("tx-1").unwrap().unwrap();
        assert!(!stored.finalized);
    }

    #[test]
    fn whitelist_round_trip() {
        let (store, _dir) = temp_store();
        let mut tx = mint_tx("tx-1");
        store.insert_tx(&tx).unwrap();
        tx.mark_sent("0xaaa".to_string());
        tx.apply_receipt(true, 10);
        tx.mark_finalized();

        let entry = WhitelistEntry {
            st_account_address: ISSUER.to_string(),
            sc_account_in_address: RELAYER.to_string(),
            sc_account_out_address: RELAYER.to_string(),
        };
        store
            .finalize_tx(
                &tx,
                &[ProjectionEffect::UpsertWhitelist {
                    ibet_wst_address: WST.to_string(),
                    entry: entry.clone(),
                }],
            )
            .unwrap();
        assert_eq!(store.get_whitelist(WST, ISSUER).unwrap(), Some(entry));

        let mut tx2 = mint_tx("tx-2");
        store.insert_tx(&tx2).unwrap();
        tx2.mark_sent("0xbbb".to_string());
        tx2.apply_receipt(true, 11);
        tx2.mark_finalized();
        store
            .finalize_tx(
                &tx2,
                &[ProjectionEffect::RemoveWhitelist {
                    ibet_wst_address: WST.to_string(),
                    st_account_address: ISSUER.to_string(),
                }],
            )
            .unwrap();
        assert_eq!(store.get_whitelist(WST, ISSUER).unwrap(), None);
    }

    #[test]
    fn trades_get_sequential_indexes() {
        let (store, _dir) = temp_store();

        for (i, hash) in ["0xaaa", "0xbbb"].iter().enumerate() {
            let mut tx = mint_tx(&format!("tx-{i}"));
            store.insert_tx(&tx).unwrap();
            tx.mark_sent(hash.to_string());
            tx.apply_receipt(true, 10 + i as u64);
            tx.mark_finalized();
            store
                .finalize_tx(
                    &tx,
                    &[ProjectionEffect::AppendTrade {
                        ibet_wst_address: WST.to_string(),
                        seller_st_account_address: ISSUER.to_string(),
                        buyer_st_account_address: RELAYER.to_string(),
                        sc_token_address: TOKEN.to_string(),
                        seller_sc_account_address: ISSUER.to_string(),
                        buyer_sc_account_address: RELAYER.to_string(),
                        st_value: 10 * (i as u128 + 1),
                        sc_value: 100,
                        memo: String::new(),
                    }],
                )
                .unwrap();
        }

        assert_eq!(store.get_trade(WST, 0).unwrap().unwrap().st_value, 10);
        assert_eq!(store.get_trade(WST, 1).unwrap().unwrap().st_value, 20);
        assert!(store.get_trade(WST, 2).unwrap().is_none());
    }

    #[test]
    fn trade_state_transition() {
        let (store, _dir) = temp_store();

        let mut tx = mint_tx("tx-1");
        store.insert_tx(&tx).unwrap();
        tx.mark_sent("0xaaa".to_string());
        tx.apply_receipt(true, 10);
        tx.mark_finalized();
        store
            .finalize_tx(
                &tx,
                &[ProjectionEffect::AppendTrade {
                    ibet_wst_address: WST.to_string(),
                    seller_st_account_address: ISSUER.to_string(),
                    buyer_st_account_address: RELAYER.to_string(),
                    sc_token_address: TOKEN.to_string(),
                    seller_sc_account_address: ISSUER.to_string(),
                    buyer_sc_account_address: RELAYER.to_string(),
                    st_value: 10,
                    sc_value: 100,
                    memo: String::new(),
                }],
            )
            .unwrap();

        let mut tx2 = mint_tx("tx-2");
        store.insert_tx(&tx2).unwrap();
        tx2.mark_sent("0xbbb".to_string());
        tx2.apply_receipt(true, 11);
        tx2.mark_finalized();
        store
            .finalize_tx(
                &tx2,
                &[ProjectionEffect::SetTradeState {
                    ibet_wst_address: WST.to_string(),
                    index: 0,
                    state: TradeState::Executed,
                }],
            )
            .unwrap();

        let trade = store.get_trade(WST, 0).unwrap().unwrap();
        assert_eq!(trade.state, TradeState::Executed);
    }

    #[test]
    fn balance_debit_saturates_at_zero() {
        let (store, _dir) = temp_store();

        let mut tx = mint_tx("tx-1");
        store.insert_tx(&tx).unwrap();
        tx.mark_sent("0xaaa".to_string());
        tx.apply_receipt(true, 10);
        tx.mark_finalized();
        store
            .finalize_tx(
                &tx,
                &[
                    ProjectionEffect::CreditBalance {
                        ibet_wst_address: WST.to_string(),
                        account_address: ISSUER.to_string(),
                        value: 100,
                    },
                    ProjectionEffect::DebitBalance {
                        ibet_wst_address: WST.to_string(),
                        account_address: ISSUER.to_string(),
                        value: 500,
                    },
                ],
            )
            .unwrap();
        assert_eq!(store.get_balance(WST, ISSUER).unwrap(), 0);
    }

    #[test]
    fn credential_round_trip() {
        let (store, _dir) = temp_store();
        store
            .put_credential(ISSUER, "4c0883a69102937d6231471b5dbb6204fe5129617082792ae468d01a3f362318")
            .unwrap();
        // Case insensitive lookup
        let key = store.get_credential(&ISSUER.to_uppercase()).unwrap();
        assert!(key.is_some());
    }
}
