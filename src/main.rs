// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

use wst_relay::chain::EthRpcClient;
use wst_relay::config::Config;
use wst_relay::credentials::StoreCredentials;
use wst_relay::monitor::TxMonitor;
use wst_relay::store::WstTxStore;

#[tokio::main]
async fn main() {
    let config = Config::from_env().expect("Failed to load configuration");
    init_tracing(&config.log_format);

    let deploy_bytecode = config
        .load_deploy_bytecode()
        .expect("Failed to load WST creation code");

    let store = Arc::new(WstTxStore::open(&config.store_path()).expect("Failed to open store"));

    let relayer =
        EthRpcClient::create_signer(&config.relayer_private_key).expect("Invalid relayer key");
    tracing::info!(relayer = %relayer.address(), network = %config.network.name, "Relayer configured");

    let chain = EthRpcClient::new(config.network.clone()).expect("Failed to build RPC client");
    let credentials = Arc::new(StoreCredentials::new(store.clone(), relayer));

    let monitor = TxMonitor::new(
        store,
        chain,
        credentials,
        config.monitor.clone(),
        deploy_bytecode,
    );

    let shutdown = CancellationToken::new();
    let handle = tokio::spawn(monitor.run(shutdown.clone()));

    tokio::signal::ctrl_c()
        .await
        .expect("Failed to listen for shutdown signal");
    tracing::info!("Shutdown signal received");
    shutdown.cancel();

    let _ = handle.await;
    tracing::info!("WST relay stopped");
}

fn init_tracing(format: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    if format == "json" {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}
