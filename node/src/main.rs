// Copyright (c) 2026 ALAS Technology. MIT License.
// See LICENSE for details.

//! # Estate Node
//!
//! Entry point for the `estate-node` binary. Parses CLI arguments,
//! initializes logging and metrics, opens the world state, and serves the
//! invocation API.
//!
//! The binary supports four subcommands:
//!
//! - `run`     — serve the HTTP and JSON-RPC API
//! - `init`    — create the data directory and seed genesis accounts
//! - `invoke`  — run one invocation locally and print the result
//! - `version` — print build version information

mod api;
mod cli;
mod config;
mod genesis;
mod logging;
mod metrics;

use anyhow::{Context, Result};
use chrono::Utc;
use clap::Parser;
use std::io::Write;
use std::sync::Arc;
use tokio::signal;

use estate_contracts::Handler;
use estate_ledger::{SledStore, TxContext};

use cli::{Commands, EstateNodeCli};
use config::NodeConfig;
use metrics::NodeMetrics;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = EstateNodeCli::parse();

    match cli.command {
        Commands::Run(args) => run_node(NodeConfig::from_run_args(&args)).await,
        Commands::Init(args) => init_node(NodeConfig::from_ledger_args(&args.ledger)),
        Commands::Invoke(args) => invoke_once(
            NodeConfig::from_ledger_args(&args.ledger),
            &args.function,
            &args.args,
        ),
        Commands::Version => {
            print_version();
            Ok(())
        }
    }
}

/// Opens the world state under the data directory and seeds genesis
/// accounts if none exist yet.
fn open_ledger(config: &NodeConfig) -> Result<Handler<SledStore>> {
    let path = config.ledger_path();
    std::fs::create_dir_all(&path)
        .with_context(|| format!("failed to create ledger directory: {}", path.display()))?;

    let store = SledStore::open(&path)
        .with_context(|| format!("failed to open world state at {}", path.display()))?;
    tracing::info!(path = %path.display(), "world state opened");

    let handler = Handler::new(store);
    let accounts = genesis::load(config.genesis.as_deref())?;
    genesis::seed(&handler, &accounts)?;
    Ok(handler)
}

/// Serves the API and metrics endpoints until a shutdown signal arrives.
async fn run_node(config: NodeConfig) -> Result<()> {
    logging::init_logging(
        "estate_node=info,estate_contracts=info,estate_ledger=info,tower_http=debug",
        config.log_format,
    );

    tracing::info!(
        rpc_port = config.rpc_port,
        metrics_port = config.metrics_port,
        data_dir = %config.data_dir.display(),
        "starting estate-node"
    );

    let handler = open_ledger(&config)?;
    let node_metrics = Arc::new(NodeMetrics::new().context("failed to register metrics")?);

    let app_state = api::AppState::new(
        format!(
            "{} (ledger {})",
            env!("CARGO_PKG_VERSION"),
            estate_ledger::config::LEDGER_VERSION,
        ),
        handler,
        Arc::clone(&node_metrics),
    );

    // --- API server ---
    let api_router = api::create_router(app_state.clone());
    let api_addr = config.rpc_addr();
    let api_listener = tokio::net::TcpListener::bind(api_addr)
        .await
        .with_context(|| format!("failed to bind RPC listener on {}", api_addr))?;
    tracing::info!("RPC/API server listening on {}", api_addr);

    // --- Metrics server ---
    let metrics_router = axum::Router::new()
        .route("/metrics", axum::routing::get(metrics::metrics_handler))
        .with_state(Arc::clone(&node_metrics));
    let metrics_addr = config.metrics_addr();
    let metrics_listener = tokio::net::TcpListener::bind(metrics_addr)
        .await
        .with_context(|| format!("failed to bind metrics listener on {}", metrics_addr))?;
    tracing::info!("Metrics server listening on {}", metrics_addr);

    // --- Serve ---
    tokio::select! {
        res = axum::serve(api_listener, api_router) => {
            if let Err(e) = res {
                tracing::error!("API server error: {}", e);
            }
        }
        res = axum::serve(metrics_listener, metrics_router) => {
            if let Err(e) = res {
                tracing::error!("Metrics server error: {}", e);
            }
        }
        _ = shutdown_signal() => {
            tracing::info!("shutdown signal received, draining connections");
        }
    }

    app_state
        .handler
        .store()
        .flush()
        .context("failed to flush world state")?;
    tracing::info!("estate-node stopped");
    Ok(())
}

/// Creates the data directory and seeds the genesis accounts.
fn init_node(config: NodeConfig) -> Result<()> {
    logging::init_logging("estate_node=info,estate_contracts=info", config.log_format);

    let handler = open_ledger(&config)?;
    let store = handler.store();
    store.flush().context("failed to flush world state")?;

    println!("Ledger initialized.");
    println!("  Data directory : {}", config.data_dir.display());
    println!("  World state    : {}", config.ledger_path().display());
    println!("  Records        : {}", store.len());
    Ok(())
}

/// Runs one invocation against the local world state and prints the JSON
/// result to stdout.
fn invoke_once(config: NodeConfig, function: &str, args: &[String]) -> Result<()> {
    logging::init_logging("estate_node=warn,estate_contracts=warn", config.log_format);

    let handler = open_ledger(&config)?;
    let ctx = TxContext::new(uuid::Uuid::new_v4().to_string(), Utc::now());
    let invoked = handler
        .invoke(ctx, function, args)
        .map_err(|e| anyhow::anyhow!("{} failed ({}): {}", function, e.kind(), e))?;
    handler
        .store()
        .flush()
        .context("failed to flush world state")?;

    let mut stdout = std::io::stdout().lock();
    serde_json::to_writer_pretty(&mut stdout, &invoked.result)?;
    writeln!(stdout)?;
    stdout.flush()?;
    Ok(())
}

/// Prints version information to stdout.
fn print_version() {
    println!("estate-node {}", env!("CARGO_PKG_VERSION"));
    println!("ledger      {}", estate_ledger::config::LEDGER_VERSION);
    println!("rustc       {}", rustc_version());
}

/// Returns the Rust compiler version used to build this binary.
fn rustc_version() -> &'static str {
    option_env!("RUSTC_VERSION").unwrap_or("unknown")
}

/// Waits for SIGINT (Ctrl+C) or SIGTERM, whichever comes first.
///
/// A handler that cannot be installed is logged and never fires.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!("failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}
