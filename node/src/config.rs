//! Node configuration.
//!
//! Built once from the parsed CLI and passed by value into the server and
//! subcommands. Nothing reads configuration from global state.

use std::net::{Ipv4Addr, SocketAddr};
use std::path::PathBuf;

use estate_ledger::config::{DEFAULT_METRICS_PORT, DEFAULT_RPC_PORT};

use crate::cli::{LedgerArgs, RunArgs};
use crate::logging::LogFormat;

/// Subdirectory of the data dir that holds the sled database.
const LEDGER_DIR: &str = "ledger";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeConfig {
    pub data_dir: PathBuf,
    pub genesis: Option<PathBuf>,
    pub log_format: LogFormat,
    pub rpc_port: u16,
    pub metrics_port: u16,
}

impl NodeConfig {
    /// Configuration for subcommands that only touch the ledger.
    pub fn from_ledger_args(args: &LedgerArgs) -> Self {
        Self {
            data_dir: args.data_dir.clone(),
            genesis: args.genesis.clone(),
            log_format: args.log_format,
            rpc_port: DEFAULT_RPC_PORT,
            metrics_port: DEFAULT_METRICS_PORT,
        }
    }

    pub fn from_run_args(args: &RunArgs) -> Self {
        Self {
            rpc_port: args.rpc_port,
            metrics_port: args.metrics_port,
            ..Self::from_ledger_args(&args.ledger)
        }
    }

    /// Directory of the sled world state.
    pub fn ledger_path(&self) -> PathBuf {
        self.data_dir.join(LEDGER_DIR)
    }

    pub fn rpc_addr(&self) -> SocketAddr {
        SocketAddr::from((Ipv4Addr::UNSPECIFIED, self.rpc_port))
    }

    pub fn metrics_addr(&self) -> SocketAddr {
        SocketAddr::from((Ipv4Addr::UNSPECIFIED, self.metrics_port))
    }
}
