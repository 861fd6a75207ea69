//! # CLI Interface
//!
//! Defines the command-line argument structure for `estate-node` using
//! `clap` derive. Supports four subcommands: `run`, `init`, `invoke`,
//! and `version`.

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

use estate_ledger::config::{DEFAULT_METRICS_PORT, DEFAULT_RPC_PORT};

use crate::logging::LogFormat;

/// Estate ledger node.
///
/// Serves the asset registry, sale and donation workflows over HTTP and
/// JSON-RPC, backed by an on-disk world state.
#[derive(Parser, Debug)]
#[command(
    name = "estate-node",
    about = "Estate ledger node",
    version,
    propagate_version = true
)]
pub struct EstateNodeCli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Serve the HTTP and JSON-RPC API.
    Run(RunArgs),
    /// Create the data directory and seed genesis accounts.
    Init(InitArgs),
    /// Run one invocation against the data directory and print the result.
    Invoke(InvokeArgs),
    /// Print version information and exit.
    Version,
}

/// Where the world state lives and how to seed it.
#[derive(Args, Debug, Clone)]
pub struct LedgerArgs {
    /// Node data directory. The world state is kept under `ledger/`.
    #[arg(long, short = 'd', env = "ESTATE_DATA_DIR", default_value = "./estate-data")]
    pub data_dir: PathBuf,

    /// JSON file with the genesis accounts. A built-in set is used when
    /// omitted.
    #[arg(long, env = "ESTATE_GENESIS")]
    pub genesis: Option<PathBuf>,

    /// Log output format.
    #[arg(long, env = "ESTATE_LOG_FORMAT", value_enum, default_value_t = LogFormat::Pretty)]
    pub log_format: LogFormat,
}

/// Arguments for the `run` subcommand.
#[derive(Args, Debug)]
pub struct RunArgs {
    #[command(flatten)]
    pub ledger: LedgerArgs,

    /// Port for the HTTP and JSON-RPC API.
    #[arg(long, env = "ESTATE_RPC_PORT", default_value_t = DEFAULT_RPC_PORT)]
    pub rpc_port: u16,

    /// Port for the Prometheus metrics endpoint.
    #[arg(long, env = "ESTATE_METRICS_PORT", default_value_t = DEFAULT_METRICS_PORT)]
    pub metrics_port: u16,
}

/// Arguments for the `init` subcommand.
#[derive(Args, Debug)]
pub struct InitArgs {
    #[command(flatten)]
    pub ledger: LedgerArgs,
}

/// Arguments for the `invoke` subcommand.
#[derive(Args, Debug)]
pub struct InvokeArgs {
    #[command(flatten)]
    pub ledger: LedgerArgs,

    /// Function name, e.g. `queryRealEstateList`.
    pub function: String,

    /// Positional string arguments passed to the function.
    #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
    pub args: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn verify_cli_structure() {
        EstateNodeCli::command().debug_assert();
    }

    #[test]
    fn invoke_collects_trailing_args() {
        let cli = EstateNodeCli::try_parse_from([
            "estate-node",
            "invoke",
            "--data-dir",
            "/tmp/estate",
            "createSaleOffer",
            "1700000000",
            "seller",
            "100",
            "30",
        ])
        .unwrap();
        match cli.command {
            Commands::Invoke(args) => {
                assert_eq!(args.function, "createSaleOffer");
                assert_eq!(args.args, vec!["1700000000", "seller", "100", "30"]);
                assert_eq!(args.ledger.data_dir, PathBuf::from("/tmp/estate"));
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn run_defaults() {
        let cli = EstateNodeCli::try_parse_from(["estate-node", "run", "--log-format", "json"])
            .unwrap();
        match cli.command {
            Commands::Run(args) => {
                assert_eq!(args.rpc_port, DEFAULT_RPC_PORT);
                assert_eq!(args.metrics_port, DEFAULT_METRICS_PORT);
                assert_eq!(args.ledger.log_format, LogFormat::Json);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }
}
