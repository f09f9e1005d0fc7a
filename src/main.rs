//! Wallet-Sweep CLI Application
//!
//! A command-line interface for planning and executing sweeps against a
//! local ledger.

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use wallet_sweep::cli::{self, AppState};
use wallet_sweep::config::SweepConfig;
use wallet_sweep::core::Priority;
use wallet_sweep::logging;

#[derive(Parser)]
#[command(name = "sweep")]
#[command(version = "0.1.0")]
#[command(about = "Proportional multi-destination wallet sweeps", long_about = None)]
struct Cli {
    /// Data directory for the ledger and configuration
    #[arg(short, long, default_value = ".sweep_data")]
    data_dir: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize a new ledger
    Init {
        /// Unlocked balance in atomic units
        #[arg(short, long)]
        balance: u64,

        /// Locked balance in atomic units
        #[arg(short, long, default_value = "0")]
        locked: u64,

        /// Fee rate in atomic units per byte
        #[arg(long)]
        fee_per_byte: Option<u64>,

        /// Replace an existing ledger
        #[arg(long)]
        force: bool,
    },

    /// Show balances
    Balance,

    /// Unlock all locked funds
    Unlock,

    /// List ledger backups
    Backups,

    /// Replace the ledger with a backup
    Restore {
        /// Backup number (0 is the most recent)
        #[arg(short, long, default_value = "0")]
        backup: usize,
    },

    /// Estimate the fee of a proportional sweep
    Estimate {
        /// Destination as ADDRESS:RATIO (repeatable)
        #[arg(short, long = "to", value_parser = cli::parse_destination, required = true)]
        to: Vec<(String, f64)>,

        /// Transaction priority (default, low, medium, high)
        #[arg(short, long)]
        priority: Option<Priority>,
    },

    /// Print the sweep plan as JSON without spending
    Plan {
        /// Destination as ADDRESS:RATIO (repeatable)
        #[arg(short, long = "to", value_parser = cli::parse_destination, required = true)]
        to: Vec<(String, f64)>,

        /// Transaction priority (default, low, medium, high)
        #[arg(short, long)]
        priority: Option<Priority>,

        /// Plan against this balance instead of the ledger (needs --fee)
        #[arg(long, requires = "fee")]
        balance: Option<u64>,

        /// Fee to plan with (needs --balance)
        #[arg(long, requires = "balance")]
        fee: Option<u64>,
    },

    /// Sweep the unlocked balance to several destinations
    Sweep {
        /// Destination as ADDRESS:RATIO (repeatable)
        #[arg(short, long = "to", value_parser = cli::parse_destination, required = true)]
        to: Vec<(String, f64)>,

        /// Transaction priority (default, low, medium, high)
        #[arg(short, long)]
        priority: Option<Priority>,
    },

    /// Send an amount to one address
    Transfer {
        /// Recipient's address
        #[arg(short, long)]
        to: String,

        /// Amount in atomic units
        #[arg(short, long)]
        amount: u64,
    },

    /// Sweep all unlocked funds to one address
    SweepAll {
        /// Recipient's address
        #[arg(short, long)]
        to: String,
    },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let mut config = SweepConfig::load(&cli.data_dir)?;

    // Initialize logger
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(&config.log_filter))
        .init();

    let config_path = SweepConfig::path(&cli.data_dir);
    if config_path.exists() {
        log::debug!("Loaded configuration from {:?}", config_path);
    }

    if logging::install(&config.log_channel) {
        log::debug!("Forwarding engine logs to target {}", config.log_channel);
    }

    let result = run(cli.command, &mut config);

    logging::uninstall();
    result
}

fn run(command: Commands, config: &mut SweepConfig) -> cli::CliResult<()> {
    // Commands that don't need a loaded ledger
    match command {
        Commands::Init {
            balance,
            locked,
            fee_per_byte,
            force,
        } => {
            if let Some(fee_per_byte) = fee_per_byte {
                config.fee_per_byte = fee_per_byte;
            }
            return cli::cmd_init(config, balance, locked, force);
        }
        Commands::Plan {
            to,
            priority,
            balance,
            fee,
        } => {
            let offline = balance.zip(fee);
            return cli::cmd_plan(config, &to, priority, offline);
        }
        Commands::Backups => return cli::cmd_backups(config),
        Commands::Restore { backup } => return cli::cmd_restore(config, backup),
        _ => {}
    }

    let mut state = AppState::new(config.clone())?;

    match command {
        Commands::Init { .. }
        | Commands::Plan { .. }
        | Commands::Backups
        | Commands::Restore { .. } => unreachable!(),
        Commands::Balance => cli::cmd_balance(&state)?,
        Commands::Unlock => cli::cmd_unlock(&mut state)?,
        Commands::Estimate { to, priority } => cli::cmd_estimate(&state, &to, priority)?,
        Commands::Sweep { to, priority } => cli::cmd_sweep(&mut state, &to, priority)?,
        Commands::Transfer { to, amount } => cli::cmd_transfer(&mut state, &to, amount)?,
        Commands::SweepAll { to } => cli::cmd_sweep_all(&mut state, &to)?,
    }

    Ok(())
}
