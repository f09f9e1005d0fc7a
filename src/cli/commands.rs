//! CLI commands for the sweep tool
//!
//! Implements all command handlers for the CLI interface.

use crate::config::SweepConfig;
use crate::core::fee::{FeeModel, Priority};
use crate::core::sweep::{plan_sweep, SweepPlan};
use crate::storage::Storage;
use crate::wallet::{LedgerEngine, LedgerState, TxReceipt, Wallet};

/// Result type for CLI operations
pub type CliResult<T> = Result<T, Box<dyn std::error::Error>>;

/// Application state
pub struct AppState {
    pub config: SweepConfig,
    pub storage: Storage,
    pub wallet: Wallet<LedgerEngine>,
}

impl AppState {
    /// Load the ledger described by `config`
    pub fn new(config: SweepConfig) -> CliResult<Self> {
        let storage = Storage::new(config.storage_config())?;

        if !storage.exists() {
            return Err(format!(
                "No ledger at {:?}. Create one with: sweep init --balance <amount>",
                storage.ledger_path()
            )
            .into());
        }

        let engine = LedgerEngine::new(storage.load()?);
        let wallet = Wallet::with_priority(engine, config.priority);

        Ok(Self {
            config,
            storage,
            wallet,
        })
    }

    /// Save the current state
    pub fn save(&self) -> CliResult<()> {
        self.storage.save(self.wallet.engine().state())?;
        Ok(())
    }
}

/// Parse a `ADDRESS:RATIO` destination argument
pub fn parse_destination(arg: &str) -> Result<(String, f64), String> {
    let (address, ratio) = arg
        .rsplit_once(':')
        .ok_or_else(|| format!("expected ADDRESS:RATIO, got `{}`", arg))?;
    let ratio: f64 = ratio
        .trim()
        .parse()
        .map_err(|_| format!("invalid ratio `{}`", ratio))?;
    Ok((address.trim().to_string(), ratio))
}

/// Split parsed destinations into addresses and ratios
pub fn split_destinations(destinations: &[(String, f64)]) -> (Vec<String>, Vec<f64>) {
    destinations.iter().cloned().unzip()
}

/// Initialize a new ledger
pub fn cmd_init(config: &SweepConfig, balance: u64, locked: u64, force: bool) -> CliResult<()> {
    let storage = Storage::new(config.storage_config())?;

    if storage.exists() && !force {
        println!("⚠️  Ledger already exists at {:?}", storage.ledger_path());
        println!("   Use --force to reinitialize (the old ledger is kept as a backup)");
        return Ok(());
    }

    let ledger = LedgerState::new(balance, locked, FeeModel::new(config.fee_per_byte));
    storage.save(&ledger)?;

    println!("✅ Ledger initialized!");
    println!("   📁 Data directory: {:?}", config.data_dir);
    println!("   💰 Unlocked: {}", balance);
    println!("   🔒 Locked: {}", locked);
    println!("   🔧 Fee rate: {} per byte", config.fee_per_byte);

    Ok(())
}

/// Show balances
pub fn cmd_balance(state: &AppState) -> CliResult<()> {
    let wallet = &state.wallet;

    println!("💰 Balance");
    println!("   ├─ Unlocked: {}", wallet.unlocked_balance());
    println!("   ├─ Total: {}", wallet.total_balance());
    println!("   └─ Height: {}", wallet.blockchain_height());

    Ok(())
}

/// Move locked funds to the unlocked balance
pub fn cmd_unlock(state: &mut AppState) -> CliResult<()> {
    let amount = state.wallet.engine_mut().unlock_all();
    state.save()?;

    println!("🔓 Unlocked {} atomic units", amount);

    Ok(())
}

/// Show the fee of a proportional sweep
pub fn cmd_estimate(
    state: &AppState,
    destinations: &[(String, f64)],
    priority: Option<Priority>,
) -> CliResult<()> {
    let (addresses, ratios) = split_destinations(destinations);
    let priority = priority.unwrap_or(state.config.priority);

    let fee = state
        .wallet
        .estimate_sweep_fee(&addresses, &ratios, priority)?;

    println!("🧮 Sweep fee estimate");
    println!("   ├─ Destinations: {}", addresses.len());
    println!("   ├─ Priority: {}", priority);
    println!("   └─ Fee: {}", fee);

    Ok(())
}

/// Print a sweep plan as JSON. With both `balance` and `fee` given the plan
/// is computed offline, without touching the ledger.
pub fn cmd_plan(
    config: &SweepConfig,
    destinations: &[(String, f64)],
    priority: Option<Priority>,
    offline: Option<(u64, u64)>,
) -> CliResult<()> {
    let (addresses, ratios) = split_destinations(destinations);

    let plan: SweepPlan = match offline {
        Some((balance, fee)) => plan_sweep(&addresses, &ratios, balance, fee)?,
        None => {
            let state = AppState::new(config.clone())?;
            let priority = priority.unwrap_or(config.priority);
            state.wallet.plan_sweep(&addresses, &ratios, priority)?
        }
    };

    println!("{}", serde_json::to_string_pretty(&plan)?);

    Ok(())
}

/// Sweep the unlocked balance to several destinations
pub fn cmd_sweep(
    state: &mut AppState,
    destinations: &[(String, f64)],
    priority: Option<Priority>,
) -> CliResult<()> {
    let (addresses, ratios) = split_destinations(destinations);
    let priority = priority.unwrap_or(state.config.priority);

    let receipt = state.wallet.sweep_multi(&addresses, &ratios, priority)?;
    state.save()?;

    print_receipt("🧹 Sweep committed", &receipt);

    Ok(())
}

/// Send an amount to one address
pub fn cmd_transfer(state: &mut AppState, address: &str, amount: u64) -> CliResult<()> {
    let receipt = state.wallet.transfer(address, amount)?;
    state.save()?;

    print_receipt("📤 Transfer committed", &receipt);

    Ok(())
}

/// Sweep everything to one address
pub fn cmd_sweep_all(state: &mut AppState, address: &str) -> CliResult<()> {
    let txids = state.wallet.sweep(address)?;
    state.save()?;

    println!("🧹 Swept all funds to {}", address);
    for txid in txids {
        println!("   └─ {}", txid);
    }

    Ok(())
}

/// List ledger backups, most recent first
pub fn cmd_backups(config: &SweepConfig) -> CliResult<()> {
    let storage = Storage::new(config.storage_config())?;
    let backups = storage.backups()?;

    if backups.is_empty() {
        println!("📭 No backups in {:?}", config.data_dir);
        return Ok(());
    }

    println!("🗄️  Backups ({}):", backups.len());
    for backup in &backups {
        let ledger = &backup.ledger;
        println!(
            "   ├─ #{} unlocked {} | locked {} | height {} | {} tx(s)",
            backup.index,
            ledger.unlocked,
            ledger.locked,
            ledger.height,
            ledger.transactions.len()
        );
    }

    Ok(())
}

/// Replace the current ledger with a backup
pub fn cmd_restore(config: &SweepConfig, index: usize) -> CliResult<()> {
    let storage = Storage::new(config.storage_config())?;
    let ledger = storage.restore(index)?;

    println!("♻️  Restored backup #{}", index);
    println!("   ├─ Unlocked: {}", ledger.unlocked);
    println!("   └─ Height: {}", ledger.height);
    println!("   The replaced ledger is now backup #0");

    Ok(())
}

fn print_receipt(title: &str, receipt: &TxReceipt) {
    println!("{}", title);
    println!("   ├─ TxID: {}", receipt.txid);
    println!("   ├─ Tx key: {}", receipt.tx_key);
    println!("   ├─ Height: {}", receipt.height);
    println!("   ├─ Fee: {}", receipt.fee);
    println!("   └─ Outputs:");
    for output in &receipt.outputs {
        println!("      └─ {} = {}", output.address, output.amount);
    }
}
