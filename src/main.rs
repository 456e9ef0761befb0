use analytics::PortfolioReport;
use clap::{Args, Parser, Subcommand};
use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use configuration::{LogFormat, StorageBackend};
use core_types::{Account, Instrument, Lot, Transaction};
use rust_decimal::Decimal;
use serde::Serialize;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use uuid::Uuid;
use web_server::AppState;

/// The main entry point for the Folio position-accounting application.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file, if there is one.
    dotenvy::dotenv().ok();

    // Parse command-line arguments
    let cli = Cli::parse();

    let mut config = configuration::load_config_from(&cli.config)?;
    if let Some(backend) = cli.storage {
        config.storage.backend = backend;
    }
    if let Some(format) = cli.log_format {
        config.logging.format = format;
    }
    let _guard = configuration::init_tracing(&config.logging)?;

    // Execute the appropriate command
    match cli.command {
        Commands::Serve { addr } => {
            let addr = match addr {
                Some(addr) => addr,
                None => config.server.socket_addr()?,
            };
            web_server::run_server(&config, addr).await
        }
        Commands::Migrate => {
            let pool = database::connect(&config.database).await?;
            database::run_migrations(&pool).await?;
            println!("Migrations applied.");
            Ok(())
        }
        Commands::Ledger(command) => {
            if config.storage.backend == StorageBackend::Memory {
                tracing::warn!(
                    "The in-memory ledger does not outlive this command; use --storage postgres to keep state."
                );
            }
            let store = web_server::build_store(&config).await?;
            let state = Arc::new(AppState::new(store, config.account.clone()));
            run_command(&state, command, cli.json).await
        }
    }
}

// ==============================================================================
// CLI Structure
// ==============================================================================

/// Lot-based position accounting: buy, sell first-in-first-out, and value holdings.
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Configuration file to read. Missing files fall back to defaults.
    #[arg(long, global = true, default_value = "config.toml")]
    config: PathBuf,

    /// Overrides `storage.backend` from the configuration.
    #[arg(long, global = true, value_enum)]
    storage: Option<StorageBackend>,

    /// Overrides `logging.format` from the configuration.
    #[arg(long, global = true, value_enum)]
    log_format: Option<LogFormat>,

    /// Print results as JSON instead of tables.
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the HTTP API.
    Serve {
        /// Listen address; defaults to `server.host:server.port`.
        #[arg(long)]
        addr: Option<SocketAddr>,
    },
    /// Apply the PostgreSQL schema migrations.
    Migrate,
    #[command(flatten)]
    Ledger(LedgerCommand),
}

/// Commands that read or write the ledger through the services.
#[derive(Subcommand)]
enum LedgerCommand {
    /// Manage tradable instruments.
    #[command(subcommand)]
    Instrument(InstrumentCommand),
    /// Feed market prices.
    #[command(subcommand)]
    Price(PriceCommand),
    /// Open and inspect accounts.
    #[command(subcommand)]
    Account(AccountCommand),
    /// Buy shares, opening a new lot.
    Buy(TradeArgs),
    /// Sell shares from the oldest lots first.
    Sell(TradeArgs),
    /// Show holdings valued at current prices.
    Positions { account_id: Uuid },
    /// Show the transaction history, newest first.
    History { account_id: Uuid },
    /// Show every lot, including fully sold ones.
    Lots { account_id: Uuid },
    /// Recompute the account's cached total value from current prices.
    Revalue { account_id: Uuid },
}

#[derive(Subcommand)]
enum InstrumentCommand {
    /// Register a new instrument.
    Add {
        symbol: String,
        name: String,
        price: Decimal,
        #[arg(long, default_value = "")]
        sector: String,
    },
    /// List all instruments.
    List,
}

#[derive(Subcommand)]
enum PriceCommand {
    /// Set an instrument's current price.
    Set { symbol: String, price: Decimal },
}

#[derive(Subcommand)]
enum AccountCommand {
    /// Open an account funded with `account.initial_cash`.
    Open { name: String },
    /// Show an account's balances.
    Show { account_id: Uuid },
}

#[derive(Args)]
struct TradeArgs {
    account_id: Uuid,
    symbol: String,
    quantity: i64,
    price: Decimal,
}

// ==============================================================================
// Command Logic
// ==============================================================================

async fn run_command(state: &AppState, command: LedgerCommand, json: bool) -> anyhow::Result<()> {
    match command {
        LedgerCommand::Instrument(InstrumentCommand::Add {
            symbol,
            name,
            price,
            sector,
        }) => {
            let instrument = state
                .instruments
                .register(&symbol, &name, &sector, price)
                .await?;
            emit(json, &instrument, || instruments_table(std::slice::from_ref(&instrument)))
        }
        LedgerCommand::Instrument(InstrumentCommand::List) => {
            let instruments = state.instruments.list().await?;
            emit(json, &instruments, || instruments_table(&instruments))
        }
        LedgerCommand::Price(PriceCommand::Set { symbol, price }) => {
            let instrument = state.instruments.update_price(&symbol, price).await?;
            emit(json, &instrument, || instruments_table(std::slice::from_ref(&instrument)))
        }
        LedgerCommand::Account(AccountCommand::Open { name }) => {
            let account = state.portfolio.open_account(&name).await?;
            emit(json, &account, || account_table(&account))
        }
        LedgerCommand::Account(AccountCommand::Show { account_id }) => {
            let account = state.portfolio.account(account_id).await?;
            emit(json, &account, || account_table(&account))
        }
        LedgerCommand::Buy(trade) => {
            let receipt = state
                .executor
                .buy(trade.account_id, &trade.symbol, trade.quantity, trade.price)
                .await?;
            emit(json, &receipt, || {
                let mut table = transactions_table(std::slice::from_ref(&receipt.transaction));
                table.add_row(vec![
                    "Cash".to_string(),
                    receipt.cash_balance.to_string(),
                    "Total".to_string(),
                    receipt.total_value.to_string(),
                ]);
                table
            })
        }
        LedgerCommand::Sell(trade) => {
            let receipt = state
                .executor
                .sell(trade.account_id, &trade.symbol, trade.quantity, trade.price)
                .await?;
            emit(json, &receipt, || {
                let mut table = transactions_table(&receipt.transactions);
                table.add_row(vec![
                    "Realized".to_string(),
                    receipt.realized_gain.to_string(),
                    "Cash".to_string(),
                    receipt.cash_balance.to_string(),
                ]);
                table
            })
        }
        LedgerCommand::Positions { account_id } => {
            let report = state.portfolio.positions(account_id).await?;
            emit(json, &report, || positions_table(&report))
        }
        LedgerCommand::History { account_id } => {
            let history = state.portfolio.transaction_history(account_id).await?;
            emit(json, &history, || transactions_table(&history))
        }
        LedgerCommand::Lots { account_id } => {
            let lots = state.portfolio.lots(account_id).await?;
            emit(json, &lots, || lots_table(&lots))
        }
        LedgerCommand::Revalue { account_id } => {
            let account = state.executor.revalue(account_id).await?;
            emit(json, &account, || account_table(&account))
        }
    }
}

// ==============================================================================
// Output
// ==============================================================================

fn emit<T: Serialize>(json: bool, value: &T, table: impl FnOnce() -> Table) -> anyhow::Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(value)?);
    } else {
        println!("{}", table());
    }
    Ok(())
}

fn new_table(header: Vec<&str>) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(header);
    table
}

fn instruments_table(instruments: &[Instrument]) -> Table {
    let mut table = new_table(vec!["Symbol", "Name", "Sector", "Price", "Updated"]);
    for i in instruments {
        table.add_row(vec![
            i.symbol.clone(),
            i.name.clone(),
            i.sector.clone(),
            i.price.to_string(),
            i.updated_at.format("%Y-%m-%d %H:%M:%S").to_string(),
        ]);
    }
    table
}

fn account_table(account: &Account) -> Table {
    let mut table = new_table(vec!["Account", "Name", "Initial Cash", "Cash", "Total Value"]);
    table.add_row(vec![
        account.account_id().to_string(),
        account.name().to_string(),
        account.initial_cash().to_string(),
        account.cash_balance().to_string(),
        account.total_value().to_string(),
    ]);
    table
}

fn transactions_table(transactions: &[Transaction]) -> Table {
    let mut table = new_table(vec!["Side", "Symbol", "Quantity", "Price", "Executed", "Lot"]);
    for t in transactions {
        table.add_row(vec![
            t.side.to_string(),
            t.symbol.clone(),
            t.quantity.to_string(),
            t.price.to_string(),
            t.executed_at.format("%Y-%m-%d %H:%M:%S").to_string(),
            t.lot_id.map(|id| id.to_string()).unwrap_or_default(),
        ]);
    }
    table
}

fn lots_table(lots: &[Lot]) -> Table {
    let mut table = new_table(vec!["Lot", "Symbol", "Purchased", "Price", "Bought", "Remaining"]);
    for lot in lots {
        table.add_row(vec![
            lot.lot_id().to_string(),
            lot.symbol().to_string(),
            lot.purchased_at().format("%Y-%m-%d %H:%M:%S").to_string(),
            lot.purchase_price().to_string(),
            lot.quantity().to_string(),
            lot.remaining_quantity().to_string(),
        ]);
    }
    table
}

fn positions_table(report: &PortfolioReport) -> Table {
    let mut table = new_table(vec![
        "Symbol", "Shares", "Avg Cost", "Price", "Value", "Gain", "Return %",
    ]);
    for p in &report.positions {
        table.add_row(vec![
            p.symbol.clone(),
            p.shares.to_string(),
            p.avg_cost.round_dp(4).to_string(),
            p.current_price.to_string(),
            p.current_value.to_string(),
            p.unrealized_gain.to_string(),
            p.return_percentage.round_dp(2).to_string(),
        ]);
    }
    let s = &report.summary;
    table.add_row(vec![
        "TOTAL".to_string(),
        format!("cash {}", s.cash_balance),
        format!("cost {}", s.total_cost),
        String::new(),
        s.total_value.to_string(),
        s.total_gain.to_string(),
        s.return_percentage.round_dp(2).to_string(),
    ]);
    table
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn ledger_commands_sit_beside_serve_and_migrate() {
        let id = Uuid::new_v4().to_string();
        let cli = Cli::try_parse_from(["folio", "buy", &id, "ACME", "10", "12.5"]).unwrap();
        match cli.command {
            Commands::Ledger(LedgerCommand::Buy(trade)) => {
                assert_eq!(trade.symbol, "ACME");
                assert_eq!(trade.quantity, 10);
                assert_eq!(trade.price, Decimal::new(125, 1));
            }
            _ => panic!("expected a buy"),
        }

        let cli = Cli::try_parse_from(["folio", "--json", "price", "set", "ACME", "13"]).unwrap();
        assert!(cli.json);
        assert!(matches!(
            cli.command,
            Commands::Ledger(LedgerCommand::Price(PriceCommand::Set { .. }))
        ));

        let cli = Cli::try_parse_from(["folio", "migrate"]).unwrap();
        assert!(matches!(cli.command, Commands::Migrate));
    }
}
