use anyhow::{Context, Result, anyhow, bail};
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use env_logger::Env;
use log::info;
use std::path::PathBuf;

use tally_core::{Account, AccountKind, Bank, Category, default_categories};
use tally_ingest::{IngestOptions, IngestionResult, ParserRegistry, StatementDocument, StatementIngestor};
use tally_store::{JsonStore, TransactionQuery, write_csv};

mod config;
mod state;

use config::Config;

#[derive(Parser, Debug)]
#[command(
    name = "tally",
    version,
    long_version = concat!(env!("CARGO_PKG_VERSION"), " (", env!("TALLY_BUILD_SHA"), ")"),
    about = "Ingest bank statements into a local transaction store"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Write a default ~/.tally/config.toml
    Init,

    /// Manage accounts
    Account {
        #[command(subcommand)]
        command: AccountCommand,
    },

    /// Parse a statement and store its new transactions
    Upload {
        /// Statement file (textual PDF, or extracted text)
        file: PathBuf,

        /// Account id (see `tally account list`)
        #[arg(long)]
        account: String,

        /// Parse and deduplicate, but store nothing
        #[arg(long)]
        dry_run: bool,
    },

    /// List stored transactions
    Transactions {
        #[arg(long)]
        account: Option<String>,

        /// First day to include (YYYY-MM-DD)
        #[arg(long)]
        from: Option<NaiveDate>,

        /// Last day to include (YYYY-MM-DD)
        #[arg(long)]
        to: Option<NaiveDate>,

        #[arg(long)]
        category: Option<String>,

        /// Only transactions without a category
        #[arg(long, conflicts_with = "category")]
        uncategorized: bool,

        #[arg(long, conflicts_with = "csv")]
        json: bool,

        #[arg(long)]
        csv: bool,
    },

    /// Set the category of a stored transaction
    Categorize {
        #[arg(long)]
        account: String,

        transaction_id: String,

        category: String,
    },

    /// List the categories transactions can be filed under
    Categories {
        /// Show or change one account's list instead of the defaults
        #[arg(long)]
        account: Option<String>,

        /// Replace the account's list with a JSON array of {"name", "description"}
        /// objects; `[]` restores the defaults
        #[arg(long, requires = "account")]
        set: Option<PathBuf>,
    },

    /// List banks and whether their statements can be parsed
    Banks,
}

#[derive(Subcommand, Debug)]
enum AccountCommand {
    /// Register an account
    Add {
        /// chase | marcus | coinbase | webull
        #[arg(long)]
        bank: Bank,

        /// debit | credit | saving | investment
        #[arg(long, default_value = "debit")]
        kind: AccountKind,

        /// Account number as printed on statements (only its digest is stored)
        #[arg(long)]
        number: String,

        /// ISO currency code (default from config)
        #[arg(long)]
        currency: Option<String>,
    },

    /// List registered accounts
    List,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let cfg = config::load_config()?;

    env_logger::Builder::from_env(Env::default().default_filter_or(cfg.log.level.as_str())).init();

    match cli.command {
        Command::Init => config::init_config()?,

        Command::Banks => print_banks(&ParserRegistry::builtin()),

        Command::Categories { account, set } => {
            let categories = match account {
                None => default_categories(),
                Some(id) => {
                    let store = open_store(&cfg)?;
                    match set {
                        Some(path) => {
                            let json = std::fs::read_to_string(&path)
                                .with_context(|| format!("read {}", path.display()))?;
                            let categories: Vec<Category> = serde_json::from_str(&json)
                                .with_context(|| format!("parse {}", path.display()))?;
                            store.set_categories(&id, categories)?.categories_or_default()
                        }
                        None => store
                            .account(&id)?
                            .ok_or_else(|| anyhow!("unknown account: {id}"))?
                            .categories_or_default(),
                    }
                }
            };
            for c in categories {
                println!("{:<16} {}", c.name, c.description);
            }
        }

        Command::Account { command } => match command {
            AccountCommand::Add {
                bank,
                kind,
                number,
                currency,
            } => {
                let store = open_store(&cfg)?;
                let id = Account::derive_id(bank, &number);
                if store.account(&id)?.is_some() {
                    bail!("account already registered: {id}");
                }
                let account = Account::new(id, bank, kind)
                    .with_currency(currency.unwrap_or_else(|| cfg.ingest.default_currency.clone()));
                store.save_account(&account)?;
                println!("Added {} {} account {}", bank.display_name(), kind, account.id);
            }
            AccountCommand::List => {
                let store = open_store(&cfg)?;
                let accounts = store.list_accounts()?;
                if accounts.is_empty() {
                    println!("No accounts. Add one with: tally account add --bank chase --number <n>");
                }
                for a in accounts {
                    let count = store.transactions(&a.id)?.len();
                    println!("{}  {:<8} {:<10} {}  {} transactions", a.id, a.bank, a.kind, a.currency, count);
                }
            }
        },

        Command::Upload {
            file,
            account,
            dry_run,
        } => {
            let store = open_store(&cfg)?;
            let document = StatementDocument::from_path(&file)?;
            let ingestor = StatementIngestor::new(ParserRegistry::builtin()).with_options(IngestOptions {
                require_balanced: cfg.ingest.require_balanced,
            });

            let result = if dry_run {
                ingestor.ingest(&document, &account, &store)?
            } else {
                ingestor.upload(&document, &account, &store)?
            };
            print_ingestion(&result, dry_run);
        }

        Command::Transactions {
            account,
            from,
            to,
            category,
            uncategorized,
            json,
            csv,
        } => {
            let store = open_store(&cfg)?;
            if let Some(id) = &account {
                if store.account(id)?.is_none() {
                    bail!("unknown account: {id}");
                }
            }
            let query = TransactionQuery {
                account_id: account,
                from,
                to,
                category,
                uncategorized_only: uncategorized,
            };
            let txns = store.query(&query)?;

            if json {
                println!("{}", serde_json::to_string_pretty(&txns)?);
            } else if csv {
                write_csv(std::io::stdout().lock(), &txns)?;
            } else {
                for t in &txns {
                    println!(
                        "{}  {}  {:>12}  {:<14} {}",
                        t.id,
                        t.date,
                        t.amount,
                        t.category.as_deref().unwrap_or("-"),
                        t.description
                    );
                }
                println!("\n{} transactions", txns.len());
            }
        }

        Command::Categorize {
            account,
            transaction_id,
            category,
        } => {
            let store = open_store(&cfg)?;
            if !store.categorize(&account, &transaction_id, &category)? {
                bail!("transaction {transaction_id} not found in account {account}");
            }
            println!("{transaction_id} -> {}", category.to_lowercase());
        }
    }

    Ok(())
}

fn open_store(cfg: &Config) -> Result<JsonStore> {
    let data_dir = cfg.data_dir()?;
    info!("using data dir {}", data_dir.display());
    JsonStore::open(&data_dir).with_context(|| format!("open store at {}", data_dir.display()))
}

fn print_banks(registry: &ParserRegistry) {
    let supported = registry.supported_banks();
    for bank in Bank::ALL {
        let status = if supported.contains(&bank) {
            "supported"
        } else {
            "not yet supported"
        };
        println!("{:<10} {:<26} {}", bank.as_str(), bank.display_name(), status);
    }
}

fn print_ingestion(result: &IngestionResult, dry_run: bool) {
    let verb = if dry_run { "Would add" } else { "Added" };
    println!(
        "{verb} {} transactions from {} ({} line items, {} duplicates skipped)",
        result.accepted.len(),
        result.source,
        result.line_items,
        result.skipped_duplicates
    );

    if !result.warnings.is_empty() {
        println!("\n{} lines could not be read:", result.warnings.len());
        for w in &result.warnings {
            println!("  line {}: {}", w.line, w.reason);
        }
    }

    if let Some(r) = &result.reconciliation {
        if r.is_balanced() {
            println!("\nBalances reconcile: {} -> {}", r.opening, r.closing);
        } else {
            println!(
                "\nBalances do not reconcile: opening {} + transactions = {}, statement says {} (off by {})",
                r.opening,
                r.computed_closing,
                r.closing,
                r.difference()
            );
        }
    }
}
