// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2025 Daniel Negri
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program. If not, see <https://www.gnu.org/licenses/>.

use clap::{Parser, Subcommand};
use csv::Writer;
use market_ledger::{Catalog, Ledger, LedgerError, LedgerStore, ProductId, UserId};
use rust_decimal::Decimal;
use std::io::{self, Write};
use std::path::PathBuf;
use std::process;
use thiserror::Error;
use tracing_subscriber::EnvFilter;

/// Decimal places shown when printing a balance.
const DECIMAL_PRECISION: u32 = 4;

/// Market Ledger - Manage shop balances from the command line
///
/// Opens (or creates) the ledger database, seeds the product catalog and
/// runs one operation against it.
#[derive(Parser, Debug)]
#[command(name = "market-ledger")]
#[command(about = "A balance and product catalog ledger", long_about = None)]
struct Args {
    /// Path to the SQLite database file
    #[arg(
        long,
        env = "MARKET_LEDGER_DATABASE",
        default_value = "market.db",
        value_name = "PATH"
    )]
    database: PathBuf,

    /// Number of products to seed (ids 1..=N)
    #[arg(long, default_value_t = Catalog::DEFAULT_SIZE)]
    catalog_size: i64,

    /// Price of every seeded product
    #[arg(long, default_value_t = Catalog::DEFAULT_PRICE)]
    product_price: Decimal,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Register a user with a zero balance
    Start { user: i64 },
    /// Print a user's balance
    Balance { user: i64 },
    /// Credit an amount and print the new balance
    Deposit {
        user: i64,
        #[arg(allow_hyphen_values = true)]
        amount: String,
    },
    /// Debit an amount and print the new balance
    Withdraw {
        user: i64,
        #[arg(allow_hyphen_values = true)]
        amount: String,
    },
    /// List the catalog as CSV
    Products,
    /// Buy a product and print the new balance
    Buy { user: i64, product: i64 },
    /// List a user's transactions as CSV
    History { user: i64 },
}

#[derive(Debug, Error)]
enum CliError {
    #[error(transparent)]
    Ledger(#[from] LedgerError),
    #[error("csv output failed: {0}")]
    Csv(#[from] csv::Error),
    #[error("output failed: {0}")]
    Io(#[from] io::Error),
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(io::stderr)
        .init();

    let args = Args::parse();

    let ledger = match Ledger::open(&args.database) {
        Ok(ledger) => ledger,
        Err(e) => {
            eprintln!("Error opening database '{}': {}", args.database.display(), e);
            process::exit(1);
        }
    };

    // Seeding is insert-if-absent, so running it on every start is harmless
    let catalog = Catalog::uniform(args.catalog_size, args.product_price);
    if let Err(e) = ledger.seed_catalog(&catalog) {
        eprintln!("Error seeding catalog: {}", e);
        process::exit(1);
    }

    if let Err(e) = run(&ledger, args.command, io::stdout().lock()) {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}

/// Runs one command and writes its result to `out`.
///
/// Balances are printed on a single line; listings are written as CSV with
/// a header row.
///
/// # Errors
///
/// Returns the ledger error for rejected operations, or an output error if
/// writing fails.
fn run<S: LedgerStore, W: Write>(
    ledger: &Ledger<S>,
    command: Command,
    mut out: W,
) -> Result<(), CliError> {
    match command {
        Command::Start { user } => {
            ledger.ensure_user(UserId(user))?;
            writeln!(out, "registered user {}", user)?;
        }
        Command::Balance { user } => {
            let balance = ledger.get_balance(UserId(user))?;
            write_balance(&mut out, balance)?;
        }
        Command::Deposit { user, amount } => {
            let balance = ledger.deposit(UserId(user), amount.as_str())?;
            write_balance(&mut out, balance)?;
        }
        Command::Withdraw { user, amount } => {
            let balance = ledger.withdraw(UserId(user), amount.as_str())?;
            write_balance(&mut out, balance)?;
        }
        Command::Products => {
            let mut wtr = Writer::from_writer(out);
            for product in ledger.list_products()? {
                wtr.serialize(&product)?;
            }
            wtr.flush()?;
        }
        Command::Buy { user, product } => {
            let balance = ledger.purchase(UserId(user), ProductId(product))?;
            write_balance(&mut out, balance)?;
        }
        Command::History { user } => {
            let mut wtr = Writer::from_writer(out);
            for transaction in ledger.history(UserId(user))? {
                wtr.serialize(&transaction)?;
            }
            wtr.flush()?;
        }
    }
    Ok(())
}

fn write_balance<W: Write>(out: &mut W, balance: Decimal) -> io::Result<()> {
    writeln!(out, "{}", balance.round_dp(DECIMAL_PRECISION))
}
