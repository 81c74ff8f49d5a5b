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

//! SQLite persistence.
//!
//! Tables follow the layout the shop has always used (`users`, `products`,
//! `transactions`). Decimals are written as text so no precision is lost;
//! reads also accept REAL and INTEGER cells, which keeps databases created
//! with floating-point columns readable.
//!
//! One connection is shared behind a mutex and every write runs in an
//! `IMMEDIATE` transaction, so writers are serialized and a failed
//! operation rolls back as a whole when its transaction is dropped.

use super::LedgerStore;
use crate::LedgerError;
use crate::base::{ProductId, TransactionId, UserId};
use crate::product::Product;
use crate::transaction::{NewTransaction, Transaction, TransactionKind};
use parking_lot::Mutex;
use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, ValueRef};
use rusqlite::{Connection, OptionalExtension, Row, TransactionBehavior, params};
use rust_decimal::Decimal;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;
use tracing::debug;

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS users (
    user_id INTEGER PRIMARY KEY,
    balance TEXT NOT NULL DEFAULT '0'
);
CREATE TABLE IF NOT EXISTS products (
    id INTEGER PRIMARY KEY,
    name TEXT NOT NULL,
    price TEXT NOT NULL
);
CREATE TABLE IF NOT EXISTS transactions (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    user_id INTEGER NOT NULL,
    type TEXT NOT NULL,
    amount TEXT NOT NULL,
    product_id INTEGER
);
CREATE INDEX IF NOT EXISTS idx_transactions_user_id ON transactions (user_id);
"#;

/// How long a writer waits for another process holding the database lock.
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Decimal stored as text, read from text, real or integer cells.
struct SqlDecimal(Decimal);

impl ToSql for SqlDecimal {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.0.to_string()))
    }
}

impl FromSql for SqlDecimal {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        match value {
            ValueRef::Integer(i) => Ok(SqlDecimal(Decimal::from(i))),
            ValueRef::Real(f) => Decimal::try_from(f)
                .map(SqlDecimal)
                .map_err(|err| FromSqlError::Other(Box::new(err))),
            ValueRef::Text(_) => {
                let text = value.as_str()?;
                Decimal::from_str(text)
                    .or_else(|_| Decimal::from_scientific(text))
                    .map(SqlDecimal)
                    .map_err(|err| FromSqlError::Other(Box::new(err)))
            }
            _ => Err(FromSqlError::InvalidType),
        }
    }
}

impl ToSql for TransactionKind {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.as_str()))
    }
}

impl FromSql for TransactionKind {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        value
            .as_str()?
            .parse()
            .map_err(|err| FromSqlError::Other(Box::new(err)))
    }
}

fn product_from_row(row: &Row<'_>) -> rusqlite::Result<Product> {
    let price: SqlDecimal = row.get(2)?;
    Ok(Product {
        id: ProductId(row.get(0)?),
        name: row.get(1)?,
        price: price.0,
    })
}

fn transaction_from_row(row: &Row<'_>) -> rusqlite::Result<Transaction> {
    let amount: SqlDecimal = row.get(3)?;
    let product_id: Option<i64> = row.get(4)?;
    Ok(Transaction {
        id: TransactionId(row.get(0)?),
        user_id: UserId(row.get(1)?),
        kind: row.get(2)?,
        amount: amount.0,
        product_id: product_id.map(ProductId),
    })
}

fn insert_transaction(
    conn: &Connection,
    entry: &NewTransaction,
) -> Result<TransactionId, LedgerError> {
    conn.execute(
        "INSERT INTO transactions (user_id, type, amount, product_id) VALUES (?1, ?2, ?3, ?4)",
        params![
            entry.user_id().0,
            entry.kind(),
            SqlDecimal(entry.amount()),
            entry.product_id().map(|id| id.0),
        ],
    )?;
    Ok(TransactionId(conn.last_insert_rowid()))
}

/// SQLite-backed [`LedgerStore`].
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Opens (or creates) the database file at `path` and applies the schema.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, LedgerError> {
        let conn = Connection::open(path)?;
        // WAL is not available everywhere (e.g. some network filesystems)
        if let Err(err) = conn.execute_batch("PRAGMA journal_mode=WAL;") {
            debug!(%err, "WAL journal mode unavailable, keeping the default");
        }
        Self::from_connection(conn)
    }

    /// Opens a private in-memory database.
    pub fn in_memory() -> Result<Self, LedgerError> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    /// Wraps an existing connection, creating any missing tables.
    pub fn from_connection(conn: Connection) -> Result<Self, LedgerError> {
        conn.busy_timeout(BUSY_TIMEOUT)?;
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }
}

impl LedgerStore for SqliteStore {
    fn ensure_user(&self, user_id: UserId) -> Result<(), LedgerError> {
        let conn = self.conn.lock();
        conn.execute(
            "INSERT OR IGNORE INTO users (user_id, balance) VALUES (?1, ?2)",
            params![user_id.0, SqlDecimal(Decimal::ZERO)],
        )?;
        Ok(())
    }

    fn balance(&self, user_id: UserId) -> Result<Option<Decimal>, LedgerError> {
        let conn = self.conn.lock();
        let balance: Option<SqlDecimal> = conn
            .query_row(
                "SELECT balance FROM users WHERE user_id = ?1",
                params![user_id.0],
                |row| row.get(0),
            )
            .optional()?;
        Ok(balance.map(|b| b.0))
    }

    fn seed_products(&self, products: &[Product]) -> Result<usize, LedgerError> {
        products.iter().try_for_each(Product::check_price)?;
        let mut conn = self.conn.lock();
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        let mut inserted = 0;
        {
            let mut stmt = tx.prepare(
                "INSERT OR IGNORE INTO products (id, name, price) VALUES (?1, ?2, ?3)",
            )?;
            for product in products {
                inserted += stmt.execute(params![
                    product.id.0,
                    product.name,
                    SqlDecimal(product.price)
                ])?;
            }
        }
        tx.commit()?;
        Ok(inserted)
    }

    fn products(&self) -> Result<Vec<Product>, LedgerError> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare("SELECT id, name, price FROM products ORDER BY id")?;
        let products = stmt
            .query_map([], product_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(products)
    }

    fn product(&self, product_id: ProductId) -> Result<Option<Product>, LedgerError> {
        let conn = self.conn.lock();
        let product = conn
            .query_row(
                "SELECT id, name, price FROM products WHERE id = ?1",
                params![product_id.0],
                product_from_row,
            )
            .optional()?;
        Ok(product)
    }

    fn append_transaction(&self, entry: NewTransaction) -> Result<TransactionId, LedgerError> {
        let conn = self.conn.lock();
        insert_transaction(&conn, &entry)
    }

    fn apply(&self, entry: NewTransaction) -> Result<(Decimal, TransactionId), LedgerError> {
        let user_id = entry.user_id();
        let mut conn = self.conn.lock();
        // Dropping `tx` without commit rolls everything back
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let stored: Option<SqlDecimal> = tx
            .query_row(
                "SELECT balance FROM users WHERE user_id = ?1",
                params![user_id.0],
                |row| row.get(0),
            )
            .optional()?;

        let current = match stored {
            Some(balance) => balance.0,
            None if entry.is_outflow() => return Err(LedgerError::InsufficientFunds),
            None => {
                tx.execute(
                    "INSERT INTO users (user_id, balance) VALUES (?1, ?2)",
                    params![user_id.0, SqlDecimal(Decimal::ZERO)],
                )?;
                Decimal::ZERO
            }
        };

        let balance = current
            .checked_add(entry.amount())
            .ok_or(LedgerError::InvalidAmount)?;
        if balance < Decimal::ZERO {
            return Err(LedgerError::InsufficientFunds);
        }

        tx.execute(
            "UPDATE users SET balance = ?1 WHERE user_id = ?2",
            params![SqlDecimal(balance), user_id.0],
        )?;
        let id = insert_transaction(&tx, &entry)?;
        tx.commit()?;

        Ok((balance, id))
    }

    fn transactions(&self, user_id: UserId) -> Result<Vec<Transaction>, LedgerError> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(
            "SELECT id, user_id, type, amount, product_id FROM transactions \
             WHERE user_id = ?1 ORDER BY id",
        )?;
        let transactions = stmt
            .query_map(params![user_id.0], transaction_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(transactions)
    }
}
