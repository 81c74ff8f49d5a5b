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

//! Storage backends for the ledger.
//!
//! A [`LedgerStore`] owns the three ledger tables (users, products and
//! transactions) and exposes them through a handful of atomic operations.
//! The ledger never reads and then writes a balance itself: the
//! read-check-write sequence lives inside [`LedgerStore::apply`], where each
//! backend can make it a single critical section.
//!
//! - [`MemoryStore`]: concurrent in-process store with per-user locks.
//! - [`SqliteStore`]: durable SQLite database.

mod memory;
mod sqlite;

pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

use crate::LedgerError;
use crate::base::{ProductId, TransactionId, UserId};
use crate::product::Product;
use crate::transaction::{NewTransaction, Transaction};
use rust_decimal::Decimal;

/// Persistent storage of users, products and the transaction journal.
///
/// Implementations must be safe to share across threads. Every method is a
/// single unit of work: locks or SQL transactions are acquired inside the
/// call and released before it returns, on success and on error.
pub trait LedgerStore: Send + Sync {
    /// Registers `user_id` with a zero balance if it is not known yet.
    fn ensure_user(&self, user_id: UserId) -> Result<(), LedgerError>;

    /// Returns the stored balance, or `None` for an unknown user.
    fn balance(&self, user_id: UserId) -> Result<Option<Decimal>, LedgerError>;

    /// Inserts every product whose id is absent and returns how many were
    /// inserted. Existing products are left as they are.
    fn seed_products(&self, products: &[Product]) -> Result<usize, LedgerError>;

    /// Returns the catalog ordered by product id.
    fn products(&self) -> Result<Vec<Product>, LedgerError>;

    fn product(&self, product_id: ProductId) -> Result<Option<Product>, LedgerError>;

    /// Appends one journal entry without touching any balance.
    fn append_transaction(&self, entry: NewTransaction) -> Result<TransactionId, LedgerError>;

    /// Atomically applies `entry` to its user's balance and appends it.
    ///
    /// Returns the new balance and the appended transaction id. An inflow for
    /// an unknown user registers the user first; an outflow for an unknown
    /// user is rejected without registering anyone.
    ///
    /// # Errors
    ///
    /// - [`LedgerError::InsufficientFunds`] - the balance would drop below zero.
    /// - [`LedgerError::InvalidAmount`] - the new balance overflows.
    /// - [`LedgerError::Storage`] - the backend failed; nothing was written.
    fn apply(&self, entry: NewTransaction) -> Result<(Decimal, TransactionId), LedgerError>;

    /// Returns the journal entries of `user_id` ordered by id.
    fn transactions(&self, user_id: UserId) -> Result<Vec<Transaction>, LedgerError>;
}
