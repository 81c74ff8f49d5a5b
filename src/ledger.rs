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

//! Ledger operations.
//!
//! The [`Ledger`] is the entry point callers use: it validates input, picks
//! the journal entry to record and hands it to the [`LedgerStore`], which
//! applies it atomically.
//!
//! # Operations
//!
//! - **Deposits**: Credit funds, registering the user if needed.
//! - **Withdrawals**: Debit funds (fails if insufficient funds).
//! - **Purchases**: Debit the price of a catalog product.
//!
//! # Thread Safety
//!
//! `Ledger` is `Sync` whenever its store is, so one instance can be shared
//! across threads (e.g. behind an [`Arc`](std::sync::Arc)). Concurrent
//! debits on the same user are serialized by the store.

use crate::LedgerError;
use crate::amount::{IntoAmount, parse_amount};
use crate::base::{ProductId, UserId};
use crate::product::{Catalog, Product};
use crate::store::{LedgerStore, MemoryStore, SqliteStore};
use crate::transaction::{NewTransaction, Transaction};
use rust_decimal::Decimal;
use std::path::Path;
use tracing::{debug, info, warn};

/// Balance and catalog ledger over a [`LedgerStore`].
///
/// # Invariants
///
/// - Every balance change is paired with exactly one journal entry whose
///   amount is the signed delta.
/// - Failed operations change nothing.
/// - Balances never go negative.
pub struct Ledger<S = MemoryStore> {
    store: S,
}

impl Ledger<MemoryStore> {
    /// Creates a ledger backed by a fresh in-memory store.
    pub fn in_memory() -> Self {
        Self::new(MemoryStore::new())
    }
}

impl Ledger<SqliteStore> {
    /// Opens a ledger backed by the SQLite database at `path`.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, LedgerError> {
        Ok(Self::new(SqliteStore::open(path)?))
    }
}

impl<S: LedgerStore> Ledger<S> {
    pub fn new(store: S) -> Self {
        Ledger { store }
    }

    /// Returns the underlying store.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Inserts the catalog products that are not stored yet.
    ///
    /// Safe to run on every start; returns the number of new products.
    pub fn seed_catalog(&self, catalog: &Catalog) -> Result<usize, LedgerError> {
        let inserted = self.store.seed_products(catalog.products())?;
        info!(inserted, catalog_size = catalog.len(), "catalog seeded");
        Ok(inserted)
    }

    /// Registers a user with a zero balance if unknown. Idempotent.
    pub fn ensure_user(&self, user_id: UserId) -> Result<(), LedgerError> {
        self.store.ensure_user(user_id)
    }

    /// Returns the current balance of `user_id`.
    ///
    /// # Errors
    ///
    /// [`LedgerError::UserNotFound`] if the user was never registered.
    pub fn get_balance(&self, user_id: UserId) -> Result<Decimal, LedgerError> {
        self.store
            .balance(user_id)?
            .ok_or(LedgerError::UserNotFound(user_id))
    }

    /// Credits `amount` to `user_id` and returns the new balance.
    ///
    /// Registers the user on first deposit. `amount` may be a string as typed
    /// by the user or a number.
    ///
    /// # Errors
    ///
    /// [`LedgerError::InvalidAmount`] unless `amount` is a positive finite number.
    pub fn deposit<A: IntoAmount>(
        &self,
        user_id: UserId,
        amount: A,
    ) -> Result<Decimal, LedgerError> {
        let amount = parse_amount(amount).inspect_err(|err| {
            warn!(%user_id, %err, "deposit rejected");
        })?;
        let (balance, transaction_id) = self
            .store
            .apply(NewTransaction::deposit(user_id, amount))?;
        debug!(%user_id, %amount, %balance, %transaction_id, "deposit applied");
        Ok(balance)
    }

    /// Debits `amount` from `user_id` and returns the new balance.
    ///
    /// # Errors
    ///
    /// - [`LedgerError::InvalidAmount`] - `amount` is not a positive finite number.
    /// - [`LedgerError::InsufficientFunds`] - the balance is below `amount`.
    pub fn withdraw<A: IntoAmount>(
        &self,
        user_id: UserId,
        amount: A,
    ) -> Result<Decimal, LedgerError> {
        let result = parse_amount(amount)
            .and_then(|amount| self.store.apply(NewTransaction::withdraw(user_id, amount)));
        match result {
            Ok((balance, transaction_id)) => {
                debug!(%user_id, %balance, %transaction_id, "withdrawal applied");
                Ok(balance)
            }
            Err(err) => {
                warn!(%user_id, %err, "withdrawal rejected");
                Err(err)
            }
        }
    }

    /// Returns the catalog ordered by product id.
    pub fn list_products(&self) -> Result<Vec<Product>, LedgerError> {
        self.store.products()
    }

    /// Buys `product_id` for `user_id` and returns the new balance.
    ///
    /// # Errors
    ///
    /// - [`LedgerError::ProductNotFound`] - the product is not in the catalog.
    /// - [`LedgerError::InsufficientFunds`] - the balance is below the price.
    /// - [`LedgerError::InvalidAmount`] - the stored price is negative.
    pub fn purchase(
        &self,
        user_id: UserId,
        product_id: ProductId,
    ) -> Result<Decimal, LedgerError> {
        let result = self
            .store
            .product(product_id)?
            .ok_or(LedgerError::ProductNotFound(product_id))
            .and_then(|product| {
                // Older databases may hold rows seeded without a price check
                product.check_price()?;
                self.store
                    .apply(NewTransaction::purchase(user_id, product.id, product.price))
            });
        match result {
            Ok((balance, transaction_id)) => {
                debug!(%user_id, %product_id, %balance, %transaction_id, "purchase applied");
                Ok(balance)
            }
            Err(err) => {
                warn!(%user_id, %product_id, %err, "purchase rejected");
                Err(err)
            }
        }
    }

    /// Returns the journal entries of `user_id`, oldest first.
    ///
    /// # Errors
    ///
    /// [`LedgerError::UserNotFound`] if the user was never registered.
    pub fn history(&self, user_id: UserId) -> Result<Vec<Transaction>, LedgerError> {
        if self.store.balance(user_id)?.is_none() {
            return Err(LedgerError::UserNotFound(user_id));
        }
        self.store.transactions(user_id)
    }
}

impl Default for Ledger<MemoryStore> {
    fn default() -> Self {
        Self::in_memory()
    }
}
