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

//! Concurrent in-process store.
//!
//! Accounts live in a [`DashMap`], each behind its own mutex (see
//! [`Account`]). Operations on different users only share a shard lock for
//! the duration of a map lookup, never while a balance is being checked, so
//! they do not block each other.

use super::LedgerStore;
use crate::LedgerError;
use crate::account::Account;
use crate::base::{ProductId, TransactionId, UserId};
use crate::journal::Journal;
use crate::product::Product;
use crate::transaction::{NewTransaction, Transaction};
use dashmap::DashMap;
use parking_lot::RwLock;
use rust_decimal::Decimal;
use std::collections::BTreeMap;
use std::sync::Arc;

/// In-memory [`LedgerStore`].
///
/// # Invariants
///
/// - An account's balance changes only together with a journal append.
/// - Balances never go negative.
#[derive(Debug, Default)]
pub struct MemoryStore {
    /// User accounts indexed by user id.
    accounts: DashMap<UserId, Arc<Account>>,
    /// Catalog ordered by product id.
    products: RwLock<BTreeMap<ProductId, Product>>,
    /// Append-only transaction log.
    journal: Journal,
}

impl MemoryStore {
    /// Creates a store with no users, products or transactions.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of journal entries across all users.
    pub fn transaction_count(&self) -> usize {
        self.journal.len()
    }

    fn account(&self, user_id: UserId) -> Option<Arc<Account>> {
        self.accounts.get(&user_id).map(|entry| Arc::clone(entry.value()))
    }

    fn account_or_create(&self, user_id: UserId) -> Arc<Account> {
        // Clone the Arc so the shard lock is released before the account lock is taken
        Arc::clone(
            self.accounts
                .entry(user_id)
                .or_insert_with(|| Arc::new(Account::new(user_id)))
                .value(),
        )
    }
}

impl LedgerStore for MemoryStore {
    fn ensure_user(&self, user_id: UserId) -> Result<(), LedgerError> {
        self.account_or_create(user_id);
        Ok(())
    }

    fn balance(&self, user_id: UserId) -> Result<Option<Decimal>, LedgerError> {
        Ok(self.account(user_id).map(|account| account.balance()))
    }

    fn seed_products(&self, products: &[Product]) -> Result<usize, LedgerError> {
        products.iter().try_for_each(Product::check_price)?;
        let mut catalog = self.products.write();
        let mut inserted = 0;
        for product in products {
            if !catalog.contains_key(&product.id) {
                catalog.insert(product.id, product.clone());
                inserted += 1;
            }
        }
        Ok(inserted)
    }

    fn products(&self) -> Result<Vec<Product>, LedgerError> {
        Ok(self.products.read().values().cloned().collect())
    }

    fn product(&self, product_id: ProductId) -> Result<Option<Product>, LedgerError> {
        Ok(self.products.read().get(&product_id).cloned())
    }

    fn append_transaction(&self, entry: NewTransaction) -> Result<TransactionId, LedgerError> {
        Ok(self.journal.append(entry))
    }

    fn apply(&self, entry: NewTransaction) -> Result<(Decimal, TransactionId), LedgerError> {
        let account = if entry.is_outflow() {
            // Unknown users have nothing to spend
            self.account(entry.user_id())
                .ok_or(LedgerError::InsufficientFunds)?
        } else {
            self.account_or_create(entry.user_id())
        };
        account.apply(entry, &self.journal)
    }

    fn transactions(&self, user_id: UserId) -> Result<Vec<Transaction>, LedgerError> {
        Ok(self.journal.for_user(user_id))
    }
}
