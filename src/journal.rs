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

//! In-memory append-only journal.
//!
//! Provides a concurrent log that hands out strictly increasing transaction
//! ids, with a per-user index so history lookups only touch that user's rows.

use crate::base::{TransactionId, UserId};
use crate::transaction::{NewTransaction, Transaction};
use dashmap::DashMap;
use std::sync::atomic::{AtomicI64, Ordering};

/// A thread-safe transaction journal.
///
/// Entries live in a [`DashMap`] keyed by id; ids come from an atomic
/// counter starting at 1, mirroring SQLite's `AUTOINCREMENT`.
#[derive(Debug)]
pub struct Journal {
    /// Appended entries indexed by id.
    entries: DashMap<TransactionId, Transaction>,

    /// Ids of each user's entries, in append order.
    by_user: DashMap<UserId, Vec<TransactionId>>,

    /// Next id to hand out.
    next_id: AtomicI64,
}

impl Journal {
    /// Creates a new empty journal.
    pub fn new() -> Self {
        Self {
            entries: DashMap::new(),
            by_user: DashMap::new(),
            next_id: AtomicI64::new(1),
        }
    }

    /// Appends an entry and returns its id.
    pub fn append(&self, entry: NewTransaction) -> TransactionId {
        let id = TransactionId(self.next_id.fetch_add(1, Ordering::Relaxed));
        let user_id = entry.user_id();

        // Entry goes in before the index so indexed ids always resolve
        self.entries.insert(id, entry.into_transaction(id));
        self.by_user.entry(user_id).or_default().push(id);
        id
    }

    /// Returns all entries for `user_id`, ordered by id.
    pub fn for_user(&self, user_id: UserId) -> Vec<Transaction> {
        let Some(ids) = self.by_user.get(&user_id) else {
            return Vec::new();
        };
        let mut entries: Vec<Transaction> = ids
            .iter()
            .filter_map(|id| self.entries.get(id).map(|entry| *entry.value()))
            .collect();
        drop(ids);

        // Appends outside an account lock can interleave their index pushes
        entries.sort_by_key(|tx| tx.id);
        entries
    }

    pub fn get(&self, id: TransactionId) -> Option<Transaction> {
        self.entries.get(&id).map(|entry| *entry.value())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for Journal {
    fn default() -> Self {
        Self::new()
    }
}
