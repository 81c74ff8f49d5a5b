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

//! In-memory account.
//!
//! An [`Account`] owns one user's balance behind a [`Mutex`]. Holding the
//! lock is the per-user critical section: the balance check, the journal
//! append and the balance write all happen under the same guard, so two
//! concurrent debits can never both pass the funds check against a stale
//! balance.
//!
//! # Example
//!
//! ```
//! use market_ledger::{Account, UserId};
//! use rust_decimal_macros::dec;
//!
//! let account = Account::new(UserId(1));
//! assert_eq!(account.balance(), dec!(0));
//! ```

use crate::LedgerError;
use crate::base::{TransactionId, UserId};
use crate::journal::Journal;
use crate::transaction::NewTransaction;
use parking_lot::Mutex;
use rust_decimal::Decimal;

#[derive(Debug)]
struct AccountData {
    user_id: UserId,
    balance: Decimal,
}

impl AccountData {
    fn new(user_id: UserId) -> Self {
        Self {
            user_id,
            balance: Decimal::ZERO,
        }
    }

    fn assert_invariants(&self) {
        debug_assert!(
            self.balance >= Decimal::ZERO,
            "Invariant violated: balance went negative: {}",
            self.balance
        );
    }

    /// Computes the balance after applying `delta` without writing it.
    fn checked_apply(&self, delta: Decimal) -> Result<Decimal, LedgerError> {
        let balance = self
            .balance
            .checked_add(delta)
            .ok_or(LedgerError::InvalidAmount)?;
        if balance < Decimal::ZERO {
            return Err(LedgerError::InsufficientFunds);
        }
        Ok(balance)
    }
}

/// Ledger account for a single user.
#[derive(Debug)]
pub struct Account {
    inner: Mutex<AccountData>,
}

impl Account {
    pub fn new(user_id: UserId) -> Self {
        Self {
            inner: Mutex::new(AccountData::new(user_id)),
        }
    }

    pub fn user_id(&self) -> UserId {
        self.inner.lock().user_id
    }

    pub fn balance(&self) -> Decimal {
        self.inner.lock().balance
    }

    /// Applies `entry` to the balance and records it in `journal`.
    ///
    /// Returns the new balance and the id of the journal entry. Nothing is
    /// written if any check fails.
    ///
    /// # Errors
    ///
    /// - [`LedgerError::InsufficientFunds`] - the entry would overdraw the account.
    /// - [`LedgerError::InvalidAmount`] - the new balance overflows.
    pub fn apply(
        &self,
        entry: NewTransaction,
        journal: &Journal,
    ) -> Result<(Decimal, TransactionId), LedgerError> {
        let mut data = self.inner.lock();
        debug_assert_eq!(entry.user_id(), data.user_id);

        let balance = data.checked_apply(entry.amount())?;
        let id = journal.append(entry);
        data.balance = balance;
        data.assert_invariants();
        Ok((balance, id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn checked_apply_rejects_overdraft() {
        let mut data = AccountData::new(UserId(1));
        data.balance = dec!(10);
        assert_eq!(data.checked_apply(dec!(-10)), Ok(dec!(0)));
        assert_eq!(data.checked_apply(dec!(-10.01)), Err(LedgerError::InsufficientFunds));
    }

    #[test]
    fn checked_apply_rejects_overflow() {
        let mut data = AccountData::new(UserId(1));
        data.balance = Decimal::MAX;
        assert_eq!(data.checked_apply(dec!(1)), Err(LedgerError::InvalidAmount));
    }

    #[test]
    fn apply_writes_balance_and_journal_together() {
        let journal = Journal::new();
        let account = Account::new(UserId(1));

        let (balance, id) = account
            .apply(NewTransaction::deposit(UserId(1), dec!(25)), &journal)
            .unwrap();
        assert_eq!(balance, dec!(25));
        assert_eq!(journal.get(id).unwrap().amount, dec!(25));

        let result = account.apply(NewTransaction::withdraw(UserId(1), dec!(30)), &journal);
        assert_eq!(result, Err(LedgerError::InsufficientFunds));
        assert_eq!(account.balance(), dec!(25));
        assert_eq!(journal.len(), 1);
    }
}
