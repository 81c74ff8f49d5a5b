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

//! Journal entries.
//!
//! Every balance change is recorded as exactly one [`Transaction`] whose
//! `amount` is the signed delta applied to the balance: positive for
//! deposits, negative for withdrawals and purchases.

use crate::base::{ProductId, TransactionId, UserId};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Kind of balance-affecting event.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum TransactionKind {
    Deposit,
    Withdraw,
    Purchase,
}

impl TransactionKind {
    /// Name used in persisted rows.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Deposit => "deposit",
            Self::Withdraw => "withdraw",
            Self::Purchase => "purchase",
        }
    }
}

impl fmt::Display for TransactionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when a stored kind name is not recognised.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown transaction type: {0}")]
pub struct UnknownKind(pub String);

impl FromStr for TransactionKind {
    type Err = UnknownKind;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "deposit" => Ok(Self::Deposit),
            "withdraw" => Ok(Self::Withdraw),
            "purchase" => Ok(Self::Purchase),
            other => Err(UnknownKind(other.to_string())),
        }
    }
}

/// A transaction that has not been appended yet.
///
/// Only the constructors below create one, so the sign of `amount` and the
/// presence of `product_id` always agree with `kind`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NewTransaction {
    user_id: UserId,
    kind: TransactionKind,
    amount: Decimal,
    product_id: Option<ProductId>,
}

impl NewTransaction {
    /// Credit of `amount` (expected positive).
    pub fn deposit(user_id: UserId, amount: Decimal) -> Self {
        Self {
            user_id,
            kind: TransactionKind::Deposit,
            amount,
            product_id: None,
        }
    }

    /// Debit of `amount`; recorded as `-amount`.
    pub fn withdraw(user_id: UserId, amount: Decimal) -> Self {
        Self {
            user_id,
            kind: TransactionKind::Withdraw,
            amount: -amount,
            product_id: None,
        }
    }

    /// Purchase of `product_id` at `price`; recorded as `-price`.
    pub fn purchase(user_id: UserId, product_id: ProductId, price: Decimal) -> Self {
        Self {
            user_id,
            kind: TransactionKind::Purchase,
            amount: -price,
            product_id: Some(product_id),
        }
    }

    pub fn user_id(&self) -> UserId {
        self.user_id
    }

    pub fn kind(&self) -> TransactionKind {
        self.kind
    }

    /// Signed delta this entry applies to the balance.
    pub fn amount(&self) -> Decimal {
        self.amount
    }

    pub fn product_id(&self) -> Option<ProductId> {
        self.product_id
    }

    /// Returns `true` if the entry takes money out of the account.
    pub fn is_outflow(&self) -> bool {
        self.amount < Decimal::ZERO
    }

    /// Attaches the id assigned by the store.
    pub fn into_transaction(self, id: TransactionId) -> Transaction {
        Transaction {
            id,
            user_id: self.user_id,
            kind: self.kind,
            amount: self.amount,
            product_id: self.product_id,
        }
    }
}

/// An appended, immutable journal entry.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct Transaction {
    pub id: TransactionId,
    pub user_id: UserId,
    #[serde(rename = "type")]
    pub kind: TransactionKind,
    pub amount: Decimal,
    pub product_id: Option<ProductId>,
}
