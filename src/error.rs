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

//! Error types for ledger operations.

use crate::base::{ProductId, UserId};
use thiserror::Error;

/// Ledger operation errors.
///
/// Every variant is raised before anything is written, so a failed
/// operation leaves balances and the journal untouched.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LedgerError {
    /// Amount is not a number, not finite, zero or negative
    #[error("invalid amount (must be a positive number)")]
    InvalidAmount,

    /// User was never registered
    #[error("user {0} not found")]
    UserNotFound(UserId),

    /// Product is not in the catalog
    #[error("product {0} not found")]
    ProductNotFound(ProductId),

    /// Withdrawal or purchase would take the balance below zero
    #[error("insufficient funds")]
    InsufficientFunds,

    /// The backing store failed
    #[error("storage error: {0}")]
    Storage(String),
}

impl LedgerError {
    /// Returns `true` for the unknown-user and unknown-product cases.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::UserNotFound(_) | Self::ProductNotFound(_))
    }
}

impl From<rusqlite::Error> for LedgerError {
    fn from(err: rusqlite::Error) -> Self {
        LedgerError::Storage(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_messages() {
        assert_eq!(
            LedgerError::InvalidAmount.to_string(),
            "invalid amount (must be a positive number)"
        );
        assert_eq!(LedgerError::UserNotFound(UserId(7)).to_string(), "user 7 not found");
        assert_eq!(
            LedgerError::ProductNotFound(ProductId(9999)).to_string(),
            "product 9999 not found"
        );
        assert_eq!(LedgerError::InsufficientFunds.to_string(), "insufficient funds");
        assert_eq!(
            LedgerError::Storage("disk I/O error".into()).to_string(),
            "storage error: disk I/O error"
        );
    }

    #[test]
    fn not_found_groups_users_and_products() {
        assert!(LedgerError::UserNotFound(UserId(1)).is_not_found());
        assert!(LedgerError::ProductNotFound(ProductId(1)).is_not_found());
        assert!(!LedgerError::InsufficientFunds.is_not_found());
        assert!(!LedgerError::InvalidAmount.is_not_found());
    }

    #[test]
    fn sqlite_errors_become_storage_errors() {
        let err: LedgerError = rusqlite::Error::QueryReturnedNoRows.into();
        assert!(matches!(err, LedgerError::Storage(_)));
    }
}
