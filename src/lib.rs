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

//! # Market Ledger
//!
//! This library keeps user balances for a small digital goods shop: users
//! deposit, withdraw and buy products from a fixed catalog, and every
//! balance change is recorded as an immutable journal entry.
//!
//! ## Core Components
//!
//! - [`Ledger`]: Validates requests and runs them against a store
//! - [`LedgerStore`]: Storage seam, implemented by [`MemoryStore`] and [`SqliteStore`]
//! - [`Catalog`] / [`Product`]: The products seeded at startup
//! - [`Transaction`] / [`TransactionKind`]: Journal entries (deposit, withdraw, purchase)
//! - [`LedgerError`]: Error types for rejected operations
//!
//! ## Example
//!
//! ```
//! use market_ledger::{Catalog, Ledger, LedgerError, ProductId, UserId};
//! use rust_decimal_macros::dec;
//!
//! let ledger = Ledger::in_memory();
//! ledger.seed_catalog(&Catalog::uniform(3, dec!(10))).unwrap();
//!
//! // Amounts may arrive as text straight from the user
//! assert_eq!(ledger.deposit(UserId(1), "25").unwrap(), dec!(25));
//! assert_eq!(ledger.purchase(UserId(1), ProductId(2)).unwrap(), dec!(15));
//! assert_eq!(
//!     ledger.withdraw(UserId(1), dec!(100)),
//!     Err(LedgerError::InsufficientFunds)
//! );
//! ```
//!
//! ## Thread Safety
//!
//! Stores serialize concurrent operations on the same user, so two
//! simultaneous debits cannot both spend the same balance.

pub mod account;
mod amount;
mod base;
pub mod error;
mod journal;
mod ledger;
mod product;
pub mod store;
mod transaction;

pub use account::Account;
pub use amount::{IntoAmount, parse_amount};
pub use base::{ProductId, TransactionId, UserId};
pub use error::LedgerError;
pub use journal::Journal;
pub use ledger::Ledger;
pub use product::{Catalog, Product};
pub use store::{LedgerStore, MemoryStore, SqliteStore};
pub use transaction::{NewTransaction, Transaction, TransactionKind, UnknownKind};
