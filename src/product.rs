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

//! Product catalog.
//!
//! The catalog is fixed: it is seeded once at startup with insert-if-absent
//! semantics and never edited afterwards.
//!
//! # Example
//!
//! ```
//! use market_ledger::{Catalog, ProductId};
//! use rust_decimal_macros::dec;
//!
//! let catalog = Catalog::uniform(3, dec!(10));
//! assert_eq!(catalog.len(), 3);
//! assert_eq!(catalog.products()[2].id, ProductId(3));
//! ```

use crate::LedgerError;
use crate::base::ProductId;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

/// A purchasable product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    pub price: Decimal,
}

impl Product {
    pub fn new(id: i64, name: impl Into<String>, price: Decimal) -> Self {
        Self {
            id: ProductId(id),
            name: name.into(),
            price,
        }
    }

    /// Checks that the price can be charged. Zero is allowed.
    ///
    /// # Errors
    ///
    /// [`LedgerError::InvalidAmount`] if the price is negative.
    pub fn check_price(&self) -> Result<(), LedgerError> {
        if self.price < Decimal::ZERO {
            return Err(LedgerError::InvalidAmount);
        }
        Ok(())
    }
}

/// Products to seed at startup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Catalog {
    products: Vec<Product>,
}

impl Catalog {
    /// Number of products in the default shop catalog.
    pub const DEFAULT_SIZE: i64 = 91;

    /// Price of every product in the default shop catalog.
    pub const DEFAULT_PRICE: Decimal = dec!(10);

    pub fn new(products: Vec<Product>) -> Self {
        Self { products }
    }

    /// Builds products with ids `1..=size`, all at the same `price`.
    pub fn uniform(size: i64, price: Decimal) -> Self {
        let products = (1..=size)
            .map(|id| Product::new(id, format!("Product {id}"), price))
            .collect();
        Self { products }
    }

    pub fn products(&self) -> &[Product] {
        &self.products
    }

    pub fn len(&self) -> usize {
        self.products.len()
    }

    pub fn is_empty(&self) -> bool {
        self.products.is_empty()
    }
}

impl Default for Catalog {
    fn default() -> Self {
        Self::uniform(Self::DEFAULT_SIZE, Self::DEFAULT_PRICE)
    }
}
