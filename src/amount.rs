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

//! Amount parsing for deposits and withdrawals.
//!
//! Callers hand the ledger whatever the user typed, or a number they already
//! hold. [`IntoAmount`] turns either into a [`Decimal`], and [`parse_amount`]
//! additionally enforces that the result is strictly positive.

use crate::LedgerError;
use rust_decimal::Decimal;
use std::str::FromStr;

/// Conversion of caller input into a monetary amount.
///
/// Conversion alone does not check the sign; see [`parse_amount`].
pub trait IntoAmount {
    fn into_amount(self) -> Result<Decimal, LedgerError>;
}

impl IntoAmount for Decimal {
    fn into_amount(self) -> Result<Decimal, LedgerError> {
        Ok(self)
    }
}

impl IntoAmount for &str {
    fn into_amount(self) -> Result<Decimal, LedgerError> {
        let input = self.trim();
        if input.is_empty() {
            return Err(LedgerError::InvalidAmount);
        }
        Decimal::from_str(input)
            .or_else(|_| Decimal::from_scientific(input))
            .map_err(|_| LedgerError::InvalidAmount)
    }
}

impl IntoAmount for String {
    fn into_amount(self) -> Result<Decimal, LedgerError> {
        self.as_str().into_amount()
    }
}

impl IntoAmount for &String {
    fn into_amount(self) -> Result<Decimal, LedgerError> {
        self.as_str().into_amount()
    }
}

impl IntoAmount for f64 {
    fn into_amount(self) -> Result<Decimal, LedgerError> {
        if !self.is_finite() {
            return Err(LedgerError::InvalidAmount);
        }
        Decimal::try_from(self).map_err(|_| LedgerError::InvalidAmount)
    }
}

impl IntoAmount for f32 {
    fn into_amount(self) -> Result<Decimal, LedgerError> {
        if !self.is_finite() {
            return Err(LedgerError::InvalidAmount);
        }
        Decimal::try_from(self).map_err(|_| LedgerError::InvalidAmount)
    }
}

impl IntoAmount for i64 {
    fn into_amount(self) -> Result<Decimal, LedgerError> {
        Ok(Decimal::from(self))
    }
}

impl IntoAmount for i32 {
    fn into_amount(self) -> Result<Decimal, LedgerError> {
        Ok(Decimal::from(self))
    }
}

impl IntoAmount for u32 {
    fn into_amount(self) -> Result<Decimal, LedgerError> {
        Ok(Decimal::from(self))
    }
}

/// Converts `input` and rejects anything that is not strictly positive.
///
/// # Errors
///
/// Returns [`LedgerError::InvalidAmount`] for unparsable, non-finite, zero
/// or negative input.
pub fn parse_amount<A: IntoAmount>(input: A) -> Result<Decimal, LedgerError> {
    let amount = input.into_amount()?;
    if amount <= Decimal::ZERO {
        return Err(LedgerError::InvalidAmount);
    }
    Ok(amount)
}
