//! Money types
//!
//! Domain primitives for prices, balance credits and balances.
//! Values are validated at construction so a negative price or credit
//! cannot reach the database.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Maximum decimal places stored for money columns
const MAX_SCALE: u32 = 2;

/// Errors that can occur when creating a money value
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MoneyError {
    #[error("Amount must not be negative (got {0})")]
    Negative(Decimal),

    #[error("Amount must be positive (got {0})")]
    NotPositive(Decimal),

    #[error("Amount has too many decimal places (max {MAX_SCALE}, got {0})")]
    TooManyDecimals(u32),

    #[error("Invalid amount format: {0}")]
    ParseError(String),
}

fn check_scale(value: Decimal) -> Result<Decimal, MoneyError> {
    let normalized = value.normalize();
    if normalized.scale() > MAX_SCALE {
        return Err(MoneyError::TooManyDecimals(normalized.scale()));
    }
    Ok(value)
}

/// Course price. Zero is allowed (free courses).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "Decimal", into = "Decimal")]
pub struct Price(Decimal);

impl Price {
    pub fn new(value: Decimal) -> Result<Self, MoneyError> {
        if value.is_sign_negative() && !value.is_zero() {
            return Err(MoneyError::Negative(value));
        }
        check_scale(value).map(Self)
    }

    pub fn value(&self) -> Decimal {
        self.0
    }
}

impl TryFrom<Decimal> for Price {
    type Error = MoneyError;

    fn try_from(value: Decimal) -> Result<Self, Self::Error> {
        Price::new(value)
    }
}

impl From<Price> for Decimal {
    fn from(price: Price) -> Self {
        price.0
    }
}

impl FromStr for Price {
    type Err = MoneyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let decimal = Decimal::from_str(s.trim())
            .map_err(|e| MoneyError::ParseError(e.to_string()))?;
        Price::new(decimal)
    }
}

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.2}", self.0)
    }
}

/// Positive amount added to a user's balance by an administrator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Decimal", into = "Decimal")]
pub struct Credit(Decimal);

impl Credit {
    pub fn new(value: Decimal) -> Result<Self, MoneyError> {
        if value <= Decimal::ZERO {
            return Err(MoneyError::NotPositive(value));
        }
        check_scale(value).map(Self)
    }

    pub fn value(&self) -> Decimal {
        self.0
    }
}

impl TryFrom<Decimal> for Credit {
    type Error = MoneyError;

    fn try_from(value: Decimal) -> Result<Self, Self::Error> {
        Credit::new(value)
    }
}

impl From<Credit> for Decimal {
    fn from(credit: Credit) -> Self {
        credit.0
    }
}

/// User balance (zero or positive).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Balance(Decimal);

impl Balance {
    pub fn new(value: Decimal) -> Result<Self, MoneyError> {
        if value.is_sign_negative() && !value.is_zero() {
            return Err(MoneyError::Negative(value));
        }
        Ok(Self(value))
    }

    pub fn value(&self) -> Decimal {
        self.0
    }

    /// Check if balance covers the price
    pub fn is_sufficient_for(&self, price: &Price) -> bool {
        self.0 >= price.value()
    }

    /// Subtract a price from the balance.
    ///
    /// Returns `None` when the result would drop below zero.
    pub fn debit(&self, price: &Price) -> Option<Balance> {
        if !self.is_sufficient_for(price) {
            return None;
        }
        Some(Self(self.0 - price.value()))
    }
}

impl fmt::Display for Balance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.2}", self.0)
    }
}
