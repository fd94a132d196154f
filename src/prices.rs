//! Prices

use rust_decimal::{Decimal, prelude::ToPrimitive};
use rusty_money::{
    Money,
    iso::{Currency, EUR, GBP, INR, USD},
};
use thiserror::Error;

/// A money amount in one of the catalog currencies.
pub type Price = Money<'static, Currency>;

/// Errors parsing prices and currency codes.
#[derive(Debug, Error, PartialEq)]
pub enum PriceParseError {
    /// Price string was not of the form `AMOUNT CURRENCY`.
    #[error("invalid price format: {0}")]
    InvalidFormat(String),

    /// Currency code is not one the catalog supports.
    #[error("unknown currency code: {0}")]
    UnknownCurrency(String),
}

/// Look up a supported currency by its ISO alpha code.
///
/// # Errors
///
/// Returns [`PriceParseError::UnknownCurrency`] for unsupported codes.
pub fn currency_for_code(code: &str) -> Result<&'static Currency, PriceParseError> {
    match code {
        "INR" => Ok(INR),
        "GBP" => Ok(GBP),
        "USD" => Ok(USD),
        "EUR" => Ok(EUR),
        other => Err(PriceParseError::UnknownCurrency(other.to_string())),
    }
}

/// Parse a price string (e.g. `"330 INR"` or `"2.99 GBP"`).
///
/// # Errors
///
/// Returns an error if the string is not in the format "AMOUNT CURRENCY", the
/// amount is not a decimal, or the currency code is not recognised.
pub fn parse_price(s: &str) -> Result<Price, PriceParseError> {
    let mut parts = s.split_whitespace();

    let (Some(amount), Some(code), None) = (parts.next(), parts.next(), parts.next()) else {
        return Err(PriceParseError::InvalidFormat(s.to_string()));
    };

    let minor_units = amount
        .parse::<Decimal>()
        .ok()
        .and_then(|value| value.checked_mul(Decimal::ONE_HUNDRED))
        .and_then(|value| value.round_dp(0).to_i64())
        .ok_or_else(|| PriceParseError::InvalidFormat(s.to_string()))?;

    Ok(Money::from_minor(minor_units, currency_for_code(code)?))
}

/// Zero in the given currency.
pub fn zero(currency: &'static Currency) -> Price {
    Money::from_minor(0, currency)
}

#[cfg(test)]
mod tests {
    use testresult::TestResult;

    use super::*;

    #[test]
    fn parse_price_reads_major_units() -> TestResult {
        assert_eq!(parse_price("330 INR")?, Money::from_minor(33_000, INR));
        assert_eq!(parse_price("2.99 GBP")?, Money::from_minor(299, GBP));

        Ok(())
    }

    #[test]
    fn parse_price_rejects_missing_currency() {
        assert!(matches!(
            parse_price("330"),
            Err(PriceParseError::InvalidFormat(_))
        ));
    }

    #[test]
    fn parse_price_rejects_unknown_currency() {
        let result = parse_price("1.00 ABC");

        assert!(matches!(result, Err(PriceParseError::UnknownCurrency(code)) if code == "ABC"));
    }

    #[test]
    fn zero_has_no_minor_units() {
        assert_eq!(zero(USD).to_minor_units(), 0);
    }
}
