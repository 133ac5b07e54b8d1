//! Exact money handling.
//!
//! Amounts are [Decimal] values in the domain types and whole cents (`i64`) in
//! the database. Amounts cross the API as strings with two fractional digits,
//! e.g. "12.30". The currency is always EUR.

use std::str::FromStr;

use rust_decimal::{Decimal, RoundingStrategy, prelude::ToPrimitive};
use serde::Deserialize;

use crate::Error;

/// The only currency supported by the bank.
pub const CURRENCY: &str = "EUR";

/// An amount of money in whole cents.
pub type Cents = i64;

/// Convert `amount` to whole cents, rounding half away from zero.
///
/// Returns `None` if the amount does not fit in an `i64` number of cents.
pub fn to_cents(amount: Decimal) -> Option<Cents> {
    amount
        .checked_mul(Decimal::ONE_HUNDRED)?
        .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
        .to_i64()
}

/// Convert whole cents to a decimal amount with two fractional digits.
pub fn from_cents(cents: Cents) -> Decimal {
    Decimal::new(cents, 2)
}

/// Convert `amount` to whole cents without rounding.
///
/// # Errors
///
/// Returns an [Error::Validation] if the amount has more than two fractional
/// digits or is too large to store.
pub fn to_exact_cents(amount: Decimal) -> Result<Cents, Error> {
    let cents = to_cents(amount)
        .ok_or_else(|| Error::Validation(format!("the amount {amount} is too large")))?;

    if from_cents(cents) != amount {
        return Err(Error::Validation(format!(
            "the amount {amount} has more than two decimal places"
        )));
    }

    Ok(cents)
}

/// Format `amount` with exactly two fractional digits, e.g. "3.40".
pub fn format_amount(amount: Decimal) -> String {
    let rounded = amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);

    format!("{rounded:.2}")
}

/// Parse a decimal amount such as "12.30" or "-4".
///
/// # Errors
///
/// Returns an [Error::Validation] if `raw` is not a decimal number.
pub fn parse_amount(raw: &str) -> Result<Decimal, Error> {
    let raw = raw.trim();

    Decimal::from_str(raw)
        .or_else(|_| Decimal::from_scientific(raw))
        .map_err(|_| Error::Validation(format!("\"{raw}\" is not a valid amount")))
}

/// An amount as sent by a client, either a JSON string or a JSON number.
///
/// Parsing is deferred to [AmountInput::parse] so that a malformed amount is
/// reported as a validation error with a readable message.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum AmountInput {
    /// An amount sent as a string, the preferred form.
    Text(String),
    /// An amount sent as a JSON number.
    Number(serde_json::Number),
}

impl AmountInput {
    /// Parse the client input into a decimal amount.
    ///
    /// # Errors
    ///
    /// Returns an [Error::Validation] if the input is not a decimal number.
    pub fn parse(&self) -> Result<Decimal, Error> {
        match self {
            AmountInput::Text(text) => parse_amount(text),
            AmountInput::Number(number) => parse_amount(&number.to_string()),
        }
    }
}

/// Serialize a [Decimal] as a string with two fractional digits.
///
/// Use with `#[serde(serialize_with = "amount_format::serialize")]`.
pub mod amount_format {
    use rust_decimal::Decimal;
    use serde::Serializer;

    use super::format_amount;

    pub fn serialize<S>(amount: &Decimal, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&format_amount(*amount))
    }
}

/// Like [amount_format] for optional amounts, `None` is serialized as `null`.
pub mod optional_amount_format {
    use rust_decimal::Decimal;
    use serde::Serializer;

    use super::format_amount;

    pub fn serialize<S>(amount: &Option<Decimal>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match amount {
            Some(amount) => serializer.serialize_str(&format_amount(*amount)),
            None => serializer.serialize_none(),
        }
    }
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;
    use serde::Serialize;

    use crate::{
        Error,
        money::{
            AmountInput, amount_format, format_amount, from_cents, parse_amount, to_cents,
            to_exact_cents,
        },
    };

    fn d(amount: &str) -> Decimal {
        amount.parse().unwrap()
    }

    #[test]
    fn to_cents_rounds_half_away_from_zero() {
        assert_eq!(to_cents(d("10.005")), Some(1001));
        assert_eq!(to_cents(d("10.004")), Some(1000));
        assert_eq!(to_cents(d("-0.015")), Some(-2));
    }

    #[test]
    fn from_cents_keeps_two_decimal_places() {
        assert_eq!(from_cents(334), d("3.34"));
        assert_eq!(from_cents(334).to_string(), "3.34");
        assert_eq!(from_cents(-5).to_string(), "-0.05");
    }

    #[test]
    fn to_exact_cents_rejects_sub_cent_amounts() {
        assert_eq!(to_exact_cents(d("25.00")), Ok(2500));
        assert!(matches!(
            to_exact_cents(d("25.001")),
            Err(Error::Validation(_))
        ));
    }

    #[test]
    fn format_amount_pads_to_two_digits() {
        assert_eq!(format_amount(d("3.4")), "3.40");
        assert_eq!(format_amount(d("7")), "7.00");
        assert_eq!(format_amount(d("0.125")), "0.13");
    }

    #[test]
    fn parse_amount_fails_on_garbage() {
        assert!(matches!(parse_amount("ten euros"), Err(Error::Validation(_))));
        assert_eq!(parse_amount(" 12.50 "), Ok(d("12.50")));
    }

    #[test]
    fn amount_input_accepts_strings_and_numbers() {
        let text: AmountInput = serde_json::from_str(r#""10.50""#).unwrap();
        let number: AmountInput = serde_json::from_str("10.5").unwrap();

        assert_eq!(text.parse(), Ok(d("10.50")));
        assert_eq!(number.parse(), Ok(d("10.5")));
    }

    #[test]
    fn serializes_amount_as_string() {
        #[derive(Serialize)]
        struct Wrapper {
            #[serde(serialize_with = "amount_format::serialize")]
            amount: Decimal,
        }

        let json = serde_json::to_string(&Wrapper { amount: d("3.3") }).unwrap();

        assert_eq!(json, r#"{"amount":"3.30"}"#);
    }
}
