//! Type-safe price representation using decimal arithmetic.
//!
//! Product prices are stored by the backend as `numeric` and rendered with
//! the storefront's currency conventions. Formatting follows the browser's
//! `Intl.NumberFormat` output for the same locale, so the server-rendered
//! pages show exactly what shoppers are used to seeing.

use core::fmt;
use core::str::FromStr;

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

/// Errors from parsing a price entered in a form.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum PriceError {
    /// The field was left blank.
    #[error("price is required")]
    Missing,
    /// Not a decimal number.
    #[error("price must be a number: {0}")]
    Invalid(String),
    /// Less than zero.
    #[error("price cannot be negative")]
    Negative,
    /// Unknown ISO 4217 code.
    #[error("unsupported currency: {0}")]
    UnsupportedCurrency(String),
}

/// Currencies the storefront knows how to display.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum Currency {
    /// Indonesian rupiah, formatted like `id-ID` (`Rp 1.500.000`).
    #[default]
    IDR,
    /// US dollar, formatted like `en-US` (`$1,500.00`).
    USD,
}

/// Locale conventions for one currency.
struct FormatSpec {
    prefix: &'static str,
    group_separator: char,
    decimal_separator: char,
    min_fraction_digits: usize,
    max_fraction_digits: u32,
}

impl Currency {
    /// ISO 4217 code.
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::IDR => "IDR",
            Self::USD => "USD",
        }
    }

    const fn spec(self) -> FormatSpec {
        match self {
            // minimumFractionDigits: 0, currency default maximum of 2
            Self::IDR => FormatSpec {
                prefix: "Rp\u{a0}",
                group_separator: '.',
                decimal_separator: ',',
                min_fraction_digits: 0,
                max_fraction_digits: 2,
            },
            Self::USD => FormatSpec {
                prefix: "$",
                group_separator: ',',
                decimal_separator: '.',
                min_fraction_digits: 2,
                max_fraction_digits: 2,
            },
        }
    }
}

impl FromStr for Currency {
    type Err = PriceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "IDR" => Ok(Self::IDR),
            "USD" => Ok(Self::USD),
            other => Err(PriceError::UnsupportedCurrency(other.to_owned())),
        }
    }
}

/// A price with currency information.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Price {
    /// Amount in the currency's standard unit (rupiah, dollars).
    pub amount: Decimal,
    /// Display currency.
    pub currency: Currency,
}

impl Price {
    /// Create a new price.
    #[must_use]
    pub const fn new(amount: Decimal, currency: Currency) -> Self {
        Self { amount, currency }
    }

    /// Parse the amount typed into a product form.
    ///
    /// # Errors
    ///
    /// Returns [`PriceError`] for blank, non-numeric or negative input.
    pub fn parse_amount(input: &str) -> Result<Decimal, PriceError> {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return Err(PriceError::Missing);
        }
        let amount =
            Decimal::from_str(trimmed).map_err(|_| PriceError::Invalid(trimmed.to_owned()))?;
        if amount.is_sign_negative() && !amount.is_zero() {
            return Err(PriceError::Negative);
        }
        Ok(amount)
    }

    /// Sum a set of amounts in one currency.
    #[must_use]
    pub fn total(amounts: impl IntoIterator<Item = Decimal>, currency: Currency) -> Self {
        Self::new(amounts.into_iter().sum(), currency)
    }

    /// Render for display, e.g. `Rp 1.500.000` or `$19.99`.
    #[must_use]
    pub fn format(&self) -> String {
        let spec = self.currency.spec();
        let rounded = self.amount.round_dp_with_strategy(
            spec.max_fraction_digits,
            RoundingStrategy::MidpointAwayFromZero,
        );
        let negative = rounded.is_sign_negative() && !rounded.is_zero();
        let digits = rounded.abs().normalize().to_string();

        let (integer, fraction) = digits
            .split_once('.')
            .map_or((digits.as_str(), ""), |(i, f)| (i, f));

        let mut fraction = fraction.to_owned();
        while fraction.len() < spec.min_fraction_digits {
            fraction.push('0');
        }

        let mut out = String::with_capacity(digits.len() + 8);
        if negative {
            out.push('-');
        }
        out.push_str(spec.prefix);
        out.push_str(&group_thousands(integer, spec.group_separator));
        if !fraction.is_empty() {
            out.push(spec.decimal_separator);
            out.push_str(&fraction);
        }
        out
    }
}

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.format())
    }
}

fn group_thousands(integer: &str, separator: char) -> String {
    let len = integer.len();
    let mut out = String::with_capacity(len + len / 3);
    for (i, c) in integer.chars().enumerate() {
        if i > 0 && (len - i) % 3 == 0 {
            out.push(separator);
        }
        out.push(c);
    }
    out
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn idr(s: &str) -> String {
        Price::new(Decimal::from_str(s).unwrap(), Currency::IDR).format()
    }

    #[test]
    fn test_idr_whole_amounts() {
        assert_eq!(idr("100"), "Rp\u{a0}100");
        assert_eq!(idr("0"), "Rp\u{a0}0");
        assert_eq!(idr("1500000"), "Rp\u{a0}1.500.000");
        assert_eq!(idr("100.00"), "Rp\u{a0}100");
    }

    #[test]
    fn test_idr_fractions_trimmed_and_rounded() {
        assert_eq!(idr("1500.5"), "Rp\u{a0}1.500,5");
        assert_eq!(idr("1500.505"), "Rp\u{a0}1.500,51");
        assert_eq!(idr("999.999"), "Rp\u{a0}1.000");
    }

    #[test]
    fn test_negative_amount() {
        assert_eq!(idr("-2500"), "-Rp\u{a0}2.500");
    }

    #[test]
    fn test_usd_keeps_two_decimals() {
        let price = Price::new(Decimal::from_str("1234.5").unwrap(), Currency::USD);
        assert_eq!(price.to_string(), "$1,234.50");
    }

    #[test]
    fn test_parse_amount() {
        assert_eq!(Price::parse_amount(" 100 ").unwrap(), Decimal::from(100));
        assert_eq!(
            Price::parse_amount("19.99").unwrap(),
            Decimal::from_str("19.99").unwrap()
        );
        assert_eq!(Price::parse_amount(""), Err(PriceError::Missing));
        assert_eq!(Price::parse_amount("-1"), Err(PriceError::Negative));
        assert!(matches!(
            Price::parse_amount("ten"),
            Err(PriceError::Invalid(_))
        ));
    }

    #[test]
    fn test_total() {
        let total = Price::total(
            [Decimal::from(100), Decimal::from_str("250.5").unwrap()],
            Currency::IDR,
        );
        assert_eq!(total.format(), "Rp\u{a0}350,5");
        assert_eq!(Price::total([], Currency::IDR).format(), "Rp\u{a0}0");
    }

    #[test]
    fn test_currency_from_str() {
        assert_eq!("idr".parse::<Currency>().unwrap(), Currency::IDR);
        assert_eq!(Currency::USD.code(), "USD");
        assert!("EUR".parse::<Currency>().is_err());
    }
}
