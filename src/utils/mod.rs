//! Display helpers for amounts and dates.
//!
//! Amounts stay at full precision through the calculation; rounding to
//! two places happens here and in the report writers, nowhere else.

use chrono::NaiveDate;
use rust_decimal::Decimal;

/// Prefix printed in front of a formatted amount
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CurrencySymbol {
    INR,
    USD,
    /// Bare number, for table cells
    None,
}

impl CurrencySymbol {
    fn prefix(self) -> &'static str {
        match self {
            CurrencySymbol::INR => "₹",
            CurrencySymbol::USD => "$",
            CurrencySymbol::None => "",
        }
    }
}

/// Placeholder for values that could not be computed
pub const NOT_AVAILABLE: &str = "N/A";

/// Round half-to-even at 2 decimal places.
///
/// ```
/// use itr_calc::utils::round2;
/// use rust_decimal_macros::dec;
///
/// assert_eq!(round2(dec!(8250.456)), dec!(8250.46));
/// assert_eq!(round2(dec!(0.125)), dec!(0.12));
/// ```
pub fn round2(value: Decimal) -> Decimal {
    value.round_dp(2)
}

/// Insert `,` every three digits, counting from the right
fn group_thousands(digits: &str) -> String {
    let lead = digits.len() % 3;
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (i + 3 - lead) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(c);
    }
    grouped
}

/// Render `value` rounded to 2 places with thousands separators,
/// right-aligned to at least `width` columns.
///
/// ```
/// use itr_calc::utils::{format_currency_with_width, CurrencySymbol};
/// use rust_decimal_macros::dec;
///
/// assert_eq!(
///     format_currency_with_width(dec!(1234.56), 0, CurrencySymbol::INR),
///     "₹1,234.56"
/// );
/// assert_eq!(
///     format_currency_with_width(dec!(1234), 12, CurrencySymbol::None),
///     "    1,234.00"
/// );
/// ```
pub fn format_currency_with_width(value: Decimal, width: usize, symbol: CurrencySymbol) -> String {
    let rounded = round2(value);
    let fixed = format!("{:.2}", rounded.abs());
    let (whole, cents) = fixed.split_once('.').unwrap_or((fixed.as_str(), "00"));

    let sign = if rounded.is_sign_negative() && !rounded.is_zero() {
        "-"
    } else {
        ""
    };
    let text = format!("{}{}{}.{}", sign, symbol.prefix(), group_thousands(whole), cents);

    // width counts chars, so the rupee sign takes one column
    format!("{:>width$}", text, width = width)
}

/// "₹1,234.56"
///
/// ```
/// use itr_calc::utils::format_inr;
/// use rust_decimal_macros::dec;
///
/// assert_eq!(format_inr(dec!(1234.56)), "₹1,234.56");
/// assert_eq!(format_inr(dec!(-500)), "-₹500.00");
/// ```
pub fn format_inr(value: Decimal) -> String {
    format_currency_with_width(value, 0, CurrencySymbol::INR)
}

pub fn format_usd(value: Decimal) -> String {
    format_currency_with_width(value, 0, CurrencySymbol::USD)
}

pub fn format_decimal(value: Decimal) -> String {
    format_currency_with_width(value, 0, CurrencySymbol::None)
}

/// `format` applied to the value, or "N/A"
pub fn format_optional<T>(value: Option<T>, format: impl Fn(T) -> String) -> String {
    match value {
        Some(v) => format(v),
        None => NOT_AVAILABLE.to_string(),
    }
}

pub fn format_date(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_group_thousands() {
        assert_eq!(group_thousands("0"), "0");
        assert_eq!(group_thousands("999"), "999");
        assert_eq!(group_thousands("1000"), "1,000");
        assert_eq!(group_thousands("123456"), "123,456");
        assert_eq!(group_thousands("12345678"), "12,345,678");
    }

    #[test]
    fn test_currency_prefixes() {
        assert_eq!(format_inr(dec!(0.99)), "₹0.99");
        assert_eq!(format_inr(dec!(999.99)), "₹999.99");
        assert_eq!(format_usd(dec!(1000000)), "$1,000,000.00");
        assert_eq!(format_decimal(dec!(12345678.90)), "12,345,678.90");
    }

    #[test]
    fn test_negative_sign_precedes_symbol() {
        assert_eq!(format_inr(dec!(-1234.56)), "-₹1,234.56");
        assert_eq!(format_usd(dec!(-0.01)), "-$0.01");
        assert_eq!(format_decimal(dec!(-1000000)), "-1,000,000.00");
    }

    #[test]
    fn test_padding_counts_rupee_as_one_column() {
        let padded = format_currency_with_width(dec!(100), 12, CurrencySymbol::INR);
        assert_eq!(padded, "     ₹100.00");
        assert_eq!(padded.chars().count(), 12);

        // Never truncated
        assert_eq!(
            format_currency_with_width(dec!(1000000), 5, CurrencySymbol::USD),
            "$1,000,000.00"
        );
    }

    #[test]
    fn test_rounds_before_formatting() {
        assert_eq!(format_decimal(dec!(1.234)), "1.23");
        assert_eq!(format_decimal(dec!(1.996)), "2.00");
        assert_eq!(format_decimal(dec!(-0.001)), "0.00");
    }

    #[test]
    fn test_format_optional() {
        assert_eq!(format_optional(Some(dec!(82.5)), format_decimal), "82.50");
        assert_eq!(format_optional(None::<Decimal>, format_decimal), "N/A");
    }
}
