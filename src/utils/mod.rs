//! Formatting helpers for CLI display and CSV cells.
//!
//! UK conventions throughout: thousands separator `,`, decimal point `.`,
//! sterling symbol. Null measures render as empty cells so spreadsheet
//! consumers see a blank, not a magic zero.

use rust_decimal::Decimal;

/// Currency symbol options for formatting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CurrencySymbol {
    /// Include the sterling prefix.
    Gbp,
    /// No currency symbol (table cells, CSV output).
    None,
}

/// Core formatting function with full control over output.
///
/// # Examples
/// ```
/// use folio::utils::{format_currency_with_width, CurrencySymbol};
/// use rust_decimal_macros::dec;
///
/// assert_eq!(
///     format_currency_with_width(dec!(1234.56), 0, CurrencySymbol::Gbp),
///     "£1,234.56"
/// );
///
/// assert_eq!(
///     format_currency_with_width(dec!(1234), 12, CurrencySymbol::None),
///     "    1,234.00"
/// );
/// ```
pub fn format_currency_with_width(value: Decimal, width: usize, symbol: CurrencySymbol) -> String {
    let is_negative = value < Decimal::ZERO;
    // Decimal's {:.2} truncates; round explicitly first.
    let abs_value = value.abs().round_dp(2);

    let formatted = format!("{:.2}", abs_value);
    let parts: Vec<&str> = formatted.split('.').collect();
    let integer_part = parts[0];
    let decimal_part = parts.get(1).unwrap_or(&"00");

    let with_separators: String = integer_part
        .chars()
        .rev()
        .enumerate()
        .flat_map(|(i, c)| {
            if i > 0 && i % 3 == 0 {
                vec![',', c]
            } else {
                vec![c]
            }
        })
        .collect::<Vec<_>>()
        .into_iter()
        .rev()
        .collect();

    let sign = if is_negative { "-" } else { "" };
    let prefix = match symbol {
        CurrencySymbol::Gbp => "£",
        CurrencySymbol::None => "",
    };

    let result = format!("{}{}{}.{}", prefix, sign, with_separators, decimal_part);

    if width > 0 && result.chars().count() < width {
        format!("{:>width$}", result, width = width)
    } else {
        result
    }
}

/// Format as sterling with symbol: "£1,234.56".
///
/// # Examples
/// ```
/// use folio::utils::format_currency;
/// use rust_decimal_macros::dec;
///
/// assert_eq!(format_currency(dec!(1234.56)), "£1,234.56");
/// assert_eq!(format_currency(dec!(-500)), "£-500.00");
/// ```
pub fn format_currency(value: Decimal) -> String {
    format_currency_with_width(value, 0, CurrencySymbol::Gbp)
}

/// Format number only (no symbol): "1,234.56".
pub fn format_number(value: Decimal) -> String {
    format_currency_with_width(value, 0, CurrencySymbol::None)
}

/// Percentage cell, rounded to two decimal places: "12.34%".
pub fn format_pct(value: Decimal) -> String {
    format!("{:.2}%", value.round_dp(2))
}

/// A plain numeric cell for CSV output: rounded to four decimal places, no
/// separators so spreadsheets parse it back.
pub fn csv_cell(value: Decimal) -> String {
    format!("{:.4}", value.round_dp(4))
}

/// Null-aware CSV cell: `None` becomes an empty string.
pub fn csv_cell_opt(value: Option<Decimal>) -> String {
    value.map(csv_cell).unwrap_or_default()
}
