use crate::quotes::Asset;
use rust_decimal::prelude::*;
use std::str::FromStr;

const SUFFIXES: [&str; 5] = ["", "K", "M", "B", "T"];
const WHOLE_NUMBER_ABOVE: f64 = 10000.0;
const MAX_FRACTION_DIGITS: u32 = 8;

/// Abbreviates to three significant digits with a magnitude suffix, e.g. `1.23K`.
pub fn human_format(num: f64) -> String {
    let mut num = round_significant(num, 3);
    let mut magnitude = 0;
    while num.abs() >= 1000.0 && magnitude < SUFFIXES.len() - 1 {
        magnitude += 1;
        num /= 1000.0;
    }
    let digits = format!("{:.6}", num);
    let digits = digits.trim_end_matches('0').trim_end_matches('.');
    format!("{}{}", digits, SUFFIXES[magnitude])
}

fn round_significant(num: f64, digits: i32) -> f64 {
    if num == 0.0 || !num.is_finite() {
        return 0.0;
    }
    let exp = digits - 1 - num.abs().log10().floor() as i32;
    if exp >= 0 {
        let scale = 10f64.powi(exp);
        (num * scale).round() / scale
    } else {
        let scale = 10f64.powi(-exp);
        (num / scale).round() * scale
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct NumberRules {
    decimal: char,
    group: char,
    symbol_first: bool,
}

fn number_rules(locale: &str) -> NumberRules {
    let language = locale.split(|c: char| c == '_' || c == '-').next().unwrap_or_default();
    match language {
        "de" | "es" | "it" | "da" | "id" | "tr" => NumberRules {
            decimal: ',',
            group: '.',
            symbol_first: false,
        },
        "nl" | "pt" => NumberRules {
            decimal: ',',
            group: '.',
            symbol_first: true,
        },
        "fr" | "ru" | "pl" | "sv" | "nb" | "fi" | "cs" | "uk" => NumberRules {
            decimal: ',',
            group: ' ',
            symbol_first: false,
        },
        _ => NumberRules {
            decimal: '.',
            group: ',',
            symbol_first: true,
        },
    }
}

fn currency_symbol(code: &str) -> &str {
    match code {
        "USD" => "$",
        "EUR" => "€",
        "GBP" => "£",
        "JPY" | "CNY" => "¥",
        "AUD" => "A$",
        "CAD" => "CA$",
        "NZD" => "NZ$",
        "HKD" => "HK$",
        other => other,
    }
}

/// Currency code as shown on screen; tether is displayed as dollars.
pub fn display_fiat(fiat: &str) -> String {
    let fiat = fiat.to_uppercase();
    if fiat == "USDT" {
        "USD".to_string()
    } else {
        fiat
    }
}

fn group_digits(integer: &str, separator: char) -> String {
    let len = integer.len();
    let mut grouped = String::with_capacity(len + len / 3);
    for (i, c) in integer.chars().enumerate() {
        if i > 0 && (len - i) % 3 == 0 {
            grouped.push(separator);
        }
        grouped.push(c);
    }
    grouped
}

fn fraction_digits(value: f64) -> Option<Decimal> {
    let mut d = Decimal::from_str(&value.abs().to_string())
        .ok()?
        .round_dp(MAX_FRACTION_DIGITS)
        .normalize();
    if d.scale() < 2 {
        d.rescale(2);
    }
    Some(d)
}

/// Formats `value` as a currency string for `locale`. Whole formatting drops
/// the fractional part entirely; otherwise every significant fraction digit is
/// kept, with at least two.
pub fn format_currency(value: f64, code: &str, locale: &str, whole: bool) -> String {
    let rules = number_rules(locale);
    let digits = if whole {
        format!("{}", value.abs().trunc() as u64)
    } else {
        fraction_digits(value)
            .map(|d| d.to_string())
            .unwrap_or_else(|| format!("{:.2}", value.abs()))
    };
    let (integer, fraction) = match digits.split_once('.') {
        Some((integer, fraction)) => (integer, Some(fraction)),
        None => (digits.as_str(), None),
    };
    let mut number = group_digits(integer, rules.group);
    if let Some(fraction) = fraction {
        number.push(rules.decimal);
        number.push_str(fraction);
    }
    let sign = if value < 0.0 { "-" } else { "" };
    let symbol = currency_symbol(code);
    let spaced = symbol.chars().all(char::is_alphabetic);
    if rules.symbol_first {
        let gap = if spaced { " " } else { "" };
        format!("{}{}{}{}", sign, symbol, gap, number)
    } else {
        format!("{}{} {}", sign, number, symbol)
    }
}

pub fn price_string(asset: &Asset, price: f64, fiat: &str, locale: &str) -> String {
    match asset {
        Asset::Equity(symbol) => format!("{}: ${}", symbol, human_format(price)),
        Asset::Crypto(_) => format_currency(
            price,
            &display_fiat(fiat),
            locale,
            price > WHOLE_NUMBER_ABOVE,
        ),
    }
}

pub fn change_string(days: u32, change_pct: f64) -> String {
    format!("{} day : {:+.2}%", days, change_pct)
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_human_format() {
        assert_eq!(human_format(0.0), "0");
        assert_eq!(human_format(999.0), "999");
        assert_eq!(human_format(1234.0), "1.23K");
        assert_eq!(human_format(999_700.0), "1M");
        assert_eq!(human_format(1_500_000.0), "1.5M");
        assert_eq!(human_format(31_234_567_890.0), "31.2B");
        assert_eq!(human_format(0.5), "0.5");
    }

    #[test]
    fn test_large_prices_have_no_fraction() {
        let asset = Asset::parse("bitcoin");
        assert_eq!(price_string(&asset, 67432.89, "usd", "en_US"), "$67,432");
        assert_eq!(price_string(&asset, 67432.89, "eur", "de_DE"), "67.432 €");
        assert_eq!(price_string(&asset, 67432.89, "usdt", "en_US"), "$67,432");
    }

    #[test]
    fn test_small_prices_keep_fraction_digits() {
        let asset = Asset::parse("ethereum");
        assert_eq!(price_string(&asset, 3120.5, "usd", "en_US"), "$3,120.50");
        assert_eq!(price_string(&asset, 3120.5, "eur", "fr_FR"), "3 120,50 €");
        assert_eq!(price_string(&asset, 0.00001234, "gbp", "en_GB"), "£0.00001234");
        assert_eq!(price_string(&asset, 1.0, "chf", "en_US"), "CHF 1.00");
    }

    #[test]
    fn test_equity_price_is_abbreviated() {
        let asset = Asset::parse("AAPL.US");
        assert_eq!(price_string(&asset, 189.87, "eur", "de_DE"), "AAPL: $190");
        assert_eq!(price_string(&asset, 1234.5, "usd", "en_US"), "AAPL: $1.23K");
    }

    #[test]
    fn test_change_string() {
        assert_eq!(change_string(7, 10.0), "7 day : +10.00%");
        assert_eq!(change_string(1, -0.5), "1 day : -0.50%");
    }

    #[test]
    fn test_group_digits() {
        assert_eq!(group_digits("1", ','), "1");
        assert_eq!(group_digits("123456", ','), "123,456");
        assert_eq!(group_digits("1234567", '.'), "1.234.567");
    }
}
