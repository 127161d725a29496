use chrono::{Datelike, NaiveDate};
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

/// Number and currency formatting policy.
///
/// Defaults reproduce the dashboard's Moroccan French output
/// (`1.234,50 DH`).
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct NumberFormat {
    pub locale: String,
    pub currency_code: String,
    /// Decimal places for prices and line-item amounts
    pub minor_unit_digits: u32,
    /// Decimal places for large summary figures such as total revenue
    pub summary_digits: u32,
}

impl Default for NumberFormat {
    fn default() -> Self {
        Self {
            locale: "fr-MA".to_string(),
            currency_code: "MAD".to_string(),
            minor_unit_digits: 2,
            summary_digits: 0,
        }
    }
}

struct Conventions {
    decimal: char,
    group: &'static str,
    symbol_first: bool,
    symbol_gap: &'static str,
    percent_gap: &'static str,
    french_dates: bool,
}

const NBSP: &str = "\u{a0}";
const NARROW_NBSP: &str = "\u{202f}";

const FRENCH_MONTHS: [&str; 12] = [
    "janvier", "février", "mars", "avril", "mai", "juin", "juillet", "août", "septembre",
    "octobre", "novembre", "décembre",
];

impl NumberFormat {
    fn conventions(&self) -> Conventions {
        let locale = self.locale.to_ascii_lowercase();
        let language = locale.split(['-', '_']).next().unwrap_or("");
        match (language, locale.as_str()) {
            (_, "fr-ma") => Conventions {
                decimal: ',',
                group: ".",
                symbol_first: false,
                symbol_gap: NBSP,
                percent_gap: NBSP,
                french_dates: true,
            },
            ("fr", _) => Conventions {
                decimal: ',',
                group: NARROW_NBSP,
                symbol_first: false,
                symbol_gap: NBSP,
                percent_gap: NARROW_NBSP,
                french_dates: true,
            },
            ("de", _) | ("es", _) | ("it", _) => Conventions {
                decimal: ',',
                group: ".",
                symbol_first: false,
                symbol_gap: NBSP,
                percent_gap: NBSP,
                french_dates: false,
            },
            _ => Conventions {
                decimal: '.',
                group: ",",
                symbol_first: true,
                symbol_gap: "",
                percent_gap: "",
                french_dates: false,
            },
        }
    }

    fn symbol(&self) -> String {
        match self.currency_code.to_ascii_uppercase().as_str() {
            "MAD" if self.locale.to_ascii_lowercase().ends_with("-ma") => "DH".to_string(),
            "USD" => "$".to_string(),
            "EUR" => "€".to_string(),
            "GBP" => "£".to_string(),
            other => other.to_string(),
        }
    }

    /// Price or line-item amount, with `minor_unit_digits` decimals
    pub fn money(&self, value: Decimal) -> String {
        self.currency(value, self.minor_unit_digits)
    }

    /// Summary figure, with `summary_digits` decimals
    pub fn summary_money(&self, value: Decimal) -> String {
        self.currency(value, self.summary_digits)
    }

    fn currency(&self, value: Decimal, digits: u32) -> String {
        let conv = self.conventions();
        let number = self.number(value, digits);
        let symbol = self.symbol();
        if conv.symbol_first {
            match number.strip_prefix('-') {
                Some(abs) => format!("-{symbol}{}{abs}", conv.symbol_gap),
                None => format!("{symbol}{}{number}", conv.symbol_gap),
            }
        } else {
            format!("{number}{}{symbol}", conv.symbol_gap)
        }
    }

    /// Grouped number with a fixed count of decimals
    pub fn number(&self, value: Decimal, digits: u32) -> String {
        let conv = self.conventions();
        let rounded = value.round_dp_with_strategy(digits, RoundingStrategy::MidpointAwayFromZero);
        let plain = format!("{:.*}", digits as usize, rounded.abs());
        let (whole, frac) = match plain.split_once('.') {
            Some((w, f)) => (w, Some(f)),
            None => (plain.as_str(), None),
        };

        let mut out = String::new();
        if rounded.is_sign_negative() && !rounded.is_zero() {
            out.push('-');
        }
        out.push_str(&group_digits(whole, conv.group));
        if let Some(frac) = frac {
            out.push(conv.decimal);
            out.push_str(frac);
        }
        out
    }

    pub fn integer(&self, value: i64) -> String {
        self.number(Decimal::from(value), 0)
    }

    pub fn percent(&self, value: Decimal) -> String {
        let conv = self.conventions();
        let digits = if value.fract().is_zero() { 0 } else { 1 };
        format!("{}{}%", self.number(value, digits), conv.percent_gap)
    }

    /// Long date: `5 janvier 2024` or `January 5, 2024`
    pub fn date(&self, date: NaiveDate) -> String {
        if self.conventions().french_dates {
            let month = FRENCH_MONTHS[date.month0() as usize];
            format!("{} {} {}", date.day(), month, date.year())
        } else {
            date.format("%B %-d, %Y").to_string()
        }
    }
}

/// Insert a group separator every three digits from the right
fn group_digits(digits: &str, separator: &str) -> String {
    let mut out = String::with_capacity(digits.len() + digits.len() / 3 * separator.len());
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push_str(separator);
        }
        out.push(ch);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dec(s: &str) -> Decimal {
        s.parse().unwrap()
    }

    fn format(locale: &str, currency: &str) -> NumberFormat {
        NumberFormat {
            locale: locale.to_string(),
            currency_code: currency.to_string(),
            ..NumberFormat::default()
        }
    }

    #[test]
    fn default_is_moroccan_dirham() {
        let fmt = NumberFormat::default();
        assert_eq!(fmt.money(dec("1234.5")), "1.234,50\u{a0}DH");
        assert_eq!(fmt.summary_money(dec("1234.5")), "1.235\u{a0}DH");
        assert_eq!(fmt.summary_money(dec("100")), "100\u{a0}DH");
    }

    #[test]
    fn us_dollars_lead_with_symbol() {
        let fmt = format("en-US", "USD");
        assert_eq!(fmt.money(dec("1234567.891")), "$1,234,567.89");
        assert_eq!(fmt.money(dec("-12")), "-$12.00");
        assert_eq!(fmt.summary_money(dec("999.5")), "$1,000");
    }

    #[test]
    fn french_euros_use_narrow_spaces() {
        let fmt = format("fr-FR", "EUR");
        assert_eq!(fmt.money(dec("1234.5")), "1\u{202f}234,50\u{a0}€");
        assert_eq!(fmt.percent(dec("12.5")), "12,5\u{202f}%");
    }

    #[test]
    fn grouping() {
        assert_eq!(group_digits("1", ","), "1");
        assert_eq!(group_digits("123", ","), "123");
        assert_eq!(group_digits("1234", ","), "1,234");
        assert_eq!(group_digits("1234567", "."), "1.234.567");
    }

    #[test]
    fn dates() {
        let d = NaiveDate::from_ymd_opt(2024, 8, 5).unwrap();
        assert_eq!(NumberFormat::default().date(d), "5 août 2024");
        assert_eq!(format("en-US", "USD").date(d), "August 5, 2024");
    }

    #[test]
    fn integers_and_percentages() {
        let fmt = format("en-US", "USD");
        assert_eq!(fmt.integer(15320), "15,320");
        assert_eq!(fmt.percent(dec("-4")), "-4%");
        assert_eq!(fmt.number(dec("-0.004"), 2), "0.00");
    }
}
