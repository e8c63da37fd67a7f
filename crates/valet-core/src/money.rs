//! Currency formatting and extraction.
//!
//! Payment records carry their amount inside the description text
//! (`"R$ 35,00 paid for ABC1D23"`); reports recover it with
//! [`parse_first_amount`].

use std::sync::LazyLock;

use regex::Regex;

pub const CURRENCY_SYMBOL: &str = "R$";

static AMOUNT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"R\$\s*(\d[\d.,]*)").expect("amount pattern should compile"));

/// Round to cents and render as `R$ 1.234,56`.
#[allow(clippy::cast_possible_truncation, clippy::as_conversions)]
pub fn format(amount: f64) -> String {
    let cents = if amount.is_finite() {
        (amount * 100.0).round() as i64
    } else {
        0
    };
    let sign = if cents < 0 { "-" } else { "" };
    let cents = cents.unsigned_abs();
    let whole = group_thousands(cents / 100);
    format!("{sign}{CURRENCY_SYMBOL} {whole},{:02}", cents % 100)
}

fn group_thousands(n: u64) -> String {
    let digits = n.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push('.');
        }
        out.push(ch);
    }
    out
}

/// Extract the first `R$`-prefixed amount in `text`.
///
/// Accepts `R$ 1.234,56`, `R$ 35,00`, `R$35` and the dot-decimal
/// `R$ 35.50` found in older records.
pub fn parse_first_amount(text: &str) -> Option<f64> {
    let raw = AMOUNT_RE.captures(text)?.get(1)?.as_str();
    let raw = raw.trim_end_matches(['.', ',']);
    normalize_number(raw).parse::<f64>().ok()
}

fn normalize_number(raw: &str) -> String {
    if raw.contains(',') {
        // Brazilian style: dots group thousands, comma is the decimal mark.
        return raw.replace('.', "").replacen(',', ".", 1).replace(',', "");
    }
    match raw.rsplit_once('.') {
        Some((_, tail)) if tail.len() == 3 => raw.replace('.', ""),
        _ => raw.to_owned(),
    }
}
