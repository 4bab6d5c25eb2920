//! Amount extraction
//!
//! Cascade: currency-suffixed amounts, then `montant … N`, then a bounded
//! bare number that must not sit next to an account keyword. Account-like
//! digit runs are blanked out first so they can never become amounts.

use regex::Regex;

use bank_assistant_config::domain::AmountPatterns;

use crate::error::Result;
use crate::pattern;

pub struct AmountExtractor {
    account_like: Regex,
    currency: Vec<Regex>,
    bare: Regex,
    bare_max_integer_digits: usize,
    guard: Regex,
    guard_window: usize,
    max: f64,
}

impl AmountExtractor {
    pub fn from_config(config: &AmountPatterns) -> Result<Self> {
        Ok(Self {
            account_like: pattern::compile(&config.account_like)?,
            currency: pattern::compile_all(&config.currency_patterns)?,
            bare: pattern::compile(&config.bare_number)?,
            bare_max_integer_digits: config.bare_max_integer_digits,
            guard: pattern::compile(&config.bare_guard)?,
            guard_window: config.guard_window,
            max: config.max,
        })
    }

    /// Largest accepted amount
    pub fn max(&self) -> f64 {
        self.max
    }

    /// First amount mentioned in `text`, unvalidated
    pub fn extract(&self, text: &str) -> Option<f64> {
        // Same-length blanks keep byte offsets aligned with `text`
        let masked = self
            .account_like
            .replace_all(text, |caps: &regex::Captures| " ".repeat(caps[0].len()));

        for re in &self.currency {
            for caps in re.captures_iter(&masked) {
                if let Some(amount) = caps.name("value").and_then(|m| parse_amount(m.as_str())) {
                    return Some(amount);
                }
            }
        }

        self.bare
            .find_iter(&masked)
            .filter(|m| self.is_plausible_bare(m.as_str()))
            .filter(|m| !self.near_guard(text, m.start(), m.end()))
            .find_map(|m| parse_amount(m.as_str()))
    }

    fn is_plausible_bare(&self, number: &str) -> bool {
        let (integer, decimals) = split_amount(number);
        integer.len() <= self.bare_max_integer_digits && decimals.map_or(0, |d| d.len()) <= 2
    }

    fn near_guard(&self, text: &str, start: usize, end: usize) -> bool {
        let lo = floor_char_boundary(text, start.saturating_sub(self.guard_window));
        let hi = ceil_char_boundary(text, (end + self.guard_window).min(text.len()));
        self.guard.is_match(&text[lo..hi])
    }

    /// Whether `amount` is in the accepted range
    pub fn is_valid(&self, amount: f64) -> bool {
        amount > 0.0 && amount <= self.max
    }
}

/// Parse "45", "45.5", "45,50", "1 500", "1.500" or "1 500,250"
pub fn parse_amount(raw: &str) -> Option<f64> {
    let (integer, decimals) = split_amount(raw);
    let number = match decimals {
        Some(decimals) => format!("{integer}.{decimals}"),
        None => integer,
    };
    number.parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Integer digits without grouping, and the decimal digits.
///
/// A space always groups thousands. A dot groups thousands when every group
/// after it has three digits, otherwise it is the decimal mark. A comma is
/// always the decimal mark.
fn split_amount(raw: &str) -> (String, Option<String>) {
    let compact: String = raw.chars().filter(|c| !c.is_whitespace()).collect();
    if let Some((head, decimals)) = compact.split_once(',') {
        return (head.replace('.', ""), Some(decimals.to_string()));
    }
    if is_dot_grouped(&compact) {
        return (compact.replace('.', ""), None);
    }
    match compact.split_once('.') {
        Some((integer, decimals)) => (integer.to_string(), Some(decimals.to_string())),
        None => (compact, None),
    }
}

fn is_dot_grouped(integer: &str) -> bool {
    let mut groups = integer.split('.');
    let first = groups.next().unwrap_or_default();
    let rest: Vec<&str> = groups.collect();
    !rest.is_empty()
        && (1..=3).contains(&first.len())
        && rest.iter().all(|g| g.len() == 3 && g.bytes().all(|b| b.is_ascii_digit()))
}

fn floor_char_boundary(text: &str, mut idx: usize) -> usize {
    while idx > 0 && !text.is_char_boundary(idx) {
        idx -= 1;
    }
    idx
}

fn ceil_char_boundary(text: &str, mut idx: usize) -> usize {
    while idx < text.len() && !text.is_char_boundary(idx) {
        idx += 1;
    }
    idx
}
