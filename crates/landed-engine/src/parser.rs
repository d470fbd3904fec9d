//! Text cleanup for classification codes and scraped tariff records.

use std::str::FromStr;

use rust_decimal::{Decimal, RoundingStrategy};

use crate::error::EngineError;

/// Valid classification code lengths after cleaning.
pub const CLASSIFICATION_LENGTHS: [usize; 3] = [6, 8, 10];

/// Strip every non-digit character ("0101.21" becomes "010121").
pub fn clean_classification_code(raw: &str) -> String {
    raw.chars().filter(|c| c.is_ascii_digit()).collect()
}

pub fn is_valid_classification_length(code: &str) -> bool {
    CLASSIFICATION_LENGTHS.contains(&code.len())
}

/// Parse a scraped rate such as "5%", " 7.5 % " or "12.50" into a percentage
/// carried at four fractional digits.
pub fn parse_rate_text(text: &str) -> Result<Decimal, EngineError> {
    let cleaned: String = text
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '.')
        .collect();
    if cleaned.is_empty() {
        return Err(EngineError::Parse(format!("No numeric rate in '{text}'")));
    }

    let value = Decimal::from_str(&cleaned)
        .map_err(|e| EngineError::Parse(format!("Invalid rate '{text}': {e}")))?;
    let mut rate = value.round_dp_with_strategy(4, RoundingStrategy::MidpointAwayFromZero);
    rate.rescale(4);
    Ok(rate)
}

/// First run of exactly four consecutive digits, read as a year.
pub fn extract_year(text: &str) -> Option<i32> {
    let bytes = text.as_bytes();
    let mut start = 0;
    while start < bytes.len() {
        if !bytes[start].is_ascii_digit() {
            start += 1;
            continue;
        }
        let mut end = start;
        while end < bytes.len() && bytes[end].is_ascii_digit() {
            end += 1;
        }
        if end - start == 4 {
            return text[start..end].parse().ok();
        }
        start = end;
    }
    None
}
