//! Conversions from raw model text into typed verdicts.
//!
//! Every lenient string scan of LLM output lives here; the rest of the
//! pipeline only sees `bool`, `u8` and [`Strategy`] values.

use super::strategy::Strategy;

const MAX_VARIATIONS: usize = 3;

/// `"1"` / `"0"` verdict. An exact match wins; otherwise the first `0` or
/// `1` character anywhere in the text decides. `None` when neither occurs.
pub fn parse_binary_verdict(raw: &str) -> Option<bool> {
    match raw.trim() {
        "1" => return Some(true),
        "0" => return Some(false),
        _ => {}
    }
    raw.chars().find_map(|c| match c {
        '1' => Some(true),
        '0' => Some(false),
        _ => None,
    })
}

/// Integer score clamped to 1..=10. Accepts a bare number or `n/10`.
pub fn parse_quality_score(raw: &str) -> Option<u8> {
    let trimmed = raw.trim().trim_end_matches('.');
    let number = trimmed
        .split_once('/')
        .map(|(score, _)| score.trim())
        .unwrap_or(trimmed);
    let value: i64 = number.parse().ok()?;
    Some(value.clamp(1, 10) as u8)
}

pub fn parse_strategy(raw: &str) -> Option<Strategy> {
    let cleaned: String = raw
        .trim()
        .trim_matches(|c: char| c == '`' || c == '"' || c == '\'' || c == '.' || c == '-' || c.is_whitespace())
        .to_ascii_lowercase();
    Strategy::from_name(&cleaned)
}

/// Strip a leading list marker (`-`, `*`, `•`, `1.`, `2)`). Returns `None`
/// when the line is not a list item.
fn strip_list_marker(line: &str) -> Option<&str> {
    let line = line.trim_start();
    for marker in ["- ", "* ", "• "] {
        if let Some(rest) = line.strip_prefix(marker) {
            return Some(rest);
        }
    }

    let digits = line.chars().take_while(|c| c.is_ascii_digit()).count();
    if digits > 0 {
        let rest = &line[digits..];
        if let Some(rest) = rest.strip_prefix(". ").or_else(|| rest.strip_prefix(") ")) {
            return Some(rest);
        }
    }
    None
}

/// Bullet-point lines from an expansion reply, markers removed, at most
/// three. Prose lines are ignored.
pub fn parse_bullets(raw: &str) -> Vec<String> {
    raw.lines()
        .filter_map(strip_list_marker)
        .map(|item| item.trim().trim_matches('"').trim())
        .filter(|item| !item.is_empty())
        .take(MAX_VARIATIONS)
        .map(str::to_string)
        .collect()
}

/// One sub-query per non-empty line, list markers removed, at most three.
pub fn parse_sub_queries(raw: &str) -> Vec<String> {
    raw.lines()
        .map(|line| strip_list_marker(line).unwrap_or(line).trim())
        .filter(|line| !line.is_empty() && !line.ends_with(':'))
        .take(MAX_VARIATIONS)
        .map(str::to_string)
        .collect()
}
