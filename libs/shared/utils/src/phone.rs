//! E.164 phone number validation and normalization.

use std::sync::OnceLock;

use regex::Regex;

static E164_RE: OnceLock<Regex> = OnceLock::new();

fn e164_pattern() -> &'static Regex {
    E164_RE.get_or_init(|| Regex::new(r"^\+[1-9]\d{10,14}$").expect("static E.164 pattern"))
}

/// Check that a phone number is in E.164 format (e.g. "+12145551234").
pub fn is_e164(phone: &str) -> bool {
    e164_pattern().is_match(phone)
}

/// Normalize a phone number in common US formats to E.164.
///
/// Returns `None` when the input cannot be interpreted unambiguously.
pub fn normalize_e164(phone: &str) -> Option<String> {
    let trimmed = phone.trim();
    if is_e164(trimmed) {
        return Some(trimmed.to_string());
    }

    let digits: String = trimmed.chars().filter(|c| c.is_ascii_digit()).collect();
    match digits.len() {
        11 if digits.starts_with('1') => Some(format!("+{}", digits)),
        10 => Some(format!("+1{}", digits)),
        _ => None,
    }
}
