//! Patterns for recognizing unfilled form slots.

use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    /// Runs of whitespace, collapsed to a single space in values.
    pub static ref WHITESPACE: Regex = Regex::new(r"\s+").unwrap();

    /// Blank-line fillers: underscores, dots, dashes.
    pub static ref FILLER_ONLY: Regex = Regex::new(r"^[_.\-\s]+$").unwrap();

    /// Empty checkbox or bracket pairs, e.g. `[ ]`, `(  )`.
    pub static ref EMPTY_BRACKETS: Regex = Regex::new(r"^[\[(]\s*[\])]$").unwrap();

    /// At least one letter or digit.
    pub static ref ALPHANUMERIC: Regex = Regex::new(r"[\p{L}\p{N}]").unwrap();

    /// CIOMS box number printed before a label, e.g. `1`, `1a`, `12`.
    pub static ref BOX_NUMBER: Regex = Regex::new(r"^\d{1,2}[a-z]?$").unwrap();

    /// Parenthesized note attached to a label, e.g. `(s)`, `(first, last)`.
    pub static ref NOTE: Regex = Regex::new(r"\([^)]*\)").unwrap();
}

/// Tokens that mark a slot as intentionally left empty.
pub const PLACEHOLDERS: &[&str] = &[
    "-", "--", "---", "____", "....", "…", "n/a", "na", "nil", "none", "empty",
];

/// Checkbox glyphs that carry no value on their own.
pub const CHECKBOX_GLYPHS: &[char] = &['☐', '☑', '☒', '□', '■', '✓', '✔', '✗', '✘'];

/// Trim and collapse internal whitespace.
pub fn clean_value(text: &str) -> String {
    WHITESPACE.replace_all(text.trim(), " ").into_owned()
}

/// Whether a normalized token is a form box number.
pub fn is_box_number(token: &str) -> bool {
    BOX_NUMBER.is_match(token)
}

/// Remove parenthesized notes.
pub fn strip_notes(text: &str) -> String {
    NOTE.replace_all(text, " ").into_owned()
}

/// Whether a value looks like an actual answer rather than a blank slot.
pub fn is_filled(text: &str) -> bool {
    let value = clean_value(text);

    if value.is_empty() {
        return false;
    }

    let lowered = value.to_lowercase();
    if PLACEHOLDERS.contains(&lowered.as_str()) {
        return false;
    }

    if FILLER_ONLY.is_match(&value) || EMPTY_BRACKETS.is_match(&value) {
        return false;
    }

    let mut chars = value.chars();
    if let (Some(c), None) = (chars.next(), chars.next()) {
        if CHECKBOX_GLYPHS.contains(&c) {
            return false;
        }
    }

    ALPHANUMERIC.is_match(&value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filled_values() {
        assert!(is_filled("J.D."));
        assert!(is_filled("Aspirin 100 mg"));
        assert!(is_filled("  45  "));
        assert!(is_filled("M"));
    }

    #[test]
    fn test_placeholders_not_filled() {
        assert!(!is_filled(""));
        assert!(!is_filled("   "));
        assert!(!is_filled("N/A"));
        assert!(!is_filled(" none "));
        assert!(!is_filled("______"));
        assert!(!is_filled(". . . ."));
        assert!(!is_filled("[ ]"));
        assert!(!is_filled("( )"));
        assert!(!is_filled("☐"));
        assert!(!is_filled("☒"));
        assert!(!is_filled("*/*"));
    }

    #[test]
    fn test_box_numbers() {
        assert!(is_box_number("1"));
        assert!(is_box_number("1a"));
        assert!(is_box_number("12"));
        assert!(!is_box_number("transdermal"));
        assert!(!is_box_number("123"));
    }

    #[test]
    fn test_strip_notes() {
        assert_eq!(strip_notes("(s)").trim(), "");
        assert_eq!(strip_notes(" (first, last) x").trim(), "x");
    }

    #[test]
    fn test_clean_value() {
        assert_eq!(clean_value("  Aspirin \n 100   mg "), "Aspirin 100 mg");
    }
}
