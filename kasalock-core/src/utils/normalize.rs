//! # Text Normalization
//!
//! Pure, deterministic transforms applied to user input before credential
//! comparison. All functions are one-way foldings used only for matching,
//! never for display.
//!
//! ## Example
//! ```rust
//! use kasalock_core::utils::normalize::{collapse_whitespace, fold_turkish};
//!
//! assert_eq!(fold_turkish("Kuzey Yıldızı"), "kuzey yildizi");
//! assert_eq!(collapse_whitespace("  kuzey \t-  yildizi "), "kuzey yildizi");
//! ```

/// Removes every whitespace and hyphen character from the input.
///
/// Anything else survives untouched, so non-digit garbage inside a numeric
/// candidate still shows up in the stripped form and fails the comparison.
pub fn strip_separators(input: &str) -> String {
    input
        .chars()
        .filter(|c| !c.is_whitespace() && *c != '-')
        .collect()
}

/// Ordinary Unicode lowercasing.
pub fn fold_case(input: &str) -> String {
    input.to_lowercase()
}

/// Lowercases, then maps the six Turkish-specific letters onto their ASCII
/// neighbours: `ı→i, ğ→g, ü→u, ş→s, ç→c, ö→o`.
///
/// Characters outside this set pass through unchanged.
pub fn fold_turkish(input: &str) -> String {
    input
        .to_lowercase()
        .chars()
        .map(|c| match c {
            'ı' => 'i',
            'ğ' => 'g',
            'ü' => 'u',
            'ş' => 's',
            'ç' => 'c',
            'ö' => 'o',
            other => other,
        })
        .collect()
}

/// Replaces every run of whitespace, tabs, and hyphens with a single space
/// and trims the ends.
pub fn collapse_whitespace(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut pending_gap = false;

    for c in input.chars() {
        if c.is_whitespace() || c == '-' {
            pending_gap = true;
        } else {
            if pending_gap && !out.is_empty() {
                out.push(' ');
            }
            pending_gap = false;
            out.push(c);
        }
    }

    out
}
