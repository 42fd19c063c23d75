//! # Credential Validation
//!
//! The two stage validators and the [`CredentialKind`] dispatcher used by
//! the stage engine. Secrets are fixed at compile time; this is a puzzle,
//! not an authentication system.
//!
//! ## Acceptance rules
//!
//! - The numeric secret matches after separator stripping only, so
//!   `"14 25 925"` and `"14-25-925"` are as good as `"1425925"`.
//! - The word secret matches on the Turkish-folded, whitespace-collapsed
//!   form, with or without the internal space, so `"Kuzey Yıldızı"`,
//!   `"kuzey yildizi"`, `"kuzey-yildizi"` and `"kuzeyyildizi"` all open the
//!   safe. The fold is applied to both sides, which makes the folded
//!   comparison a superset of the case-only one.
//!
//! ## Example
//! ```rust
//! use kasalock_core::utils::validate::{CredentialKind, is_word_match};
//!
//! assert!(is_word_match("kuzeyyildizi"));
//! assert!(CredentialKind::Numeric.matches("1425925"));
//! ```

use std::fmt::Display;

use crate::utils::normalize::{collapse_whitespace, fold_turkish, strip_separators};

/// The first safe's combination. Digits only.
pub const NUMERIC_SECRET: &str = "1425925";

/// The second safe's passphrase. Compared case- and diacritic-insensitively.
pub const WORD_SECRET: &str = "kuzey yıldızı";

/// Returns whether `candidate` matches the numeric secret.
///
/// Separators (whitespace, hyphens) are stripped; the rest must be
/// byte-for-byte equal to [`NUMERIC_SECRET`]. Non-digit characters survive
/// stripping and fail the comparison. Empty input never matches.
pub fn is_numeric_match(candidate: &str) -> bool {
    strip_separators(candidate) == NUMERIC_SECRET
}

/// Returns whether `candidate` matches the word secret.
///
/// Both sides are Turkish-folded and whitespace-collapsed, then compared
/// with and without their internal spaces. Empty input never matches.
pub fn is_word_match(candidate: &str) -> bool {
    let folded = collapse_whitespace(&fold_turkish(candidate));
    let secret = collapse_whitespace(&fold_turkish(WORD_SECRET));

    folded == secret || strip_separators(&folded) == strip_separators(&secret)
}

/// Selects which validator a stage runs its input buffer through.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CredentialKind {
    Numeric,
    Word,
}

impl CredentialKind {
    /// Dispatches `candidate` to the matching validator.
    pub fn matches(&self, candidate: &str) -> bool {
        match self {
            Self::Numeric => is_numeric_match(candidate),
            Self::Word => is_word_match(candidate),
        }
    }
}

impl Display for CredentialKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Numeric => write!(f, "numeric"),
            Self::Word => write!(f, "word"),
        }
    }
}
