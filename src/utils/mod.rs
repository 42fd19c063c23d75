//! Text utilities re-exported from `kasalock-core`.
//!
//! Everything here is pure and dependency-free: the normalization foldings,
//! the two credential validators, and the terminal prompt helper used by
//! interactive frontends.

pub use kasalock_core::utils::{
    CredentialKind, NUMERIC_SECRET, Terminal, WORD_SECRET, collapse_whitespace, fold_case,
    fold_turkish, is_numeric_match, is_word_match, strip_separators,
};
