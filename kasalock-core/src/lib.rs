//! # Kasalock Core
//!
//! This crate provides the dependency-free text layer of the kasalock
//! escape-room engine: normalization helpers, the two credential
//! validators, and a small terminal prompt helper.
//!
//! The main idea is that all credential matching is done on **normalized
//! forms** of the user's input (separator stripping, case folding, Turkish
//! diacritic folding), never on the raw string, so the same secret is
//! accepted across every reasonable way of typing it.
//!
//! ## Features
//! - Separator stripping and whitespace collapsing for free-form input.
//! - One-way Turkish diacritic folding (`ı→i, ğ→g, ü→u, ş→s, ç→c, ö→o`).
//! - Numeric and two-word credential validation with fixed secrets.
//! - A prompt-until-accepted stdin helper for interactive frontends.
//!
//! ## Example
//! ```rust
//! use kasalock_core::utils::{is_numeric_match, is_word_match};
//!
//! assert!(is_numeric_match("14-25-925"));
//! assert!(is_word_match("Kuzey Yıldızı"));
//! ```

pub mod utils;
