//! # Kasalock
//!
//! A two-stage escape-room engine for interactive frontends: credential
//! validation with Turkish-aware text folding, per-stage state machines
//! with timed feedback reversion, and a three-screen progression sequencer.
//!
//! The experience is linear: the user opens a numeric safe, then a
//! word-locked safe, then reaches the reveal screen. This crate holds the
//! logic; rendering, image assets, and the actual audio device are
//! collaborators behind small interfaces.
//!
//! ## Features
//!
//! (All feature versions)
//! - **Credential Validation** - Separator-tolerant numeric matching and
//!   case/diacritic-insensitive word matching ([`utils`])
//! - **Terminal Prompt Helper** - Prompt-until-accepted stdin input loops
//!
//! ("tokio-dep" feature, on by default)
//! - **Stage Engine** - Per-stage state machines with timed error reversion
//!   and delayed unlock notifications ([`engine`])
//! - **Progression Sequencer** - The Stage1/Stage2/Reveal screen selector
//!   with restart, behind the [`engine::EscapeRoom`] trait
//! - **Event Log** - Structured transition events over a broadcast channel
//!   with pluggable formatters
//!
//! ("audio" feature)
//! - **Sound Cues** - rodio-backed advisory cue playback with a generated
//!   tone fallback ([`sound`])
//!
//! ## Quick Start
//!
//! Add this to your `Cargo.toml`:
//!
//! ```toml
//! [dependencies]
//! kasalock = "0.1"
//! kasalock = { version = "0.1", features = ["audio"] }
//! kasalock = { version = "0.1", default-features = false }
//! ```
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use kasalock::engine::{EscapeRoom, Game, StructuredFormatter};
//!
//! #[tokio::main]
//! async fn main() {
//!     let game = Game::<StructuredFormatter>::new().build();
//!     let mut events = game.get_events_stream();
//!
//!     // Drive the active stage from your input handling.
//!     if let Some(stage) = game.stage() {
//!         for digit in "1425925".chars() {
//!             stage.append_digit(digit);
//!         }
//!         stage.submit();
//!     }
//!
//!     // Observe transitions as they happen.
//!     tokio::spawn(async move {
//!         while let Some(event) = events.next().await {
//!             println!("event: {event:?}");
//!         }
//!     });
//!
//!     // Resolves once both safes are open.
//!     game.await_reveal().await;
//! }
//! ```
//!
//! ## Architecture
//!
//! - **`utils`** - Pure text layer (normalization, validators, prompt
//!   helper), re-exported from `kasalock-core`
//! - **`engine`** - Stage controllers, progression sequencer, event log
//! - **`sound`** - Advisory cue surface and playback backends
//!
//! ## Design Principles
//!
//! - **Type Safety** - Screen and stage state are enums; illegal
//!   transitions are unrepresentable through the public surface
//! - **Determinism** - Timed transitions carry generation/epoch tags, so a
//!   stale timer can never act against a screen that replaced its owner
//! - **Advisory Side Effects** - Sound cues are fire-and-forget and can
//!   never alter a validation outcome

pub mod utils;

cfg_if::cfg_if! {
    if #[cfg(feature = "tokio-dep")] {
        pub mod engine;
        pub mod sound;
    }
}
