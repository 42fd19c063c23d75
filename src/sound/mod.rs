//! # Advisory Sound Cues
//!
//! The engine's audio surface. Cues enrich feedback but carry no meaning:
//! an implementation that drops every cue on the floor is fully conformant,
//! and the engine never waits on, retries, or observes playback.
//!
//! Implementations must return from [`SoundBank::play`] promptly; anything
//! slow (device setup, file IO, decoding) belongs on a thread of their own.
//!
//! The `audio` feature adds `CueBank`, a rodio-backed implementation that
//! plays asset files when present and falls back to short generated tones.

/// The four interaction cues.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cue {
    /// A keypad press or text edit.
    Key,
    /// A submit attempt (the safe's opening mechanism).
    Open,
    /// A backspace.
    Delete,
    /// The clear button.
    Clear,
}

/// An advisory sound collaborator.
pub trait SoundBank: Send + Sync + 'static {
    /// Triggers a cue. Non-blocking; failures stay inside the
    /// implementation and never surface.
    fn play(&self, cue: Cue);
}

/// Discards every cue. The default collaborator, and the one tests use.
pub struct NullSounds;

impl SoundBank for NullSounds {
    fn play(&self, _cue: Cue) {}
}

cfg_if::cfg_if! {
    if #[cfg(feature = "audio")] {
        mod playback;
        pub use playback::CueBank;
    }
}
