//! rodio-backed cue playback.
//!
//! A single worker thread owns the audio output for its whole lifetime; the
//! output handle is created lazily on the first cue, so constructing a
//! [`CueBank`] on a machine with no audio device costs nothing and every
//! cue simply evaporates. There is no global audio state.

use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::sync::mpsc;
use std::thread;
use std::time::Duration;

use rodio::source::{SineWave, Source};
use rodio::{Decoder, OutputStream, OutputStreamHandle, Sink};

use super::{Cue, SoundBank};

/// Plays cue asset files from a directory, falling back to short generated
/// tones when an asset is missing or undecodable.
///
/// Expected assets: `key.mp3`, `open.mp3`, `delete.mp3`, `clear.mp3`. All
/// of them are optional.
pub struct CueBank {
    tx: mpsc::Sender<Cue>,
}

impl CueBank {
    /// Spawns the playback thread. Dropping the bank shuts it down once the
    /// queued cues drain.
    pub fn new(asset_dir: impl Into<PathBuf>) -> Self {
        let dir = asset_dir.into();
        let (tx, rx) = mpsc::channel();
        thread::spawn(move || playback_loop(&dir, &rx));
        Self { tx }
    }
}

impl SoundBank for CueBank {
    fn play(&self, cue: Cue) {
        // An unbounded channel send never blocks; a dead worker is silent.
        self.tx.send(cue).ok();
    }
}

fn playback_loop(dir: &Path, rx: &mpsc::Receiver<Cue>) {
    // The stream half must outlive every detached sink playing through it.
    let mut output: Option<(OutputStream, OutputStreamHandle)> = None;

    while let Ok(cue) = rx.recv() {
        if output.is_none() {
            output = OutputStream::try_default().ok();
        }
        let Some((_stream, handle)) = output.as_ref() else {
            continue;
        };
        play_cue(handle, dir, cue);
    }
}

fn play_cue(handle: &OutputStreamHandle, dir: &Path, cue: Cue) {
    let Ok(sink) = Sink::try_new(handle) else {
        return;
    };

    match open_asset(dir, cue) {
        Some(decoder) => sink.append(decoder),
        None => {
            let (freq, millis, gain) = fallback_tone(cue);
            let tone = SineWave::new(freq)
                .take_duration(Duration::from_millis(millis))
                .amplify(gain);
            sink.append(tone);
        }
    }

    sink.detach();
}

fn open_asset(dir: &Path, cue: Cue) -> Option<Decoder<BufReader<File>>> {
    let name = match cue {
        Cue::Key => "key.mp3",
        Cue::Open => "open.mp3",
        Cue::Delete => "delete.mp3",
        Cue::Clear => "clear.mp3",
    };
    let file = File::open(dir.join(name)).ok()?;
    Decoder::new(BufReader::new(file)).ok()
}

/// Frequency, duration, and gain of the generated stand-in tones.
fn fallback_tone(cue: Cue) -> (f32, u64, f32) {
    match cue {
        Cue::Key => (1_000.0, 60, 0.04),
        Cue::Open => (220.0, 120, 0.06),
        Cue::Delete => (600.0, 50, 0.04),
        Cue::Clear => (300.0, 80, 0.05),
    }
}
