//! Per-screen stage controller: the input buffer, the transient feedback
//! flags, and the two timed transitions.
//!
//! A controller is mounted by the sequencer, driven by the render
//! collaborator through the operations below, and discarded once its stage
//! is solved or the experience restarts. Discarded controllers may still
//! have timers in flight; those detect staleness and do nothing.

use std::sync::Arc;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tokio::time::{Duration, Instant, sleep_until};
use tokio_util::sync::CancellationToken;

use super::{EventBus, EventFormatter, GameEvent, ScreenState, UnlockNotice};
use crate::sound::{Cue, SoundBank};
use kasalock_core::utils::CredentialKind;

/// Per-stage configuration: which validator runs, how long feedback lives,
/// and whether the buffer is capped.
#[derive(Clone, Debug)]
pub struct StageOptions {
    pub credential: CredentialKind,
    /// How long error feedback stays up before reverting, in milliseconds.
    pub error_timeout_ms: u64,
    /// Delay between a correct submit and the unlock notification.
    pub unlock_delay_ms: u64,
    /// Maximum buffer length in characters; `None` means unbounded.
    pub max_len: Option<usize>,
    /// User-facing message shown while the error window is active.
    pub error_message: String,
}

impl StageOptions {
    /// The first safe: numeric keypad, 10-digit cap, 2 s error window.
    pub fn numeric() -> Self {
        Self {
            credential: CredentialKind::Numeric,
            error_timeout_ms: 2_000,
            unlock_delay_ms: 1_500,
            max_len: Some(10),
            error_message: "Şifre hatalı.".to_string(),
        }
    }

    /// The second safe: free text, no cap, 3 s error window.
    pub fn word() -> Self {
        Self {
            credential: CredentialKind::Word,
            error_timeout_ms: 3_000,
            unlock_delay_ms: 1_500,
            max_len: None,
            error_message: "Kasa Şifresi yanlış… tekrar dene.".to_string(),
        }
    }
}

/// What the render collaborator needs to draw a stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StageSnapshot {
    pub buffer: String,
    pub error_message: Option<String>,
    pub is_shaking: bool,
    pub is_unlocking: bool,
}

#[derive(Debug, Default)]
struct StageState {
    buffer: String,
    error_message: Option<String>,
    shaking: bool,
    unlocking: bool,
    /// Bumped on every new error window; a revert timer only acts if its
    /// epoch still matches.
    error_epoch: u64,
}

struct StageInner<F>
where
    F: EventFormatter,
{
    screen: ScreenState,
    options: StageOptions,
    generation: u64,
    state: Mutex<StageState>,
    cancel: CancellationToken,
    notice_tx: mpsc::UnboundedSender<UnlockNotice>,
    bus: Arc<EventBus<F>>,
    sounds: Arc<dyn SoundBank>,
}

/// The per-screen state machine.
///
/// Cheap to clone; clones share the same underlying instance. All
/// operations are non-blocking and fire their advisory sound cue before
/// touching state.
pub struct StageController<F>(Arc<StageInner<F>>)
where
    F: EventFormatter;

impl<F> Clone for StageController<F>
where
    F: EventFormatter,
{
    fn clone(&self) -> Self {
        Self(self.0.clone())
    }
}

impl<F> StageController<F>
where
    F: EventFormatter,
{
    pub(crate) fn new(
        screen: ScreenState,
        options: StageOptions,
        generation: u64,
        notice_tx: mpsc::UnboundedSender<UnlockNotice>,
        bus: Arc<EventBus<F>>,
        sounds: Arc<dyn SoundBank>,
    ) -> Self {
        Self(Arc::new(StageInner {
            screen,
            options,
            generation,
            state: Mutex::new(StageState::default()),
            cancel: CancellationToken::new(),
            notice_tx,
            bus,
            sounds,
        }))
    }

    /// The screen this controller belongs to.
    pub fn screen(&self) -> ScreenState {
        self.0.screen
    }

    pub(crate) fn generation(&self) -> u64 {
        self.0.generation
    }

    /// Cancels in-flight timers. Called by the sequencer on unmount; the
    /// generation/epoch checks stay correct even if this never runs.
    pub(crate) fn discard(&self) {
        self.0.cancel.cancel();
    }

    /// Returns the current render state.
    pub fn snapshot(&self) -> StageSnapshot {
        let state = self.0.state.lock();
        StageSnapshot {
            buffer: state.buffer.clone(),
            error_message: state.error_message.clone(),
            is_shaking: state.shaking,
            is_unlocking: state.unlocking,
        }
    }

    /// Appends one keypad character. Silently capped at the configured
    /// maximum length.
    pub fn append_digit(&self, digit: char) {
        self.0.sounds.play(Cue::Key);
        let mut state = self.0.state.lock();
        if let Some(cap) = self.0.options.max_len
            && state.buffer.chars().count() >= cap
        {
            return;
        }
        state.buffer.push(digit);
    }

    /// Removes the last character; no-op on an empty buffer.
    pub fn backspace(&self) {
        self.0.sounds.play(Cue::Delete);
        self.0.sounds.play(Cue::Key);
        self.0.state.lock().buffer.pop();
    }

    /// Empties the buffer and drops active error feedback immediately,
    /// without waiting out the auto-clear timer.
    pub fn clear(&self) {
        self.0.sounds.play(Cue::Clear);
        self.0.sounds.play(Cue::Key);
        let mut state = self.0.state.lock();
        state.buffer.clear();
        state.error_message = None;
        state.shaking = false;
    }

    /// Replaces the buffer with free text. Truncated to the cap when one is
    /// configured; the free-text stage configures none.
    pub fn set_buffer(&self, text: &str) {
        self.0.sounds.play(Cue::Key);
        let mut state = self.0.state.lock();
        state.buffer = match self.0.options.max_len {
            Some(cap) => text.chars().take(cap).collect(),
            None => text.to_string(),
        };
    }

    /// Validates the buffer and transitions.
    ///
    /// A correct credential starts the unlocking transition and, after the
    /// configured delay, sends exactly one notification to the sequencer.
    /// A wrong one raises shake feedback that reverts on its own. No-op
    /// while already unlocking.
    pub fn submit(&self) {
        self.0.sounds.play(Cue::Open);
        let mut state = self.0.state.lock();
        if state.unlocking {
            return;
        }

        if self.0.options.credential.matches(&state.buffer) {
            state.unlocking = true;
            drop(state);
            self.0.bus.emit(&GameEvent::UnlockStarted {
                screen: self.0.screen,
            });
            self.schedule_unlock();
        } else {
            state.error_message = Some(self.0.options.error_message.clone());
            state.shaking = true;
            state.error_epoch += 1;
            let epoch = state.error_epoch;
            drop(state);
            self.0.bus.emit(&GameEvent::WrongCredential {
                screen: self.0.screen,
                message: self.0.options.error_message.clone(),
            });
            self.schedule_error_revert(epoch);
        }
    }

    fn schedule_unlock(&self) {
        let inner = self.0.clone();
        // Deadline fixed now, so a late first poll cannot stretch the delay.
        let deadline = Instant::now() + Duration::from_millis(inner.options.unlock_delay_ms);
        tokio::task::spawn(async move {
            tokio::select! {
                // Cancellation wins when both are ready, so a discarded
                // controller stays silent even if its deadline passed.
                biased;
                _ = inner.cancel.cancelled() => {}
                _ = sleep_until(deadline) => {
                    inner
                        .notice_tx
                        .send(UnlockNotice {
                            generation: inner.generation,
                        })
                        .ok();
                }
            }
        });
    }

    fn schedule_error_revert(&self, epoch: u64) {
        let inner = self.0.clone();
        let deadline = Instant::now() + Duration::from_millis(inner.options.error_timeout_ms);
        tokio::task::spawn(async move {
            tokio::select! {
                biased;
                _ = inner.cancel.cancelled() => {}
                _ = sleep_until(deadline) => {
                    let cleared = {
                        let mut state = inner.state.lock();
                        if state.error_epoch == epoch && state.error_message.is_some() {
                            state.error_message = None;
                            state.shaking = false;
                            true
                        } else {
                            false
                        }
                    };
                    if cleared {
                        inner.bus.emit(&GameEvent::FeedbackCleared {
                            screen: inner.screen,
                        });
                    }
                }
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::StructuredFormatter;
    use crate::sound::NullSounds;

    fn controller(
        options: StageOptions,
    ) -> (
        StageController<StructuredFormatter>,
        mpsc::UnboundedReceiver<UnlockNotice>,
    ) {
        let (notice_tx, notice_rx) = mpsc::unbounded_channel();
        let bus = Arc::new(EventBus::new(Arc::new(StructuredFormatter)));
        let controller = StageController::new(
            ScreenState::Stage1,
            options,
            7,
            notice_tx,
            bus,
            Arc::new(NullSounds),
        );
        (controller, notice_rx)
    }

    async fn settle() {
        for _ in 0..8 {
            tokio::task::yield_now().await;
        }
    }

    #[test]
    fn test_append_digit_respects_cap() {
        let (controller, _rx) = controller(StageOptions::numeric());

        for _ in 0..25 {
            controller.append_digit('7');
        }
        assert_eq!(controller.snapshot().buffer.chars().count(), 10);
    }

    #[test]
    fn test_backspace_and_clear_edit_the_buffer() {
        let (controller, _rx) = controller(StageOptions::numeric());

        controller.backspace();
        assert_eq!(controller.snapshot().buffer, "");

        controller.append_digit('1');
        controller.append_digit('4');
        controller.backspace();
        assert_eq!(controller.snapshot().buffer, "1");

        controller.clear();
        assert_eq!(controller.snapshot().buffer, "");
    }

    #[test]
    fn test_set_buffer_truncates_only_when_capped() {
        let (capped, _rx) = controller(StageOptions::numeric());
        capped.set_buffer("123456789012345");
        assert_eq!(capped.snapshot().buffer, "1234567890");

        let (free, _rx) = controller(StageOptions::word());
        free.set_buffer("kuzey yıldızı ve daha fazlası");
        assert_eq!(free.snapshot().buffer, "kuzey yıldızı ve daha fazlası");
    }

    #[tokio::test(start_paused = true)]
    async fn test_wrong_submit_raises_and_auto_clears() {
        let (controller, _rx) = controller(StageOptions::numeric());
        controller.set_buffer("0000");
        controller.submit();

        let snapshot = controller.snapshot();
        assert!(snapshot.is_shaking);
        assert_eq!(snapshot.error_message.as_deref(), Some("Şifre hatalı."));

        tokio::time::advance(Duration::from_millis(1_999)).await;
        settle().await;
        assert!(controller.snapshot().is_shaking);

        tokio::time::advance(Duration::from_millis(2)).await;
        settle().await;
        let snapshot = controller.snapshot();
        assert!(!snapshot.is_shaking);
        assert_eq!(snapshot.error_message, None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_input_during_error_window_survives_auto_clear() {
        let (controller, _rx) = controller(StageOptions::numeric());
        controller.set_buffer("1");
        controller.submit();
        assert!(controller.snapshot().is_shaking);

        controller.append_digit('9');
        tokio::time::advance(Duration::from_millis(2_001)).await;
        settle().await;

        let snapshot = controller.snapshot();
        assert_eq!(snapshot.error_message, None);
        assert_eq!(snapshot.buffer, "19");
    }

    #[tokio::test(start_paused = true)]
    async fn test_clear_drops_feedback_before_the_timer() {
        let (controller, _rx) = controller(StageOptions::numeric());
        controller.set_buffer("1");
        controller.submit();
        assert!(controller.snapshot().is_shaking);

        controller.clear();
        let snapshot = controller.snapshot();
        assert!(!snapshot.is_shaking);
        assert_eq!(snapshot.error_message, None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_superseded_error_timer_cannot_clear_a_newer_error() {
        let (controller, _rx) = controller(StageOptions::numeric());

        controller.set_buffer("1");
        controller.submit();
        tokio::time::advance(Duration::from_millis(1_000)).await;
        settle().await;

        controller.clear();
        controller.set_buffer("2");
        controller.submit();

        // The first error's timer elapses now; the second window is still
        // open and must keep its feedback.
        tokio::time::advance(Duration::from_millis(1_100)).await;
        settle().await;
        assert!(controller.snapshot().error_message.is_some());

        tokio::time::advance(Duration::from_millis(1_000)).await;
        settle().await;
        assert_eq!(controller.snapshot().error_message, None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_correct_submit_notifies_exactly_once() {
        let (controller, mut notice_rx) = controller(StageOptions::numeric());
        controller.set_buffer("14-25-925");
        controller.submit();
        assert!(controller.snapshot().is_unlocking);

        // Resubmitting during the closing transition is a no-op.
        controller.submit();

        tokio::time::advance(Duration::from_millis(1_500)).await;
        settle().await;

        let notice = notice_rx.try_recv().expect("one unlock notice");
        assert_eq!(notice.generation, 7);
        assert!(notice_rx.try_recv().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_discard_cancels_pending_unlock() {
        let (controller, mut notice_rx) = controller(StageOptions::numeric());
        controller.set_buffer("1425925");
        controller.submit();

        controller.discard();
        tokio::time::advance(Duration::from_millis(2_000)).await;
        settle().await;
        assert!(notice_rx.try_recv().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_word_stage_uses_its_own_timeout() {
        let (controller, _rx) = controller(StageOptions::word());
        controller.set_buffer("yanlış şifre");
        controller.submit();

        let snapshot = controller.snapshot();
        assert!(snapshot.is_shaking);
        assert_eq!(
            snapshot.error_message.as_deref(),
            Some("Kasa Şifresi yanlış… tekrar dene.")
        );

        tokio::time::advance(Duration::from_millis(2_500)).await;
        settle().await;
        assert!(controller.snapshot().is_shaking);

        tokio::time::advance(Duration::from_millis(600)).await;
        settle().await;
        assert!(!controller.snapshot().is_shaking);
    }
}
