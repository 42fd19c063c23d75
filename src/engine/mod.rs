//! # Stage Engine
//!
//! This module implements the **progression state machine** behind the two
//! credential-gated safes and the reveal screen.
//!
//! The engine is built around three pillars:
//!
//! - [`EscapeRoom`]: the high-level API for driving the experience and
//!   observing it
//! - [`Game`]: the builder that assembles options, sounds, and the event
//!   formatter into a running sequencer
//! - [`StageController`]: the per-screen state machine owning the input
//!   buffer and the transient feedback flags
//!
//! ---
//!
//! ## Architecture Overview
//!
//! ```text
//! +------------------------------------------------------+
//! |                     User Code                        |
//! |     (drives the active stage, consumes events)       |
//! +------------------------------+-----------------------+
//!                                |
//!                                v
//! +------------------------------------------------------+
//! |                  EscapeRoom API                      |
//! |   - screen, stage, restart                           |
//! |   - get_events_stream                                |
//! |   - await_reveal                                     |
//! +------------------------------+-----------------------+
//!                                |
//!                                v
//! +------------------------------------------------------+
//! |                 BuiltGame (runtime)                  |
//! |   Mounts controllers and dispatches unlock notices   |
//! +------------------------------+-----------------------+
//!                                |
//!                                v
//! +------------------------------------------------------+
//! |                StageController (per screen)          |
//! | - input buffer      - error/shake feedback           |
//! | - unlock flag       - timed reversion tasks          |
//! +------------------------------------------------------+
//! ```
//!
//! Only one controller is mounted at a time; the sequencer is the single
//! source of truth for which screen is live. Solving a stage puts its
//! controller into the unlocking state, and after a fixed delay exactly one
//! notification reaches the sequencer, which discards the controller and
//! mounts the next screen.
//!
//! ---
//!
//! ## Stale Timer Safety
//!
//! Both delayed transitions (error auto-clear, unlock notification) run as
//! detached tasks with their deadline fixed at schedule time. Each
//! controller instance carries a **generation** tag and a cancellation
//! token:
//!
//! - discarding a controller (progression or restart) cancels its token
//! - an unlock notice is applied only if its generation matches the
//!   currently mounted controller
//! - an error auto-clear is applied only if its **epoch** still matches the
//!   error window that scheduled it
//!
//! Cancellation is an optimization; the generation/epoch checks alone keep
//! a stale timer from ever acting against a newer screen.
//!
//! ---
//!
//! ## Event Streaming
//!
//! State transitions are published as [`GameEvent`] records through a
//! `tokio::broadcast` channel. `get_events_stream()` returns an
//! [`EventStream`] that skips lagged-receiver gaps. Serialization is
//! pluggable via [`EventFormatter`]; see [`formatter`].
//!
//! # Example: end-to-end usage
//!
//! ```rust,no_run
//! use kasalock::engine::{EscapeRoom, Game, GameEvent, ScreenState, StructuredFormatter};
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() {
//!     let game = Game::<StructuredFormatter>::new().build();
//!     let mut events = game.get_events_stream();
//!
//!     let stage = game.stage().expect("stage 1 is mounted at start");
//!     for digit in "1425925".chars() {
//!         stage.append_digit(digit);
//!     }
//!     stage.submit();
//!
//!     while let Some(event) = events.next().await {
//!         if let GameEvent::ScreenChanged { screen } = event {
//!             assert_eq!(screen, ScreenState::Stage2);
//!             break;
//!         }
//!     }
//! }
//! ```
//!
//! ---
//!
//! ## Design Notes
//!
//! - Operations are synchronous and run to completion; the only suspension
//!   points are the two delayed transitions.
//! - Submitting while unlocking is a no-op, so the closing transition can
//!   never fire twice.
//! - Sound cues are advisory: a missing or failing audio backend changes
//!   nothing about any transition.

use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tokio::sync::{Notify, broadcast, mpsc};
use tokio_stream::{StreamExt, wrappers::BroadcastStream};

pub mod formatter;
pub use formatter::{EventFormatter, JsonFormatter, StructuredFormatter};
mod stage;
pub use stage::{StageController, StageOptions, StageSnapshot};

use crate::sound::{NullSounds, SoundBank};

/// Which of the three screens is live. Owned by the sequencer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ScreenState {
    Stage1,
    Stage2,
    Reveal,
}

/// A state transition published on the event stream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum GameEvent {
    /// The sequencer mounted a different screen.
    ScreenChanged { screen: ScreenState },
    /// A correct credential was submitted; the closing transition started.
    UnlockStarted { screen: ScreenState },
    /// A wrong credential was submitted; shake feedback is active.
    WrongCredential { screen: ScreenState, message: String },
    /// The error window elapsed and the feedback reverted on its own.
    FeedbackCleared { screen: ScreenState },
    /// The experience was reset to stage 1.
    Restarted,
}

/// Delayed success notification from a stage controller to the sequencer.
#[derive(Debug, Clone, Copy)]
pub(crate) struct UnlockNotice {
    pub(crate) generation: u64,
}

/// Publishes formatted [`GameEvent`]s to every subscriber.
pub(crate) struct EventBus<F>
where
    F: EventFormatter,
{
    tx: broadcast::Sender<F::Output>,
    formatter: Arc<F>,
}

impl<F> EventBus<F>
where
    F: EventFormatter,
{
    pub(crate) fn new(formatter: Arc<F>) -> Self {
        let (tx, _rx) = broadcast::channel(64);
        Self { tx, formatter }
    }

    pub(crate) fn emit(&self, event: &GameEvent) {
        self.tx.send(self.formatter.format(event)).ok();
    }

    fn subscribe(&self) -> EventStream<F::Output> {
        EventStream::new(self.tx.subscribe())
    }
}

/// A subscription to the engine's transition events.
///
/// Wraps a `BroadcastStream` and silently skips gaps caused by a slow
/// receiver, so `.next()` only ever yields real events.
pub struct EventStream<T> {
    inner: BroadcastStream<T>,
}

impl<T> EventStream<T>
where
    T: Clone + Send + 'static,
{
    pub fn new(rx: broadcast::Receiver<T>) -> Self {
        Self {
            inner: BroadcastStream::new(rx),
        }
    }

    /// Receives the next event, or `None` once the engine is gone.
    pub async fn next(&mut self) -> Option<T> {
        while let Some(msg) = self.inner.next().await {
            match msg {
                Ok(event) => return Some(event),
                Err(_) => continue,
            }
        }
        None
    }
}

/// Runtime configuration for the whole experience.
///
/// Defaults: a 2 s error window and a 10-digit cap on stage 1, a 3 s error
/// window on stage 2, and a 1.5 s closing transition on both.
#[derive(Clone, Debug)]
pub struct GameOptions {
    pub stage_one: StageOptions,
    pub stage_two: StageOptions,
}

impl Default for GameOptions {
    fn default() -> Self {
        Self {
            stage_one: StageOptions::numeric(),
            stage_two: StageOptions::word(),
        }
    }
}

/// Which controller (if any) is mounted, and the generation counter used to
/// tag controller incarnations.
struct ScreenSlot<F>
where
    F: EventFormatter,
{
    screen: ScreenState,
    controller: Option<StageController<F>>,
    next_generation: u64,
}

/// Core shared state for the running sequencer.
///
/// Users never construct this directly; call [`Game::new`] and
/// [`Game::build`] to obtain the runtime.
struct GameCore<F>
where
    F: EventFormatter,
{
    options: GameOptions,
    sounds: Arc<dyn SoundBank>,
    bus: Arc<EventBus<F>>,
    notice_tx: mpsc::UnboundedSender<UnlockNotice>,
    slot: Mutex<ScreenSlot<F>>,
    reveal_notify: Notify,
}

impl<F> GameCore<F>
where
    F: EventFormatter,
{
    /// Discards the current controller and mounts the given screen. The
    /// reveal screen mounts no controller.
    fn mount_locked(&self, slot: &mut ScreenSlot<F>, screen: ScreenState) {
        if let Some(prev) = slot.controller.take() {
            prev.discard();
        }
        slot.screen = screen;

        let options = match screen {
            ScreenState::Stage1 => self.options.stage_one.clone(),
            ScreenState::Stage2 => self.options.stage_two.clone(),
            ScreenState::Reveal => return,
        };

        let generation = slot.next_generation;
        slot.next_generation += 1;
        slot.controller = Some(StageController::new(
            screen,
            options,
            generation,
            self.notice_tx.clone(),
            self.bus.clone(),
            self.sounds.clone(),
        ));
    }

    fn handle_unlock(&self, notice: UnlockNotice) {
        let next = {
            let mut slot = self.slot.lock();
            match slot.controller.as_ref() {
                Some(active) if active.generation() == notice.generation => {}
                // Stale notice from a controller that was already discarded.
                _ => return,
            }
            let next = match slot.screen {
                ScreenState::Stage1 => ScreenState::Stage2,
                ScreenState::Stage2 => ScreenState::Reveal,
                ScreenState::Reveal => return,
            };
            self.mount_locked(&mut slot, next);
            next
        };

        self.bus.emit(&GameEvent::ScreenChanged { screen: next });
        if next == ScreenState::Reveal {
            self.reveal_notify.notify_waiters();
        }
    }

    fn restart(&self) {
        {
            let mut slot = self.slot.lock();
            self.mount_locked(&mut slot, ScreenState::Stage1);
        }
        self.bus.emit(&GameEvent::Restarted);
        self.bus.emit(&GameEvent::ScreenChanged {
            screen: ScreenState::Stage1,
        });
    }
}

/// Builder for the running sequencer.
///
/// # Type Parameters
/// - `F`: the [`EventFormatter`] used to serialize events for subscribers.
pub struct Game<F>
where
    F: EventFormatter,
{
    options: GameOptions,
    sounds: Arc<dyn SoundBank>,
    formatter: Arc<F>,
}

impl<F> Game<F>
where
    F: EventFormatter + Default,
{
    pub fn new() -> Self {
        Self {
            options: GameOptions::default(),
            sounds: Arc::new(NullSounds),
            formatter: Arc::new(F::default()),
        }
    }
}

impl<F> Default for Game<F>
where
    F: EventFormatter + Default,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<F> Game<F>
where
    F: EventFormatter,
{
    /// Sets custom stage configuration.
    pub fn with_options(mut self, options: GameOptions) -> Self {
        self.options = options;
        self
    }

    /// Sets the advisory sound collaborator. Defaults to [`NullSounds`].
    pub fn with_sounds(mut self, sounds: Arc<dyn SoundBank>) -> Self {
        self.sounds = sounds;
        self
    }

    /// Mounts stage 1 and spawns the unlock dispatch loop.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn build(self) -> Arc<BuiltGame<F>> {
        let (notice_tx, mut notice_rx) = mpsc::unbounded_channel();

        let core = Arc::new(GameCore {
            options: self.options,
            sounds: self.sounds,
            bus: Arc::new(EventBus::new(self.formatter)),
            notice_tx,
            slot: Mutex::new(ScreenSlot {
                screen: ScreenState::Stage1,
                controller: None,
                next_generation: 0,
            }),
            reveal_notify: Notify::new(),
        });

        {
            let mut slot = core.slot.lock();
            core.mount_locked(&mut slot, ScreenState::Stage1);
        }

        // The loop holds only a weak handle, so dropping the game tears the
        // dispatcher down instead of keeping it alive through its own sender.
        let dispatch = Arc::downgrade(&core);
        tokio::task::spawn(async move {
            while let Some(notice) = notice_rx.recv().await {
                match dispatch.upgrade() {
                    Some(core) => core.handle_unlock(notice),
                    None => break,
                }
            }
        });

        Arc::new(BuiltGame(core))
    }
}

/// High-level interface to the running experience.
///
/// All methods are thread-safe; operations run to completion before the
/// next one is processed.
#[async_trait]
pub trait EscapeRoom: Send + Sync + 'static {
    type F: EventFormatter;

    /// Returns which screen is currently live.
    fn screen(&self) -> ScreenState;

    /// Returns a handle to the active stage controller, if a stage screen
    /// is mounted. The reveal screen has none.
    fn stage(&self) -> Option<StageController<Self::F>>;

    /// Resets the experience to stage 1 with a fresh controller. In-flight
    /// timers of the discarded controller can never act on the new one.
    fn restart(&self);

    /// Returns a subscription to the transition events.
    fn get_events_stream(&self) -> EventStream<<Self::F as EventFormatter>::Output>;

    /// Resolves once both safes are open and the reveal screen is live.
    async fn await_reveal(&self);
}

/// Internal runtime implementing [`EscapeRoom`]; obtained from
/// [`Game::build`].
pub struct BuiltGame<F>(Arc<GameCore<F>>)
where
    F: EventFormatter;

#[async_trait]
impl<F> EscapeRoom for BuiltGame<F>
where
    F: EventFormatter,
{
    type F = F;

    fn screen(&self) -> ScreenState {
        self.0.slot.lock().screen
    }

    fn stage(&self) -> Option<StageController<F>> {
        self.0.slot.lock().controller.clone()
    }

    fn restart(&self) {
        self.0.restart();
    }

    fn get_events_stream(&self) -> EventStream<F::Output> {
        self.0.bus.subscribe()
    }

    async fn await_reveal(&self) {
        let notified = self.0.reveal_notify.notified();
        tokio::pin!(notified);
        loop {
            // Register interest before checking, so a notification landing
            // between the check and the await is never lost.
            notified.as_mut().enable();
            if self.0.slot.lock().screen == ScreenState::Reveal {
                return;
            }
            notified.as_mut().await;
            notified.set(self.0.reveal_notify.notified());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    async fn settle() {
        for _ in 0..8 {
            tokio::task::yield_now().await;
        }
    }

    fn empty_snapshot() -> StageSnapshot {
        StageSnapshot {
            buffer: String::new(),
            error_message: None,
            is_shaking: false,
            is_unlocking: false,
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_full_progression_reaches_reveal() {
        let game = Game::<StructuredFormatter>::new().build();
        let mut events = game.get_events_stream();
        assert_eq!(game.screen(), ScreenState::Stage1);

        let stage = game.stage().unwrap();
        for digit in "1425925".chars() {
            stage.append_digit(digit);
        }
        stage.submit();
        assert!(stage.snapshot().is_unlocking);

        assert_eq!(
            events.next().await,
            Some(GameEvent::UnlockStarted {
                screen: ScreenState::Stage1
            })
        );
        assert_eq!(
            events.next().await,
            Some(GameEvent::ScreenChanged {
                screen: ScreenState::Stage2
            })
        );
        assert_eq!(game.screen(), ScreenState::Stage2);

        // The second stage mounts fresh.
        let stage = game.stage().unwrap();
        assert_eq!(stage.snapshot(), empty_snapshot());

        stage.set_buffer("Kuzey Yıldızı");
        stage.submit();
        game.await_reveal().await;

        assert_eq!(game.screen(), ScreenState::Reveal);
        assert!(game.stage().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_wrong_credential_does_not_advance() {
        let game = Game::<StructuredFormatter>::new().build();
        let mut events = game.get_events_stream();

        let stage = game.stage().unwrap();
        stage.set_buffer("0000000");
        stage.submit();

        assert!(matches!(
            events.next().await,
            Some(GameEvent::WrongCredential { .. })
        ));
        tokio::time::advance(Duration::from_millis(5_000)).await;
        settle().await;
        assert_eq!(game.screen(), ScreenState::Stage1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_restart_mid_unlock_ignores_stale_timer() {
        let game = Game::<StructuredFormatter>::new().build();
        let mut events = game.get_events_stream();

        let stage = game.stage().unwrap();
        stage.set_buffer("1425925");
        stage.submit();
        assert!(stage.snapshot().is_unlocking);

        // Reset before the closing transition finishes.
        game.restart();
        tokio::time::advance(Duration::from_millis(2_000)).await;
        settle().await;

        assert_eq!(game.screen(), ScreenState::Stage1);
        assert_eq!(game.stage().unwrap().snapshot(), empty_snapshot());

        assert_eq!(
            events.next().await,
            Some(GameEvent::UnlockStarted {
                screen: ScreenState::Stage1
            })
        );
        assert_eq!(events.next().await, Some(GameEvent::Restarted));
        assert_eq!(
            events.next().await,
            Some(GameEvent::ScreenChanged {
                screen: ScreenState::Stage1
            })
        );
        // The stale unlock never lands: no further screen change arrives.
        let nothing = tokio::time::timeout(Duration::from_secs(10), events.next()).await;
        assert!(nothing.is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_restart_from_reveal_mounts_fresh_stage_one() {
        let game = Game::<StructuredFormatter>::new().build();

        let stage = game.stage().unwrap();
        stage.set_buffer("1425925");
        stage.submit();
        tokio::time::advance(Duration::from_millis(1_500)).await;
        settle().await;

        let stage = game.stage().unwrap();
        stage.set_buffer("kuzeyyildizi");
        stage.submit();
        game.await_reveal().await;
        assert_eq!(game.screen(), ScreenState::Reveal);

        game.restart();
        assert_eq!(game.screen(), ScreenState::Stage1);
        assert_eq!(game.stage().unwrap().snapshot(), empty_snapshot());
    }

    #[tokio::test(start_paused = true)]
    async fn test_restart_discards_error_feedback_with_controller() {
        let game = Game::<StructuredFormatter>::new().build();

        let stage = game.stage().unwrap();
        stage.set_buffer("1111");
        stage.submit();
        assert!(stage.snapshot().is_shaking);

        game.restart();
        let fresh = game.stage().unwrap();
        assert_eq!(fresh.snapshot(), empty_snapshot());

        // The old error window elapsing changes nothing on the new screen.
        tokio::time::advance(Duration::from_millis(3_000)).await;
        settle().await;
        assert_eq!(fresh.snapshot(), empty_snapshot());
    }

    #[tokio::test(start_paused = true)]
    async fn test_unlock_fires_exactly_once_despite_resubmit() {
        let game = Game::<StructuredFormatter>::new().build();
        let mut events = game.get_events_stream();

        let stage = game.stage().unwrap();
        stage.set_buffer("14 25 925");
        stage.submit();
        stage.submit();
        stage.submit();

        assert_eq!(
            events.next().await,
            Some(GameEvent::UnlockStarted {
                screen: ScreenState::Stage1
            })
        );
        assert_eq!(
            events.next().await,
            Some(GameEvent::ScreenChanged {
                screen: ScreenState::Stage2
            })
        );
        let nothing = tokio::time::timeout(Duration::from_secs(10), events.next()).await;
        assert!(nothing.is_err());
        assert_eq!(game.screen(), ScreenState::Stage2);
    }
}
