use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::SceneStore;

/// Scene-wide playback position in whole seconds.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct PlaybackClock {
    seconds: u64,
}

impl PlaybackClock {
    pub fn seconds(&self) -> u64 {
        self.seconds
    }

    pub fn reset(&mut self) {
        self.seconds = 0;
    }

    pub fn advance(&mut self) -> u64 {
        self.seconds += 1;
        self.seconds
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PlaybackState {
    /// Nothing played yet, or rewound. The clock is at zero.
    Idle,
    Running,
    /// Frozen mid-run by the user; `play` resumes from the same second.
    Paused,
    /// The clock reached the bound.
    Stopped,
}

/// Identifies one repeating timer handed out by a [`Cadence`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimerId(u64);

impl TimerId {
    pub fn new(raw: u64) -> Self {
        Self(raw)
    }
}

/// Source of the fixed-interval trigger that advances the clock.
///
/// The host calls [`PlaybackEngine::on_tick`] with the timer id every time an
/// installed timer fires.
pub trait Cadence {
    fn install(&mut self, period: Duration) -> TimerId;
    fn cancel(&mut self, timer: TimerId);
}

/// Single-threaded cadence that never fires on its own.
///
/// A host loop asks for [`next_due`](Self::next_due), waits for the period
/// and delivers the tick. Install and cancel counts are kept so callers can
/// check that timers never pile up.
#[derive(Debug, Default)]
pub struct ManualCadence {
    next: u64,
    active: Vec<(TimerId, Duration)>,
    installed: usize,
    cancelled: usize,
}

impl ManualCadence {
    pub fn new() -> Self {
        Self::default()
    }

    /// The oldest timer still installed, with its period.
    pub fn next_due(&self) -> Option<(TimerId, Duration)> {
        self.active.first().copied()
    }

    pub fn active_timers(&self) -> usize {
        self.active.len()
    }

    pub fn installed(&self) -> usize {
        self.installed
    }

    pub fn cancelled(&self) -> usize {
        self.cancelled
    }
}

impl Cadence for ManualCadence {
    fn install(&mut self, period: Duration) -> TimerId {
        self.next += 1;
        let timer = TimerId(self.next);
        self.active.push((timer, period));
        self.installed += 1;
        timer
    }

    fn cancel(&mut self, timer: TimerId) {
        let before = self.active.len();
        self.active.retain(|(id, _)| *id != timer);
        if self.active.len() != before {
            self.cancelled += 1;
        }
    }
}

/// What a delivered tick did to the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// The timer is stale or playback is not running.
    Ignored,
    Advanced(u64),
    /// The clock reached the bound; playback is now stopped.
    Finished(u64),
}

/// Playback state machine driving scene visibility from the clock.
///
/// At most one timer is installed at any time: every install is preceded by
/// cancelling the previous one, and ticks from any other timer are ignored.
#[derive(Debug)]
pub struct PlaybackEngine<C: Cadence = ManualCadence> {
    clock: PlaybackClock,
    state: PlaybackState,
    bound: f64,
    period: Duration,
    timer: Option<TimerId>,
    cadence: C,
}

impl<C: Cadence> PlaybackEngine<C> {
    pub fn new(cadence: C, period: Duration) -> Self {
        Self {
            clock: PlaybackClock::default(),
            state: PlaybackState::Idle,
            bound: 0.0,
            period,
            timer: None,
            cadence,
        }
    }

    pub fn clock(&self) -> u64 {
        self.clock.seconds()
    }

    pub fn state(&self) -> PlaybackState {
        self.state
    }

    pub fn is_running(&self) -> bool {
        self.state == PlaybackState::Running
    }

    /// Clock value at which the current run stops.
    pub fn bound(&self) -> f64 {
        self.bound
    }

    pub fn cadence(&self) -> &C {
        &self.cadence
    }

    /// Starts or restarts the cadence, stopping once the clock reaches
    /// `bound` (the end time of the active object).
    ///
    /// Without a bound the call is rejected and nothing changes. A running
    /// or paused engine keeps its clock; a stopped one rewinds to zero first.
    /// Returns whether the request was accepted.
    pub fn play(&mut self, bound: Option<f64>, store: &mut SceneStore) -> bool {
        let Some(bound) = bound else {
            debug!(state = ?self.state, "play rejected without an active object");
            return false;
        };

        self.cancel_timer();
        if self.state == PlaybackState::Stopped {
            self.clock.reset();
            store.recompute_visibility(0);
        }
        self.bound = bound;

        if self.clock.seconds() as f64 >= bound {
            debug!(clock = self.clock.seconds(), bound, "bound already reached");
            self.state = PlaybackState::Stopped;
            return true;
        }

        self.timer = Some(self.cadence.install(self.period));
        self.state = PlaybackState::Running;
        debug!(clock = self.clock.seconds(), bound, "playback running");
        true
    }

    /// Freezes a running clock. Returns `false` if nothing was running.
    pub fn pause(&mut self) -> bool {
        if self.state != PlaybackState::Running {
            return false;
        }

        self.cancel_timer();
        self.state = PlaybackState::Paused;
        debug!(clock = self.clock.seconds(), "playback paused");
        true
    }

    /// Advances the clock by one second and recomputes visibility.
    ///
    /// The tick that reaches the bound is applied before playback stops, so
    /// the last delivered clock value equals the bound.
    pub fn on_tick(&mut self, timer: TimerId, store: &mut SceneStore) -> TickOutcome {
        if self.state != PlaybackState::Running || self.timer != Some(timer) {
            return TickOutcome::Ignored;
        }

        let clock = self.clock.advance();
        store.recompute_visibility(clock);

        if clock as f64 >= self.bound {
            self.cancel_timer();
            self.state = PlaybackState::Stopped;
            debug!(clock, "playback stopped at bound");
            TickOutcome::Finished(clock)
        } else {
            TickOutcome::Advanced(clock)
        }
    }

    /// Reset is offered once the clock has moved or while a run is in
    /// progress. A run paused or stopped at second zero has nothing to
    /// rewind, and `play` restarts it anyway.
    pub fn can_reset(&self) -> bool {
        self.clock.seconds() > 0 || self.state == PlaybackState::Running
    }

    /// Cancels playback, rewinds to zero and restores the visibility of
    /// second zero. Returns `false` when there is nothing to rewind.
    pub fn reset(&mut self, store: &mut SceneStore) -> bool {
        if !self.can_reset() {
            return false;
        }

        self.cancel_timer();
        self.clock.reset();
        store.recompute_visibility(0);
        self.state = PlaybackState::Idle;
        debug!("playback reset");
        true
    }

    /// Cancels any outstanding timer. The clock keeps its value.
    pub fn dispose(&mut self) {
        self.cancel_timer();
        if self.state == PlaybackState::Running {
            self.state = PlaybackState::Stopped;
        }
    }

    fn cancel_timer(&mut self) {
        if let Some(timer) = self.timer.take() {
            self.cadence.cancel(timer);
        }
    }
}

impl<C: Cadence> Drop for PlaybackEngine<C> {
    fn drop(&mut self) {
        self.cancel_timer();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{MediaKind, MediaSource};

    fn engine() -> PlaybackEngine {
        PlaybackEngine::new(ManualCadence::new(), Duration::from_secs(1))
    }

    fn store_with_window(start: f64, end: f64) -> SceneStore {
        let mut store = SceneStore::default();
        let source = MediaSource::new("clip.mp4", MediaKind::Video, 640.0, 360.0).unwrap();
        let id = store.add(source);
        store.set_time_window(id, start, end);
        store
    }

    fn run_to_end(engine: &mut PlaybackEngine, store: &mut SceneStore) -> Vec<TickOutcome> {
        let mut outcomes = Vec::new();
        while let Some((timer, _)) = engine.cadence().next_due() {
            outcomes.push(engine.on_tick(timer, store));
        }
        outcomes
    }

    #[test]
    fn clock_advances_and_resets() {
        let mut clock = PlaybackClock::default();
        assert_eq!(clock.advance(), 1);
        assert_eq!(clock.advance(), 2);
        clock.reset();
        assert_eq!(clock.seconds(), 0);
    }

    #[test]
    fn play_without_bound_is_rejected() {
        let mut engine = engine();
        let mut store = SceneStore::default();

        assert!(!engine.play(None, &mut store));
        assert_eq!(engine.state(), PlaybackState::Idle);
        assert_eq!(engine.cadence().installed(), 0);
    }

    #[test]
    fn runs_until_the_bound_inclusive() {
        let mut engine = engine();
        let mut store = store_with_window(0.0, 3.0);

        assert!(engine.play(Some(3.0), &mut store));
        let outcomes = run_to_end(&mut engine, &mut store);

        assert_eq!(
            outcomes,
            vec![
                TickOutcome::Advanced(1),
                TickOutcome::Advanced(2),
                TickOutcome::Finished(3),
            ]
        );
        assert_eq!(engine.state(), PlaybackState::Stopped);
        assert_eq!(engine.clock(), 3);
        assert_eq!(engine.cadence().active_timers(), 0);
    }

    #[test]
    fn stale_ticks_are_ignored() {
        let mut engine = engine();
        let mut store = store_with_window(0.0, 10.0);

        engine.play(Some(10.0), &mut store);
        let (first, _) = engine.cadence().next_due().unwrap();
        engine.play(Some(10.0), &mut store);

        assert_eq!(engine.on_tick(first, &mut store), TickOutcome::Ignored);
        assert_eq!(engine.clock(), 0);
    }

    #[test]
    fn replay_while_running_keeps_a_single_timer() {
        let mut engine = engine();
        let mut store = store_with_window(0.0, 10.0);

        engine.play(Some(10.0), &mut store);
        let (timer, _) = engine.cadence().next_due().unwrap();
        engine.on_tick(timer, &mut store);

        for _ in 0..4 {
            engine.play(Some(10.0), &mut store);
        }
        let cadence = engine.cadence();
        assert_eq!(cadence.active_timers(), 1);
        assert_eq!(cadence.installed(), 5);
        assert_eq!(cadence.cancelled(), 4);
        assert_eq!(engine.clock(), 1);
    }

    #[test]
    fn pause_freezes_and_play_resumes() {
        let mut engine = engine();
        let mut store = store_with_window(0.0, 10.0);

        engine.play(Some(10.0), &mut store);
        let (timer, _) = engine.cadence().next_due().unwrap();
        engine.on_tick(timer, &mut store);
        engine.on_tick(timer, &mut store);

        assert!(engine.pause());
        assert!(!engine.pause());
        assert_eq!(engine.state(), PlaybackState::Paused);
        assert_eq!(engine.cadence().active_timers(), 0);
        assert_eq!(engine.on_tick(timer, &mut store), TickOutcome::Ignored);

        engine.play(Some(10.0), &mut store);
        let (timer, _) = engine.cadence().next_due().unwrap();
        assert_eq!(engine.on_tick(timer, &mut store), TickOutcome::Advanced(3));
    }

    #[test]
    fn play_after_stop_rewinds() {
        let mut engine = engine();
        let mut store = store_with_window(0.0, 2.0);

        engine.play(Some(2.0), &mut store);
        run_to_end(&mut engine, &mut store);
        assert_eq!(engine.clock(), 2);

        engine.play(Some(2.0), &mut store);
        assert_eq!(engine.clock(), 0);
        assert_eq!(engine.state(), PlaybackState::Running);
    }

    #[test]
    fn zero_bound_stops_without_a_timer() {
        let mut engine = engine();
        let mut store = store_with_window(0.0, 0.0);

        assert!(engine.play(Some(0.0), &mut store));
        assert_eq!(engine.state(), PlaybackState::Stopped);
        assert_eq!(engine.cadence().installed(), 0);
    }

    #[test]
    fn reset_rewinds_and_restores_visibility() {
        let mut engine = engine();
        let mut store = store_with_window(2.0, 5.0);
        assert!(!engine.reset(&mut store));

        engine.play(Some(5.0), &mut store);
        let (timer, _) = engine.cadence().next_due().unwrap();
        engine.on_tick(timer, &mut store);
        engine.on_tick(timer, &mut store);
        assert!(store.iter().all(|object| object.visible()));

        assert!(engine.reset(&mut store));
        assert_eq!(engine.clock(), 0);
        assert_eq!(engine.state(), PlaybackState::Idle);
        assert_eq!(engine.cadence().active_timers(), 0);
        assert!(store.iter().all(|object| !object.visible()));
        assert!(!engine.reset(&mut store));
    }

    #[test]
    fn reset_is_disabled_at_second_zero_unless_running() {
        let mut engine = engine();
        let mut store = store_with_window(0.0, 10.0);

        engine.play(Some(10.0), &mut store);
        assert!(engine.can_reset());
        engine.pause();
        assert_eq!(engine.state(), PlaybackState::Paused);
        assert!(!engine.reset(&mut store));
        assert_eq!(engine.state(), PlaybackState::Paused);

        engine.play(Some(10.0), &mut store);
        assert!(engine.reset(&mut store));
        assert_eq!(engine.state(), PlaybackState::Idle);
        assert_eq!(engine.cadence().active_timers(), 0);
    }

    #[test]
    fn dispose_cancels_the_timer() {
        let mut engine = engine();
        let mut store = store_with_window(0.0, 10.0);

        engine.play(Some(10.0), &mut store);
        engine.dispose();
        assert_eq!(engine.cadence().active_timers(), 0);
        assert_eq!(engine.state(), PlaybackState::Stopped);
    }
}
