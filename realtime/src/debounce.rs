//! Trailing-edge debouncing of refresh triggers.
//!
//! `DebounceWindow` is the Idle/Pending state machine on its own, driven by
//! explicit instants so it can be exercised without a clock. `Debouncer` runs
//! a window inside a tokio task: it receives triggers over a channel, sleeps
//! until the window's deadline, and runs the refresh action once per settled
//! burst.

use crate::manager::BroadcastReport;
use async_trait::async_trait;
use log::*;
use serde::Serialize;
use std::mem;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::{sleep_until, Instant};
use tokio_util::sync::CancellationToken;

/// Time without a new trigger before a pending refresh fires.
pub const QUIET_PERIOD: Duration = Duration::from_millis(100);

/// Result of one refresh, shared by every trigger the refresh absorbed.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum RefreshOutcome {
    Broadcast(BroadcastReport),
    Failed { reason: String },
}

/// The work run when a debounce window fires.
#[async_trait]
pub trait RefreshAction: Send + Sync {
    async fn refresh(&self) -> RefreshOutcome;
}

type Waiter = oneshot::Sender<RefreshOutcome>;

enum State {
    Idle,
    Pending {
        deadline: Instant,
        waiters: Vec<Waiter>,
    },
}

/// Idle/Pending debounce state.
///
/// A trigger in Idle opens a window ending one quiet period later; a trigger in
/// Pending pushes the end of the window to one quiet period after itself.
/// Firing is only possible once the deadline has passed, and returns the
/// machine to Idle.
pub struct DebounceWindow {
    quiet_period: Duration,
    state: State,
}

impl DebounceWindow {
    pub fn new(quiet_period: Duration) -> Self {
        Self {
            quiet_period,
            state: State::Idle,
        }
    }

    pub fn is_pending(&self) -> bool {
        matches!(self.state, State::Pending { .. })
    }

    pub fn deadline(&self) -> Option<Instant> {
        match &self.state {
            State::Idle => None,
            State::Pending { deadline, .. } => Some(*deadline),
        }
    }

    /// Record a trigger at `now` and return the (re)scheduled deadline.
    /// `waiter`, if any, receives the outcome of the refresh this window fires.
    pub fn trigger(&mut self, now: Instant, waiter: Option<Waiter>) -> Instant {
        let next_deadline = now + self.quiet_period;
        if let State::Pending { deadline, waiters } = &mut self.state {
            *deadline = next_deadline;
            waiters.extend(waiter);
            return next_deadline;
        }
        self.state = State::Pending {
            deadline: next_deadline,
            waiters: waiter.into_iter().collect(),
        };
        next_deadline
    }

    /// If the window is pending and its deadline has passed, return to Idle and
    /// hand back the waiters to notify. Otherwise leave the state unchanged.
    pub fn fire(&mut self, now: Instant) -> Option<Vec<Waiter>> {
        let due = matches!(&self.state, State::Pending { deadline, .. } if now >= *deadline);
        if !due {
            return None;
        }
        match mem::replace(&mut self.state, State::Idle) {
            State::Pending { waiters, .. } => Some(waiters),
            State::Idle => None,
        }
    }

    /// Drop a pending window without firing. Returns the number of waiters
    /// released; their receivers observe a closed channel.
    pub fn cancel(&mut self) -> usize {
        match mem::replace(&mut self.state, State::Idle) {
            State::Pending { waiters, .. } => waiters.len(),
            State::Idle => 0,
        }
    }
}

/// Cloneable entry point for feeding triggers to a running `Debouncer`.
#[derive(Clone)]
pub struct DebouncerHandle {
    commands: mpsc::UnboundedSender<Option<Waiter>>,
}

impl DebouncerHandle {
    /// Feed one trigger and get a receiver for the outcome of the refresh that
    /// absorbs it. The receiver closes without a value if the debouncer shuts
    /// down first.
    pub fn trigger(&self) -> oneshot::Receiver<RefreshOutcome> {
        let (waiter, outcome) = oneshot::channel();
        if self.commands.send(Some(waiter)).is_err() {
            warn!("Debouncer is not running, dropping trigger");
        }
        outcome
    }

    /// Feed one trigger without waiting for its outcome.
    pub fn notify(&self) {
        if self.commands.send(None).is_err() {
            warn!("Debouncer is not running, dropping trigger");
        }
    }
}

/// Actor owning a `DebounceWindow` and the refresh action it fires.
pub struct Debouncer {
    window: DebounceWindow,
    commands: mpsc::UnboundedReceiver<Option<Waiter>>,
    action: Arc<dyn RefreshAction>,
    shutdown: CancellationToken,
}

impl Debouncer {
    pub fn new(
        action: Arc<dyn RefreshAction>,
        shutdown: CancellationToken,
    ) -> (Self, DebouncerHandle) {
        Self::with_quiet_period(action, QUIET_PERIOD, shutdown)
    }

    pub fn with_quiet_period(
        action: Arc<dyn RefreshAction>,
        quiet_period: Duration,
        shutdown: CancellationToken,
    ) -> (Self, DebouncerHandle) {
        let (tx, rx) = mpsc::unbounded_channel();
        let debouncer = Self {
            window: DebounceWindow::new(quiet_period),
            commands: rx,
            action,
            shutdown,
        };
        (debouncer, DebouncerHandle { commands: tx })
    }

    /// Spawn a debouncer with the default quiet period on the current runtime.
    pub fn spawn(
        action: Arc<dyn RefreshAction>,
        shutdown: CancellationToken,
    ) -> (DebouncerHandle, JoinHandle<()>) {
        let (debouncer, handle) = Self::new(action, shutdown);
        (handle, tokio::spawn(debouncer.run()))
    }

    /// Run until `shutdown` is cancelled, or until every handle is dropped and
    /// no window is pending.
    ///
    /// Refreshes run inline, so at most one is in flight. Triggers that arrive
    /// meanwhile wait in the channel and open the next window afterwards.
    pub async fn run(mut self) {
        let mut handles_dropped = false;

        loop {
            if handles_dropped && !self.window.is_pending() {
                debug!("All debouncer handles dropped, stopping");
                return;
            }

            let deadline = self.window.deadline();

            tokio::select! {
                biased;

                _ = self.shutdown.cancelled() => {
                    let released = self.window.cancel();
                    if released > 0 || deadline.is_some() {
                        info!("Debouncer shutting down, dropping pending refresh ({released} waiter(s))");
                    } else {
                        debug!("Debouncer shutting down");
                    }
                    return;
                }

                command = self.commands.recv(), if !handles_dropped => match command {
                    Some(waiter) => {
                        let was_pending = self.window.is_pending();
                        self.window.trigger(Instant::now(), waiter);
                        if was_pending {
                            trace!("Refresh rescheduled");
                        } else {
                            trace!("Refresh scheduled");
                        }
                    }
                    None => handles_dropped = true,
                },

                _ = sleep_until(deadline.unwrap_or_else(Instant::now)), if deadline.is_some() => {
                    if let Some(waiters) = self.window.fire(Instant::now()) {
                        debug!("Debounce window elapsed, refreshing ({} waiter(s))", waiters.len());
                        let outcome = self.action.refresh().await;
                        if let RefreshOutcome::Failed { reason } = &outcome {
                            warn!("Refresh failed: {reason}");
                        }
                        for waiter in waiters {
                            // The caller may have stopped waiting.
                            let _ = waiter.send(outcome.clone());
                        }
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingAction {
        fired_at: Mutex<Vec<Instant>>,
        outcomes: Mutex<VecDeque<RefreshOutcome>>,
        duration: Option<Duration>,
    }

    impl RecordingAction {
        fn taking(duration: Duration) -> Self {
            Self {
                duration: Some(duration),
                ..Default::default()
            }
        }

        fn failing_once() -> Self {
            let action = Self::default();
            action
                .outcomes
                .lock()
                .unwrap()
                .push_back(RefreshOutcome::Failed {
                    reason: "store unavailable".to_string(),
                });
            action
        }

        fn calls(&self) -> usize {
            self.fired_at.lock().unwrap().len()
        }

        fn fired_at(&self) -> Vec<Instant> {
            self.fired_at.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl RefreshAction for RecordingAction {
        async fn refresh(&self) -> RefreshOutcome {
            self.fired_at.lock().unwrap().push(Instant::now());
            if let Some(duration) = self.duration {
                tokio::time::sleep(duration).await;
            }
            let queued = self.outcomes.lock().unwrap().pop_front();
            queued.unwrap_or(RefreshOutcome::Broadcast(BroadcastReport {
                delivered: 1,
                skipped: 0,
            }))
        }
    }

    fn ms(millis: u64) -> Duration {
        Duration::from_millis(millis)
    }

    #[test]
    fn window_trigger_from_idle_schedules_one_quiet_period_out() {
        let mut window = DebounceWindow::new(QUIET_PERIOD);
        let now = Instant::now();

        assert!(!window.is_pending());
        let deadline = window.trigger(now, None);

        assert!(window.is_pending());
        assert_eq!(deadline, now + QUIET_PERIOD);
        assert_eq!(window.deadline(), Some(deadline));
    }

    #[test]
    fn window_trigger_while_pending_reschedules_from_the_new_trigger() {
        let mut window = DebounceWindow::new(QUIET_PERIOD);
        let start = Instant::now();
        window.trigger(start, None);

        let deadline = window.trigger(start + ms(70), None);

        assert_eq!(deadline, start + ms(170));
        assert!(window.fire(start + ms(100)).is_none());
        assert!(window.is_pending());
    }

    #[test]
    fn window_fire_returns_to_idle_with_all_waiters() {
        let mut window = DebounceWindow::new(QUIET_PERIOD);
        let start = Instant::now();
        let (first, _first_rx) = oneshot::channel();
        let (second, _second_rx) = oneshot::channel();
        window.trigger(start, Some(first));
        window.trigger(start + ms(10), None);
        window.trigger(start + ms(20), Some(second));

        let waiters = window.fire(start + ms(120)).expect("window should fire");

        assert_eq!(waiters.len(), 2);
        assert!(!window.is_pending());
        assert!(window.fire(start + ms(500)).is_none());
    }

    #[test]
    fn window_cancel_releases_waiters_without_firing() {
        let mut window = DebounceWindow::new(QUIET_PERIOD);
        let (waiter, mut outcome) = oneshot::channel();
        window.trigger(Instant::now(), Some(waiter));

        assert_eq!(window.cancel(), 1);

        assert!(!window.is_pending());
        assert!(outcome.try_recv().is_err());
        assert_eq!(window.cancel(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn burst_of_triggers_collapses_into_one_refresh_after_the_last() {
        let action = Arc::new(RecordingAction::default());
        let shutdown = CancellationToken::new();
        let (handle, _task) = Debouncer::spawn(action.clone(), shutdown.clone());
        let start = Instant::now();

        for _ in 0..5 {
            handle.notify();
            tokio::time::sleep(ms(50)).await;
        }
        // Last trigger landed at start + 200ms.
        assert_eq!(action.calls(), 0);

        tokio::time::sleep(ms(49)).await;
        assert_eq!(action.calls(), 0);

        tokio::time::sleep(ms(10)).await;
        assert_eq!(action.calls(), 1);
        let fired = action.fired_at()[0];
        assert!(fired >= start + ms(300), "fired too early: {:?}", fired - start);
        assert!(fired < start + ms(310), "fired too late: {:?}", fired - start);

        tokio::time::sleep(ms(1000)).await;
        assert_eq!(action.calls(), 1);
        shutdown.cancel();
    }

    #[tokio::test(start_paused = true)]
    async fn every_trigger_in_a_burst_receives_the_same_outcome() {
        let action = Arc::new(RecordingAction::default());
        let shutdown = CancellationToken::new();
        let (handle, _task) = Debouncer::spawn(action.clone(), shutdown.clone());

        let first = handle.trigger();
        let second = handle.trigger();
        handle.notify();
        let third = handle.trigger();

        let expected = RefreshOutcome::Broadcast(BroadcastReport {
            delivered: 1,
            skipped: 0,
        });
        assert_eq!(first.await.unwrap(), expected);
        assert_eq!(second.await.unwrap(), expected);
        assert_eq!(third.await.unwrap(), expected);
        assert_eq!(action.calls(), 1);
        shutdown.cancel();
    }

    #[tokio::test(start_paused = true)]
    async fn shutdown_while_pending_never_runs_the_refresh() {
        let action = Arc::new(RecordingAction::default());
        let shutdown = CancellationToken::new();
        let (handle, task) = Debouncer::spawn(action.clone(), shutdown.clone());

        let outcome = handle.trigger();
        tokio::time::sleep(ms(50)).await;
        shutdown.cancel();
        task.await.unwrap();
        tokio::time::sleep(ms(500)).await;

        assert_eq!(action.calls(), 0);
        assert!(outcome.await.is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn failed_refresh_returns_to_idle_and_next_trigger_fires() {
        let action = Arc::new(RecordingAction::failing_once());
        let shutdown = CancellationToken::new();
        let (handle, _task) = Debouncer::spawn(action.clone(), shutdown.clone());

        let failed = handle.trigger().await.unwrap();
        assert_eq!(
            failed,
            RefreshOutcome::Failed {
                reason: "store unavailable".to_string()
            }
        );

        let recovered = handle.trigger().await.unwrap();
        assert!(matches!(recovered, RefreshOutcome::Broadcast(_)));
        assert_eq!(action.calls(), 2);
        shutdown.cancel();
    }

    #[tokio::test(start_paused = true)]
    async fn trigger_during_an_inflight_refresh_opens_a_new_window() {
        let action = Arc::new(RecordingAction::taking(ms(500)));
        let shutdown = CancellationToken::new();
        let (handle, _task) = Debouncer::spawn(action.clone(), shutdown.clone());
        let start = Instant::now();

        let first = handle.trigger();
        tokio::time::sleep(ms(150)).await;
        // The first refresh started at start + 100ms and runs until + 600ms.
        assert_eq!(action.calls(), 1);
        let second = handle.trigger();

        first.await.unwrap();
        second.await.unwrap();

        let fired = action.fired_at();
        assert_eq!(fired.len(), 2);
        assert!(fired[1] >= start + ms(700), "second fired at {:?}", fired[1] - start);
        shutdown.cancel();
    }

    #[tokio::test(start_paused = true)]
    async fn debouncer_stops_once_handles_are_dropped_and_idle() {
        let action = Arc::new(RecordingAction::default());
        let (handle, task) = Debouncer::spawn(action.clone(), CancellationToken::new());

        handle.notify();
        drop(handle);
        task.await.unwrap();

        // The pending window still fires before the task stops.
        assert_eq!(action.calls(), 1);
    }
}
