//! Pausable focus-session timer.
//!
//! One [`SessionTimer`] models a single focus or break interval as an
//! explicit state machine (RUNNING → PAUSED → RUNNING → … → COMPLETED or
//! CANCELED) driven by an owned [`TimerHandle`]. Cancellation propagates
//! through a [`CancellationToken`] rather than an orphaned background task:
//! dropping or cancelling the handle deterministically ends the task, and
//! exactly one of the completion/cancellation futures runs.

use std::sync::Arc;
use std::time::Duration;

use futures::future::BoxFuture;
use parking_lot::Mutex;
use tokio::sync::mpsc;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::error::TimerError;

/// Lifecycle state of a session timer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerState {
    /// Counting down.
    Running,
    /// Countdown suspended; remaining time is frozen.
    Paused,
    /// Cancelled before completion; the cancel future has been scheduled.
    Canceled,
    /// Ran to zero; the completion future has been scheduled.
    Completed,
}

impl TimerState {
    fn name(self) -> &'static str {
        match self {
            Self::Running => "running",
            Self::Paused => "paused",
            Self::Canceled => "canceled",
            Self::Completed => "completed",
        }
    }
}

enum TimerCmd {
    Pause,
    Resume,
}

/// Owned control handle for a running [`SessionTimer`].
///
/// The handle is the only way to affect the timer; there is no detached
/// global registry. Cloning is cheap and clones control the same timer.
#[derive(Clone)]
pub struct TimerHandle {
    state: Arc<Mutex<TimerState>>,
    cmd_tx: mpsc::UnboundedSender<TimerCmd>,
    cancel: CancellationToken,
}

impl TimerHandle {
    /// Current lifecycle state.
    pub fn state(&self) -> TimerState {
        *self.state.lock()
    }

    /// Suspends the countdown. Only valid while running.
    pub fn pause(&self) -> Result<(), TimerError> {
        let mut state = self.state.lock();
        match *state {
            TimerState::Running => {
                *state = TimerState::Paused;
                // Task may have already finished; the send failure is then moot.
                let _ = self.cmd_tx.send(TimerCmd::Pause);
                Ok(())
            }
            other => Err(TimerError::InvalidState {
                state: other.name(),
                op: "pause",
            }),
        }
    }

    /// Resumes a paused countdown.
    pub fn resume(&self) -> Result<(), TimerError> {
        let mut state = self.state.lock();
        match *state {
            TimerState::Paused => {
                *state = TimerState::Running;
                let _ = self.cmd_tx.send(TimerCmd::Resume);
                Ok(())
            }
            other => Err(TimerError::InvalidState {
                state: other.name(),
                op: "resume",
            }),
        }
    }

    /// Cancels the timer. Idempotent; a no-op once completed or canceled.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }
}

/// A one-shot pausable interval timer backed by a tokio task.
pub struct SessionTimer;

impl SessionTimer {
    /// Starts a timer for `duration`.
    ///
    /// `on_complete` is awaited if the countdown reaches zero; `on_cancel`
    /// is awaited if [`TimerHandle::cancel`] fires first. The unused future
    /// is dropped without being polled.
    pub fn start(
        duration: Duration,
        on_complete: BoxFuture<'static, ()>,
        on_cancel: BoxFuture<'static, ()>,
    ) -> TimerHandle {
        let state = Arc::new(Mutex::new(TimerState::Running));
        let (cmd_tx, cmd_rx) = mpsc::unbounded_channel();
        let cancel = CancellationToken::new();

        let handle = TimerHandle {
            state: Arc::clone(&state),
            cmd_tx,
            cancel: cancel.clone(),
        };

        tokio::spawn(run_timer(
            duration,
            state,
            cmd_rx,
            cancel,
            on_complete,
            on_cancel,
        ));

        handle
    }
}

async fn run_timer(
    duration: Duration,
    state: Arc<Mutex<TimerState>>,
    mut cmd_rx: mpsc::UnboundedReceiver<TimerCmd>,
    cancel: CancellationToken,
    on_complete: BoxFuture<'static, ()>,
    on_cancel: BoxFuture<'static, ()>,
) {
    let mut remaining = duration;

    loop {
        // Frozen while paused: only a resume or a cancel can move us on.
        if *state.lock() == TimerState::Paused {
            tokio::select! {
                _ = cancel.cancelled() => {
                    *state.lock() = TimerState::Canceled;
                    debug!("session timer canceled while paused");
                    on_cancel.await;
                    return;
                }
                cmd = cmd_rx.recv() => match cmd {
                    Some(TimerCmd::Resume) => {}
                    Some(TimerCmd::Pause) => continue,
                    // All handles dropped while paused: nothing can ever
                    // resume us, treat as cancellation.
                    None => {
                        *state.lock() = TimerState::Canceled;
                        on_cancel.await;
                        return;
                    }
                },
            }
            continue;
        }

        let started = Instant::now();
        tokio::select! {
            _ = tokio::time::sleep(remaining) => {
                *state.lock() = TimerState::Completed;
                debug!(?duration, "session timer completed");
                on_complete.await;
                return;
            }
            _ = cancel.cancelled() => {
                *state.lock() = TimerState::Canceled;
                debug!("session timer canceled");
                on_cancel.await;
                return;
            }
            cmd = cmd_rx.recv() => match cmd {
                Some(TimerCmd::Pause) => {
                    remaining = remaining.saturating_sub(started.elapsed());
                }
                Some(TimerCmd::Resume) => {}
                None => {
                    // Handle dropped mid-run; let the countdown finish on
                    // its own so completed sessions still get credited.
                    tokio::select! {
                        _ = tokio::time::sleep(remaining.saturating_sub(started.elapsed())) => {
                            *state.lock() = TimerState::Completed;
                            on_complete.await;
                        }
                        _ = cancel.cancelled() => {
                            *state.lock() = TimerState::Canceled;
                            on_cancel.await;
                        }
                    }
                    return;
                }
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn flag_future(flag: &Arc<AtomicUsize>) -> BoxFuture<'static, ()> {
        let flag = Arc::clone(flag);
        Box::pin(async move {
            flag.fetch_add(1, Ordering::SeqCst);
        })
    }

    #[tokio::test(start_paused = true)]
    async fn test_timer_completes() {
        let completed = Arc::new(AtomicUsize::new(0));
        let canceled = Arc::new(AtomicUsize::new(0));
        let handle = SessionTimer::start(
            Duration::from_secs(5),
            flag_future(&completed),
            flag_future(&canceled),
        );

        tokio::time::sleep(Duration::from_secs(6)).await;
        assert_eq!(handle.state(), TimerState::Completed);
        assert_eq!(completed.load(Ordering::SeqCst), 1);
        assert_eq!(canceled.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_timer_cancel() {
        let completed = Arc::new(AtomicUsize::new(0));
        let canceled = Arc::new(AtomicUsize::new(0));
        let handle = SessionTimer::start(
            Duration::from_secs(60),
            flag_future(&completed),
            flag_future(&canceled),
        );

        tokio::time::sleep(Duration::from_secs(1)).await;
        handle.cancel();
        tokio::time::sleep(Duration::from_secs(1)).await;

        assert_eq!(handle.state(), TimerState::Canceled);
        assert_eq!(completed.load(Ordering::SeqCst), 0);
        assert_eq!(canceled.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_pause_freezes_remaining() {
        let completed = Arc::new(AtomicUsize::new(0));
        let canceled = Arc::new(AtomicUsize::new(0));
        let handle = SessionTimer::start(
            Duration::from_secs(10),
            flag_future(&completed),
            flag_future(&canceled),
        );

        tokio::time::sleep(Duration::from_secs(3)).await;
        handle.pause().unwrap();
        assert_eq!(handle.state(), TimerState::Paused);

        // Far longer than the original duration; a paused timer must not fire.
        tokio::time::sleep(Duration::from_secs(60)).await;
        assert_eq!(completed.load(Ordering::SeqCst), 0);

        handle.resume().unwrap();
        tokio::time::sleep(Duration::from_secs(8)).await;
        assert_eq!(handle.state(), TimerState::Completed);
        assert_eq!(completed.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cloned_handle_controls_same_timer() {
        let completed = Arc::new(AtomicUsize::new(0));
        let canceled = Arc::new(AtomicUsize::new(0));
        let handle = SessionTimer::start(
            Duration::from_secs(60),
            flag_future(&completed),
            flag_future(&canceled),
        );

        // A clone pulled out of shared storage cancels the original timer,
        // and both observe the state change.
        let clone = handle.clone();
        drop(handle);
        clone.cancel();
        tokio::time::sleep(Duration::from_secs(1)).await;

        assert_eq!(clone.state(), TimerState::Canceled);
        assert_eq!(canceled.load(Ordering::SeqCst), 1);
        assert_eq!(completed.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_invalid_transitions() {
        let handle = SessionTimer::start(
            Duration::from_secs(10),
            Box::pin(async {}),
            Box::pin(async {}),
        );

        assert!(handle.resume().is_err());
        handle.pause().unwrap();
        assert!(handle.pause().is_err());
        handle.cancel();
        tokio::time::sleep(Duration::from_secs(1)).await;
        assert_eq!(handle.state(), TimerState::Canceled);
        assert!(handle.pause().is_err());
    }
}
