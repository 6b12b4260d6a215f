//! Background loads polled once per tick.
//!
//! The render loop never waits: it asks a [`LoadState`] whether its value arrived and
//! carries on either way.

use std::fmt;
use std::sync::mpsc::{self, Receiver, TryRecvError};
use std::thread;

use crate::EngineError;

/// A value being produced on another thread.
pub struct Pending<T> {
    label: String,
    rx: Receiver<Result<T, EngineError>>,
}

/// Outcome of one non-blocking check on a [`Pending`].
#[derive(Debug)]
pub enum PendingPoll<T> {
    NotReady,
    Done(Result<T, EngineError>),
}

impl<T: Send + 'static> Pending<T> {
    /// Run `job` on a new thread.
    pub fn spawn<F>(label: impl Into<String>, job: F) -> Self
    where
        F: FnOnce() -> Result<T, EngineError> + Send + 'static,
    {
        let label = label.into();
        let (tx, rx) = mpsc::channel();
        let thread_label = label.clone();
        thread::spawn(move || {
            // receiver may already be gone (owner disposed); nothing to do then
            if tx.send(job()).is_err() {
                tracing::debug!(label = %thread_label, "load finished after owner went away");
            }
        });
        Self { label, rx }
    }

    /// Already-resolved value (synchronous sources, tests).
    pub fn resolved(label: impl Into<String>, value: Result<T, EngineError>) -> Self {
        let (tx, rx) = mpsc::channel();
        let _ = tx.send(value);
        Self {
            label: label.into(),
            rx,
        }
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn poll(&self) -> PendingPoll<T> {
        match self.rx.try_recv() {
            Ok(v) => PendingPoll::Done(v),
            Err(TryRecvError::Empty) => PendingPoll::NotReady,
            Err(TryRecvError::Disconnected) => PendingPoll::Done(Err(EngineError::other(format!(
                "{}: loader thread exited without a result",
                self.label
            )))),
        }
    }
}

impl<T> fmt::Debug for Pending<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pending").field("label", &self.label).finish()
    }
}

/// `Unloaded -> Loading -> Ready | Failed`.
#[derive(Debug)]
pub enum LoadState<T> {
    Unloaded,
    Loading(Pending<T>),
    Ready(T),
    Failed(String),
}

impl<T> Default for LoadState<T> {
    fn default() -> Self {
        LoadState::Unloaded
    }
}

impl<T: Send + 'static> LoadState<T> {
    pub fn loading(p: Pending<T>) -> Self {
        LoadState::Loading(p)
    }

    /// Advance a `Loading` state if its result arrived; returns the ready value, if any.
    pub fn poll(&mut self) -> Option<&T> {
        if let LoadState::Loading(p) = self {
            match p.poll() {
                PendingPoll::NotReady => {}
                PendingPoll::Done(Ok(v)) => *self = LoadState::Ready(v),
                PendingPoll::Done(Err(e)) => {
                    tracing::warn!(label = %p.label(), error = %e, "background load failed");
                    *self = LoadState::Failed(e.to_string());
                }
            }
        }
        self.ready()
    }

    pub fn ready(&self) -> Option<&T> {
        match self {
            LoadState::Ready(v) => Some(v),
            _ => None,
        }
    }

    pub fn is_loading(&self) -> bool {
        matches!(self, LoadState::Loading(_))
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, LoadState::Failed(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::mpsc::sync_channel;
    use std::time::{Duration, Instant};

    #[test]
    fn resolved_pending_becomes_ready_on_first_poll() {
        let mut st = LoadState::loading(Pending::resolved("n", Ok(7u32)));
        assert_eq!(st.poll(), Some(&7));
        assert_eq!(st.ready(), Some(&7));
    }

    #[test]
    fn failure_moves_to_failed() {
        let mut st: LoadState<u32> =
            LoadState::loading(Pending::resolved("n", Err(EngineError::other("boom"))));
        assert_eq!(st.poll(), None);
        assert!(st.is_failed());
    }

    #[test]
    fn spawned_job_is_not_ready_until_it_finishes() {
        let (gate_tx, gate_rx) = sync_channel::<()>(0);
        let mut st = LoadState::loading(Pending::spawn("gated", move || {
            gate_rx.recv().map_err(|e| EngineError::other(e.to_string()))?;
            Ok("done")
        }));

        assert_eq!(st.poll(), None);
        assert!(st.is_loading());

        gate_tx.send(()).unwrap();
        let deadline = Instant::now() + Duration::from_secs(5);
        while st.poll().is_none() {
            assert!(Instant::now() < deadline, "job never completed");
            std::thread::sleep(Duration::from_millis(1));
        }
        assert_eq!(st.ready(), Some(&"done"));
    }

    #[test]
    fn unloaded_stays_unloaded() {
        let mut st: LoadState<u8> = LoadState::Unloaded;
        assert_eq!(st.poll(), None);
        assert!(!st.is_loading());
    }
}
