//! # Debouncer
//!
//! Coalesces bursts of setpoint changes into a single action.
//!
//! Every trigger restarts a quiet-period timer; when it expires the most
//! recent value is handed to the action. Values still pending when the
//! debouncer is dropped are discarded.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::sleep;
use tracing::debug;

use crate::error::{AdcsError, Result};
use crate::store::observable::Listener;

/// Trigger side of a debounce task
#[derive(Debug)]
pub struct Debouncer<T> {
    delay: Duration,
    tx: mpsc::UnboundedSender<T>,
}

impl<T: Send + 'static> Debouncer<T> {
    /// Spawn the debounce task on the current tokio runtime
    ///
    /// The task ends once the returned handle is dropped.
    ///
    /// # Panics
    ///
    /// Panics if called outside a tokio runtime.
    pub fn spawn<F, Fut>(delay: Duration, mut action: F) -> Arc<Self>
    where
        F: FnMut(T) -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let (tx, mut rx) = mpsc::unbounded_channel::<T>();

        tokio::spawn(async move {
            let mut pending: Option<T> = None;
            loop {
                if pending.is_none() {
                    match rx.recv().await {
                        Some(value) => pending = Some(value),
                        None => break,
                    }
                    continue;
                }

                tokio::select! {
                    received = rx.recv() => match received {
                        Some(value) => pending = Some(value),
                        None => break,
                    },
                    _ = sleep(delay) => {
                        if let Some(value) = pending.take() {
                            action(value).await;
                        }
                    }
                }
            }
            debug!("Debounce task finished");
        });

        Arc::new(Self { delay, tx })
    }

    #[must_use]
    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Submit a new value, restarting the quiet period
    ///
    /// # Errors
    ///
    /// Returns `Listener` if the debounce task has stopped
    pub fn trigger(&self, value: T) -> Result<()> {
        self.tx
            .send(value)
            .map_err(|_| AdcsError::Listener("debounce task has stopped".to_string()))
    }
}

impl<T: Clone + Send + 'static> Listener<T> for Debouncer<T> {
    fn on_change(&self, value: &T) -> Result<()> {
        self.trigger(value.clone())
    }
}
