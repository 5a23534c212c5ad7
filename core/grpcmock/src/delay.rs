// Copyright AGNTCY Contributors (https://github.com/agntcy)
// SPDX-License-Identifier: Apache-2.0

//! Artificial latency applied before a mocked response is sent.

use std::time::Duration;

use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

use crate::errors::DelayError;

/// Release gate for [`Delay::Signal`].
///
/// Firing the gate releases every current and future waiter.
#[derive(Debug)]
pub struct Signal {
    tx: watch::Sender<()>,
}

impl Signal {
    /// Creates a gate together with the delay that waits on it
    pub fn new() -> (Self, Delay) {
        let (tx, rx) = watch::channel(());

        (Self { tx }, Delay::Signal(rx))
    }

    pub fn fire(&self) {
        self.tx.send_replace(());
    }
}

/// How long a matched call is held before its response is produced
#[derive(Debug, Clone, Default)]
pub enum Delay {
    /// Proceed at once, unless the caller is already cancelled
    #[default]
    NoWait,
    /// Wait until the paired [`Signal`] fires
    Signal(watch::Receiver<()>),
    /// Wait for a fixed amount of time
    Duration(Duration),
}

impl Delay {
    /// Blocks until the delay elapses or `cancel` fires, whichever comes first.
    pub async fn wait(&self, cancel: &CancellationToken) -> Result<(), DelayError> {
        match self {
            Delay::NoWait => {
                if cancel.is_cancelled() {
                    return Err(DelayError::Cancelled);
                }

                Ok(())
            }
            Delay::Signal(rx) => {
                // a fresh clone still sees a fire that happened before this call
                let mut rx = rx.clone();

                tokio::select! {
                    biased;
                    _ = cancel.cancelled() => Err(DelayError::Cancelled),
                    res = rx.changed() => match res {
                        Ok(()) => Ok(()),
                        Err(_) => {
                            // gate dropped without firing: only cancellation can release us
                            tracing::trace!("delay signal closed before firing");
                            cancel.cancelled().await;
                            Err(DelayError::Cancelled)
                        }
                    },
                }
            }
            Delay::Duration(duration) => {
                tracing::trace!(?duration, "delaying response");

                tokio::select! {
                    biased;
                    _ = cancel.cancelled() => Err(DelayError::Cancelled),
                    _ = tokio::time::sleep(*duration) => Ok(()),
                }
            }
        }
    }
}

impl From<Duration> for Delay {
    fn from(duration: Duration) -> Self {
        Delay::Duration(duration)
    }
}
