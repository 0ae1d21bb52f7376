//! Cancellable repeating task driving the live appointment check.
//!
//! # State machine
//! `Idle --arm--> Armed --disarm--> Idle`. No other states exist.
//!
//! # Invariants
//! - `arm` runs one tick on the caller's thread before the timer starts.
//! - After `disarm` returns, no further tick runs.
//! - Arming an armed poller or disarming an idle one is a no-op.

use log::{info, warn};
use std::sync::mpsc::{self, RecvTimeoutError, Sender};
use std::thread::{self, JoinHandle};
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollerState {
    Idle,
    Armed,
}

struct Worker {
    stop: Sender<()>,
    handle: JoinHandle<()>,
}

pub struct Poller {
    interval: Duration,
    worker: Option<Worker>,
}

impl Poller {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            worker: None,
        }
    }

    pub fn state(&self) -> PollerState {
        if self.worker.is_some() {
            PollerState::Armed
        } else {
            PollerState::Idle
        }
    }

    /// Runs `tick` once, then every interval until disarmed.
    ///
    /// Returns `false` when already armed.
    pub fn arm<F>(&mut self, mut tick: F) -> bool
    where
        F: FnMut() + Send + 'static,
    {
        if self.worker.is_some() {
            return false;
        }

        tick();

        let (stop, stop_rx) = mpsc::channel::<()>();
        let interval = self.interval;
        let spawned = thread::Builder::new()
            .name("biaia-poller".to_string())
            .spawn(move || loop {
                match stop_rx.recv_timeout(interval) {
                    Err(RecvTimeoutError::Timeout) => tick(),
                    Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
                }
            });

        match spawned {
            Ok(handle) => {
                info!(
                    "event=poller_arm module=poller status=ok interval_ms={}",
                    interval.as_millis()
                );
                self.worker = Some(Worker { stop, handle });
                true
            }
            Err(err) => {
                warn!(
                    "event=poller_arm module=poller status=error error_code=spawn_failed error={}",
                    err
                );
                false
            }
        }
    }

    /// Stops the timer and waits for an in-flight tick to finish.
    ///
    /// Returns `false` when already idle.
    pub fn disarm(&mut self) -> bool {
        let Some(worker) = self.worker.take() else {
            return false;
        };

        let _ = worker.stop.send(());
        if worker.handle.join().is_err() {
            warn!("event=poller_disarm module=poller status=error error_code=tick_panicked");
        } else {
            info!("event=poller_disarm module=poller status=ok");
        }
        true
    }
}

impl Drop for Poller {
    fn drop(&mut self) {
        self.disarm();
    }
}
