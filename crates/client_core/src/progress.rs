//! Simulated upload progress.
//!
//! The analyzer gives no upload feedback, so progress is advanced on a fixed
//! timer while the request is in flight and capped below 100 until the real
//! response arrives.

use std::{future::Future, time::Duration};

use tokio::{
    task::JoinHandle,
    time::{self, MissedTickBehavior},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProgressSettings {
    pub tick: Duration,
    pub step: u8,
    pub cap: u8,
}

impl Default for ProgressSettings {
    fn default() -> Self {
        Self {
            tick: Duration::from_millis(200),
            step: 10,
            cap: 90,
        }
    }
}

impl ProgressSettings {
    pub fn advance(&self, current: u8) -> u8 {
        if current >= self.cap {
            return current;
        }
        current.saturating_add(self.step).min(self.cap)
    }
}

/// Handle to the periodic progress task. The task is aborted when the ticker
/// is stopped or dropped.
pub(crate) struct ProgressTicker {
    handle: Option<JoinHandle<()>>,
}

impl ProgressTicker {
    /// Runs `on_tick` every `period`, starting one period from now, until it
    /// returns `false` or the ticker goes away.
    pub(crate) fn spawn<F, Fut>(period: Duration, mut on_tick: F) -> Self
    where
        F: FnMut() -> Fut + Send + 'static,
        Fut: Future<Output = bool> + Send + 'static,
    {
        let handle = tokio::spawn(async move {
            let mut interval = time::interval(period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            interval.tick().await;
            loop {
                interval.tick().await;
                if !on_tick().await {
                    break;
                }
            }
        });

        Self {
            handle: Some(handle),
        }
    }

    #[cfg(test)]
    pub(crate) fn is_running(&self) -> bool {
        self.handle
            .as_ref()
            .map(|handle| !handle.is_finished())
            .unwrap_or(false)
    }

    /// Aborts the task and waits until it is gone, so no tick can land after
    /// this returns.
    pub(crate) async fn stop(mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
            let _ = handle.await;
        }
    }
}

impl Drop for ProgressTicker {
    fn drop(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }
}

#[cfg(test)]
#[path = "tests/progress_tests.rs"]
mod tests;
