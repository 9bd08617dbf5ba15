//! Periodic Triggers
//!
//! A restartable fixed-period trigger. `start` and `stop` are idempotent;
//! a stopped trigger never fires, so it can sit in a `select!` branch.

use std::time::Duration;
use tokio::time::{interval_at, Instant, Interval, MissedTickBehavior};

/// Fixed-period trigger that can be torn down and restarted.
#[derive(Debug)]
pub struct PeriodicTrigger {
    period: Duration,
    interval: Option<Interval>,
}

impl PeriodicTrigger {
    /// Stopped trigger with the given period.
    pub fn new(period: Duration) -> Self {
        Self {
            period: period.max(Duration::from_millis(1)),
            interval: None,
        }
    }

    /// Is running.
    pub fn is_running(&self) -> bool {
        self.interval.is_some()
    }

    /// Start firing one period from now. Returns false if already running.
    pub fn start(&mut self) -> bool {
        if self.interval.is_some() {
            return false;
        }
        let mut interval = interval_at(Instant::now() + self.period, self.period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
        self.interval = Some(interval);
        true
    }

    /// Stop firing. Returns false if already stopped.
    pub fn stop(&mut self) -> bool {
        self.interval.take().is_some()
    }

    /// Wait for the next firing. Pends forever while stopped.
    pub async fn tick(&mut self) -> Instant {
        match self.interval.as_mut() {
            Some(interval) => interval.tick().await,
            None => std::future::pending().await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::time::timeout;

    #[test]
    fn test_start_stop_idempotent() {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_time()
            .build()
            .unwrap();
        runtime.block_on(async {
            let mut trigger = PeriodicTrigger::new(Duration::from_millis(16));
            assert!(!trigger.is_running());
            assert!(trigger.start());
            assert!(!trigger.start());
            assert!(trigger.is_running());
            assert!(trigger.stop());
            assert!(!trigger.stop());
            assert!(!trigger.is_running());
        });
    }

    #[tokio::test(start_paused = true)]
    async fn test_fires_every_period() {
        let mut trigger = PeriodicTrigger::new(Duration::from_millis(16));
        trigger.start();

        let begin = Instant::now();
        trigger.tick().await;
        assert_eq!(begin.elapsed(), Duration::from_millis(16));
        trigger.tick().await;
        assert_eq!(begin.elapsed(), Duration::from_millis(32));
    }

    #[tokio::test(start_paused = true)]
    async fn test_stopped_never_fires() {
        let mut trigger = PeriodicTrigger::new(Duration::from_millis(16));
        assert!(timeout(Duration::from_millis(100), trigger.tick()).await.is_err());

        trigger.start();
        assert!(timeout(Duration::from_millis(100), trigger.tick()).await.is_ok());

        trigger.stop();
        assert!(timeout(Duration::from_millis(100), trigger.tick()).await.is_err());
    }
}
