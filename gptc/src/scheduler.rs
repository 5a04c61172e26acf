//! Periodic tick driver.
//!
//! Both callbacks run on one task. A slow tick that is still awaiting the
//! oracle holds back every other tick; missed ticks are skipped rather than
//! replayed in a burst.

use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, info};

use crate::config::ScheduleConfig;

#[async_trait]
pub trait TickHandler: Send {
    /// Called every fast period with that period as `dt`.
    async fn on_fast_tick(&mut self, dt: Duration);

    /// Called every slow period with that period as `dt`.
    async fn on_slow_tick(&mut self, dt: Duration);
}

/// Ticks delivered during one [`TickScheduler::run`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickCounts {
    pub fast: u64,
    pub slow: u64,
}

#[derive(Debug, Clone, Copy)]
pub struct TickScheduler {
    fast: Duration,
    slow: Duration,
}

impl TickScheduler {
    pub fn new(fast: Duration, slow: Duration) -> Self {
        Self { fast, slow }
    }

    pub fn from_config(config: &ScheduleConfig) -> Self {
        Self::new(config.fast_tick(), config.slow_tick())
    }

    /// Drive `handler` until `shutdown` resolves. The first tick of each
    /// kind fires one full period after the call.
    pub async fn run<H, F>(&self, handler: &mut H, shutdown: F) -> TickCounts
    where
        H: TickHandler + ?Sized,
        F: Future<Output = ()>,
    {
        let start = Instant::now();
        let mut fast = interval_at(start + self.fast, self.fast);
        fast.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let mut slow = interval_at(start + self.slow, self.slow);
        slow.set_missed_tick_behavior(MissedTickBehavior::Skip);

        tokio::pin!(shutdown);
        let mut counts = TickCounts::default();
        info!(
            fast_ms = self.fast.as_millis() as u64,
            slow_ms = self.slow.as_millis() as u64,
            "tick scheduler started"
        );

        loop {
            tokio::select! {
                biased;
                _ = &mut shutdown => break,
                _ = slow.tick() => {
                    counts.slow += 1;
                    debug!(tick = counts.slow, "slow tick");
                    handler.on_slow_tick(self.slow).await;
                }
                _ = fast.tick() => {
                    counts.fast += 1;
                    handler.on_fast_tick(self.fast).await;
                }
            }
        }

        info!(fast = counts.fast, slow = counts.slow, "tick scheduler stopped");
        counts
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Recorder {
        fast_at: Vec<Duration>,
        slow_at: Vec<Duration>,
        slow_work: Duration,
        origin: Option<Instant>,
    }

    impl Recorder {
        fn elapsed(&mut self) -> Duration {
            let origin = *self.origin.get_or_insert_with(Instant::now);
            Instant::now() - origin
        }
    }

    #[async_trait]
    impl TickHandler for Recorder {
        async fn on_fast_tick(&mut self, _dt: Duration) {
            let t = self.elapsed();
            self.fast_at.push(t);
        }

        async fn on_slow_tick(&mut self, _dt: Duration) {
            let t = self.elapsed();
            self.slow_at.push(t);
            tokio::time::sleep(self.slow_work).await;
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_tick_counts_over_twenty_seconds() {
        let scheduler = TickScheduler::new(Duration::from_millis(500), Duration::from_secs(10));
        let mut recorder = Recorder {
            origin: Some(Instant::now()),
            ..Recorder::default()
        };
        let counts = scheduler
            .run(&mut recorder, tokio::time::sleep(Duration::from_millis(20_100)))
            .await;
        assert_eq!(counts, TickCounts { fast: 40, slow: 2 });
        assert_eq!(recorder.fast_at.first(), Some(&Duration::from_millis(500)));
        assert_eq!(recorder.slow_at, vec![Duration::from_secs(10), Duration::from_secs(20)]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_tick_holds_back_fast_ticks() {
        let scheduler = TickScheduler::new(Duration::from_millis(500), Duration::from_secs(10));
        let mut recorder = Recorder {
            origin: Some(Instant::now()),
            slow_work: Duration::from_secs(3),
            ..Recorder::default()
        };
        let counts = scheduler
            .run(&mut recorder, tokio::time::sleep(Duration::from_millis(15_100)))
            .await;
        assert_eq!(counts.slow, 1);
        assert!(counts.fast < 30);
        assert!(recorder
            .fast_at
            .iter()
            .all(|t| *t <= Duration::from_secs(10) || *t >= Duration::from_secs(13)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_immediate_shutdown_runs_nothing() {
        let scheduler = TickScheduler::from_config(&ScheduleConfig::default());
        let mut recorder = Recorder::default();
        let counts = scheduler.run(&mut recorder, std::future::ready(())).await;
        assert_eq!(counts, TickCounts::default());
    }
}
