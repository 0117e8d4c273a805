//! Periodic alert sweeps on a dedicated thread.
//!
//! One thread means sweeps never overlap. Manual triggers are coalesced.

use std::sync::{Arc, Mutex, mpsc};
use std::thread;
use std::time::{Duration, Instant};

use chrono::{Local, NaiveDate};
use serde::Serialize;
use tracing::{info, warn};

use stockwatch_alerts::{AlertRunSummary, AlertSweep, ExpiryWindow};

/// Source of "today" for each sweep.
pub type Clock = Arc<dyn Fn() -> NaiveDate + Send + Sync>;

/// Local calendar date.
pub fn local_clock() -> Clock {
    Arc::new(|| Local::now().date_naive())
}

/// Config for the sweep runner.
#[derive(Debug, Clone)]
pub struct SweepRunner {
    pub interval: Duration,
    pub max_retries: u32,
    pub base_backoff: Duration,
    pub window: ExpiryWindow,
}

impl Default for SweepRunner {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(3600),
            max_retries: 5,
            base_backoff: Duration::from_millis(250),
            window: ExpiryWindow::default(),
        }
    }
}

/// Cumulative runner statistics.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RunnerStats {
    pub sweeps_completed: u64,
    pub sweeps_failed: u64,
    pub notifications_delivered: u64,
    /// Notifications the transport did not accept.
    pub delivery_failures: u64,
    /// Records skipped because they were malformed or undecodable.
    pub malformed_products: u64,
}

impl RunnerStats {
    fn absorb(&mut self, summary: &AlertRunSummary) {
        self.sweeps_completed += 1;
        self.notifications_delivered += summary.delivered();
        self.delivery_failures += summary.results.iter().filter(|r| !r.delivered).count() as u64;
        self.malformed_products += summary.malformed.len() as u64;
    }
}

/// Owner of a running sweep thread.
#[derive(Debug)]
pub struct SweepRunnerHandle {
    shutdown: mpsc::Sender<()>,
    trigger: mpsc::SyncSender<()>,
    join: Option<thread::JoinHandle<()>>,
    stats: Arc<Mutex<RunnerStats>>,
}

impl SweepRunnerHandle {
    /// Ask for an extra sweep. Does nothing while one is already queued.
    pub fn trigger(&self) {
        let _ = self.trigger.try_send(());
    }

    pub fn stats(&self) -> RunnerStats {
        self.stats.lock().map(|s| s.clone()).unwrap_or_default()
    }

    /// Stop the runner thread, wait for the current sweep to finish and
    /// return the final statistics.
    pub fn shutdown(mut self) -> RunnerStats {
        let _ = self.shutdown.send(());
        if let Some(j) = self.join.take() {
            let _ = j.join();
        }
        self.stats()
    }
}

impl SweepRunner {
    /// Spawn the runner using the local calendar date.
    ///
    /// - Schedule: one sweep on startup, then every `interval`
    /// - Trigger: `handle.trigger()` requests an extra sweep
    /// - Failures: a sweep that cannot read products is retried with bounded
    ///   exponential backoff, then skipped until the next tick
    pub fn spawn(&self, name: &'static str, sweep: AlertSweep) -> std::io::Result<SweepRunnerHandle> {
        self.spawn_with_clock(name, sweep, local_clock())
    }

    pub fn spawn_with_clock(
        &self,
        name: &'static str,
        sweep: AlertSweep,
        clock: Clock,
    ) -> std::io::Result<SweepRunnerHandle> {
        let (shutdown_tx, shutdown_rx) = mpsc::channel::<()>();
        let (trigger_tx, trigger_rx) = mpsc::sync_channel::<()>(1);
        let stats = Arc::new(Mutex::new(RunnerStats::default()));

        let cfg = self.clone();
        let thread_stats = stats.clone();
        let join = thread::Builder::new().name(name.to_string()).spawn(move || {
            runner_loop(name, cfg, sweep, clock, shutdown_rx, trigger_rx, thread_stats)
        })?;

        Ok(SweepRunnerHandle {
            shutdown: shutdown_tx,
            trigger: trigger_tx,
            join: Some(join),
            stats,
        })
    }
}

const MAX_BACKOFF: Duration = Duration::from_secs(10);
const POLL: Duration = Duration::from_millis(250);
const MIN_INTERVAL: Duration = Duration::from_millis(1);

/// Retry bookkeeping for sweeps that abort before producing a summary.
#[derive(Debug)]
struct RetryPolicy {
    max_retries: u32,
    base: Duration,
    attempts: u32,
}

impl RetryPolicy {
    fn new(max_retries: u32, base: Duration) -> Self {
        Self {
            max_retries,
            base,
            attempts: 0,
        }
    }

    fn succeeded(&mut self) {
        self.attempts = 0;
    }

    /// When to try again, or `None` once retries are used up. Exhaustion resets
    /// the count so the next scheduled tick starts afresh.
    fn failed(&mut self, now: Instant) -> Option<Instant> {
        self.attempts += 1;
        if self.attempts > self.max_retries {
            self.attempts = 0;
            return None;
        }
        Some(now + backoff_delay(self.base, self.attempts))
    }
}

/// `base * 2^(attempt - 1)`, capped at [`MAX_BACKOFF`].
fn backoff_delay(base: Duration, attempt: u32) -> Duration {
    let factor = 1u32 << attempt.saturating_sub(1).min(16);
    base.saturating_mul(factor).min(MAX_BACKOFF)
}

/// First tick strictly after `now`, keeping the original cadence.
fn next_tick_after(mut tick: Instant, now: Instant, interval: Duration) -> Instant {
    while tick <= now {
        tick += interval;
    }
    tick
}

fn update(stats: &Mutex<RunnerStats>, f: impl FnOnce(&mut RunnerStats)) {
    if let Ok(mut s) = stats.lock() {
        f(&mut s);
    }
}

fn runner_loop(
    name: &'static str,
    cfg: SweepRunner,
    sweep: AlertSweep,
    clock: Clock,
    shutdown_rx: mpsc::Receiver<()>,
    trigger_rx: mpsc::Receiver<()>,
    stats: Arc<Mutex<RunnerStats>>,
) {
    let interval = cfg.interval.max(MIN_INTERVAL);
    info!(runner = name, interval_secs = interval.as_secs(), "alert sweep runner started");

    let mut retry = RetryPolicy::new(cfg.max_retries, cfg.base_backoff);
    let mut next_tick = Instant::now() + interval;
    let mut retry_at: Option<Instant> = None;
    // Sweep once on startup.
    let mut pending = true;

    loop {
        let now = Instant::now();
        if now >= next_tick {
            pending = true;
            next_tick = next_tick_after(next_tick, now, interval);
        }
        while trigger_rx.try_recv().is_ok() {
            pending = true;
        }

        if pending && retry_at.is_none_or(|at| now >= at) {
            pending = false;
            retry_at = None;

            match sweep.run(clock(), cfg.window) {
                Ok(summary) => {
                    retry.succeeded();
                    update(&stats, |s| s.absorb(&summary));
                }
                Err(e) => {
                    let attempt = retry.attempts + 1;
                    update(&stats, |s| s.sweeps_failed += 1);
                    retry_at = retry.failed(Instant::now());
                    pending = retry_at.is_some();
                    warn!(
                        runner = name,
                        error = %e,
                        attempt,
                        will_retry = pending,
                        "alert sweep failed"
                    );
                }
            }
        }

        let wake = match retry_at {
            Some(at) if pending => at.min(next_tick),
            _ => next_tick,
        };
        let wait = wake.saturating_duration_since(Instant::now()).min(POLL);
        match shutdown_rx.recv_timeout(wait) {
            Err(mpsc::RecvTimeoutError::Timeout) => {}
            // Shutdown requested, or the handle is gone.
            _ => break,
        }
    }

    info!(runner = name, "alert sweep runner stopped");
}

#[cfg(test)]
mod tests {
    use super::*;

    use stockwatch_alerts::{
        AlertCondition, NotificationDispatcher, NotificationResult, ProductRef, StaticRecipients,
    };
    use stockwatch_core::ProductId;
    use stockwatch_products::Product;

    use crate::mail::InMemoryTransport;
    use crate::repository::InMemoryProductRepository;

    fn fixed_clock() -> Clock {
        Arc::new(|| NaiveDate::from_ymd_opt(2024, 3, 15).unwrap())
    }

    fn wait_until(mut done: impl FnMut() -> bool) {
        let deadline = Instant::now() + Duration::from_secs(5);
        while !done() && Instant::now() < deadline {
            thread::sleep(Duration::from_millis(20));
        }
    }

    #[test]
    fn backoff_doubles_and_caps() {
        let base = Duration::from_millis(250);
        assert_eq!(backoff_delay(base, 1), Duration::from_millis(250));
        assert_eq!(backoff_delay(base, 2), Duration::from_millis(500));
        assert_eq!(backoff_delay(base, 3), Duration::from_millis(1000));
        assert_eq!(backoff_delay(base, 30), MAX_BACKOFF);
    }

    #[test]
    fn retry_policy_gives_up_then_starts_over() {
        let mut retry = RetryPolicy::new(2, Duration::from_millis(100));
        let now = Instant::now();

        assert_eq!(retry.failed(now), Some(now + Duration::from_millis(100)));
        assert_eq!(retry.failed(now), Some(now + Duration::from_millis(200)));
        assert_eq!(retry.failed(now), None);
        assert_eq!(retry.failed(now), Some(now + Duration::from_millis(100)));

        retry.succeeded();
        assert_eq!(retry.attempts, 0);
    }

    #[test]
    fn delayed_tick_keeps_cadence() {
        let start = Instant::now();
        let interval = Duration::from_secs(10);

        let next = next_tick_after(start, start + Duration::from_secs(25), interval);
        assert_eq!(next, start + Duration::from_secs(30));
    }

    #[test]
    fn stats_separate_delivery_failures_from_malformed_records() {
        let today = NaiveDate::from_ymd_opt(2024, 3, 15).unwrap();
        let valid = Product::new(ProductId::new(), "Milk", 1, 10).validate().unwrap();
        let condition = || AlertCondition::LowStock {
            product: ProductRef::from(&valid),
            current_quantity: 1,
        };

        let mut summary = AlertRunSummary::new(today, ExpiryWindow::default());
        summary.record(NotificationResult::delivered(condition()));
        summary.record(NotificationResult::failed(condition(), "connection reset"));
        summary.record_malformed(None, "record 3: missing field `quantity`");
        summary.record_malformed(Some(ProductId::new()), "quantity must be >= 0 (got -1)");

        let mut stats = RunnerStats::default();
        stats.absorb(&summary);

        assert_eq!(stats.sweeps_completed, 1);
        assert_eq!(stats.notifications_delivered, 1);
        assert_eq!(stats.delivery_failures, 1);
        assert_eq!(stats.malformed_products, 2);
    }

    #[test]
    fn sweeps_on_startup_and_on_trigger() {
        let repo = Arc::new(InMemoryProductRepository::with_products([Product::new(
            ProductId::new(),
            "Low",
            1,
            10,
        )]));
        let transport = Arc::new(InMemoryTransport::new());
        let dispatcher = NotificationDispatcher::new(
            transport.clone(),
            Arc::new(StaticRecipients::new(["staff@example.com"])),
        );
        let sweep = AlertSweep::new(repo, dispatcher);

        let runner = SweepRunner {
            interval: Duration::from_secs(3600),
            ..Default::default()
        };
        let handle = runner
            .spawn_with_clock("test-sweep-runner", sweep, fixed_clock())
            .unwrap();

        wait_until(|| handle.stats().sweeps_completed >= 1);
        handle.trigger();
        wait_until(|| handle.stats().sweeps_completed >= 2);

        let stats = handle.shutdown();

        assert_eq!(stats.sweeps_completed, 2);
        assert_eq!(stats.notifications_delivered, 2);
        assert_eq!(transport.sent().len(), 2);
    }

    #[test]
    fn unavailable_repository_is_retried() {
        let repo = Arc::new(InMemoryProductRepository::new());
        repo.set_offline(true);
        let dispatcher = NotificationDispatcher::new(
            Arc::new(InMemoryTransport::new()),
            Arc::new(StaticRecipients::new(["staff@example.com"])),
        );
        let sweep = AlertSweep::new(repo.clone(), dispatcher);

        let runner = SweepRunner {
            interval: Duration::from_secs(3600),
            base_backoff: Duration::from_millis(10),
            max_retries: 50,
            ..Default::default()
        };
        let handle = runner
            .spawn_with_clock("test-sweep-retry", sweep, fixed_clock())
            .unwrap();

        wait_until(|| handle.stats().sweeps_failed >= 2);
        repo.set_offline(false);
        wait_until(|| handle.stats().sweeps_completed >= 1);

        let stats = handle.shutdown();

        assert!(stats.sweeps_failed >= 2);
        assert_eq!(stats.sweeps_completed, 1);
    }
}
