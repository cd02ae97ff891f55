//! Repeating refresh timer driving the fetch→metrics→render chain.
//!
//! Explicit three-state machine (`Stopped`/`Running`/`Paused`) instead of a
//! bare interval with ad hoc pause flags. Pausing follows the host's
//! visibility signal: a hidden page stops ticking, and becoming visible again
//! resumes with one immediate tick so the dashboard is never a full interval
//! stale.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use futures::future::BoxFuture;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{MissedTickBehavior, interval};
use tracing::{debug, info};

/// Scheduler lifecycle state, observable via [`RefreshScheduler::watch_state`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerState {
    Stopped,
    Running,
    Paused,
}

/// The work fired on each tick. Must be idempotent: a stale cycle's render is
/// fully overwritten by the next one.
pub type CycleFn = Arc<dyn Fn() -> BoxFuture<'static, ()> + Send + Sync>;

pub struct RefreshScheduler {
    period: Duration,
    visibility: watch::Receiver<bool>,
    auto_refresh: Arc<AtomicBool>,
    state_tx: watch::Sender<SchedulerState>,
    task: Option<JoinHandle<()>>,
}

impl RefreshScheduler {
    /// `visibility` carries the host page's visible/hidden signal; `period` is
    /// a configuration parameter (observed range 5s-5min across dashboards).
    pub fn new(period: Duration, visibility: watch::Receiver<bool>) -> Self {
        let (state_tx, _rx) = watch::channel(SchedulerState::Stopped);
        Self {
            period,
            visibility,
            auto_refresh: Arc::new(AtomicBool::new(true)),
            state_tx,
            task: None,
        }
    }

    pub fn state(&self) -> SchedulerState {
        *self.state_tx.borrow()
    }

    pub fn watch_state(&self) -> watch::Receiver<SchedulerState> {
        self.state_tx.subscribe()
    }

    /// User toggle for auto-refresh; toggling off stops the scheduler and a
    /// later visibility change must not resurrect it.
    pub fn set_auto_refresh(&mut self, enabled: bool) {
        self.auto_refresh.store(enabled, Ordering::SeqCst);
        if !enabled {
            self.stop();
        }
    }

    /// Start ticking. Idempotent: any pre-existing loop is torn down first, so
    /// starting twice never creates two timers.
    pub fn start(&mut self, cycle: CycleFn) {
        self.abort_task();

        let period = self.period;
        let mut visibility = self.visibility.clone();
        let auto_refresh = Arc::clone(&self.auto_refresh);
        let state_tx = self.state_tx.clone();
        let in_flight = Arc::new(AtomicBool::new(false));

        let initial = if *visibility.borrow() {
            SchedulerState::Running
        } else {
            SchedulerState::Paused
        };
        let _ = state_tx.send(initial);
        info!(?period, ?initial, "refresh scheduler started");

        self.task = Some(tokio::spawn(async move {
            let mut ticker = interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        if *state_tx.borrow() == SchedulerState::Running {
                            fire(&cycle, &in_flight);
                        }
                    }
                    changed = visibility.changed() => {
                        if changed.is_err() {
                            // Visibility source dropped with the host page.
                            break;
                        }
                        let visible = *visibility.borrow();
                        let current = *state_tx.borrow();
                        match (visible, current) {
                            (false, SchedulerState::Running) => {
                                debug!("page hidden, pausing refresh");
                                let _ = state_tx.send(SchedulerState::Paused);
                            }
                            (true, SchedulerState::Paused)
                                if auto_refresh.load(Ordering::SeqCst) =>
                            {
                                debug!("page visible, resuming refresh");
                                let _ = state_tx.send(SchedulerState::Running);
                                ticker.reset();
                                fire(&cycle, &in_flight);
                            }
                            _ => {}
                        }
                    }
                }
            }
        }));
    }

    /// Stop ticking and mark `Stopped`. Safe to call repeatedly.
    pub fn stop(&mut self) {
        self.abort_task();
        let _ = self.state_tx.send(SchedulerState::Stopped);
    }

    fn abort_task(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

impl Drop for RefreshScheduler {
    fn drop(&mut self) {
        self.abort_task();
    }
}

/// Launch one cycle unless the previous one is still in flight.
///
/// The guard keeps ticks from overlapping without blocking the loop from
/// observing visibility changes while a cycle runs.
fn fire(cycle: &CycleFn, in_flight: &Arc<AtomicBool>) {
    if in_flight.swap(true, Ordering::SeqCst) {
        debug!("previous cycle still in flight, skipping tick");
        return;
    }
    let work = cycle();
    let in_flight = Arc::clone(in_flight);
    tokio::spawn(async move {
        work.await;
        in_flight.store(false, Ordering::SeqCst);
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::FutureExt;
    use std::sync::atomic::AtomicUsize;

    const PERIOD: Duration = Duration::from_secs(30);

    fn counting_cycle() -> (CycleFn, Arc<AtomicUsize>) {
        let count = Arc::new(AtomicUsize::new(0));
        let count_in_cycle = Arc::clone(&count);
        let cycle: CycleFn = Arc::new(move || {
            let count = Arc::clone(&count_in_cycle);
            async move {
                count.fetch_add(1, Ordering::SeqCst);
            }
            .boxed()
        });
        (cycle, count)
    }

    async fn settle() {
        // Let spawned cycle tasks run to completion on the paused runtime.
        for _ in 0..8 {
            tokio::task::yield_now().await;
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_running_scheduler_ticks_on_interval() {
        let (_vis_tx, vis_rx) = watch::channel(true);
        let mut scheduler = RefreshScheduler::new(PERIOD, vis_rx);
        let (cycle, count) = counting_cycle();

        scheduler.start(cycle);
        settle().await;
        // The interval's first tick fires immediately.
        assert_eq!(count.load(Ordering::SeqCst), 1);
        assert_eq!(scheduler.state(), SchedulerState::Running);

        tokio::time::sleep(PERIOD).await;
        settle().await;
        tokio::time::sleep(PERIOD).await;
        settle().await;
        assert_eq!(count.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_start_twice_creates_one_timer() {
        let (_vis_tx, vis_rx) = watch::channel(true);
        let mut scheduler = RefreshScheduler::new(PERIOD, vis_rx);
        let (cycle, count) = counting_cycle();

        scheduler.start(Arc::clone(&cycle));
        settle().await;
        scheduler.start(cycle);
        settle().await;

        tokio::time::sleep(PERIOD * 2).await;
        settle().await;
        // Two immediate first ticks (one per start) plus two interval ticks
        // from the single surviving timer; a duplicated timer would double the
        // interval ticks.
        assert_eq!(count.load(Ordering::SeqCst), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn test_visibility_pause_and_resume_with_immediate_tick() {
        let (vis_tx, vis_rx) = watch::channel(true);
        let mut scheduler = RefreshScheduler::new(PERIOD, vis_rx);
        let (cycle, count) = counting_cycle();

        scheduler.start(cycle);
        settle().await;
        assert_eq!(count.load(Ordering::SeqCst), 1);

        vis_tx.send(false).unwrap();
        settle().await;
        assert_eq!(scheduler.state(), SchedulerState::Paused);

        // Hidden: intervals elapse without firing.
        tokio::time::sleep(PERIOD * 3).await;
        settle().await;
        assert_eq!(count.load(Ordering::SeqCst), 1);

        // Visible again: back to Running with one immediate tick.
        vis_tx.send(true).unwrap();
        settle().await;
        assert_eq!(scheduler.state(), SchedulerState::Running);
        assert_eq!(count.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_auto_refresh_off_stays_stopped() {
        let (vis_tx, vis_rx) = watch::channel(true);
        let mut scheduler = RefreshScheduler::new(PERIOD, vis_rx);
        let (cycle, count) = counting_cycle();

        scheduler.start(cycle);
        settle().await;
        scheduler.set_auto_refresh(false);
        assert_eq!(scheduler.state(), SchedulerState::Stopped);

        vis_tx.send(false).unwrap();
        vis_tx.send(true).unwrap();
        tokio::time::sleep(PERIOD * 2).await;
        settle().await;
        assert_eq!(count.load(Ordering::SeqCst), 1);
        assert_eq!(scheduler.state(), SchedulerState::Stopped);
    }

    #[tokio::test(start_paused = true)]
    async fn test_in_flight_cycle_skips_overlapping_tick() {
        let (_vis_tx, vis_rx) = watch::channel(true);
        let mut scheduler = RefreshScheduler::new(PERIOD, vis_rx);

        let count = Arc::new(AtomicUsize::new(0));
        let count_in_cycle = Arc::clone(&count);
        // Each cycle outlives one full interval.
        let cycle: CycleFn = Arc::new(move || {
            let count = Arc::clone(&count_in_cycle);
            async move {
                tokio::time::sleep(PERIOD + PERIOD / 2).await;
                count.fetch_add(1, Ordering::SeqCst);
            }
            .boxed()
        });

        scheduler.start(cycle);
        settle().await;

        tokio::time::sleep(PERIOD * 4).await;
        settle().await;
        // Without the guard this would approach 4 completions.
        assert!(count.load(Ordering::SeqCst) <= 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_halts_ticks() {
        let (_vis_tx, vis_rx) = watch::channel(true);
        let mut scheduler = RefreshScheduler::new(PERIOD, vis_rx);
        let (cycle, count) = counting_cycle();

        scheduler.start(cycle);
        settle().await;
        scheduler.stop();
        assert_eq!(scheduler.state(), SchedulerState::Stopped);

        tokio::time::sleep(PERIOD * 3).await;
        settle().await;
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }
}
