use crate::dto::leaderboard_dto::SchedulerStatusResponse;
use crate::error::Result;
use crate::services::profile_service::ProfileService;
use crate::services::rank_service::RankService;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::Notify;

#[async_trait]
pub trait LeaderboardJob: Send + Sync + 'static {
    async fn run(&self) -> Result<()>;
}

/// The periodic consistency backstop: refresh every profile's aggregates,
/// then rebuild the rank table.
pub struct LeaderboardRefreshJob {
    profiles: ProfileService,
    ranks: RankService,
}

impl LeaderboardRefreshJob {
    pub fn new(profiles: ProfileService, ranks: RankService) -> Self {
        Self { profiles, ranks }
    }
}

#[async_trait]
impl LeaderboardJob for LeaderboardRefreshJob {
    async fn run(&self) -> Result<()> {
        let updated = self.profiles.refresh_all().await?;
        let ranked = self.ranks.recompute_all().await?;
        tracing::info!(
            profiles_updated = updated,
            profiles_ranked = ranked,
            "leaderboard refresh complete"
        );
        Ok(())
    }
}

struct SchedulerInner {
    running: AtomicBool,
    job_in_flight: AtomicBool,
    // Replaced on every start so a stop permit aimed at an old loop can
    // never cancel a newly started one.
    stop: Mutex<Arc<Notify>>,
    next_fire: Mutex<Option<DateTime<Utc>>>,
}

/// Interval-driven leaderboard refresher. Owns its timer task; `start` and
/// `stop` are idempotent, and a firing that lands while the previous job is
/// still executing is skipped outright rather than queued.
#[derive(Clone)]
pub struct LeaderboardScheduler {
    job: Arc<dyn LeaderboardJob>,
    interval: Duration,
    inner: Arc<SchedulerInner>,
}

impl LeaderboardScheduler {
    pub fn new(job: Arc<dyn LeaderboardJob>, interval: Duration) -> Self {
        Self {
            job,
            interval,
            inner: Arc::new(SchedulerInner {
                running: AtomicBool::new(false),
                job_in_flight: AtomicBool::new(false),
                stop: Mutex::new(Arc::new(Notify::new())),
                next_fire: Mutex::new(None),
            }),
        }
    }

    pub fn start(&self) {
        if self.inner.running.swap(true, Ordering::SeqCst) {
            tracing::info!("leaderboard scheduler already running, skipping start");
            return;
        }

        let stop = Arc::new(Notify::new());
        *self.inner.stop.lock().expect("stop lock poisoned") = stop.clone();

        let scheduler = self.clone();
        tokio::spawn(async move { scheduler.run_loop(stop).await });
        tracing::info!(
            interval_secs = self.interval.as_secs(),
            "leaderboard scheduler started"
        );
    }

    pub fn stop(&self) {
        if !self.inner.running.swap(false, Ordering::SeqCst) {
            tracing::info!("leaderboard scheduler is not running");
            return;
        }

        // Wakes the loop immediately if it is waiting on the timer; an
        // in-flight job finishes on its own.
        self.inner
            .stop
            .lock()
            .expect("stop lock poisoned")
            .notify_one();
        tracing::info!("leaderboard scheduler stopped");
    }

    pub fn status(&self) -> SchedulerStatusResponse {
        let running = self.inner.running.load(Ordering::SeqCst);
        let next_fire_time = if running {
            *self.inner.next_fire.lock().expect("next_fire lock poisoned")
        } else {
            None
        };

        SchedulerStatusResponse {
            status: if running { "running" } else { "stopped" }.to_string(),
            next_fire_time,
        }
    }

    async fn run_loop(&self, stop: Arc<Notify>) {
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        // The first tick of a tokio interval completes immediately; consume
        // it so the first firing happens one full interval after start.
        ticker.tick().await;

        loop {
            self.set_next_fire(Some(Utc::now() + chrono_interval(self.interval)));

            tokio::select! {
                _ = ticker.tick() => {}
                _ = stop.notified() => break,
            }
            if !self.inner.running.load(Ordering::SeqCst) {
                break;
            }

            self.spawn_firing();
        }

        // A restarted loop owns next_fire now; only clear it when stopped.
        if !self.inner.running.load(Ordering::SeqCst) {
            self.set_next_fire(None);
        }
    }

    /// Runs the job in its own task so the timer keeps ticking; the
    /// in-flight flag drops any firing that overlaps the previous one.
    fn spawn_firing(&self) {
        if self
            .inner
            .job_in_flight
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            tracing::warn!("previous leaderboard job still running, skipping this firing");
            return;
        }

        let scheduler = self.clone();
        tokio::spawn(async move {
            tracing::info!("starting scheduled leaderboard update");
            if let Err(e) = scheduler.job.run().await {
                tracing::error!(error = ?e, "scheduled leaderboard update failed");
            }
            scheduler.inner.job_in_flight.store(false, Ordering::SeqCst);
        });
    }

    fn set_next_fire(&self, value: Option<DateTime<Utc>>) {
        *self.inner.next_fire.lock().expect("next_fire lock poisoned") = value;
    }
}

fn chrono_interval(interval: Duration) -> chrono::Duration {
    chrono::Duration::from_std(interval).unwrap_or_else(|_| chrono::Duration::seconds(300))
}
