use std::future::Future;
use std::time::Duration as StdDuration;

use chrono::{DateTime, Duration, NaiveTime, Utc};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time;
use tracing::debug;

/// Next occurrence of `hour:00` UTC strictly after `from`.
pub fn next_daily_run(from: DateTime<Utc>, hour: u8) -> DateTime<Utc> {
    let target = NaiveTime::from_hms_opt(u32::from(hour.min(23)), 0, 0).unwrap_or(NaiveTime::MIN);

    let today = from.date_naive().and_time(target).and_utc();
    if from < today {
        today
    } else {
        (from.date_naive() + Duration::days(1)).and_time(target).and_utc()
    }
}

/// Run `job` once per day at `hour:00` UTC until the shutdown signal flips.
pub fn spawn_daily<F, Fut>(
    name: &'static str,
    hour: u8,
    mut shutdown: watch::Receiver<bool>,
    job: F,
) -> JoinHandle<()>
where
    F: Fn() -> Fut + Send + 'static,
    Fut: Future<Output = ()> + Send,
{
    tokio::spawn(async move {
        loop {
            let next = next_daily_run(Utc::now(), hour);
            let wait = (next - Utc::now()).to_std().unwrap_or(StdDuration::ZERO);
            debug!(job = name, next_run = %next, "daily job scheduled");

            tokio::select! {
                _ = time::sleep(wait) => job().await,
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
            }
        }
        debug!(job = name, "daily job stopped");
    })
}

/// Run `job` on a fixed period until the shutdown signal flips. The first
/// run happens one full period after spawn.
pub fn spawn_interval<F, Fut>(
    name: &'static str,
    period: StdDuration,
    mut shutdown: watch::Receiver<bool>,
    job: F,
) -> JoinHandle<()>
where
    F: Fn() -> Fut + Send + 'static,
    Fut: Future<Output = ()> + Send,
{
    tokio::spawn(async move {
        let mut ticker = time::interval(period);
        // A tokio interval yields immediately; consume that so the first
        // real run lands one period out.
        ticker.tick().await;

        loop {
            tokio::select! {
                _ = ticker.tick() => job().await,
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
            }
        }
        debug!(job = name, "interval job stopped");
    })
}
