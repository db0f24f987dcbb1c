use crate::core::sweeper::NotificationSweeper;
use crate::domain::model::SweepReport;
use crate::domain::ports::RecordStore;
use chrono::{
    DateTime, Duration as ChronoDuration, Local, NaiveDate, NaiveDateTime, NaiveTime, TimeZone,
};
use std::sync::Arc;
use tokio::task::JoinHandle;

/// Fires once a day at a fixed local wall-clock time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DailySchedule {
    pub at: NaiveTime,
}

impl DailySchedule {
    pub fn new(at: NaiveTime) -> Self {
        Self { at }
    }

    /// Next firing strictly after `now`, in naive local time.
    pub fn next_naive_after(&self, now: NaiveDateTime) -> NaiveDateTime {
        let today = now.date().and_time(self.at);
        if today > now {
            today
        } else {
            today + ChronoDuration::days(1)
        }
    }

    pub fn next_after(&self, now: DateTime<Local>) -> DateTime<Local> {
        let naive = self.next_naive_after(now.naive_local());
        match Local.from_local_datetime(&naive).earliest() {
            Some(next) => next,
            // Wall-clock time skipped by a DST jump; fire just after the gap.
            None => Local
                .from_local_datetime(&(naive + ChronoDuration::hours(1)))
                .earliest()
                .unwrap_or_else(|| now + ChronoDuration::days(1)),
        }
    }

    pub fn until_next(&self, now: DateTime<Local>) -> std::time::Duration {
        (self.next_after(now) - now)
            .to_std()
            .unwrap_or(std::time::Duration::ZERO)
    }
}

/// Runs the sweep at every firing of `schedule` until the task is aborted.
pub fn spawn_daily_sweep<S>(
    sweeper: Arc<NotificationSweeper<S>>,
    schedule: DailySchedule,
) -> JoinHandle<()>
where
    S: RecordStore + 'static,
{
    tokio::spawn(async move {
        loop {
            let wait = schedule.until_next(Local::now());
            tracing::info!(
                "⏰ Next expiry sweep in {}m (at {})",
                wait.as_secs() / 60,
                schedule.at.format("%H:%M")
            );
            tokio::time::sleep(wait).await;

            sweep_and_log(&sweeper, Local::now().date_naive()).await;
        }
    })
}

/// Runs one sweep and logs its outcome. A failed sweep is logged, not
/// propagated, so callers keep serving and the next firing retries.
pub async fn sweep_and_log<S: RecordStore>(
    sweeper: &NotificationSweeper<S>,
    today: NaiveDate,
) -> Option<SweepReport> {
    match sweeper.run(today).await {
        Ok(report) => {
            if !report.skipped {
                tracing::info!(
                    "✅ Sweep done: {} products, {} delivered, {} failed",
                    report.matched_records,
                    report.delivered,
                    report.failed
                );
            }
            Some(report)
        }
        Err(e) => {
            tracing::error!("❌ Expiry sweep failed: {}", e);
            None
        }
    }
}
