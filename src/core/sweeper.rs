//! Daily "expires tomorrow" sweep.
//!
//! A sweep reads records whose expiry date is tomorrow and sends one alert
//! per record and target. Each dispatch stands alone: a failing target is
//! counted and logged, the rest still go out.

use crate::domain::model::{ExpiryAlert, NotificationTarget, SweepReport};
use crate::domain::ports::{NotificationSink, RecordStore};
use crate::utils::error::{Result, TrackerError};
use chrono::NaiveDate;
use std::sync::Arc;
use tokio::sync::Mutex;

#[derive(Debug, Default)]
struct SweepState {
    last_target: Option<NaiveDate>,
}

pub struct NotificationSweeper<S: RecordStore> {
    store: Arc<S>,
    targets: Vec<NotificationTarget>,
    sinks: Vec<Arc<dyn NotificationSink>>,
    // Held for the whole run; `try_lock` failure means a sweep is in flight.
    state: Mutex<SweepState>,
}

impl<S: RecordStore> NotificationSweeper<S> {
    pub fn new(
        store: Arc<S>,
        targets: Vec<NotificationTarget>,
        sinks: Vec<Arc<dyn NotificationSink>>,
    ) -> Self {
        Self {
            store,
            targets,
            sinks,
            state: Mutex::new(SweepState::default()),
        }
    }

    pub fn targets(&self) -> &[NotificationTarget] {
        &self.targets
    }

    /// Runs one sweep for records expiring the day after `today`.
    ///
    /// Skips (without side effects) when another sweep is running or when the
    /// same target date was already swept. Only a store failure is an error;
    /// the target date is then left unswept so a later firing can retry.
    pub async fn run(&self, today: NaiveDate) -> Result<SweepReport> {
        let Ok(mut state) = self.state.try_lock() else {
            tracing::warn!("Expiry sweep already running, skipping this firing");
            return Ok(SweepReport {
                skipped: true,
                ..SweepReport::default()
            });
        };

        let target_date = today.succ_opt().ok_or_else(|| TrackerError::InternalError {
            message: format!("no calendar day after {}", today),
        })?;

        if state.last_target == Some(target_date) {
            tracing::info!("Expiry sweep for {} already done, skipping", target_date);
            return Ok(SweepReport {
                target_date: Some(target_date),
                skipped: true,
                ..SweepReport::default()
            });
        }

        let records = self.store.query_by_expiry_date(target_date).await?;
        let mut report = SweepReport {
            target_date: Some(target_date),
            matched_records: records.len(),
            ..SweepReport::default()
        };

        if records.is_empty() {
            tracing::info!("No products expire on {}", target_date);
        }

        for record in records {
            let Some(expiry_date) = record.expiry_date else {
                continue;
            };
            let alert = ExpiryAlert {
                product_name: record.name,
                expiry_date,
            };

            for target in &self.targets {
                match self.dispatch(target, &alert).await {
                    Ok(()) => report.delivered += 1,
                    Err(e) => {
                        if e.is_degradable() {
                            tracing::warn!("{}", e);
                        } else {
                            tracing::error!(
                                "❌ Unexpected dispatch error for {}: {}",
                                target.label(),
                                e
                            );
                        }
                        report.failed += 1;
                    }
                }
            }
        }

        state.last_target = Some(target_date);
        tracing::info!(
            "Expiry sweep for {} finished: {} products, {} alerts sent, {} failed",
            target_date,
            report.matched_records,
            report.delivered,
            report.failed
        );
        Ok(report)
    }

    async fn dispatch(&self, target: &NotificationTarget, alert: &ExpiryAlert) -> Result<()> {
        let sink = self
            .sinks
            .iter()
            .find(|sink| sink.accepts(target))
            .ok_or_else(|| TrackerError::DispatchFailure {
                target: target.label(),
                message: "no notification sink configured for this target".to_string(),
            })?;

        sink.deliver(target, alert).await
    }
}
