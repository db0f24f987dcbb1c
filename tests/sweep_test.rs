use async_trait::async_trait;
use chrono::NaiveDate;
use grocery_expiry::domain::model::{ExpiryAlert, ExpiryRecord, NotificationTarget};
use grocery_expiry::domain::ports::{NotificationSink, RecordStore};
use grocery_expiry::{NotificationSweeper, Result, SqliteRecordStore, TrackerError};
use std::sync::{Arc, Mutex};
use tempfile::TempDir;

#[derive(Default)]
struct Outbox {
    sent: Mutex<Vec<String>>,
    refuse: Vec<String>,
}

#[async_trait]
impl NotificationSink for Outbox {
    fn accepts(&self, target: &NotificationTarget) -> bool {
        matches!(target, NotificationTarget::Email(_))
    }

    async fn deliver(&self, target: &NotificationTarget, alert: &ExpiryAlert) -> Result<()> {
        let label = target.label();
        if self.refuse.contains(&label) {
            return Err(TrackerError::DispatchFailure {
                target: label,
                message: "550 mailbox unavailable".to_string(),
            });
        }
        self.sent
            .lock()
            .unwrap()
            .push(format!("{} -> {}", alert.subject(), label));
        Ok(())
    }
}

fn day(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

#[tokio::test]
async fn test_sweep_against_file_backed_store() {
    let temp_dir = TempDir::new().unwrap();
    let db_path = temp_dir.path().join("expiry.db");
    let today = day(2024, 12, 31);

    {
        let store = SqliteRecordStore::open(&db_path).await.unwrap();
        store
            .put(&ExpiryRecord::new("Eggs", "1 day", Some(1), today))
            .await
            .unwrap();
        store
            .put(&ExpiryRecord::new("Rice", "about 10 days", Some(10), today))
            .await
            .unwrap();
        store
            .put(&ExpiryRecord::new("Honey", "practically forever", None, today))
            .await
            .unwrap();
    }

    // Reopen to make sure the records survived on disk.
    let store = Arc::new(SqliteRecordStore::open(&db_path).await.unwrap());
    let outbox = Arc::new(Outbox {
        refuse: vec!["email:bounce@example.com".to_string()],
        ..Outbox::default()
    });
    let sweeper = NotificationSweeper::new(
        store,
        vec![
            NotificationTarget::Email("bounce@example.com".to_string()),
            NotificationTarget::Email("carol@example.com".to_string()),
        ],
        vec![outbox.clone() as Arc<dyn NotificationSink>],
    );

    let report = sweeper.run(today).await.unwrap();

    assert_eq!(report.target_date, Some(day(2025, 1, 1)));
    assert_eq!(report.matched_records, 1);
    assert_eq!(report.delivered, 1);
    assert_eq!(report.failed, 1);
    assert_eq!(
        outbox.sent.lock().unwrap().clone(),
        vec!["Eggs expires tomorrow -> email:carol@example.com".to_string()]
    );
}
