use crate::domain::model::{ExpiryAlert, ExpiryRecord, NotificationTarget};
use crate::utils::error::Result;
use async_trait::async_trait;
use chrono::NaiveDate;

/// Durable product-name → record mapping.
///
/// `put` must be atomic on the name: of several concurrent puts for one name
/// exactly one succeeds and the rest fail with `TrackerError::DuplicateKey`.
pub trait RecordStore: Send + Sync {
    fn get(
        &self,
        name: &str,
    ) -> impl std::future::Future<Output = Result<Option<ExpiryRecord>>> + Send;
    fn put(&self, record: &ExpiryRecord) -> impl std::future::Future<Output = Result<()>> + Send;
    fn query_by_expiry_date(
        &self,
        date: NaiveDate,
    ) -> impl std::future::Future<Output = Result<Vec<ExpiryRecord>>> + Send;
}

/// External text-generation service that guesses a shelf life.
#[async_trait]
pub trait ExpiryOracle: Send + Sync {
    /// Raw, untrusted estimate text. Every failure is `OracleUnavailable`.
    async fn estimate(&self, product_name: &str) -> Result<String>;
}

/// Best-effort illustrative image lookup. Never fails, only comes back empty.
#[async_trait]
pub trait ImageFinder: Send + Sync {
    async fn find_image(&self, product_name: &str) -> Option<String>;
}

#[async_trait]
pub trait BrowserLauncher: Send + Sync {
    async fn launch(&self) -> Result<Box<dyn BrowserSession>>;
}

/// A live browser session. Callers must `close` it on every path.
#[async_trait]
pub trait BrowserSession: Send {
    async fn goto(&mut self, url: &str) -> Result<()>;
    /// `src` attributes of every `<img>` currently rendered.
    async fn image_sources(&mut self) -> Result<Vec<String>>;
    async fn close(self: Box<Self>) -> Result<()>;
}

#[async_trait]
pub trait NotificationSink: Send + Sync {
    fn accepts(&self, target: &NotificationTarget) -> bool;
    async fn deliver(&self, target: &NotificationTarget, alert: &ExpiryAlert) -> Result<()>;
}

pub trait Clock: Send + Sync {
    fn today(&self) -> NaiveDate;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn today(&self) -> NaiveDate {
        chrono::Local::now().date_naive()
    }
}
