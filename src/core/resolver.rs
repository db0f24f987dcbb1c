use crate::domain::model::{ExpiryRecord, ExpiryResolution, Source};
use crate::domain::ports::{Clock, ExpiryOracle, ImageFinder, RecordStore, SystemClock};
use crate::utils::error::{Result, TrackerError};
use regex::Regex;
use std::sync::{Arc, LazyLock};

static FIRST_INTEGER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\d+").expect("static pattern compiles"));

/// First run of digits in the oracle's answer, read as days.
///
/// `"14 days"` gives `Some(14)`; `"approximately two weeks"` gives `None`.
pub fn parse_duration_days(text: &str) -> Option<i64> {
    FIRST_INTEGER
        .find(text)
        .and_then(|m| m.as_str().parse::<i64>().ok())
}

enum Lookup {
    Found(ExpiryRecord, Source),
    Unavailable,
}

/// Cache-first expiry lookup with an oracle fallback and concurrent image
/// enrichment.
pub struct ExpiryResolver<S: RecordStore> {
    store: Arc<S>,
    oracle: Arc<dyn ExpiryOracle>,
    images: Arc<dyn ImageFinder>,
    clock: Arc<dyn Clock>,
}

impl<S: RecordStore> ExpiryResolver<S> {
    pub fn new(store: Arc<S>, oracle: Arc<dyn ExpiryOracle>, images: Arc<dyn ImageFinder>) -> Self {
        Self {
            store,
            oracle,
            images,
            clock: Arc::new(SystemClock),
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    /// Resolves one product name.
    ///
    /// The image lookup runs alongside the store/oracle path and is always
    /// awaited before returning; it never changes `source`. Degradable oracle
    /// failures become an "Unavailable" answer. Store failures and
    /// non-degradable oracle errors are returned.
    pub async fn resolve_expiry(&self, product_name: &str) -> Result<ExpiryResolution> {
        let (lookup, image_url) = tokio::join!(
            self.lookup_or_estimate(product_name),
            self.images.find_image(product_name)
        );

        let resolution = match lookup? {
            Lookup::Found(record, source) => ExpiryResolution::from_record(record, source, image_url),
            Lookup::Unavailable => ExpiryResolution::unavailable(product_name, image_url),
        };

        tracing::info!(
            "Resolved {} via {:?} (days: {:?}, image: {})",
            product_name,
            resolution.source,
            resolution.expiry_days,
            resolution.image_url.is_some()
        );
        Ok(resolution)
    }

    async fn lookup_or_estimate(&self, product_name: &str) -> Result<Lookup> {
        if let Some(record) = self.store.get(product_name).await? {
            tracing::debug!("Cache hit for {}", product_name);
            return Ok(Lookup::Found(record, Source::Cache));
        }

        let text = match self.oracle.estimate(product_name).await {
            Ok(text) => text,
            Err(e) if e.is_degradable() => {
                tracing::warn!("Oracle failed for {}: {}", product_name, e);
                return Ok(Lookup::Unavailable);
            }
            Err(e) => return Err(e),
        };

        let days = parse_duration_days(&text);
        if days.is_none() {
            tracing::warn!("No day count in oracle answer {:?} for {}", text, product_name);
        }

        let record = ExpiryRecord::new(product_name, text, days, self.clock.today());
        match self.store.put(&record).await {
            Ok(()) => Ok(Lookup::Found(record, Source::Oracle)),
            Err(TrackerError::DuplicateKey { .. }) => {
                // Another resolution stored this name first; theirs is canonical.
                tracing::debug!("Lost insert race for {}, re-reading", product_name);
                let existing = self.store.get(product_name).await?.ok_or_else(|| {
                    TrackerError::InternalError {
                        message: format!("record for {} vanished after conflict", product_name),
                    }
                })?;
                Ok(Lookup::Found(existing, Source::Oracle))
            }
            Err(e) => Err(e),
        }
    }
}
