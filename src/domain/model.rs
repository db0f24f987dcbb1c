use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Placeholder estimate reported when the oracle could not answer.
pub const UNAVAILABLE_ESTIMATE: &str = "Unavailable";

/// One resolved product, keyed by its (case-sensitive) name.
///
/// `expiry_date` is `created_on + expiry_days` whenever `expiry_days` parsed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExpiryRecord {
    pub name: String,
    pub expiry_info: String,
    pub expiry_days: Option<i64>,
    pub expiry_date: Option<NaiveDate>,
    pub created_on: NaiveDate,
}

impl ExpiryRecord {
    pub fn new(
        name: impl Into<String>,
        expiry_info: impl Into<String>,
        expiry_days: Option<i64>,
        created_on: NaiveDate,
    ) -> Self {
        let expiry_date = expiry_days
            .and_then(|days| u64::try_from(days).ok())
            .and_then(|days| created_on.checked_add_days(chrono::Days::new(days)));

        Self {
            name: name.into(),
            expiry_info: expiry_info.into(),
            // A duration we cannot turn into a date is treated as unparsed.
            expiry_days: expiry_date.and(expiry_days),
            expiry_date,
            created_on,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Source {
    Cache,
    Oracle,
    Error,
}

/// Answer for a single `resolve_expiry` call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExpiryResolution {
    pub product_name: String,
    pub expiry_info: String,
    #[serde(rename = "expiryDurationDays")]
    pub expiry_days: Option<i64>,
    pub expiry_date: Option<NaiveDate>,
    pub image_url: Option<String>,
    pub source: Source,
}

impl ExpiryResolution {
    pub fn from_record(record: ExpiryRecord, source: Source, image_url: Option<String>) -> Self {
        Self {
            product_name: record.name,
            expiry_info: record.expiry_info,
            expiry_days: record.expiry_days,
            expiry_date: record.expiry_date,
            image_url,
            source,
        }
    }

    pub fn unavailable(product_name: impl Into<String>, image_url: Option<String>) -> Self {
        Self {
            product_name: product_name.into(),
            expiry_info: UNAVAILABLE_ESTIMATE.to_string(),
            expiry_days: None,
            expiry_date: None,
            image_url,
            source: Source::Error,
        }
    }
}

/// Browser push subscription as serialized by `PushSubscription.toJSON()`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PushSubscription {
    pub endpoint: String,
    pub keys: PushKeys,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PushKeys {
    pub p256dh: String,
    pub auth: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NotificationTarget {
    Email(String),
    Push(PushSubscription),
}

impl NotificationTarget {
    /// Short label for logs; never includes push key material.
    pub fn label(&self) -> String {
        match self {
            NotificationTarget::Email(address) => format!("email:{}", address),
            NotificationTarget::Push(sub) => {
                let host = url::Url::parse(&sub.endpoint)
                    .ok()
                    .and_then(|u| u.host_str().map(str::to_string))
                    .unwrap_or_else(|| "unknown".to_string());
                format!("push:{}", host)
            }
        }
    }
}

/// Content of a single "expires tomorrow" alert.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExpiryAlert {
    pub product_name: String,
    pub expiry_date: NaiveDate,
}

impl ExpiryAlert {
    pub fn subject(&self) -> String {
        format!("{} expires tomorrow", self.product_name)
    }

    pub fn body(&self) -> String {
        format!(
            "Heads up: your {} expires on {}. Use it today or tomorrow!",
            self.product_name,
            self.expiry_date.format("%Y-%m-%d")
        )
    }
}

/// Outcome of one sweep run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SweepReport {
    pub target_date: Option<NaiveDate>,
    pub matched_records: usize,
    pub delivered: usize,
    pub failed: usize,
    pub skipped: bool,
}
