pub mod adapters;
pub mod config;
pub mod core;
pub mod domain;
pub mod server;
pub mod utils;

#[cfg(feature = "cli")]
pub use config::cli::CliArgs;
pub use config::AppConfig;

pub use adapters::store::SqliteRecordStore;
pub use core::{ExpiryResolver, NotificationSweeper};
pub use domain::model::{ExpiryResolution, Source};
pub use utils::error::{Result, TrackerError};
