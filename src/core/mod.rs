pub mod resolver;
pub mod schedule;
pub mod sweeper;

pub use resolver::ExpiryResolver;
pub use schedule::{spawn_daily_sweep, sweep_and_log, DailySchedule};
pub use sweeper::NotificationSweeper;
