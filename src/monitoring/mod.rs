pub mod aggregator;
pub mod models;
pub mod probe;
pub mod scheduler;
pub mod status;
pub mod streak;

pub use aggregator::{OverallStatus, group_display_status, overall_status, service_display_status};
pub use scheduler::{HealthCheckScheduler, SchedulerConfig, ShardAssignment};
pub use status::Status;
