use async_trait::async_trait;

pub mod models;
pub mod senders;
pub mod service;

pub use models::NotificationKind;
pub use service::{NotificationError, NotificationService};

/// Receiver of scheduler alerts. Called at most once per escalation and once
/// per restoration, never per tick.
#[async_trait]
pub trait NotificationSink: Send + Sync {
    async fn notify(
        &self,
        kind: NotificationKind,
        title: &str,
        message: &str,
    ) -> Result<(), NotificationError>;
}
