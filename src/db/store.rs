//! Persistence seams consumed by the scheduler, the aggregator and the web
//! layer.

use async_trait::async_trait;
use sea_orm::DbErr;
use thiserror::Error;

use crate::monitoring::models::{Incident, MonitoredService, ProbeResult, ServiceGroup, ServiceId};
use crate::monitoring::status::Status;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] DbErr),
    #[error("Service not found: {0}")]
    ServiceNotFound(ServiceId),
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("Seed data error: {0}")]
    Seed(String),
}

/// Read access to monitored services plus the two write-backs the scheduler
/// performs.
#[async_trait]
pub trait ServiceStore: Send + Sync {
    async fn list_services(&self) -> Result<Vec<MonitoredService>, StoreError>;

    async fn get_service(&self, id: ServiceId) -> Result<Option<MonitoredService>, StoreError>;

    async fn list_groups(&self) -> Result<Vec<ServiceGroup>, StoreError>;

    /// Persists a scheduler-driven status change together with the probe
    /// result that caused it.
    async fn update_service_status(
        &self,
        id: ServiceId,
        status: Status,
        probe_result: ProbeResult,
    ) -> Result<(), StoreError>;

    /// Persists the latest probe result without touching the status.
    async fn record_probe_result(
        &self,
        id: ServiceId,
        probe_result: ProbeResult,
    ) -> Result<(), StoreError>;
}

#[async_trait]
pub trait IncidentStore: Send + Sync {
    /// Incidents that are publicly visible and not resolved, completed or
    /// dismissed.
    async fn list_active_visible_incidents(&self) -> Result<Vec<Incident>, StoreError>;
}
