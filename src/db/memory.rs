//! Process-local store used by tests and by seeded runs without a database.
use async_trait::async_trait;
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::store::{IncidentStore, ServiceStore, StoreError};
use crate::monitoring::models::{Incident, MonitoredService, ProbeResult, ServiceGroup, ServiceId};
use crate::monitoring::status::Status;

/// Initial contents of an [`InMemoryStore`], usually loaded from JSON.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct SeedData {
    pub services: Vec<MonitoredService>,
    pub groups: Vec<ServiceGroup>,
    pub incidents: Vec<Incident>,
}

impl SeedData {
    pub fn from_file(path: &Path) -> Result<Self, StoreError> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| StoreError::Seed(format!("Failed to read {path:?}: {e}")))?;
        Ok(serde_json::from_str(&contents)?)
    }
}

#[derive(Default)]
struct StoreData {
    services: HashMap<ServiceId, MonitoredService>,
    groups: HashMap<Uuid, ServiceGroup>,
    incidents: HashMap<Uuid, Incident>,
}

#[derive(Default)]
pub struct InMemoryStore {
    data: RwLock<StoreData>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_seed(seed: SeedData) -> Self {
        let data = StoreData {
            services: seed.services.into_iter().map(|s| (s.id, s)).collect(),
            groups: seed.groups.into_iter().map(|g| (g.id, g)).collect(),
            incidents: seed.incidents.into_iter().map(|i| (i.id, i)).collect(),
        };
        Self {
            data: RwLock::new(data),
        }
    }

    pub async fn upsert_service(&self, service: MonitoredService) {
        self.data.write().await.services.insert(service.id, service);
    }

    pub async fn remove_service(&self, id: ServiceId) -> Option<MonitoredService> {
        self.data.write().await.services.remove(&id)
    }

    /// Applies `change` to a stored service. Returns `false` if it does not exist.
    pub async fn modify_service<F>(&self, id: ServiceId, change: F) -> bool
    where
        F: FnOnce(&mut MonitoredService),
    {
        match self.data.write().await.services.get_mut(&id) {
            Some(service) => {
                change(service);
                true
            }
            None => false,
        }
    }

    pub async fn upsert_group(&self, group: ServiceGroup) {
        self.data.write().await.groups.insert(group.id, group);
    }

    pub async fn upsert_incident(&self, incident: Incident) {
        self.data.write().await.incidents.insert(incident.id, incident);
    }
}

#[async_trait]
impl ServiceStore for InMemoryStore {
    async fn list_services(&self) -> Result<Vec<MonitoredService>, StoreError> {
        let mut services: Vec<MonitoredService> =
            self.data.read().await.services.values().cloned().collect();
        services.sort_by(|a, b| a.name.cmp(&b.name).then(a.id.cmp(&b.id)));
        Ok(services)
    }

    async fn get_service(&self, id: ServiceId) -> Result<Option<MonitoredService>, StoreError> {
        Ok(self.data.read().await.services.get(&id).cloned())
    }

    async fn list_groups(&self) -> Result<Vec<ServiceGroup>, StoreError> {
        let mut groups: Vec<ServiceGroup> = self.data.read().await.groups.values().cloned().collect();
        groups.sort_by(|a, b| a.display_order.cmp(&b.display_order).then(a.name.cmp(&b.name)));
        Ok(groups)
    }

    async fn update_service_status(
        &self,
        id: ServiceId,
        status: Status,
        probe_result: ProbeResult,
    ) -> Result<(), StoreError> {
        let mut data = self.data.write().await;
        let service = data
            .services
            .get_mut(&id)
            .ok_or(StoreError::ServiceNotFound(id))?;
        service.status = status;
        service.last_probe_result = Some(probe_result);
        Ok(())
    }

    async fn record_probe_result(
        &self,
        id: ServiceId,
        probe_result: ProbeResult,
    ) -> Result<(), StoreError> {
        let mut data = self.data.write().await;
        let service = data
            .services
            .get_mut(&id)
            .ok_or(StoreError::ServiceNotFound(id))?;
        service.last_probe_result = Some(probe_result);
        Ok(())
    }
}

#[async_trait]
impl IncidentStore for InMemoryStore {
    async fn list_active_visible_incidents(&self) -> Result<Vec<Incident>, StoreError> {
        Ok(self
            .data
            .read()
            .await
            .incidents
            .values()
            .filter(|incident| incident.is_active_and_visible())
            .cloned()
            .collect())
    }
}
