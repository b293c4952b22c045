use async_trait::async_trait;
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, DbErr, EntityTrait,
    QueryFilter, QueryOrder, Schema, Set,
};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tracing::warn;
use uuid::Uuid;

use crate::db::entities::prelude::{
    IncidentEntity, IncidentModel, IncidentServiceEntity, ServiceComponentEntity,
    ServiceComponentModel, ServiceEntity, ServiceGroupEntity, ServiceModel,
};
use crate::db::entities::{incident, incident_service, service, service_component, service_group};
use crate::db::store::{IncidentStore, ServiceStore, StoreError};
use crate::monitoring::models::{
    Component, Incident, MonitoredService, PingConfig, PingInterval, ProbeResult, ServiceGroup,
    ServiceId,
};
use crate::monitoring::status::Status;

/// Postgres-backed store.
#[derive(Clone)]
pub struct SeaOrmStore {
    db: Arc<DatabaseConnection>,
}

impl SeaOrmStore {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Creates any missing tables, parents before children.
    pub async fn ensure_schema(&self) -> Result<(), StoreError> {
        let backend = self.db.get_database_backend();
        let schema = Schema::new(backend);

        let mut statements = vec![
            schema.create_table_from_entity(ServiceGroupEntity),
            schema.create_table_from_entity(ServiceEntity),
            schema.create_table_from_entity(ServiceComponentEntity),
            schema.create_table_from_entity(IncidentEntity),
            schema.create_table_from_entity(IncidentServiceEntity),
        ];
        for statement in &mut statements {
            statement.if_not_exists();
            self.db.execute(backend.build(&*statement)).await?;
        }
        Ok(())
    }

    async fn write_service(
        &self,
        id: ServiceId,
        status: Option<Status>,
        probe_result: ProbeResult,
    ) -> Result<(), StoreError> {
        let probe_json = serde_json::to_value(&probe_result)?;
        let mut active = service::ActiveModel {
            id: Set(id),
            last_probe_result: Set(Some(probe_json)),
            updated_at: Set(Utc::now()),
            ..Default::default()
        };
        if let Some(status) = status {
            active.status = Set(status);
        }

        match active.update(&*self.db).await {
            Ok(_) => Ok(()),
            Err(DbErr::RecordNotUpdated) => Err(StoreError::ServiceNotFound(id)),
            Err(e) => Err(e.into()),
        }
    }
}

fn ping_config(model: &ServiceModel) -> PingConfig {
    let interval = u32::try_from(model.ping_interval_minutes)
        .ok()
        .and_then(|minutes| PingInterval::try_from(minutes).ok());

    // An unsupported stored interval leaves the service unmonitored until fixed.
    let (enabled, interval) = match interval {
        Some(interval) => (model.ping_enabled, interval),
        None => {
            if model.ping_enabled {
                warn!(
                    service_id = %model.id,
                    interval_minutes = model.ping_interval_minutes,
                    "Unsupported ping interval; health checks disabled for this service."
                );
            }
            (false, PingInterval::default())
        }
    };

    PingConfig {
        enabled,
        url: model.ping_url.clone(),
        interval,
        alerts_muted: model.alerts_muted,
    }
}

fn last_probe_result(model: &ServiceModel) -> Option<ProbeResult> {
    let value = model.last_probe_result.clone()?;
    match serde_json::from_value(value) {
        Ok(result) => Some(result),
        Err(e) => {
            warn!(service_id = %model.id, error = %e, "Ignoring unreadable stored probe result.");
            None
        }
    }
}

fn to_monitored_service(model: ServiceModel, components: Vec<Component>) -> MonitoredService {
    let ping = ping_config(&model);
    let last_probe_result = last_probe_result(&model);
    MonitoredService {
        id: model.id,
        name: model.name,
        status: model.status,
        components,
        group_id: model.group_id,
        is_public: model.is_public,
        ping,
        last_probe_result,
    }
}

fn to_component(model: ServiceComponentModel) -> Component {
    Component {
        id: model.id,
        name: model.name,
        status: model.status,
    }
}

#[async_trait]
impl ServiceStore for SeaOrmStore {
    async fn list_services(&self) -> Result<Vec<MonitoredService>, StoreError> {
        let (services, components) = futures::try_join!(
            ServiceEntity::find()
                .order_by_asc(service::Column::Name)
                .order_by_asc(service::Column::Id)
                .all(&*self.db),
            ServiceComponentEntity::find()
                .order_by_asc(service_component::Column::Name)
                .all(&*self.db),
        )?;

        let mut by_service: HashMap<Uuid, Vec<Component>> = HashMap::new();
        for component in components {
            by_service
                .entry(component.service_id)
                .or_default()
                .push(to_component(component));
        }

        Ok(services
            .into_iter()
            .map(|model| {
                let components = by_service.remove(&model.id).unwrap_or_default();
                to_monitored_service(model, components)
            })
            .collect())
    }

    async fn get_service(&self, id: ServiceId) -> Result<Option<MonitoredService>, StoreError> {
        let Some(model) = ServiceEntity::find_by_id(id).one(&*self.db).await? else {
            return Ok(None);
        };
        let components = ServiceComponentEntity::find()
            .filter(service_component::Column::ServiceId.eq(id))
            .order_by_asc(service_component::Column::Name)
            .all(&*self.db)
            .await?
            .into_iter()
            .map(to_component)
            .collect();
        Ok(Some(to_monitored_service(model, components)))
    }

    async fn list_groups(&self) -> Result<Vec<ServiceGroup>, StoreError> {
        let groups = ServiceGroupEntity::find()
            .order_by_asc(service_group::Column::DisplayOrder)
            .order_by_asc(service_group::Column::Name)
            .all(&*self.db)
            .await?;
        Ok(groups
            .into_iter()
            .map(|model| ServiceGroup {
                id: model.id,
                name: model.name,
                display_order: model.display_order,
            })
            .collect())
    }

    async fn update_service_status(
        &self,
        id: ServiceId,
        status: Status,
        probe_result: ProbeResult,
    ) -> Result<(), StoreError> {
        self.write_service(id, Some(status), probe_result).await
    }

    async fn record_probe_result(
        &self,
        id: ServiceId,
        probe_result: ProbeResult,
    ) -> Result<(), StoreError> {
        self.write_service(id, None, probe_result).await
    }
}

#[async_trait]
impl IncidentStore for SeaOrmStore {
    async fn list_active_visible_incidents(&self) -> Result<Vec<Incident>, StoreError> {
        let incidents: Vec<IncidentModel> = IncidentEntity::find()
            .filter(incident::Column::IsPublic.eq(true))
            .all(&*self.db)
            .await?
            .into_iter()
            .filter(|model| model.status.is_active())
            .collect();
        if incidents.is_empty() {
            return Ok(Vec::new());
        }

        let ids: Vec<Uuid> = incidents.iter().map(|model| model.id).collect();
        let links = IncidentServiceEntity::find()
            .filter(incident_service::Column::IncidentId.is_in(ids))
            .all(&*self.db)
            .await?;

        let mut affected: HashMap<Uuid, HashSet<ServiceId>> = HashMap::new();
        for link in links {
            affected
                .entry(link.incident_id)
                .or_default()
                .insert(link.service_id);
        }

        Ok(incidents
            .into_iter()
            .map(|model| Incident {
                affected_service_ids: affected.remove(&model.id).unwrap_or_default(),
                id: model.id,
                title: model.title,
                incident_type: model.incident_type,
                impact: model.impact,
                status: model.status,
                is_public: model.is_public,
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::enums::{IncidentImpact, IncidentStatus, IncidentType};
    use crate::monitoring::models::ProbeStatus;
    use sea_orm::{DatabaseBackend, MockDatabase};

    fn service_model(interval_minutes: i32) -> service::Model {
        let now = Utc::now();
        service::Model {
            id: Uuid::new_v4(),
            name: "Payments".to_string(),
            status: Status::Degraded,
            group_id: None,
            is_public: true,
            ping_enabled: true,
            ping_url: Some("https://payments.example.com/health".to_string()),
            ping_interval_minutes: interval_minutes,
            alerts_muted: false,
            last_probe_result: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn unsupported_interval_disables_checks() {
        let service = to_monitored_service(service_model(7), Vec::new());
        assert!(!service.ping.enabled);
        assert!(!service.ping.is_eligible());

        let service = to_monitored_service(service_model(10), Vec::new());
        assert!(service.ping.is_eligible());
        assert_eq!(service.ping.interval, PingInterval::TenMinutes);
    }

    #[test]
    fn stored_probe_result_is_decoded() {
        let mut model = service_model(5);
        let stored = ProbeResult::new(ProbeStatus::Slow).with_status_code(200);
        model.last_probe_result = Some(serde_json::to_value(&stored).unwrap());
        assert_eq!(to_monitored_service(model, Vec::new()).last_probe_result, Some(stored));

        let mut garbage = service_model(5);
        garbage.last_probe_result = Some(serde_json::json!({ "status": "sideways" }));
        assert_eq!(to_monitored_service(garbage, Vec::new()).last_probe_result, None);
    }

    #[tokio::test]
    async fn get_service_attaches_components() {
        let model = service_model(2);
        let id = model.id;
        let component = service_component::Model {
            id: Uuid::new_v4(),
            service_id: id,
            name: "Card processor".to_string(),
            status: Status::PartialOutage,
        };
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![model]])
            .append_query_results([vec![component]])
            .into_connection();

        let store = SeaOrmStore::new(Arc::new(db));
        let service = store.get_service(id).await.unwrap().unwrap();
        assert_eq!(service.name, "Payments");
        assert_eq!(service.components.len(), 1);
        assert_eq!(service.components[0].status, Status::PartialOutage);
    }

    #[tokio::test]
    async fn get_service_returns_none_for_unknown_id() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([Vec::<service::Model>::new()])
            .into_connection();
        let store = SeaOrmStore::new(Arc::new(db));
        assert!(store.get_service(Uuid::new_v4()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn closed_incidents_are_filtered_out() {
        let now = Utc::now();
        let incident = |status| incident::Model {
            id: Uuid::new_v4(),
            title: "Latency spike".to_string(),
            incident_type: IncidentType::Incident,
            impact: IncidentImpact::Minor,
            status,
            is_public: true,
            created_at: now,
            updated_at: now,
        };
        let open = incident(IncidentStatus::Monitoring);
        let open_id = open.id;
        let affected = Uuid::new_v4();

        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![open, incident(IncidentStatus::Resolved)]])
            .append_query_results([vec![incident_service::Model {
                incident_id: open_id,
                service_id: affected,
            }]])
            .into_connection();
        let store = SeaOrmStore::new(Arc::new(db));

        let incidents = store.list_active_visible_incidents().await.unwrap();
        assert_eq!(incidents.len(), 1);
        assert_eq!(incidents[0].id, open_id);
        assert!(incidents[0].affects(affected));
    }
}
