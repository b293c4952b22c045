use serde::Serialize;
use std::collections::HashSet;
use uuid::Uuid;

use crate::db::enums::{IncidentImpact, IncidentStatus, IncidentType};
use crate::monitoring::aggregator::{
    OverallStatus, group_display_status, overall_status, service_display_status,
};
use crate::monitoring::models::{Component, Incident, MonitoredService, ProbeResult, ServiceGroup};
use crate::monitoring::status::Status;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceStatusResponse {
    pub id: Uuid,
    pub name: String,
    /// Status as set by operators or the scheduler.
    pub status: Status,
    /// Status after folding in components and active incidents.
    pub display_status: Status,
    pub group_id: Option<Uuid>,
    pub components: Vec<Component>,
    pub last_probe_result: Option<ProbeResult>,
}

impl ServiceStatusResponse {
    pub fn from_service(service: &MonitoredService, incidents: &[Incident]) -> Self {
        Self {
            id: service.id,
            name: service.name.clone(),
            status: service.status,
            display_status: service_display_status(service, incidents),
            group_id: service.group_id,
            components: service.components.clone(),
            last_probe_result: service.last_probe_result.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupStatusResponse {
    pub id: Uuid,
    pub name: String,
    pub display_order: i32,
    pub display_status: Status,
    pub services: Vec<ServiceStatusResponse>,
}

impl GroupStatusResponse {
    /// `services` must already be restricted to what the caller may show.
    pub fn build(group: &ServiceGroup, services: &[MonitoredService], incidents: &[Incident]) -> Self {
        Self {
            id: group.id,
            name: group.name.clone(),
            display_order: group.display_order,
            display_status: group_display_status(group, services, incidents),
            services: services
                .iter()
                .filter(|service| service.group_id == Some(group.id))
                .map(|service| ServiceStatusResponse::from_service(service, incidents))
                .collect(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IncidentSummary {
    pub id: Uuid,
    pub title: String,
    #[serde(rename = "type")]
    pub incident_type: IncidentType,
    pub impact: IncidentImpact,
    pub status: IncidentStatus,
    pub affected_service_ids: Vec<Uuid>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusPage {
    pub overall: OverallStatus,
    pub groups: Vec<GroupStatusResponse>,
    pub ungrouped_services: Vec<ServiceStatusResponse>,
    pub active_incidents: Vec<IncidentSummary>,
}

/// Public services only, ordered by name.
pub fn public_services(services: &[MonitoredService]) -> Vec<MonitoredService> {
    let mut public: Vec<MonitoredService> = services
        .iter()
        .filter(|service| service.is_public)
        .cloned()
        .collect();
    public.sort_by(|a, b| a.name.cmp(&b.name).then(a.id.cmp(&b.id)));
    public
}

impl StatusPage {
    pub fn build(services: &[MonitoredService], groups: &[ServiceGroup], incidents: &[Incident]) -> Self {
        let public = public_services(services);
        let public_ids: HashSet<Uuid> = public.iter().map(|service| service.id).collect();

        let mut groups: Vec<&ServiceGroup> = groups.iter().collect();
        groups.sort_by(|a, b| a.display_order.cmp(&b.display_order).then(a.name.cmp(&b.name)));
        let group_ids: HashSet<Uuid> = groups.iter().map(|group| group.id).collect();

        let ungrouped_services = public
            .iter()
            .filter(|service| service.group_id.is_none_or(|id| !group_ids.contains(&id)))
            .map(|service| ServiceStatusResponse::from_service(service, incidents))
            .collect();

        let mut active_incidents: Vec<IncidentSummary> = incidents
            .iter()
            .filter(|incident| incident.is_active_and_visible())
            .map(|incident| {
                let mut affected: Vec<Uuid> = incident
                    .affected_service_ids
                    .iter()
                    .filter(|id| public_ids.contains(*id))
                    .copied()
                    .collect();
                affected.sort();
                IncidentSummary {
                    id: incident.id,
                    title: incident.title.clone(),
                    incident_type: incident.incident_type,
                    impact: incident.impact,
                    status: incident.status,
                    affected_service_ids: affected,
                }
            })
            .collect();
        active_incidents.sort_by(|a, b| a.title.cmp(&b.title).then(a.id.cmp(&b.id)));

        Self {
            overall: overall_status(&public, incidents),
            groups: groups
                .into_iter()
                .map(|group| GroupStatusResponse::build(group, &public, incidents))
                .collect(),
            ungrouped_services,
            active_incidents,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn group(name: &str, display_order: i32) -> ServiceGroup {
        ServiceGroup {
            id: Uuid::new_v4(),
            name: name.to_string(),
            display_order,
        }
    }

    #[test]
    fn groups_are_ordered_and_hidden_services_left_out() {
        let core = group("Core", 2);
        let edge = group("Edge", 1);
        let also_first = group("Billing", 1);

        let mut api = MonitoredService::new("API", Status::Degraded);
        api.group_id = Some(core.id);
        let mut secret = MonitoredService::new("Secret", Status::MajorOutage);
        secret.group_id = Some(core.id);
        secret.is_public = false;
        let docs = MonitoredService::new("Docs", Status::Operational);
        let mut orphan = MonitoredService::new("Orphan", Status::Operational);
        orphan.group_id = Some(Uuid::new_v4());

        let page = StatusPage::build(
            &[api, secret, docs, orphan],
            &[core.clone(), edge, also_first],
            &[],
        );

        let names: Vec<&str> = page.groups.iter().map(|g| g.name.as_str()).collect();
        assert_eq!(names, ["Billing", "Edge", "Core"]);

        let core_view = &page.groups[2];
        assert_eq!(core_view.services.len(), 1);
        assert_eq!(core_view.display_status, Status::Degraded);
        assert_eq!(page.groups[0].display_status, Status::Unknown);

        let ungrouped: Vec<&str> = page.ungrouped_services.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(ungrouped, ["Docs", "Orphan"]);
        assert_eq!(page.overall.status, Status::Degraded);
    }

    #[test]
    fn incident_summary_lists_only_active_public_incidents() {
        let api = MonitoredService::new("API", Status::Operational);
        let mut hidden = MonitoredService::new("Hidden", Status::Operational);
        hidden.is_public = false;

        let active = Incident {
            id: Uuid::new_v4(),
            title: "Elevated latency".to_string(),
            incident_type: IncidentType::Incident,
            impact: IncidentImpact::Minor,
            status: IncidentStatus::Identified,
            affected_service_ids: HashSet::from([api.id, hidden.id]),
            is_public: true,
        };
        let mut resolved = active.clone();
        resolved.id = Uuid::new_v4();
        resolved.status = IncidentStatus::Resolved;

        let page = StatusPage::build(&[api.clone(), hidden], &[], &[active, resolved]);
        assert_eq!(page.active_incidents.len(), 1);
        assert_eq!(page.active_incidents[0].affected_service_ids, vec![api.id]);
        assert_eq!(page.ungrouped_services[0].display_status, Status::Degraded);
    }

    #[test]
    fn serializes_camel_case() {
        let service = MonitoredService::new("API", Status::Operational);
        let json = serde_json::to_value(StatusPage::build(&[service], &[], &[])).unwrap();
        assert_eq!(json["overall"]["status"], "operational");
        assert_eq!(json["ungroupedServices"][0]["displayStatus"], "operational");
        assert!(json["activeIncidents"].as_array().unwrap().is_empty());
    }
}
