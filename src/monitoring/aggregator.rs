//! Display status derivation for services, groups and the whole platform.
//!
//! Everything here is a pure function of its inputs: no store access, no
//! clock, no knowledge of the scheduler.

use serde::Serialize;

use super::models::{Incident, MonitoredService, ServiceGroup};
use super::status::Status;

pub const NO_SERVICES_MESSAGE: &str = "No services are currently monitored.";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OverallStatus {
    pub status: Status,
    pub message: String,
}

impl OverallStatus {
    fn from_status(status: Status) -> Self {
        Self {
            status,
            message: status.overall_message().to_string(),
        }
    }
}

/// The status a service shows publicly: its own status, its components and
/// every active public incident that affects it, whichever is worst.
pub fn service_display_status(service: &MonitoredService, incidents: &[Incident]) -> Status {
    let components = service.components.iter().map(|component| component.status);
    let from_incidents = incidents
        .iter()
        .filter(|incident| incident.is_active_and_visible() && incident.affects(service.id))
        .filter_map(Incident::implied_status);

    components
        .chain(from_incidents)
        .fold(service.status, Status::worse)
}

/// Worst display status among the members of `group`, `Unknown` if it has none.
pub fn group_display_status<'a, I>(group: &ServiceGroup, services: I, incidents: &[Incident]) -> Status
where
    I: IntoIterator<Item = &'a MonitoredService>,
{
    Status::worst_of(
        services
            .into_iter()
            .filter(|service| service.group_id == Some(group.id))
            .map(|service| service_display_status(service, incidents)),
    )
    .unwrap_or(Status::Unknown)
}

pub fn overall_status<'a, I>(services: I, incidents: &[Incident]) -> OverallStatus
where
    I: IntoIterator<Item = &'a MonitoredService>,
{
    let worst = Status::worst_of(
        services
            .into_iter()
            .filter(|service| service.is_public)
            .map(|service| service_display_status(service, incidents)),
    );

    match worst {
        Some(status) => OverallStatus::from_status(status),
        None => OverallStatus {
            status: Status::Operational,
            message: NO_SERVICES_MESSAGE.to_string(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::enums::{IncidentImpact, IncidentStatus, IncidentType};
    use crate::monitoring::models::Component;
    use std::collections::HashSet;
    use uuid::Uuid;

    fn incident(
        incident_type: IncidentType,
        impact: IncidentImpact,
        affects: &MonitoredService,
    ) -> Incident {
        Incident {
            id: Uuid::new_v4(),
            title: "Elevated error rates".to_string(),
            incident_type,
            impact,
            status: IncidentStatus::Investigating,
            affected_service_ids: HashSet::from([affects.id]),
            is_public: true,
        }
    }

    fn component(status: Status) -> Component {
        Component {
            id: Uuid::new_v4(),
            name: "worker".to_string(),
            status,
        }
    }

    #[test]
    fn critical_incident_makes_operational_service_major_outage() {
        let service = MonitoredService::new("API", Status::Operational);
        let incidents = [incident(IncidentType::Incident, IncidentImpact::Critical, &service)];
        assert_eq!(service_display_status(&service, &incidents), Status::MajorOutage);
    }

    #[test]
    fn maintenance_does_not_mask_degraded() {
        let service = MonitoredService::new("API", Status::Degraded);
        let incidents = [incident(IncidentType::Maintenance, IncidentImpact::None, &service)];
        assert_eq!(service_display_status(&service, &incidents), Status::Degraded);
    }

    #[test]
    fn worst_of_all_matching_incidents_wins() {
        let service = MonitoredService::new("API", Status::Operational);
        let incidents = [
            incident(IncidentType::Incident, IncidentImpact::Minor, &service),
            incident(IncidentType::Incident, IncidentImpact::Significant, &service),
            incident(IncidentType::Maintenance, IncidentImpact::None, &service),
        ];
        assert_eq!(service_display_status(&service, &incidents), Status::PartialOutage);
    }

    #[test]
    fn closed_private_unrelated_and_informational_incidents_are_ignored() {
        let service = MonitoredService::new("API", Status::Operational);
        let other = MonitoredService::new("Web", Status::Operational);

        let mut resolved = incident(IncidentType::Incident, IncidentImpact::Critical, &service);
        resolved.status = IncidentStatus::Resolved;
        let mut private = incident(IncidentType::Incident, IncidentImpact::Critical, &service);
        private.is_public = false;
        let unrelated = incident(IncidentType::Incident, IncidentImpact::Critical, &other);
        let informational = incident(IncidentType::Information, IncidentImpact::Critical, &service);
        let no_impact = incident(IncidentType::Incident, IncidentImpact::None, &service);

        let incidents = [resolved, private, unrelated, informational, no_impact];
        assert_eq!(service_display_status(&service, &incidents), Status::Operational);
    }

    #[test]
    fn components_contribute_to_service_status() {
        let mut service = MonitoredService::new("API", Status::Operational);
        service.components = vec![component(Status::Operational), component(Status::PartialOutage)];
        assert_eq!(service_display_status(&service, &[]), Status::PartialOutage);
    }

    #[test]
    fn service_display_status_is_idempotent() {
        let mut service = MonitoredService::new("API", Status::Maintenance);
        service.components = vec![component(Status::Degraded)];
        let incidents = [incident(IncidentType::Incident, IncidentImpact::Minor, &service)];
        let first = service_display_status(&service, &incidents);
        assert_eq!(first, service_display_status(&service, &incidents));
        assert_eq!(first, Status::Degraded);
    }

    #[test]
    fn group_status_only_considers_members() {
        let group = ServiceGroup {
            id: Uuid::new_v4(),
            name: "Core".to_string(),
            display_order: 0,
        };
        let mut member = MonitoredService::new("API", Status::Degraded);
        member.group_id = Some(group.id);
        let outsider = MonitoredService::new("Web", Status::MajorOutage);

        assert_eq!(group_display_status(&group, [&member, &outsider], &[]), Status::Degraded);
        assert_eq!(group_display_status(&group, [&outsider], &[]), Status::Unknown);
    }

    #[test]
    fn overall_status_reports_worst_public_service() {
        let operational = MonitoredService::new("API", Status::Operational);
        let partial = MonitoredService::new("Web", Status::PartialOutage);
        let mut hidden = MonitoredService::new("Internal", Status::MajorOutage);
        hidden.is_public = false;

        let overall = overall_status([&operational, &partial, &hidden], &[]);
        assert_eq!(overall.status, Status::PartialOutage);
        assert_eq!(overall.message, "Partial outage affecting some systems.");
    }

    #[test]
    fn overall_status_is_order_invariant() {
        let services = vec![
            MonitoredService::new("A", Status::Maintenance),
            MonitoredService::new("B", Status::Degraded),
            MonitoredService::new("C", Status::Operational),
        ];
        let incidents = [incident(IncidentType::Incident, IncidentImpact::Critical, &services[2])];

        let forward = overall_status(&services, &incidents);
        let backward = overall_status(services.iter().rev(), &incidents);
        assert_eq!(forward, backward);
        assert_eq!(forward.status, Status::MajorOutage);
    }

    #[test]
    fn no_public_services_is_operational_with_dedicated_message() {
        let overall = overall_status(std::iter::empty(), &[]);
        assert_eq!(overall.status, Status::Operational);
        assert_eq!(overall.message, NO_SERVICES_MESSAGE);
    }

    #[test]
    fn all_operational_uses_canonical_message() {
        let service = MonitoredService::new("API", Status::Operational);
        assert_eq!(
            overall_status([&service], &[]),
            OverallStatus {
                status: Status::Operational,
                message: "All systems operational.".to_string(),
            }
        );
    }
}
