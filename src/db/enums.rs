use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::monitoring::status::Status;

#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Text", enum_name = "incident_type_enum")]
#[serde(rename_all = "snake_case")]
pub enum IncidentType {
    #[sea_orm(string_value = "incident")]
    Incident,
    #[sea_orm(string_value = "maintenance")]
    Maintenance,
    #[sea_orm(string_value = "information")]
    Information,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Text", enum_name = "incident_impact_enum")]
#[serde(rename_all = "snake_case")]
pub enum IncidentImpact {
    #[default]
    #[sea_orm(string_value = "none")]
    None,
    #[sea_orm(string_value = "minor")]
    Minor,
    #[sea_orm(string_value = "significant")]
    Significant,
    #[sea_orm(string_value = "critical")]
    Critical,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Text", enum_name = "incident_status_enum")]
#[serde(rename_all = "snake_case")]
pub enum IncidentStatus {
    #[sea_orm(string_value = "investigating")]
    Investigating,
    #[sea_orm(string_value = "identified")]
    Identified,
    #[sea_orm(string_value = "monitoring")]
    Monitoring,
    #[sea_orm(string_value = "scheduled")]
    Scheduled,
    #[sea_orm(string_value = "in_progress")]
    InProgress,
    #[sea_orm(string_value = "resolved")]
    Resolved,
    #[sea_orm(string_value = "completed")]
    Completed,
    #[sea_orm(string_value = "dismissed")]
    Dismissed,
}

impl IncidentStatus {
    /// Lifecycle states after which an incident no longer affects any status.
    pub const CLOSED: [IncidentStatus; 3] = [
        IncidentStatus::Resolved,
        IncidentStatus::Completed,
        IncidentStatus::Dismissed,
    ];

    pub fn is_active(self) -> bool {
        !Self::CLOSED.contains(&self)
    }
}

impl IncidentType {
    /// Status an active incident of this type and impact forces onto the
    /// services it affects, if any.
    pub fn implied_status(self, impact: IncidentImpact) -> Option<Status> {
        match self {
            IncidentType::Maintenance => Some(Status::Maintenance),
            IncidentType::Incident => match impact {
                IncidentImpact::Critical => Some(Status::MajorOutage),
                IncidentImpact::Significant => Some(Status::PartialOutage),
                IncidentImpact::Minor => Some(Status::Degraded),
                IncidentImpact::None => None,
            },
            IncidentType::Information => None,
        }
    }
}

impl fmt::Display for IncidentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

impl fmt::Display for IncidentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn incident_impact_maps_to_status() {
        let incident = IncidentType::Incident;
        assert_eq!(incident.implied_status(IncidentImpact::Critical), Some(Status::MajorOutage));
        assert_eq!(incident.implied_status(IncidentImpact::Significant), Some(Status::PartialOutage));
        assert_eq!(incident.implied_status(IncidentImpact::Minor), Some(Status::Degraded));
        assert_eq!(incident.implied_status(IncidentImpact::None), None);
    }

    #[test]
    fn maintenance_ignores_impact_and_information_implies_nothing() {
        assert_eq!(
            IncidentType::Maintenance.implied_status(IncidentImpact::Critical),
            Some(Status::Maintenance)
        );
        assert_eq!(IncidentType::Information.implied_status(IncidentImpact::Critical), None);
    }

    #[test]
    fn closed_lifecycle_states_are_inactive() {
        assert!(IncidentStatus::Investigating.is_active());
        assert!(IncidentStatus::InProgress.is_active());
        assert!(!IncidentStatus::Resolved.is_active());
        assert!(!IncidentStatus::Completed.is_active());
        assert!(!IncidentStatus::Dismissed.is_active());
    }
}
