use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use crate::db::enums::{IncidentImpact, IncidentStatus, IncidentType};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[sea_orm(table_name = "incidents")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub title: String,
    pub incident_type: IncidentType,
    pub impact: IncidentImpact,
    #[sea_orm(indexed)]
    pub status: IncidentStatus,
    pub is_public: bool,
    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::incident_service::Entity")]
    IncidentService,
}

impl Related<super::service::Entity> for Entity {
    fn to() -> RelationDef {
        super::incident_service::Relation::Service.def()
    }

    fn via() -> Option<RelationDef> {
        Some(super::incident_service::Relation::Incident.def().rev())
    }
}

impl ActiveModelBehavior for ActiveModel {}
