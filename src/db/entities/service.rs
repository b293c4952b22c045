use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use crate::monitoring::status::Status;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[sea_orm(table_name = "services")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub name: String,
    #[sea_orm(indexed)]
    pub status: Status,
    #[sea_orm(indexed, nullable)]
    pub group_id: Option<Uuid>,
    pub is_public: bool,
    pub ping_enabled: bool,
    #[sea_orm(nullable)]
    pub ping_url: Option<String>,
    pub ping_interval_minutes: i32,
    pub alerts_muted: bool,
    /// Latest probe outcome, replaced on every check.
    #[sea_orm(column_type = "JsonBinary", nullable)]
    pub last_probe_result: Option<Json>,
    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::service_component::Entity")]
    ServiceComponent,

    #[sea_orm(
        belongs_to = "super::service_group::Entity",
        from = "Column::GroupId",
        to = "super::service_group::Column::Id",
        on_delete = "SetNull",
        on_update = "Cascade"
    )]
    ServiceGroup,

    #[sea_orm(has_many = "super::incident_service::Entity")]
    IncidentService,
}

impl Related<super::service_component::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::ServiceComponent.def()
    }
}

impl Related<super::service_group::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::ServiceGroup.def()
    }
}

impl Related<super::incident::Entity> for Entity {
    fn to() -> RelationDef {
        super::incident_service::Relation::Incident.def()
    }

    fn via() -> Option<RelationDef> {
        Some(super::incident_service::Relation::Service.def().rev())
    }
}

impl ActiveModelBehavior for ActiveModel {}
