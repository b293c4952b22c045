use axum::{
    Json, Router,
    extract::{Path, State},
    routing::get,
};
use std::sync::Arc;
use uuid::Uuid;

use crate::monitoring::aggregator::{OverallStatus, overall_status};
use crate::monitoring::models::{Incident, MonitoredService, ServiceGroup};
use crate::web::models::status_models::{
    GroupStatusResponse, ServiceStatusResponse, StatusPage, public_services,
};
use crate::web::{AppError, AppState};

struct StatusSnapshot {
    services: Vec<MonitoredService>,
    groups: Vec<ServiceGroup>,
    incidents: Vec<Incident>,
}

async fn load_snapshot(app_state: &AppState) -> Result<StatusSnapshot, AppError> {
    let (services, groups, incidents) = futures::try_join!(
        app_state.services.list_services(),
        app_state.services.list_groups(),
        app_state.incidents.list_active_visible_incidents(),
    )?;
    Ok(StatusSnapshot {
        services,
        groups,
        incidents,
    })
}

async fn get_status_page_handler(
    State(app_state): State<Arc<AppState>>,
) -> Result<Json<StatusPage>, AppError> {
    let snapshot = load_snapshot(&app_state).await?;
    Ok(Json(StatusPage::build(
        &snapshot.services,
        &snapshot.groups,
        &snapshot.incidents,
    )))
}

async fn get_overall_status_handler(
    State(app_state): State<Arc<AppState>>,
) -> Result<Json<OverallStatus>, AppError> {
    let (services, incidents) = futures::try_join!(
        app_state.services.list_services(),
        app_state.incidents.list_active_visible_incidents(),
    )?;
    Ok(Json(overall_status(&services, &incidents)))
}

async fn get_service_status_handler(
    State(app_state): State<Arc<AppState>>,
    Path(service_id): Path<Uuid>,
) -> Result<Json<ServiceStatusResponse>, AppError> {
    let (service, incidents) = futures::try_join!(
        app_state.services.get_service(service_id),
        app_state.incidents.list_active_visible_incidents(),
    )?;
    match service {
        Some(service) if service.is_public => Ok(Json(ServiceStatusResponse::from_service(
            &service, &incidents,
        ))),
        _ => Err(AppError::NotFound(format!("Service {service_id} not found"))),
    }
}

async fn get_group_status_handler(
    State(app_state): State<Arc<AppState>>,
    Path(group_id): Path<Uuid>,
) -> Result<Json<GroupStatusResponse>, AppError> {
    let snapshot = load_snapshot(&app_state).await?;
    let group = snapshot
        .groups
        .iter()
        .find(|group| group.id == group_id)
        .ok_or_else(|| AppError::NotFound(format!("Group {group_id} not found")))?;
    let public = public_services(&snapshot.services);
    Ok(Json(GroupStatusResponse::build(group, &public, &snapshot.incidents)))
}

pub fn create_status_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/status", get(get_status_page_handler))
        .route("/api/status/overall", get(get_overall_status_handler))
        .route(
            "/api/status/services/{service_id}",
            get(get_service_status_handler),
        )
        .route("/api/status/groups/{group_id}", get(get_group_status_handler))
}
