use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::errors::ServiceError;
use crate::models::status::ShipmentStatus;
use crate::services::shipments::{AllocationPreview, CreateShipmentInput, ShipmentResponse};
use crate::{AppState, DocumentResponse};

#[derive(Debug, Deserialize)]
pub struct TransitionShipmentRequest {
    pub status: ShipmentStatus,
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/shipments", post(create_shipment))
        .route("/shipments/preview", post(preview_allocations))
        .route("/shipments/:id", get(get_shipment))
        .route("/shipments/:id/status", post(transition_shipment))
}

async fn create_shipment(
    State(state): State<AppState>,
    Json(input): Json<CreateShipmentInput>,
) -> Result<(StatusCode, Json<DocumentResponse<ShipmentResponse>>), ServiceError> {
    let shipment = state.services.shipments.create_shipment(input).await?;
    Ok((
        StatusCode::CREATED,
        Json(DocumentResponse { document: shipment }),
    ))
}

/// Allocation progress for an in-flight edit; commits nothing.
async fn preview_allocations(
    State(state): State<AppState>,
    Json(input): Json<CreateShipmentInput>,
) -> Result<Json<AllocationPreview>, ServiceError> {
    let preview = state.services.shipments.preview_allocations(&input).await?;
    Ok(Json(preview))
}

async fn get_shipment(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<DocumentResponse<ShipmentResponse>>, ServiceError> {
    let shipment = state.services.shipments.get_shipment(id).await?;
    Ok(Json(DocumentResponse { document: shipment }))
}

async fn transition_shipment(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(request): Json<TransitionShipmentRequest>,
) -> Result<Json<DocumentResponse<ShipmentResponse>>, ServiceError> {
    let shipment = state
        .services
        .shipments
        .transition(id, request.status)
        .await?;
    Ok(Json(DocumentResponse { document: shipment }))
}
