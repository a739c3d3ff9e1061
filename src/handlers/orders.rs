use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post, put},
    Json, Router,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::errors::ServiceError;
use crate::models::status::OrderStatus;
use crate::services::orders::{CreateOrderInput, UpdateOrderLinesInput};
use crate::{AppState, DocumentResponse, DocumentWithWarnings};

#[derive(Debug, Deserialize)]
pub struct TransitionOrderRequest {
    pub status: OrderStatus,
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/orders", post(create_order))
        .route("/orders/:id", get(get_order))
        .route("/orders/:id/lines", put(update_lines))
        .route("/orders/:id/reserve", post(reserve_order))
        .route("/orders/:id/release", post(release_order))
        .route("/orders/:id/status", post(transition_order))
}

async fn create_order(
    State(state): State<AppState>,
    Json(input): Json<CreateOrderInput>,
) -> Result<(StatusCode, Json<DocumentResponse<crate::services::orders::OrderResponse>>), ServiceError>
{
    let order = state.services.orders.create_order(input).await?;
    Ok((StatusCode::CREATED, Json(DocumentResponse { document: order })))
}

async fn get_order(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<DocumentResponse<crate::services::orders::OrderResponse>>, ServiceError> {
    let order = state.services.orders.get_order(id).await?;
    Ok(Json(DocumentResponse { document: order }))
}

async fn update_lines(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(input): Json<UpdateOrderLinesInput>,
) -> Result<Json<DocumentResponse<crate::services::orders::OrderResponse>>, ServiceError> {
    let order = state.services.orders.update_lines(id, input).await?;
    Ok(Json(DocumentResponse { document: order }))
}

async fn reserve_order(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<DocumentWithWarnings<crate::services::orders::OrderResponse>>, ServiceError> {
    let (order, warnings) = state.services.reservations.reserve(id).await?;
    Ok(Json(DocumentWithWarnings {
        document: order,
        warnings,
    }))
}

async fn release_order(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<DocumentResponse<crate::services::orders::OrderResponse>>, ServiceError> {
    let order = state.services.reservations.release(id).await?;
    Ok(Json(DocumentResponse { document: order }))
}

async fn transition_order(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(request): Json<TransitionOrderRequest>,
) -> Result<Json<DocumentResponse<crate::services::orders::OrderResponse>>, ServiceError> {
    let order = state.services.orders.transition(id, request.status).await?;
    Ok(Json(DocumentResponse { document: order }))
}
