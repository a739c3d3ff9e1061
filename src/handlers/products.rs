use axum::{
    extract::{Path, Query, State},
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::ServiceError;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct AvailabilityQuery {
    pub warehouse_id: Option<Uuid>,
}

#[derive(Debug, Serialize)]
pub struct AvailabilityResponse {
    pub product_id: Uuid,
    pub warehouse_id: Option<Uuid>,
    pub available: i32,
}

pub fn routes() -> Router<AppState> {
    Router::new().route("/products/:id/availability", get(availability))
}

async fn availability(
    State(state): State<AppState>,
    Path(product_id): Path<Uuid>,
    Query(query): Query<AvailabilityQuery>,
) -> Result<Json<AvailabilityResponse>, ServiceError> {
    let available = state
        .services
        .availability
        .available(product_id, query.warehouse_id)
        .await?;
    Ok(Json(AvailabilityResponse {
        product_id,
        warehouse_id: query.warehouse_id,
        available,
    }))
}
