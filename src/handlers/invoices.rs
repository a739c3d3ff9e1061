use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use rust_decimal::Decimal;
use serde::Deserialize;
use uuid::Uuid;

use crate::errors::ServiceError;
use crate::models::status::InvoiceStatus;
use crate::services::invoicing::{CreateInvoiceInput, InvoiceResponse};
use crate::{AppState, DocumentResponse, DocumentWithWarnings};

#[derive(Debug, Deserialize)]
pub struct RecordPaymentRequest {
    pub paid_amount: Decimal,
}

#[derive(Debug, Deserialize)]
pub struct RecordShipmentRequest {
    pub shipped_amount: Decimal,
}

#[derive(Debug, Deserialize)]
pub struct TransitionInvoiceRequest {
    pub status: InvoiceStatus,
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/invoices", post(create_invoice))
        .route("/invoices/:id", get(get_invoice))
        .route("/invoices/:id/payment", post(record_payment))
        .route("/invoices/:id/shipment", post(record_shipment))
        .route("/invoices/:id/status", post(transition_invoice))
}

async fn create_invoice(
    State(state): State<AppState>,
    Json(input): Json<CreateInvoiceInput>,
) -> Result<(StatusCode, Json<DocumentWithWarnings<InvoiceResponse>>), ServiceError> {
    let (invoice, warnings) = state.services.invoicing.create_invoice(input).await?;
    Ok((
        StatusCode::CREATED,
        Json(DocumentWithWarnings {
            document: invoice,
            warnings,
        }),
    ))
}

async fn get_invoice(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<DocumentResponse<InvoiceResponse>>, ServiceError> {
    let invoice = state.services.invoicing.get_invoice(id).await?;
    Ok(Json(DocumentResponse { document: invoice }))
}

async fn record_payment(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(request): Json<RecordPaymentRequest>,
) -> Result<Json<DocumentResponse<InvoiceResponse>>, ServiceError> {
    let invoice = state
        .services
        .invoicing
        .record_payment(id, request.paid_amount)
        .await?;
    Ok(Json(DocumentResponse { document: invoice }))
}

async fn record_shipment(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(request): Json<RecordShipmentRequest>,
) -> Result<Json<DocumentResponse<InvoiceResponse>>, ServiceError> {
    let invoice = state
        .services
        .invoicing
        .record_shipment(id, request.shipped_amount)
        .await?;
    Ok(Json(DocumentResponse { document: invoice }))
}

async fn transition_invoice(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(request): Json<TransitionInvoiceRequest>,
) -> Result<Json<DocumentResponse<InvoiceResponse>>, ServiceError> {
    let invoice = state
        .services
        .invoicing
        .transition(id, request.status)
        .await?;
    Ok(Json(DocumentResponse { document: invoice }))
}
