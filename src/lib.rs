//! Order-to-cash core service.
//!
//! Customer orders, warehouse-split shipments, and sales invoices over a
//! shared multi-warehouse stock pool. Stock mutates exactly once per
//! document, at its commit point: shipment creation (allocation commit)
//! and invoice creation (settlement). Order reservation is an advisory
//! soft-hold. Status transitions validate against fixed per-document
//! graphs and never touch stock themselves.
#![forbid(unsafe_code)]
#![deny(rust_2018_idioms)]
#![warn(clippy::all, clippy::perf, clippy::dbg_macro)]

pub mod config;
pub mod db;
pub mod entities;
pub mod errors;
pub mod events;
pub mod handlers;
pub mod models;
pub mod services;

use std::sync::Arc;

use axum::{response::Json, routing::get, Router};
use chrono::Utc;
use sea_orm::DatabaseConnection;
use serde::Serialize;
use serde_json::{json, Value};

use crate::events::EventSender;
use crate::services::StockShortfall;

/// Shared application state for the HTTP layer.
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<DatabaseConnection>,
    pub config: config::AppConfig,
    pub event_sender: EventSender,
    pub services: handlers::AppServices,
}

/// `{document}` envelope for operations without warnings.
#[derive(Debug, Serialize)]
pub struct DocumentResponse<T> {
    pub document: T,
}

/// `{document, warnings[]}` envelope for creations that may report soft
/// stock shortfalls.
#[derive(Debug, Serialize)]
pub struct DocumentWithWarnings<T> {
    pub document: T,
    pub warnings: Vec<StockShortfall>,
}

pub fn app_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .merge(handlers::orders::routes())
        .merge(handlers::shipments::routes())
        .merge(handlers::invoices::routes())
        .merge(handlers::products::routes())
        .with_state(state)
}

async fn health() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "service": "ordercash-api",
        "timestamp": Utc::now().to_rfc3339(),
    }))
}
