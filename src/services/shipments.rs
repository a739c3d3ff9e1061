//! Shipment creation (allocation commit) and status transitions.
//!
//! A shipment line's allocations must cover its required quantity
//! exactly before anything persists. The commit is all-or-nothing for the
//! whole shipment: one failing line or entry rolls everything back and
//! the error names the line, the warehouse, and the shortfall.

use std::collections::HashSet;
use std::sync::Arc;

use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DatabaseTransaction, EntityTrait,
    QueryFilter, QueryOrder, Set, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument, warn};
use uuid::Uuid;
use validator::Validate;

use crate::entities::{
    sales_order, sales_order_line, shipment, shipment_allocation, shipment_line, warehouse,
};
use crate::errors::ServiceError;
use crate::events::{Event, EventSender};
use crate::models::allocation::{
    self, AllocationEntry, AllocationIssue, AllocationSummary,
};
use crate::models::line::round_money;
use crate::models::status::{DocumentType, ShipmentStatus};
use crate::services::{audit, availability, stock, MAX_COMMIT_ATTEMPTS};

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CreateShipmentInput {
    #[validate(length(min = 1, max = 50, message = "Shipment number is required"))]
    pub shipment_number: String,
    pub order_id: Uuid,
    #[serde(default)]
    pub allow_negative_stock: bool,
    #[validate(length(min = 1, message = "At least one line is required"))]
    pub lines: Vec<ShipmentLineInput>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShipmentLineInput {
    pub product_id: Uuid,
    pub required_quantity: i32,
    pub unit_price: Decimal,
    pub allocations: Vec<AllocationEntry>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShipmentLineResponse {
    pub line_no: i32,
    pub product_id: Uuid,
    pub required_quantity: i32,
    pub unit_price: Decimal,
    pub total: Decimal,
    pub allocations: Vec<AllocationEntry>,
    pub summary: AllocationSummary,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShipmentResponse {
    pub id: Uuid,
    pub shipment_number: String,
    pub order_id: Uuid,
    pub status: ShipmentStatus,
    pub allow_negative_stock: bool,
    pub lines: Vec<ShipmentLineResponse>,
}

/// Per-line feedback for an allocation being edited: progress plus every
/// issue that would block a commit right now.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AllocationPreviewLine {
    pub line_no: i32,
    pub product_id: Uuid,
    pub summary: AllocationSummary,
    pub issues: Vec<AllocationIssue>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AllocationPreview {
    pub lines: Vec<AllocationPreviewLine>,
    pub can_commit: bool,
}

#[derive(Clone)]
pub struct ShipmentService {
    db: Arc<DatabaseConnection>,
    event_sender: EventSender,
}

impl ShipmentService {
    pub fn new(db: Arc<DatabaseConnection>, event_sender: EventSender) -> Self {
        Self { db, event_sender }
    }

    /// Validates and commits a shipment with its warehouse allocations.
    ///
    /// On success every allocation entry has decremented its warehouse
    /// stock (and the product's global counter) and the shipment is
    /// persisted as `pending`. On any failure nothing is persisted.
    #[instrument(skip(self, input), fields(shipment_number = %input.shipment_number))]
    pub async fn create_shipment(
        &self,
        input: CreateShipmentInput,
    ) -> Result<ShipmentResponse, ServiceError> {
        for attempt in 1..=MAX_COMMIT_ATTEMPTS {
            match self.try_create(&input).await {
                Err(ServiceError::ConcurrentModification(id)) if attempt < MAX_COMMIT_ATTEMPTS => {
                    warn!(
                        "shipment {} lost a stock race on {id}, retrying",
                        input.shipment_number
                    );
                }
                Ok(response) => {
                    self.event_sender
                        .publish(Event::ShipmentCreated {
                            shipment_id: response.id,
                            order_id: response.order_id,
                        })
                        .await;
                    return Ok(response);
                }
                Err(e) => return Err(e),
            }
        }
        Err(ServiceError::InternalError(format!(
            "shipment {} could not be committed after {MAX_COMMIT_ATTEMPTS} attempts",
            input.shipment_number
        )))
    }

    async fn try_create(
        &self,
        input: &CreateShipmentInput,
    ) -> Result<ShipmentResponse, ServiceError> {
        input.validate()?;

        // Structural gate: positive quantities and exact coverage,
        // before any database work.
        let mut issues = Vec::new();
        for (idx, line) in input.lines.iter().enumerate() {
            if line.required_quantity <= 0 {
                return Err(ServiceError::ValidationError(format!(
                    "line {}: required_quantity must be positive, got {}",
                    idx + 1,
                    line.required_quantity
                )));
            }
            issues.extend(allocation::validate_coverage(
                idx as i32 + 1,
                line.required_quantity,
                &line.allocations,
            ));
        }
        if !issues.is_empty() {
            return Err(ServiceError::ValidationError(allocation::issues_message(
                &issues,
            )));
        }

        let txn = self.db.begin().await?;

        let order = sales_order::Entity::find_by_id(input.order_id)
            .one(&txn)
            .await?
            .ok_or_else(|| {
                ServiceError::NotFound(format!("Order {} not found", input.order_id))
            })?;
        let order_products: HashSet<Uuid> = sales_order_line::Entity::find()
            .filter(sales_order_line::Column::OrderId.eq(order.id))
            .all(&txn)
            .await?
            .into_iter()
            .map(|l| l.product_id)
            .collect();
        for (idx, line) in input.lines.iter().enumerate() {
            if !order_products.contains(&line.product_id) {
                return Err(ServiceError::ValidationError(format!(
                    "line {}: product {} is not on order {}",
                    idx + 1,
                    line.product_id,
                    order.order_number
                )));
            }
        }
        self.check_warehouses_exist(&txn, input).await?;

        // Availability gate against live stock, entry by entry. Collected
        // in full so the caller sees every shortfall at once.
        if !input.allow_negative_stock {
            let mut shortfalls = Vec::new();
            for (idx, line) in input.lines.iter().enumerate() {
                for entry in &line.allocations {
                    let available = availability::available(
                        &txn,
                        line.product_id,
                        Some(entry.warehouse_id),
                    )
                    .await?;
                    if available < entry.quantity {
                        shortfalls.push(AllocationIssue::Shortfall {
                            line_no: idx as i32 + 1,
                            warehouse_id: entry.warehouse_id,
                            requested: entry.quantity,
                            available,
                            shortfall: entry.quantity - available,
                        });
                    }
                }
            }
            if !shortfalls.is_empty() {
                // Dropping the transaction rolls back; stock is untouched
                return Err(ServiceError::InsufficientStock(allocation::issues_message(
                    &shortfalls,
                )));
            }
        }

        // Commit: decrement each named warehouse and the global counter.
        // The adjustments re-check inside the transaction, so entries
        // naming the same warehouse cannot jointly overdraw what each
        // passed the snapshot gate with.
        for line in &input.lines {
            for entry in &line.allocations {
                stock::adjust_warehouse_stock(
                    &txn,
                    line.product_id,
                    entry.warehouse_id,
                    -entry.quantity,
                    input.allow_negative_stock,
                )
                .await?;
                stock::adjust_product_quantity(
                    &txn,
                    line.product_id,
                    -entry.quantity,
                    input.allow_negative_stock,
                )
                .await?;
            }
        }

        let now = Utc::now();
        let shipment_id = Uuid::new_v4();
        let header = shipment::ActiveModel {
            id: Set(shipment_id),
            shipment_number: Set(input.shipment_number.clone()),
            order_id: Set(input.order_id),
            status: Set(ShipmentStatus::Pending),
            allow_negative_stock: Set(input.allow_negative_stock),
            version: Set(1),
            created_at: Set(now),
            updated_at: Set(now),
        };
        header.insert(&txn).await?;

        for (idx, line) in input.lines.iter().enumerate() {
            let line_id = Uuid::new_v4();
            let row = shipment_line::ActiveModel {
                id: Set(line_id),
                shipment_id: Set(shipment_id),
                line_no: Set(idx as i32 + 1),
                product_id: Set(line.product_id),
                required_quantity: Set(line.required_quantity),
                unit_price: Set(line.unit_price),
                total: Set(round_money(
                    Decimal::from(line.required_quantity) * line.unit_price,
                )),
                created_at: Set(now),
            };
            row.insert(&txn).await?;
            for entry in &line.allocations {
                let alloc = shipment_allocation::ActiveModel {
                    id: Set(Uuid::new_v4()),
                    shipment_line_id: Set(line_id),
                    warehouse_id: Set(entry.warehouse_id),
                    quantity: Set(entry.quantity),
                    created_at: Set(now),
                };
                alloc.insert(&txn).await?;
            }
        }
        txn.commit().await?;

        info!(
            "committed shipment {} against order {} ({} lines)",
            input.shipment_number,
            input.order_id,
            input.lines.len()
        );
        self.get_shipment(shipment_id).await
    }

    async fn check_warehouses_exist(
        &self,
        txn: &DatabaseTransaction,
        input: &CreateShipmentInput,
    ) -> Result<(), ServiceError> {
        let mut seen = HashSet::new();
        for line in &input.lines {
            for entry in &line.allocations {
                if !seen.insert(entry.warehouse_id) {
                    continue;
                }
                warehouse::Entity::find_by_id(entry.warehouse_id)
                    .one(txn)
                    .await?
                    .ok_or_else(|| {
                        ServiceError::ValidationError(format!(
                            "warehouse {} does not exist",
                            entry.warehouse_id
                        ))
                    })?;
            }
        }
        Ok(())
    }

    /// Allocation feedback without committing anything: per-line
    /// progress, coverage issues, and live-stock shortfalls.
    pub async fn preview_allocations(
        &self,
        input: &CreateShipmentInput,
    ) -> Result<AllocationPreview, ServiceError> {
        let mut lines = Vec::with_capacity(input.lines.len());
        let mut can_commit = true;
        for (idx, line) in input.lines.iter().enumerate() {
            let line_no = idx as i32 + 1;
            let summary = allocation::summarize(line.required_quantity, &line.allocations);
            let mut issues =
                allocation::validate_coverage(line_no, line.required_quantity, &line.allocations);
            if !input.allow_negative_stock {
                for entry in &line.allocations {
                    let available = availability::available(
                        &*self.db,
                        line.product_id,
                        Some(entry.warehouse_id),
                    )
                    .await?;
                    if entry.quantity > 0 && available < entry.quantity {
                        issues.push(AllocationIssue::Shortfall {
                            line_no,
                            warehouse_id: entry.warehouse_id,
                            requested: entry.quantity,
                            available,
                            shortfall: entry.quantity - available,
                        });
                    }
                }
            }
            can_commit &= issues.is_empty();
            lines.push(AllocationPreviewLine {
                line_no,
                product_id: line.product_id,
                summary,
                issues,
            });
        }
        Ok(AllocationPreview { lines, can_commit })
    }

    pub async fn get_shipment(&self, shipment_id: Uuid) -> Result<ShipmentResponse, ServiceError> {
        let header = shipment::Entity::find_by_id(shipment_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| {
                ServiceError::NotFound(format!("Shipment {shipment_id} not found"))
            })?;
        let lines = shipment_line::Entity::find()
            .filter(shipment_line::Column::ShipmentId.eq(shipment_id))
            .order_by_asc(shipment_line::Column::LineNo)
            .all(&*self.db)
            .await?;

        let mut out_lines = Vec::with_capacity(lines.len());
        for line in lines {
            let allocations: Vec<AllocationEntry> = shipment_allocation::Entity::find()
                .filter(shipment_allocation::Column::ShipmentLineId.eq(line.id))
                .all(&*self.db)
                .await?
                .into_iter()
                .map(|a| AllocationEntry {
                    warehouse_id: a.warehouse_id,
                    quantity: a.quantity,
                })
                .collect();
            let summary = allocation::summarize(line.required_quantity, &allocations);
            out_lines.push(ShipmentLineResponse {
                line_no: line.line_no,
                product_id: line.product_id,
                required_quantity: line.required_quantity,
                unit_price: line.unit_price,
                total: line.total,
                allocations,
                summary,
            });
        }
        Ok(ShipmentResponse {
            id: header.id,
            shipment_number: header.shipment_number,
            order_id: header.order_id,
            status: header.status,
            allow_negative_stock: header.allow_negative_stock,
            lines: out_lines,
        })
    }

    #[instrument(skip(self))]
    pub async fn transition(
        &self,
        shipment_id: Uuid,
        target: ShipmentStatus,
    ) -> Result<ShipmentResponse, ServiceError> {
        let header = shipment::Entity::find_by_id(shipment_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| {
                ServiceError::NotFound(format!("Shipment {shipment_id} not found"))
            })?;
        let current = header.status;
        if !current.can_transition_to(target) {
            return Err(ServiceError::InvalidStatus(format!(
                "shipment {shipment_id}: {current} -> {target} is not allowed"
            )));
        }

        let txn = self.db.begin().await?;
        let result = shipment::Entity::update_many()
            .col_expr(shipment::Column::Status, Expr::value(target))
            .col_expr(shipment::Column::Version, Expr::value(header.version + 1))
            .col_expr(shipment::Column::UpdatedAt, Expr::value(Utc::now()))
            .filter(shipment::Column::Id.eq(shipment_id))
            .filter(shipment::Column::Version.eq(header.version))
            .exec(&txn)
            .await?;
        if result.rows_affected == 0 {
            return Err(ServiceError::ConcurrentModification(shipment_id));
        }
        audit::record_transition(
            &txn,
            DocumentType::Shipment,
            shipment_id,
            &current.to_string(),
            &target.to_string(),
        )
        .await?;
        txn.commit().await?;

        self.event_sender
            .publish(Event::StatusChanged {
                document_type: DocumentType::Shipment.to_string(),
                document_id: shipment_id,
                from_status: current.to_string(),
                to_status: target.to_string(),
            })
            .await;

        self.get_shipment(shipment_id).await
    }
}
