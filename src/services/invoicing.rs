//! Invoice settlement: totals, unconditional stock deduction at
//! creation, and payment/shipping progress afterwards.
//!
//! Invoices are always allowed to push stock negative; every shortfall is
//! returned as a warning next to the created invoice, in the same
//! soft-fail style as order reservation. After creation only
//! `paid_amount`, `shipped_amount`, and the derived statuses change.

use std::sync::Arc;

use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set,
    TransactionTrait,
};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument, warn};
use uuid::Uuid;
use validator::Validate;

use crate::entities::{sales_invoice, sales_invoice_line, warehouse};
use crate::errors::ServiceError;
use crate::events::{Event, EventSender};
use crate::models::line::{self, round_money};
use crate::models::status::{DocumentType, InvoiceStatus, ShippedStatus};
use crate::services::{audit, availability, stock, StockShortfall, MAX_COMMIT_ATTEMPTS};

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CreateInvoiceInput {
    #[validate(length(min = 1, max = 50, message = "Invoice number is required"))]
    pub invoice_number: String,
    pub customer_id: Uuid,
    #[validate(length(min = 3, max = 3, message = "Currency must be a 3-letter code"))]
    pub currency: String,
    pub exchange_rate: Decimal,
    #[validate(length(min = 1, message = "At least one line is required"))]
    pub lines: Vec<InvoiceLineInput>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InvoiceLineInput {
    pub product_id: Uuid,
    /// Warehouse the quantity ships from; `None` deducts from the
    /// product's global stock only.
    pub warehouse_id: Option<Uuid>,
    pub quantity: i32,
    pub selling_price: Decimal,
    #[serde(default)]
    pub cost_price: Decimal,
    #[serde(default)]
    pub discount_pct: Decimal,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InvoiceLineResponse {
    pub line_no: i32,
    pub product_id: Uuid,
    pub warehouse_id: Option<Uuid>,
    pub quantity: i32,
    pub selling_price: Decimal,
    pub cost_price: Decimal,
    pub discount_pct: Decimal,
    pub discount_amount: Decimal,
    pub total: Decimal,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InvoiceResponse {
    pub id: Uuid,
    pub invoice_number: String,
    pub customer_id: Uuid,
    pub currency: String,
    pub exchange_rate: Decimal,
    pub total_amount: Decimal,
    pub discount_total: Decimal,
    pub final_amount: Decimal,
    pub paid_amount: Decimal,
    pub shipped_amount: Decimal,
    pub status: InvoiceStatus,
    pub shipped_status: ShippedStatus,
    pub base_final_amount: Decimal,
    pub lines: Vec<InvoiceLineResponse>,
}

#[derive(Clone)]
pub struct InvoiceService {
    db: Arc<DatabaseConnection>,
    event_sender: EventSender,
}

impl InvoiceService {
    pub fn new(db: Arc<DatabaseConnection>, event_sender: EventSender) -> Self {
        Self { db, event_sender }
    }

    /// Creates the invoice and deducts stock in one transaction.
    ///
    /// Deduction is unconditional; shortfalls come back as warnings with
    /// the created invoice. `total_amount` is the gross sum of
    /// `quantity * selling_price`, `final_amount` the payable net.
    #[instrument(skip(self, input), fields(invoice_number = %input.invoice_number))]
    pub async fn create_invoice(
        &self,
        input: CreateInvoiceInput,
    ) -> Result<(InvoiceResponse, Vec<StockShortfall>), ServiceError> {
        for attempt in 1..=MAX_COMMIT_ATTEMPTS {
            match self.try_create(&input).await {
                Err(ServiceError::ConcurrentModification(id)) if attempt < MAX_COMMIT_ATTEMPTS => {
                    warn!(
                        "invoice {} lost a stock race on {id}, retrying",
                        input.invoice_number
                    );
                }
                Ok((response, warnings)) => {
                    self.event_sender
                        .publish(Event::InvoiceCreated {
                            invoice_id: response.id,
                            shortfall_count: warnings.len(),
                        })
                        .await;
                    return Ok((response, warnings));
                }
                Err(e) => return Err(e),
            }
        }
        Err(ServiceError::InternalError(format!(
            "invoice {} could not be committed after {MAX_COMMIT_ATTEMPTS} attempts",
            input.invoice_number
        )))
    }

    async fn try_create(
        &self,
        input: &CreateInvoiceInput,
    ) -> Result<(InvoiceResponse, Vec<StockShortfall>), ServiceError> {
        input.validate()?;
        if input.exchange_rate <= Decimal::ZERO {
            return Err(ServiceError::ValidationError(format!(
                "exchange_rate must be positive, got {}",
                input.exchange_rate
            )));
        }

        // Hard-validate and derive every line before touching stock
        let mut computed = Vec::with_capacity(input.lines.len());
        for (idx, line_input) in input.lines.iter().enumerate() {
            let line_no = idx as i32 + 1;
            if line_input.cost_price < Decimal::ZERO {
                return Err(ServiceError::ValidationError(format!(
                    "line {line_no}: cost_price must not be negative"
                )));
            }
            let amounts = line::recalc_line(
                line_input.quantity,
                line_input.selling_price,
                line_input.discount_pct,
            )
            .map_err(|e| match e {
                ServiceError::ValidationError(msg) => {
                    ServiceError::ValidationError(format!("line {line_no}: {msg}"))
                }
                other => other,
            })?;
            computed.push(amounts);
        }

        let mut total_amount = Decimal::ZERO;
        let mut discount_total = Decimal::ZERO;
        for (line_input, amounts) in input.lines.iter().zip(&computed) {
            total_amount += round_money(
                Decimal::from(line_input.quantity) * line_input.selling_price,
            );
            discount_total += amounts.discount_amount;
        }
        let final_amount = total_amount - discount_total;

        let mut warnings = Vec::new();
        let txn = self.db.begin().await?;

        for (idx, line_input) in input.lines.iter().enumerate() {
            if let Some(warehouse_id) = line_input.warehouse_id {
                warehouse::Entity::find_by_id(warehouse_id)
                    .one(&txn)
                    .await?
                    .ok_or_else(|| {
                        ServiceError::ValidationError(format!(
                            "line {}: warehouse {} does not exist",
                            idx + 1,
                            warehouse_id
                        ))
                    })?;
            }
        }

        for line_input in &input.lines {
            let available =
                availability::available(&txn, line_input.product_id, line_input.warehouse_id)
                    .await?;
            if available < line_input.quantity {
                warnings.push(StockShortfall::new(
                    line_input.product_id,
                    line_input.warehouse_id,
                    line_input.quantity,
                    available,
                ));
            }
            if let Some(warehouse_id) = line_input.warehouse_id {
                stock::adjust_warehouse_stock(
                    &txn,
                    line_input.product_id,
                    warehouse_id,
                    -line_input.quantity,
                    true,
                )
                .await?;
            }
            stock::adjust_product_quantity(&txn, line_input.product_id, -line_input.quantity, true)
                .await?;
        }

        let now = Utc::now();
        let invoice_id = Uuid::new_v4();
        let header = sales_invoice::ActiveModel {
            id: Set(invoice_id),
            invoice_number: Set(input.invoice_number.clone()),
            customer_id: Set(input.customer_id),
            currency: Set(input.currency.clone()),
            exchange_rate: Set(input.exchange_rate),
            total_amount: Set(total_amount),
            discount_total: Set(discount_total),
            final_amount: Set(final_amount),
            paid_amount: Set(Decimal::ZERO),
            shipped_amount: Set(Decimal::ZERO),
            status: Set(InvoiceStatus::Unpaid),
            shipped_status: Set(ShippedStatus::NotShipped),
            version: Set(1),
            created_at: Set(now),
            updated_at: Set(now),
        };
        header.insert(&txn).await?;

        for (idx, (line_input, amounts)) in input.lines.iter().zip(&computed).enumerate() {
            let row = sales_invoice_line::ActiveModel {
                id: Set(Uuid::new_v4()),
                invoice_id: Set(invoice_id),
                line_no: Set(idx as i32 + 1),
                product_id: Set(line_input.product_id),
                warehouse_id: Set(line_input.warehouse_id),
                quantity: Set(line_input.quantity),
                selling_price: Set(line_input.selling_price),
                cost_price: Set(line_input.cost_price),
                discount_pct: Set(line_input.discount_pct),
                discount_amount: Set(amounts.discount_amount),
                total: Set(amounts.total),
                created_at: Set(now),
            };
            row.insert(&txn).await?;
        }
        txn.commit().await?;

        info!(
            "settled invoice {} ({} lines, {} shortfalls)",
            input.invoice_number,
            input.lines.len(),
            warnings.len()
        );
        let response = self.get_invoice(invoice_id).await?;
        Ok((response, warnings))
    }

    pub async fn get_invoice(&self, invoice_id: Uuid) -> Result<InvoiceResponse, ServiceError> {
        let header = sales_invoice::Entity::find_by_id(invoice_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| {
                ServiceError::NotFound(format!("Invoice {invoice_id} not found"))
            })?;
        let lines = sales_invoice_line::Entity::find()
            .filter(sales_invoice_line::Column::InvoiceId.eq(invoice_id))
            .order_by_asc(sales_invoice_line::Column::LineNo)
            .all(&*self.db)
            .await?;
        Ok(invoice_response(header, lines))
    }

    /// Records the cumulative paid amount and recomputes the payment
    /// status. A manually cancelled invoice keeps its status.
    #[instrument(skip(self))]
    pub async fn record_payment(
        &self,
        invoice_id: Uuid,
        new_paid_amount: Decimal,
    ) -> Result<InvoiceResponse, ServiceError> {
        if new_paid_amount < Decimal::ZERO {
            return Err(ServiceError::ValidationError(format!(
                "paid_amount must not be negative, got {new_paid_amount}"
            )));
        }
        let header = sales_invoice::Entity::find_by_id(invoice_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| {
                ServiceError::NotFound(format!("Invoice {invoice_id} not found"))
            })?;

        let new_status = if header.status == InvoiceStatus::Cancelled {
            InvoiceStatus::Cancelled
        } else {
            InvoiceStatus::from_paid_amount(new_paid_amount, header.final_amount)
        };

        let txn = self.db.begin().await?;
        let result = sales_invoice::Entity::update_many()
            .col_expr(
                sales_invoice::Column::PaidAmount,
                Expr::value(new_paid_amount),
            )
            .col_expr(sales_invoice::Column::Status, Expr::value(new_status))
            .col_expr(
                sales_invoice::Column::Version,
                Expr::value(header.version + 1),
            )
            .col_expr(sales_invoice::Column::UpdatedAt, Expr::value(Utc::now()))
            .filter(sales_invoice::Column::Id.eq(invoice_id))
            .filter(sales_invoice::Column::Version.eq(header.version))
            .exec(&txn)
            .await?;
        if result.rows_affected == 0 {
            return Err(ServiceError::ConcurrentModification(invoice_id));
        }
        txn.commit().await?;

        self.event_sender
            .publish(Event::InvoicePaymentRecorded {
                invoice_id,
                paid_amount: new_paid_amount,
            })
            .await;
        self.get_invoice(invoice_id).await
    }

    /// Records the cumulative shipped amount and recomputes the shipping
    /// progress status.
    #[instrument(skip(self))]
    pub async fn record_shipment(
        &self,
        invoice_id: Uuid,
        new_shipped_amount: Decimal,
    ) -> Result<InvoiceResponse, ServiceError> {
        if new_shipped_amount < Decimal::ZERO {
            return Err(ServiceError::ValidationError(format!(
                "shipped_amount must not be negative, got {new_shipped_amount}"
            )));
        }
        let header = sales_invoice::Entity::find_by_id(invoice_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| {
                ServiceError::NotFound(format!("Invoice {invoice_id} not found"))
            })?;
        let shipped_status =
            ShippedStatus::from_shipped_amount(new_shipped_amount, header.final_amount);

        let txn = self.db.begin().await?;
        let result = sales_invoice::Entity::update_many()
            .col_expr(
                sales_invoice::Column::ShippedAmount,
                Expr::value(new_shipped_amount),
            )
            .col_expr(
                sales_invoice::Column::ShippedStatus,
                Expr::value(shipped_status),
            )
            .col_expr(
                sales_invoice::Column::Version,
                Expr::value(header.version + 1),
            )
            .col_expr(sales_invoice::Column::UpdatedAt, Expr::value(Utc::now()))
            .filter(sales_invoice::Column::Id.eq(invoice_id))
            .filter(sales_invoice::Column::Version.eq(header.version))
            .exec(&txn)
            .await?;
        if result.rows_affected == 0 {
            return Err(ServiceError::ConcurrentModification(invoice_id));
        }
        txn.commit().await?;
        self.get_invoice(invoice_id).await
    }

    /// Manual status move; in practice only cancellation. Stock committed
    /// at settlement is not rolled back here — reversal takes an explicit
    /// compensating document.
    #[instrument(skip(self))]
    pub async fn transition(
        &self,
        invoice_id: Uuid,
        target: InvoiceStatus,
    ) -> Result<InvoiceResponse, ServiceError> {
        let header = sales_invoice::Entity::find_by_id(invoice_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| {
                ServiceError::NotFound(format!("Invoice {invoice_id} not found"))
            })?;
        let current = header.status;
        if !current.can_transition_to(target) {
            return Err(ServiceError::InvalidStatus(format!(
                "invoice {invoice_id}: {current} -> {target} is not allowed"
            )));
        }

        let txn = self.db.begin().await?;
        let result = sales_invoice::Entity::update_many()
            .col_expr(sales_invoice::Column::Status, Expr::value(target))
            .col_expr(
                sales_invoice::Column::Version,
                Expr::value(header.version + 1),
            )
            .col_expr(sales_invoice::Column::UpdatedAt, Expr::value(Utc::now()))
            .filter(sales_invoice::Column::Id.eq(invoice_id))
            .filter(sales_invoice::Column::Version.eq(header.version))
            .exec(&txn)
            .await?;
        if result.rows_affected == 0 {
            return Err(ServiceError::ConcurrentModification(invoice_id));
        }
        audit::record_transition(
            &txn,
            DocumentType::Invoice,
            invoice_id,
            &current.to_string(),
            &target.to_string(),
        )
        .await?;
        txn.commit().await?;

        self.event_sender
            .publish(Event::StatusChanged {
                document_type: DocumentType::Invoice.to_string(),
                document_id: invoice_id,
                from_status: current.to_string(),
                to_status: target.to_string(),
            })
            .await;
        self.get_invoice(invoice_id).await
    }
}

fn invoice_response(
    header: sales_invoice::Model,
    lines: Vec<sales_invoice_line::Model>,
) -> InvoiceResponse {
    InvoiceResponse {
        base_final_amount: line::base_equivalent(header.final_amount, header.exchange_rate),
        id: header.id,
        invoice_number: header.invoice_number,
        customer_id: header.customer_id,
        currency: header.currency,
        exchange_rate: header.exchange_rate,
        total_amount: header.total_amount,
        discount_total: header.discount_total,
        final_amount: header.final_amount,
        paid_amount: header.paid_amount,
        shipped_amount: header.shipped_amount,
        status: header.status,
        shipped_status: header.shipped_status,
        lines: lines
            .into_iter()
            .map(|l| InvoiceLineResponse {
                line_no: l.line_no,
                product_id: l.product_id,
                warehouse_id: l.warehouse_id,
                quantity: l.quantity,
                selling_price: l.selling_price,
                cost_price: l.cost_price,
                discount_pct: l.discount_pct,
                discount_amount: l.discount_amount,
                total: l.total,
            })
            .collect(),
    }
}
