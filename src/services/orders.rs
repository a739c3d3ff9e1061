//! Customer order operations: creation, draft line edits, and status
//! transitions. Orders never mutate stock directly; reservation is the
//! advisory soft-hold handled by [`crate::services::reservation`].

use std::sync::Arc;

use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set,
    TransactionTrait,
};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};
use uuid::Uuid;
use validator::Validate;

use crate::entities::{sales_order, sales_order_line};
use crate::errors::ServiceError;
use crate::events::{Event, EventSender};
use crate::models::line::{self, LineView};
use crate::models::status::{DocumentType, OrderStatus};
use crate::services::audit;

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CreateOrderInput {
    #[validate(length(min = 1, max = 50, message = "Order number is required"))]
    pub order_number: String,
    pub customer_id: Uuid,
    #[validate(length(min = 3, max = 3, message = "Currency must be a 3-letter code"))]
    pub currency: String,
    /// Rate to the base currency; 1 for base-currency documents.
    pub exchange_rate: Decimal,
    #[validate(length(min = 1, message = "At least one line is required"))]
    pub lines: Vec<OrderLineInput>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderLineInput {
    pub product_id: Uuid,
    pub quantity: i32,
    pub unit_price: Decimal,
    #[serde(default)]
    pub discount_pct: Decimal,
    #[serde(default)]
    pub vat_pct: Decimal,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct UpdateOrderLinesInput {
    #[validate(length(min = 1, message = "At least one line is required"))]
    pub lines: Vec<OrderLineInput>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderLineResponse {
    pub line_no: i32,
    pub product_id: Uuid,
    pub quantity: i32,
    pub unit_price: Decimal,
    pub discount_pct: Decimal,
    pub vat_pct: Decimal,
    pub discount_amount: Decimal,
    pub total: Decimal,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderResponse {
    pub id: Uuid,
    pub order_number: String,
    pub customer_id: Uuid,
    pub currency: String,
    pub exchange_rate: Decimal,
    pub status: OrderStatus,
    pub reserved: bool,
    pub total_amount: Decimal,
    pub discount_total: Decimal,
    pub vat_total: Decimal,
    /// Derived on demand; never a second stored source of truth.
    pub base_total_amount: Decimal,
    pub lines: Vec<OrderLineResponse>,
}

pub(crate) fn order_response(
    order: sales_order::Model,
    lines: Vec<sales_order_line::Model>,
) -> OrderResponse {
    OrderResponse {
        base_total_amount: line::base_equivalent(order.total_amount, order.exchange_rate),
        id: order.id,
        order_number: order.order_number,
        customer_id: order.customer_id,
        currency: order.currency,
        exchange_rate: order.exchange_rate,
        status: order.status,
        reserved: order.reserved,
        total_amount: order.total_amount,
        discount_total: order.discount_total,
        vat_total: order.vat_total,
        lines: lines
            .into_iter()
            .map(|l| OrderLineResponse {
                line_no: l.line_no,
                product_id: l.product_id,
                quantity: l.quantity,
                unit_price: l.unit_price,
                discount_pct: l.discount_pct,
                vat_pct: l.vat_pct,
                discount_amount: l.discount_amount,
                total: l.total,
            })
            .collect(),
    }
}

pub(crate) async fn load_order(
    db: &DatabaseConnection,
    order_id: Uuid,
) -> Result<(sales_order::Model, Vec<sales_order_line::Model>), ServiceError> {
    let order = sales_order::Entity::find_by_id(order_id)
        .one(db)
        .await?
        .ok_or_else(|| ServiceError::NotFound(format!("Order {order_id} not found")))?;
    let lines = sales_order_line::Entity::find()
        .filter(sales_order_line::Column::OrderId.eq(order_id))
        .order_by_asc(sales_order_line::Column::LineNo)
        .all(db)
        .await?;
    Ok((order, lines))
}

/// Runs every line through the calculator and aggregates document totals.
/// Errors name the offending line.
pub(crate) fn recalc_lines(
    lines: &[OrderLineInput],
) -> Result<(Vec<LineView>, line::DocumentTotals), ServiceError> {
    let mut views = Vec::with_capacity(lines.len());
    for (idx, input) in lines.iter().enumerate() {
        let line_no = idx as i32 + 1;
        if input.vat_pct < Decimal::ZERO || input.vat_pct > Decimal::ONE_HUNDRED {
            return Err(ServiceError::ValidationError(format!(
                "line {line_no}: vat_pct must be between 0 and 100, got {}",
                input.vat_pct
            )));
        }
        let amounts = line::recalc_line(input.quantity, input.unit_price, input.discount_pct)
            .map_err(|e| match e {
                ServiceError::ValidationError(msg) => {
                    ServiceError::ValidationError(format!("line {line_no}: {msg}"))
                }
                other => other,
            })?;
        views.push(LineView {
            quantity: input.quantity,
            unit_price: input.unit_price,
            discount_pct: input.discount_pct,
            vat_pct: input.vat_pct,
            discount_amount: amounts.discount_amount,
            total: amounts.total,
        });
    }
    let totals = line::aggregate(&views);
    Ok((views, totals))
}

#[derive(Clone)]
pub struct OrderService {
    db: Arc<DatabaseConnection>,
    event_sender: EventSender,
}

impl OrderService {
    pub fn new(db: Arc<DatabaseConnection>, event_sender: EventSender) -> Self {
        Self { db, event_sender }
    }

    /// Creates an order in the initial `new` status. No stock moves here.
    #[instrument(skip(self, input), fields(order_number = %input.order_number))]
    pub async fn create_order(
        &self,
        input: CreateOrderInput,
    ) -> Result<OrderResponse, ServiceError> {
        input.validate()?;
        if input.exchange_rate <= Decimal::ZERO {
            return Err(ServiceError::ValidationError(format!(
                "exchange_rate must be positive, got {}",
                input.exchange_rate
            )));
        }
        let (views, totals) = recalc_lines(&input.lines)?;

        let now = Utc::now();
        let order_id = Uuid::new_v4();
        let txn = self.db.begin().await?;

        let order = sales_order::ActiveModel {
            id: Set(order_id),
            order_number: Set(input.order_number.clone()),
            customer_id: Set(input.customer_id),
            currency: Set(input.currency.clone()),
            exchange_rate: Set(input.exchange_rate),
            status: Set(OrderStatus::New),
            reserved: Set(false),
            total_amount: Set(totals.total_amount),
            discount_total: Set(totals.discount_total),
            vat_total: Set(totals.vat_amount),
            version: Set(1),
            created_at: Set(now),
            updated_at: Set(now),
        };
        let order = order.insert(&txn).await?;

        for (idx, (input_line, view)) in input.lines.iter().zip(&views).enumerate() {
            let row = sales_order_line::ActiveModel {
                id: Set(Uuid::new_v4()),
                order_id: Set(order_id),
                line_no: Set(idx as i32 + 1),
                product_id: Set(input_line.product_id),
                quantity: Set(input_line.quantity),
                unit_price: Set(input_line.unit_price),
                discount_pct: Set(input_line.discount_pct),
                vat_pct: Set(input_line.vat_pct),
                discount_amount: Set(view.discount_amount),
                total: Set(view.total),
                created_at: Set(now),
            };
            row.insert(&txn).await?;
        }
        txn.commit().await?;

        info!("created order {} ({})", order_id, order.order_number);
        self.event_sender
            .publish(Event::OrderCreated { order_id })
            .await;

        let (order, lines) = load_order(&self.db, order_id).await?;
        Ok(order_response(order, lines))
    }

    pub async fn get_order(&self, order_id: Uuid) -> Result<OrderResponse, ServiceError> {
        let (order, lines) = load_order(&self.db, order_id).await?;
        Ok(order_response(order, lines))
    }

    /// Replaces the line set of a draft order and recomputes totals.
    /// Rejected once the order has left `new` or while it holds a
    /// reservation (release first, then edit).
    #[instrument(skip(self, input))]
    pub async fn update_lines(
        &self,
        order_id: Uuid,
        input: UpdateOrderLinesInput,
    ) -> Result<OrderResponse, ServiceError> {
        input.validate()?;
        let (order, _) = load_order(&self.db, order_id).await?;
        if !order.status.is_editable() {
            return Err(ServiceError::ValidationError(format!(
                "order {} is {}, lines can only be edited while new",
                order_id, order.status
            )));
        }
        if order.reserved {
            return Err(ServiceError::ValidationError(format!(
                "order {order_id} is reserved; release it before editing lines"
            )));
        }
        let (views, totals) = recalc_lines(&input.lines)?;

        let now = Utc::now();
        let txn = self.db.begin().await?;
        sales_order_line::Entity::delete_many()
            .filter(sales_order_line::Column::OrderId.eq(order_id))
            .exec(&txn)
            .await?;
        for (idx, (input_line, view)) in input.lines.iter().zip(&views).enumerate() {
            let row = sales_order_line::ActiveModel {
                id: Set(Uuid::new_v4()),
                order_id: Set(order_id),
                line_no: Set(idx as i32 + 1),
                product_id: Set(input_line.product_id),
                quantity: Set(input_line.quantity),
                unit_price: Set(input_line.unit_price),
                discount_pct: Set(input_line.discount_pct),
                vat_pct: Set(input_line.vat_pct),
                discount_amount: Set(view.discount_amount),
                total: Set(view.total),
                created_at: Set(now),
            };
            row.insert(&txn).await?;
        }
        let result = sales_order::Entity::update_many()
            .col_expr(
                sales_order::Column::TotalAmount,
                Expr::value(totals.total_amount),
            )
            .col_expr(
                sales_order::Column::DiscountTotal,
                Expr::value(totals.discount_total),
            )
            .col_expr(sales_order::Column::VatTotal, Expr::value(totals.vat_amount))
            .col_expr(sales_order::Column::Version, Expr::value(order.version + 1))
            .col_expr(sales_order::Column::UpdatedAt, Expr::value(now))
            .filter(sales_order::Column::Id.eq(order_id))
            .filter(sales_order::Column::Version.eq(order.version))
            .exec(&txn)
            .await?;
        if result.rows_affected == 0 {
            return Err(ServiceError::ConcurrentModification(order_id));
        }
        txn.commit().await?;

        let (order, lines) = load_order(&self.db, order_id).await?;
        Ok(order_response(order, lines))
    }

    /// Moves the order along its status graph and records the audit row.
    /// The state machine only validates and records; any side effects are
    /// the caller's to invoke afterwards.
    #[instrument(skip(self))]
    pub async fn transition(
        &self,
        order_id: Uuid,
        target: OrderStatus,
    ) -> Result<OrderResponse, ServiceError> {
        let (order, _) = load_order(&self.db, order_id).await?;
        let current = order.status;
        if !current.can_transition_to(target) {
            return Err(ServiceError::InvalidStatus(format!(
                "order {order_id}: {current} -> {target} is not allowed"
            )));
        }

        let txn = self.db.begin().await?;
        let result = sales_order::Entity::update_many()
            .col_expr(sales_order::Column::Status, Expr::value(target))
            .col_expr(sales_order::Column::Version, Expr::value(order.version + 1))
            .col_expr(sales_order::Column::UpdatedAt, Expr::value(Utc::now()))
            .filter(sales_order::Column::Id.eq(order_id))
            .filter(sales_order::Column::Version.eq(order.version))
            .exec(&txn)
            .await?;
        if result.rows_affected == 0 {
            return Err(ServiceError::ConcurrentModification(order_id));
        }
        audit::record_transition(
            &txn,
            DocumentType::Order,
            order_id,
            &current.to_string(),
            &target.to_string(),
        )
        .await?;
        txn.commit().await?;

        self.event_sender
            .publish(Event::StatusChanged {
                document_type: DocumentType::Order.to_string(),
                document_id: order_id,
                from_status: current.to_string(),
                to_status: target.to_string(),
            })
            .await;

        let (order, lines) = load_order(&self.db, order_id).await?;
        Ok(order_response(order, lines))
    }
}
