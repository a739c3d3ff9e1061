//! Order reservation: an advisory soft-hold on global product stock.
//!
//! Reservation reduces cross-order oversell without hard-blocking staff:
//! a short line still reserves, and the shortfall comes back as a warning
//! next to the reserved order. Holds are global, never warehouse-scoped.

use std::sync::Arc;

use chrono::Utc;
use sea_orm::sea_query::Expr;
use sea_orm::{
    ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, TransactionTrait,
};
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::entities::sales_order;
use crate::errors::ServiceError;
use crate::events::{Event, EventSender};
use crate::services::orders::{load_order, order_response, OrderResponse};
use crate::services::{availability, stock, StockShortfall, MAX_COMMIT_ATTEMPTS};

#[derive(Clone)]
pub struct ReservationService {
    db: Arc<DatabaseConnection>,
    event_sender: EventSender,
}

impl ReservationService {
    pub fn new(db: Arc<DatabaseConnection>, event_sender: EventSender) -> Self {
        Self { db, event_sender }
    }

    /// Soft-holds every line's quantity against the product's global
    /// counters. Shortfalls are returned as warnings, not failures.
    #[instrument(skip(self))]
    pub async fn reserve(
        &self,
        order_id: Uuid,
    ) -> Result<(OrderResponse, Vec<StockShortfall>), ServiceError> {
        for attempt in 1..=MAX_COMMIT_ATTEMPTS {
            match self.try_reserve(order_id).await {
                Err(ServiceError::ConcurrentModification(id)) if attempt < MAX_COMMIT_ATTEMPTS => {
                    warn!("reserve of order {order_id} lost a race on {id}, retrying");
                }
                Ok((response, warnings)) => {
                    self.event_sender
                        .publish(Event::OrderReserved {
                            order_id,
                            shortfall_count: warnings.len(),
                        })
                        .await;
                    return Ok((response, warnings));
                }
                Err(e) => return Err(e),
            }
        }
        Err(ServiceError::ConcurrentModification(order_id))
    }

    async fn try_reserve(
        &self,
        order_id: Uuid,
    ) -> Result<(OrderResponse, Vec<StockShortfall>), ServiceError> {
        let (order, lines) = load_order(&self.db, order_id).await?;
        if order.reserved {
            return Err(ServiceError::ValidationError(format!(
                "order {order_id} is already reserved"
            )));
        }

        let mut warnings = Vec::new();
        let txn = self.db.begin().await?;
        for line in &lines {
            let available = availability::available(&txn, line.product_id, None).await?;
            if available < line.quantity {
                warnings.push(StockShortfall::new(
                    line.product_id,
                    None,
                    line.quantity,
                    available,
                ));
            }
            stock::adjust_product_reserved(&txn, line.product_id, line.quantity).await?;
        }
        set_reserved_flag(&txn, &order, true).await?;
        txn.commit().await?;

        info!(
            "reserved order {} ({} lines, {} shortfalls)",
            order_id,
            lines.len(),
            warnings.len()
        );
        let (order, lines) = load_order(&self.db, order_id).await?;
        Ok((order_response(order, lines), warnings))
    }

    /// Releases the order's holds. Calling this on an order that holds no
    /// reservation is a no-op.
    #[instrument(skip(self))]
    pub async fn release(&self, order_id: Uuid) -> Result<OrderResponse, ServiceError> {
        for attempt in 1..=MAX_COMMIT_ATTEMPTS {
            match self.try_release(order_id).await {
                Err(ServiceError::ConcurrentModification(id)) if attempt < MAX_COMMIT_ATTEMPTS => {
                    warn!("release of order {order_id} lost a race on {id}, retrying");
                }
                Ok((response, released)) => {
                    if released {
                        self.event_sender
                            .publish(Event::OrderReleased { order_id })
                            .await;
                    }
                    return Ok(response);
                }
                Err(e) => return Err(e),
            }
        }
        Err(ServiceError::ConcurrentModification(order_id))
    }

    async fn try_release(
        &self,
        order_id: Uuid,
    ) -> Result<(OrderResponse, bool), ServiceError> {
        let (order, lines) = load_order(&self.db, order_id).await?;
        if !order.reserved {
            return Ok((order_response(order, lines), false));
        }

        let txn = self.db.begin().await?;
        for line in &lines {
            stock::adjust_product_reserved(&txn, line.product_id, -line.quantity).await?;
        }
        set_reserved_flag(&txn, &order, false).await?;
        txn.commit().await?;

        info!("released reservation on order {order_id}");
        let (order, lines) = load_order(&self.db, order_id).await?;
        Ok((order_response(order, lines), true))
    }
}

async fn set_reserved_flag(
    txn: &sea_orm::DatabaseTransaction,
    order: &sales_order::Model,
    reserved: bool,
) -> Result<(), ServiceError> {
    let result = sales_order::Entity::update_many()
        .col_expr(sales_order::Column::Reserved, Expr::value(reserved))
        .col_expr(sales_order::Column::Version, Expr::value(order.version + 1))
        .col_expr(sales_order::Column::UpdatedAt, Expr::value(Utc::now()))
        .filter(sales_order::Column::Id.eq(order.id))
        .filter(sales_order::Column::Version.eq(order.version))
        .exec(txn)
        .await?;
    if result.rows_affected == 0 {
        return Err(ServiceError::ConcurrentModification(order.id));
    }
    Ok(())
}
