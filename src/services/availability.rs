//! Read-only stock availability queries.
//!
//! Consulted by the allocation engine and the reservation manager before
//! any commit; never mutates. Availability is `quantity - reserved`, from
//! the warehouse-scoped row when a warehouse is given, else from the
//! product's global counters. A missing warehouse row reads as zero.

use std::sync::Arc;

use sea_orm::{ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, QueryFilter};
use uuid::Uuid;

use crate::entities::{product, warehouse_stock};
use crate::errors::ServiceError;

pub async fn available<C: ConnectionTrait>(
    conn: &C,
    product_id: Uuid,
    warehouse_id: Option<Uuid>,
) -> Result<i32, ServiceError> {
    match warehouse_id {
        Some(warehouse_id) => {
            let stock = warehouse_stock::Entity::find()
                .filter(warehouse_stock::Column::ProductId.eq(product_id))
                .filter(warehouse_stock::Column::WarehouseId.eq(warehouse_id))
                .one(conn)
                .await?;
            Ok(stock.map(|s| s.quantity - s.reserved).unwrap_or(0))
        }
        None => {
            let product = product::Entity::find_by_id(product_id)
                .one(conn)
                .await?
                .ok_or_else(|| {
                    ServiceError::NotFound(format!("Product {product_id} not found"))
                })?;
            Ok(product.quantity - product.reserved)
        }
    }
}

/// Handler-facing wrapper over the free functions.
#[derive(Clone)]
pub struct AvailabilityChecker {
    db: Arc<DatabaseConnection>,
}

impl AvailabilityChecker {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    pub async fn available(
        &self,
        product_id: Uuid,
        warehouse_id: Option<Uuid>,
    ) -> Result<i32, ServiceError> {
        available(&*self.db, product_id, warehouse_id).await
    }
}
