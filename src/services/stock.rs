//! Version-guarded stock counter updates.
//!
//! Every mutation here is a conditional update keyed on the row's
//! `version` column and runs inside the caller's transaction. Zero rows
//! affected means another commit won the race; the caller rolls back and
//! retries the whole operation. This is what keeps concurrent documents
//! from losing updates against the shared stock pool.

use chrono::Utc;
use sea_orm::sea_query::Expr;
use sea_orm::{ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, Set};
use uuid::Uuid;

use crate::entities::{product, warehouse_stock};
use crate::errors::ServiceError;

/// Applies `delta` to a warehouse stock row, creating the row when the
/// product has never been stocked there. Negative results are rejected
/// unless `allow_negative` is set.
pub async fn adjust_warehouse_stock<C: ConnectionTrait>(
    conn: &C,
    product_id: Uuid,
    warehouse_id: Uuid,
    delta: i32,
    allow_negative: bool,
) -> Result<i32, ServiceError> {
    let existing = warehouse_stock::Entity::find()
        .filter(warehouse_stock::Column::ProductId.eq(product_id))
        .filter(warehouse_stock::Column::WarehouseId.eq(warehouse_id))
        .one(conn)
        .await?;

    match existing {
        Some(row) => {
            let new_quantity = row.quantity + delta;
            if new_quantity < 0 && !allow_negative {
                return Err(ServiceError::InsufficientStock(format!(
                    "warehouse {} has {} of product {}, cannot apply {}",
                    warehouse_id, row.quantity, product_id, delta
                )));
            }
            let result = warehouse_stock::Entity::update_many()
                .col_expr(warehouse_stock::Column::Quantity, Expr::value(new_quantity))
                .col_expr(
                    warehouse_stock::Column::Version,
                    Expr::value(row.version + 1),
                )
                .col_expr(warehouse_stock::Column::UpdatedAt, Expr::value(Utc::now()))
                .filter(warehouse_stock::Column::Id.eq(row.id))
                .filter(warehouse_stock::Column::Version.eq(row.version))
                .exec(conn)
                .await?;
            if result.rows_affected == 0 {
                return Err(ServiceError::ConcurrentModification(row.id));
            }
            Ok(new_quantity)
        }
        None => {
            if delta < 0 && !allow_negative {
                return Err(ServiceError::InsufficientStock(format!(
                    "warehouse {warehouse_id} has no stock of product {product_id}"
                )));
            }
            let now = Utc::now();
            let row = warehouse_stock::ActiveModel {
                id: Set(Uuid::new_v4()),
                product_id: Set(product_id),
                warehouse_id: Set(warehouse_id),
                quantity: Set(delta),
                reserved: Set(0),
                version: Set(1),
                created_at: Set(now),
                updated_at: Set(now),
            };
            row.insert(conn).await?;
            Ok(delta)
        }
    }
}

/// Applies `delta` to a product's global on-hand quantity.
pub async fn adjust_product_quantity<C: ConnectionTrait>(
    conn: &C,
    product_id: Uuid,
    delta: i32,
    allow_negative: bool,
) -> Result<i32, ServiceError> {
    let row = product::Entity::find_by_id(product_id)
        .one(conn)
        .await?
        .ok_or_else(|| ServiceError::NotFound(format!("Product {product_id} not found")))?;

    let new_quantity = row.quantity + delta;
    if new_quantity < 0 && !allow_negative {
        return Err(ServiceError::InsufficientStock(format!(
            "product {} has {} on hand, cannot apply {}",
            product_id, row.quantity, delta
        )));
    }
    conditional_product_update(conn, &row, new_quantity, row.reserved).await?;
    Ok(new_quantity)
}

/// Applies `delta` to a product's global reserved counter, flooring at
/// zero on release so repeated releases stay idempotent.
pub async fn adjust_product_reserved<C: ConnectionTrait>(
    conn: &C,
    product_id: Uuid,
    delta: i32,
) -> Result<i32, ServiceError> {
    let row = product::Entity::find_by_id(product_id)
        .one(conn)
        .await?
        .ok_or_else(|| ServiceError::NotFound(format!("Product {product_id} not found")))?;

    let new_reserved = (row.reserved + delta).max(0);
    conditional_product_update(conn, &row, row.quantity, new_reserved).await?;
    Ok(new_reserved)
}

async fn conditional_product_update<C: ConnectionTrait>(
    conn: &C,
    row: &product::Model,
    quantity: i32,
    reserved: i32,
) -> Result<(), ServiceError> {
    let result = product::Entity::update_many()
        .col_expr(product::Column::Quantity, Expr::value(quantity))
        .col_expr(product::Column::Reserved, Expr::value(reserved))
        .col_expr(product::Column::Version, Expr::value(row.version + 1))
        .col_expr(product::Column::UpdatedAt, Expr::value(Utc::now()))
        .filter(product::Column::Id.eq(row.id))
        .filter(product::Column::Version.eq(row.version))
        .exec(conn)
        .await?;
    if result.rows_affected == 0 {
        return Err(ServiceError::ConcurrentModification(row.id));
    }
    Ok(())
}
