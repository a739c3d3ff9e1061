#![allow(dead_code)]

use std::sync::Arc;

use chrono::Utc;
use sea_orm::{ActiveModelTrait, ColumnTrait, ConnectOptions, Database, DatabaseConnection, EntityTrait, QueryFilter, Set};
use tokio::sync::mpsc;
use uuid::Uuid;

use ordercash_api::db;
use ordercash_api::entities::{product, warehouse, warehouse_stock};
use ordercash_api::events::{process_events, EventSender};
use ordercash_api::handlers::AppServices;

/// Fresh in-memory database plus the full service set.
pub async fn setup() -> (Arc<DatabaseConnection>, AppServices) {
    let mut opt = ConnectOptions::new("sqlite::memory:".to_string());
    opt.max_connections(1).min_connections(1).sqlx_logging(false);
    let conn = Database::connect(opt).await.expect("db connect");
    db::init_schema(&conn).await.expect("schema init");
    let db = Arc::new(conn);

    let (tx, rx) = mpsc::channel(256);
    tokio::spawn(process_events(rx));
    let services = AppServices::new(db.clone(), EventSender::new(tx));
    (db, services)
}

pub async fn seed_product(db: &DatabaseConnection, sku: &str, quantity: i32) -> Uuid {
    let now = Utc::now();
    let id = Uuid::new_v4();
    product::ActiveModel {
        id: Set(id),
        sku: Set(sku.to_string()),
        name: Set(format!("Product {sku}")),
        quantity: Set(quantity),
        reserved: Set(0),
        version: Set(1),
        created_at: Set(now),
        updated_at: Set(now),
    }
    .insert(db)
    .await
    .expect("seed product");
    id
}

pub async fn seed_warehouse(db: &DatabaseConnection, code: &str) -> Uuid {
    let id = Uuid::new_v4();
    warehouse::ActiveModel {
        id: Set(id),
        code: Set(code.to_string()),
        name: Set(format!("Warehouse {code}")),
        created_at: Set(Utc::now()),
    }
    .insert(db)
    .await
    .expect("seed warehouse");
    id
}

pub async fn seed_stock(
    db: &DatabaseConnection,
    product_id: Uuid,
    warehouse_id: Uuid,
    quantity: i32,
) {
    let now = Utc::now();
    warehouse_stock::ActiveModel {
        id: Set(Uuid::new_v4()),
        product_id: Set(product_id),
        warehouse_id: Set(warehouse_id),
        quantity: Set(quantity),
        reserved: Set(0),
        version: Set(1),
        created_at: Set(now),
        updated_at: Set(now),
    }
    .insert(db)
    .await
    .expect("seed warehouse stock");
}

/// (quantity, reserved) of the product's global counters.
pub async fn product_counters(db: &DatabaseConnection, product_id: Uuid) -> (i32, i32) {
    let row = product::Entity::find_by_id(product_id)
        .one(db)
        .await
        .expect("query product")
        .expect("product exists");
    (row.quantity, row.reserved)
}

pub async fn warehouse_quantity(
    db: &DatabaseConnection,
    product_id: Uuid,
    warehouse_id: Uuid,
) -> i32 {
    warehouse_stock::Entity::find()
        .filter(warehouse_stock::Column::ProductId.eq(product_id))
        .filter(warehouse_stock::Column::WarehouseId.eq(warehouse_id))
        .one(db)
        .await
        .expect("query warehouse stock")
        .map(|row| row.quantity)
        .unwrap_or(0)
}
