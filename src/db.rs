use std::time::Duration;

use sea_orm::{ConnectOptions, ConnectionTrait, Database, DatabaseConnection, DbErr, Schema};
use tracing::info;

use crate::config::AppConfig;
use crate::entities::{
    product, sales_invoice, sales_invoice_line, sales_order, sales_order_line, shipment,
    shipment_allocation, shipment_line, status_history, warehouse, warehouse_stock,
};

/// Type alias for a database connection pool
pub type DbPool = DatabaseConnection;

pub async fn establish_connection(cfg: &AppConfig) -> Result<DbPool, DbErr> {
    let mut opt = ConnectOptions::new(cfg.database_url.clone());
    opt.max_connections(10)
        .min_connections(1)
        .connect_timeout(Duration::from_secs(30))
        .acquire_timeout(Duration::from_secs(8))
        .idle_timeout(Duration::from_secs(600))
        .sqlx_logging(false);

    // An in-memory sqlite database exists per connection; a larger pool
    // would hand out empty databases.
    if cfg.database_url.starts_with("sqlite::memory:") {
        opt.max_connections(1).min_connections(1);
    }

    info!("connecting to database");
    Database::connect(opt).await
}

/// Creates all tables from the entity definitions. Idempotent.
pub async fn init_schema(db: &DatabaseConnection) -> Result<(), DbErr> {
    let backend = db.get_database_backend();
    let schema = Schema::new(backend);

    let mut statements = vec![
        schema.create_table_from_entity(product::Entity),
        schema.create_table_from_entity(warehouse::Entity),
        schema.create_table_from_entity(warehouse_stock::Entity),
        schema.create_table_from_entity(sales_order::Entity),
        schema.create_table_from_entity(sales_order_line::Entity),
        schema.create_table_from_entity(shipment::Entity),
        schema.create_table_from_entity(shipment_line::Entity),
        schema.create_table_from_entity(shipment_allocation::Entity),
        schema.create_table_from_entity(sales_invoice::Entity),
        schema.create_table_from_entity(sales_invoice_line::Entity),
        schema.create_table_from_entity(status_history::Entity),
    ];
    for statement in &mut statements {
        statement.if_not_exists();
        db.execute(backend.build(&*statement)).await?;
    }
    Ok(())
}
