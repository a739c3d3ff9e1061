use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Product with its global stock counters. Per-warehouse counters live in
/// `warehouse_stocks`; the global pair here is the sum across warehouses
/// plus any stock not assigned to a warehouse.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "products")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub sku: String,
    pub name: String,
    /// Physical on-hand quantity; may go negative when an operation
    /// explicitly allows it (invoice settlement).
    pub quantity: i32,
    /// Advisory order-level soft holds.
    pub reserved: i32,
    pub version: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::warehouse_stock::Entity")]
    WarehouseStocks,
}

impl Related<super::warehouse_stock::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::WarehouseStocks.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
