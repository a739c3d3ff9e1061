use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::status::OrderStatus;

/// Customer order header. Amounts are stored in the document currency;
/// the base-currency equivalent is derived on demand via `exchange_rate`.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "sales_orders")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    /// Human-readable number assigned by the external numbering sequence.
    pub order_number: String,
    pub customer_id: Uuid,
    pub currency: String,
    pub exchange_rate: Decimal,
    pub status: OrderStatus,
    /// Whether the order currently holds a soft reservation.
    pub reserved: bool,
    pub total_amount: Decimal,
    pub discount_total: Decimal,
    pub vat_total: Decimal,
    pub version: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::sales_order_line::Entity")]
    Lines,
    #[sea_orm(has_many = "super::shipment::Entity")]
    Shipments,
}

impl Related<super::sales_order_line::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Lines.def()
    }
}

impl Related<super::shipment::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Shipments.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
