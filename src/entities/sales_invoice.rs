use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::status::{InvoiceStatus, ShippedStatus};

/// Sales invoice header. Stock is deducted unconditionally at creation;
/// afterwards only `paid_amount`, `shipped_amount` and the two derived
/// statuses are mutated.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "sales_invoices")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub invoice_number: String,
    pub customer_id: Uuid,
    pub currency: String,
    pub exchange_rate: Decimal,
    /// Gross sum of `quantity * selling_price` over all lines.
    pub total_amount: Decimal,
    pub discount_total: Decimal,
    /// `total_amount - discount_total`; the amount payment is tracked against.
    pub final_amount: Decimal,
    pub paid_amount: Decimal,
    pub shipped_amount: Decimal,
    pub status: InvoiceStatus,
    pub shipped_status: ShippedStatus,
    pub version: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::sales_invoice_line::Entity")]
    Lines,
}

impl Related<super::sales_invoice_line::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Lines.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
