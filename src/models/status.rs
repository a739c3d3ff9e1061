//! Document status graphs.
//!
//! Each document type moves along a fixed directed graph; any edge not
//! listed in `allowed_next` is invalid. The services persist the new
//! status plus an audit row only after the edge has been validated here.
//! Transitions never mutate stock: stock moves exactly once per document,
//! at its commit point (shipment allocation commit, invoice settlement).

use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Enum representing the possible statuses of a customer order.
#[derive(
    Copy,
    Clone,
    Debug,
    PartialEq,
    Eq,
    EnumIter,
    DeriveActiveEnum,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(32))")]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    #[sea_orm(string_value = "new")]
    New,
    #[sea_orm(string_value = "confirmed")]
    Confirmed,
    #[sea_orm(string_value = "assembled")]
    Assembled,
    #[sea_orm(string_value = "shipped")]
    Shipped,
    #[sea_orm(string_value = "delivered")]
    Delivered,
    #[sea_orm(string_value = "returned")]
    Returned,
    #[sea_orm(string_value = "cancelled")]
    Cancelled,
}

impl OrderStatus {
    pub fn allowed_next(self) -> &'static [OrderStatus] {
        use OrderStatus::*;
        match self {
            New => &[Confirmed, Cancelled],
            Confirmed => &[Assembled, Shipped, Cancelled],
            Assembled => &[Shipped, Cancelled],
            Shipped => &[Delivered, Returned],
            Delivered => &[Returned],
            // Cancellation is the only path back to the initial status
            Cancelled => &[New],
            Returned => &[],
        }
    }

    pub fn can_transition_to(self, target: OrderStatus) -> bool {
        self.allowed_next().contains(&target)
    }

    /// Line edits are only allowed while the order is still a draft.
    pub fn is_editable(self) -> bool {
        matches!(self, OrderStatus::New)
    }
}

/// Enum representing the possible statuses of a shipment.
#[derive(
    Copy,
    Clone,
    Debug,
    PartialEq,
    Eq,
    EnumIter,
    DeriveActiveEnum,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(32))")]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ShipmentStatus {
    #[sea_orm(string_value = "pending")]
    Pending,
    #[sea_orm(string_value = "in_transit")]
    InTransit,
    #[sea_orm(string_value = "delivered")]
    Delivered,
    #[sea_orm(string_value = "cancelled")]
    Cancelled,
}

impl ShipmentStatus {
    pub fn allowed_next(self) -> &'static [ShipmentStatus] {
        use ShipmentStatus::*;
        match self {
            Pending => &[InTransit, Cancelled],
            InTransit => &[Delivered, Cancelled],
            Delivered => &[],
            Cancelled => &[Pending],
        }
    }

    pub fn can_transition_to(self, target: ShipmentStatus) -> bool {
        self.allowed_next().contains(&target)
    }
}

/// Payment status of a sales invoice.
///
/// `unpaid`/`partial`/`paid` are derived from the paid amount by
/// settlement; `cancelled` is the only manually assigned status and is
/// never overridden by a payment recompute.
#[derive(
    Copy,
    Clone,
    Debug,
    PartialEq,
    Eq,
    EnumIter,
    DeriveActiveEnum,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(32))")]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum InvoiceStatus {
    #[sea_orm(string_value = "unpaid")]
    Unpaid,
    #[sea_orm(string_value = "partial")]
    Partial,
    #[sea_orm(string_value = "paid")]
    Paid,
    #[sea_orm(string_value = "cancelled")]
    Cancelled,
}

impl InvoiceStatus {
    pub fn allowed_next(self) -> &'static [InvoiceStatus] {
        use InvoiceStatus::*;
        match self {
            Unpaid => &[Cancelled],
            Partial => &[Cancelled],
            Paid => &[],
            Cancelled => &[],
        }
    }

    pub fn can_transition_to(self, target: InvoiceStatus) -> bool {
        self.allowed_next().contains(&target)
    }

    /// Recomputes the payment status from the paid amount. A zero
    /// `final_amount` (fully discounted invoice) counts as paid in full.
    pub fn from_paid_amount(paid: Decimal, final_amount: Decimal) -> InvoiceStatus {
        if paid >= final_amount {
            InvoiceStatus::Paid
        } else if paid > Decimal::ZERO {
            InvoiceStatus::Partial
        } else {
            InvoiceStatus::Unpaid
        }
    }
}

/// Shipping-side status of a sales invoice, derived from `shipped_amount`.
#[derive(
    Copy,
    Clone,
    Debug,
    PartialEq,
    Eq,
    EnumIter,
    DeriveActiveEnum,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(32))")]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ShippedStatus {
    #[sea_orm(string_value = "not_shipped")]
    NotShipped,
    #[sea_orm(string_value = "partial")]
    Partial,
    #[sea_orm(string_value = "shipped")]
    Shipped,
}

impl ShippedStatus {
    pub fn from_shipped_amount(shipped: Decimal, final_amount: Decimal) -> ShippedStatus {
        if shipped >= final_amount {
            ShippedStatus::Shipped
        } else if shipped > Decimal::ZERO {
            ShippedStatus::Partial
        } else {
            ShippedStatus::NotShipped
        }
    }
}

/// Document kind recorded in the status audit trail.
#[derive(
    Copy,
    Clone,
    Debug,
    PartialEq,
    Eq,
    EnumIter,
    DeriveActiveEnum,
    Serialize,
    Deserialize,
    strum::Display,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum DocumentType {
    #[sea_orm(string_value = "order")]
    Order,
    #[sea_orm(string_value = "shipment")]
    Shipment,
    #[sea_orm(string_value = "invoice")]
    Invoice,
}
