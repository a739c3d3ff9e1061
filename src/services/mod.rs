pub mod audit;
pub mod availability;
pub mod invoicing;
pub mod orders;
pub mod reservation;
pub mod shipments;
pub mod stock;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// How many times a commit is retried after losing a version-guard race
/// before the conflict is surfaced to the caller.
pub const MAX_COMMIT_ATTEMPTS: u32 = 3;

/// Non-blocking warning that a commit proceeded despite insufficient
/// stock. The document persists either way; warnings are surfaced as a
/// list, never silently dropped.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockShortfall {
    pub product_id: Uuid,
    pub warehouse_id: Option<Uuid>,
    pub requested: i32,
    pub available: i32,
    pub shortfall: i32,
    pub message: String,
}

impl StockShortfall {
    pub fn new(
        product_id: Uuid,
        warehouse_id: Option<Uuid>,
        requested: i32,
        available: i32,
    ) -> Self {
        Self {
            product_id,
            warehouse_id,
            requested,
            available,
            shortfall: requested - available,
            message: "insufficient stock".to_string(),
        }
    }
}
