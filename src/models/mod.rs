pub mod allocation;
pub mod line;
pub mod status;

pub use allocation::{AllocationEntry, AllocationIssue, AllocationSummary};
pub use line::{DocumentTotals, LineAmounts};
pub use status::{DocumentType, InvoiceStatus, OrderStatus, ShipmentStatus, ShippedStatus};
