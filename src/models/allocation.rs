//! Warehouse allocation math for shipment lines.
//!
//! A shipment line carries a user-edited list of `(warehouse, quantity)`
//! entries. The summary here is the authoritative gate for commit and the
//! feedback shown while editing; it is always recomputed from the entry
//! list as submitted, never from a cached snapshot, so removing an entry
//! or switching its warehouse is reflected immediately.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One `(warehouse, quantity)` split of a shipment line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AllocationEntry {
    pub warehouse_id: Uuid,
    pub quantity: i32,
}

/// Per-line allocation progress.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AllocationSummary {
    pub required_quantity: i32,
    pub allocated_quantity: i32,
    pub remaining: i32,
    pub fully_allocated: bool,
}

/// A reason a shipment line cannot be committed, pointing at the line and
/// (where applicable) the warehouse and shortfall amount.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum AllocationIssue {
    NonPositiveQuantity {
        line_no: i32,
        warehouse_id: Uuid,
        quantity: i32,
    },
    CoverageMismatch {
        line_no: i32,
        required: i32,
        allocated: i32,
    },
    Shortfall {
        line_no: i32,
        warehouse_id: Uuid,
        requested: i32,
        available: i32,
        shortfall: i32,
    },
}

impl std::fmt::Display for AllocationIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AllocationIssue::NonPositiveQuantity {
                line_no,
                warehouse_id,
                quantity,
            } => write!(
                f,
                "line {line_no}: allocation for warehouse {warehouse_id} must be positive, got {quantity}"
            ),
            AllocationIssue::CoverageMismatch {
                line_no,
                required,
                allocated,
            } => write!(
                f,
                "line {line_no}: allocations sum to {allocated}, required {required}"
            ),
            AllocationIssue::Shortfall {
                line_no,
                warehouse_id,
                requested,
                available,
                shortfall,
            } => write!(
                f,
                "line {line_no}: warehouse {warehouse_id} has {available} available, requested {requested} (short by {shortfall})"
            ),
        }
    }
}

/// Joins issues into one caller-facing message.
pub fn issues_message(issues: &[AllocationIssue]) -> String {
    issues
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// Recomputes allocated/remaining/fully-allocated for one line.
pub fn summarize(required_quantity: i32, entries: &[AllocationEntry]) -> AllocationSummary {
    let allocated_quantity: i32 = entries.iter().map(|e| e.quantity).sum();
    AllocationSummary {
        required_quantity,
        allocated_quantity,
        remaining: required_quantity - allocated_quantity,
        fully_allocated: allocated_quantity == required_quantity,
    }
}

/// Structural checks for one line: positive entry quantities and exact
/// coverage of the required quantity. Availability is checked separately
/// at commit time against live stock.
pub fn validate_coverage(
    line_no: i32,
    required_quantity: i32,
    entries: &[AllocationEntry],
) -> Vec<AllocationIssue> {
    let mut issues = Vec::new();
    for entry in entries {
        if entry.quantity <= 0 {
            issues.push(AllocationIssue::NonPositiveQuantity {
                line_no,
                warehouse_id: entry.warehouse_id,
                quantity: entry.quantity,
            });
        }
    }
    let summary = summarize(required_quantity, entries);
    if !summary.fully_allocated {
        issues.push(AllocationIssue::CoverageMismatch {
            line_no,
            required: required_quantity,
            allocated: summary.allocated_quantity,
        });
    }
    issues
}
