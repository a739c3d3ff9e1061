//! Status transition audit trail.

use chrono::Utc;
use sea_orm::{ActiveModelTrait, ConnectionTrait, Set};
use uuid::Uuid;

use crate::entities::status_history;
use crate::errors::ServiceError;
use crate::models::status::DocumentType;

/// Appends one audit row for a validated transition. Runs in the same
/// transaction as the status update itself.
pub async fn record_transition<C: ConnectionTrait>(
    conn: &C,
    document_type: DocumentType,
    document_id: Uuid,
    from_status: &str,
    to_status: &str,
) -> Result<(), ServiceError> {
    let row = status_history::ActiveModel {
        id: Set(Uuid::new_v4()),
        document_type: Set(document_type),
        document_id: Set(document_id),
        from_status: Set(from_status.to_string()),
        to_status: Set(to_status.to_string()),
        changed_at: Set(Utc::now()),
    };
    row.insert(conn).await?;
    Ok(())
}
