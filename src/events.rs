//! Domain events published after successful commits.
//!
//! Events are emitted once the owning transaction has committed; a failed
//! send is logged and never fails the operation that produced it.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::{error, info};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Event {
    OrderCreated {
        order_id: Uuid,
    },
    OrderReserved {
        order_id: Uuid,
        shortfall_count: usize,
    },
    OrderReleased {
        order_id: Uuid,
    },
    ShipmentCreated {
        shipment_id: Uuid,
        order_id: Uuid,
    },
    InvoiceCreated {
        invoice_id: Uuid,
        shortfall_count: usize,
    },
    InvoicePaymentRecorded {
        invoice_id: Uuid,
        paid_amount: Decimal,
    },
    StatusChanged {
        document_type: String,
        document_id: Uuid,
        from_status: String,
        to_status: String,
    },
}

#[derive(Debug, Clone)]
pub struct EventSender {
    sender: mpsc::Sender<Event>,
}

impl EventSender {
    pub fn new(sender: mpsc::Sender<Event>) -> Self {
        Self { sender }
    }

    pub async fn send(&self, event: Event) -> Result<(), String> {
        self.sender
            .send(event)
            .await
            .map_err(|e| format!("Failed to send event: {e}"))
    }

    /// Post-commit publication: logs on failure instead of surfacing an
    /// error, since the document is already persisted.
    pub async fn publish(&self, event: Event) {
        if let Err(e) = self.send(event).await {
            error!("event publication failed: {e}");
        }
    }
}

/// Drains the event channel. Downstream consumers (webhooks, projections)
/// would hang off this loop; for now every event is logged.
pub async fn process_events(mut rx: mpsc::Receiver<Event>) {
    info!("Starting event processing loop");
    while let Some(event) = rx.recv().await {
        match &event {
            Event::StatusChanged {
                document_type,
                document_id,
                from_status,
                to_status,
            } => {
                info!(
                    "{} {} moved {} -> {}",
                    document_type, document_id, from_status, to_status
                );
            }
            other => info!("Received event: {:?}", other),
        }
    }
    info!("Event processing loop stopped");
}
