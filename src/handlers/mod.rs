pub mod invoices;
pub mod orders;
pub mod products;
pub mod shipments;

use std::sync::Arc;

use sea_orm::DatabaseConnection;

use crate::events::EventSender;
use crate::services::availability::AvailabilityChecker;
use crate::services::invoicing::InvoiceService;
use crate::services::orders::OrderService;
use crate::services::reservation::ReservationService;
use crate::services::shipments::ShipmentService;

/// Services shared by the HTTP handlers.
#[derive(Clone)]
pub struct AppServices {
    pub orders: Arc<OrderService>,
    pub reservations: Arc<ReservationService>,
    pub shipments: Arc<ShipmentService>,
    pub invoicing: Arc<InvoiceService>,
    pub availability: Arc<AvailabilityChecker>,
}

impl AppServices {
    pub fn new(db: Arc<DatabaseConnection>, event_sender: EventSender) -> Self {
        Self {
            orders: Arc::new(OrderService::new(db.clone(), event_sender.clone())),
            reservations: Arc::new(ReservationService::new(db.clone(), event_sender.clone())),
            shipments: Arc::new(ShipmentService::new(db.clone(), event_sender.clone())),
            invoicing: Arc::new(InvoiceService::new(db.clone(), event_sender)),
            availability: Arc::new(AvailabilityChecker::new(db)),
        }
    }
}
