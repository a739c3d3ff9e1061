mod common;

use assert_matches::assert_matches;
use rust_decimal_macros::dec;
use uuid::Uuid;

use ordercash_api::errors::ServiceError;
use ordercash_api::handlers::AppServices;
use ordercash_api::models::allocation::AllocationEntry;
use ordercash_api::models::status::ShipmentStatus;
use ordercash_api::services::orders::{CreateOrderInput, OrderLineInput};
use ordercash_api::services::shipments::{CreateShipmentInput, ShipmentLineInput};

async fn order_for(services: &AppServices, product_id: Uuid, quantity: i32) -> Uuid {
    let input = CreateOrderInput {
        order_number: format!("ORD-{}", Uuid::new_v4()),
        customer_id: Uuid::new_v4(),
        currency: "USD".to_string(),
        exchange_rate: dec!(1),
        lines: vec![OrderLineInput {
            product_id,
            quantity,
            unit_price: dec!(100),
            discount_pct: dec!(0),
            vat_pct: dec!(0),
        }],
    };
    services.orders.create_order(input).await.unwrap().id
}

fn shipment_input(
    order_id: Uuid,
    product_id: Uuid,
    required: i32,
    allocations: Vec<AllocationEntry>,
) -> CreateShipmentInput {
    CreateShipmentInput {
        shipment_number: format!("SHP-{}", Uuid::new_v4()),
        order_id,
        allow_negative_stock: false,
        lines: vec![ShipmentLineInput {
            product_id,
            required_quantity: required,
            unit_price: dec!(100),
            allocations,
        }],
    }
}

#[tokio::test]
async fn exact_split_commits_and_deducts_stock() {
    let (db, services) = common::setup().await;
    let product = common::seed_product(&db, "SKU-1", 10).await;
    let wh1 = common::seed_warehouse(&db, "WH1").await;
    let wh2 = common::seed_warehouse(&db, "WH2").await;
    common::seed_stock(&db, product, wh1, 5).await;
    common::seed_stock(&db, product, wh2, 5).await;
    let order_id = order_for(&services, product, 5).await;

    let shipment = services
        .shipments
        .create_shipment(shipment_input(
            order_id,
            product,
            5,
            vec![
                AllocationEntry {
                    warehouse_id: wh1,
                    quantity: 3,
                },
                AllocationEntry {
                    warehouse_id: wh2,
                    quantity: 2,
                },
            ],
        ))
        .await
        .unwrap();

    assert_eq!(shipment.status, ShipmentStatus::Pending);
    assert!(shipment.lines[0].summary.fully_allocated);
    assert_eq!(shipment.lines[0].summary.remaining, 0);
    assert_eq!(common::warehouse_quantity(&db, product, wh1).await, 2);
    assert_eq!(common::warehouse_quantity(&db, product, wh2).await, 3);
    assert_eq!(common::product_counters(&db, product).await, (5, 0));
}

#[tokio::test]
async fn partial_coverage_is_rejected_and_stock_untouched() {
    let (db, services) = common::setup().await;
    let product = common::seed_product(&db, "SKU-1", 10).await;
    let wh1 = common::seed_warehouse(&db, "WH1").await;
    common::seed_stock(&db, product, wh1, 5).await;
    let order_id = order_for(&services, product, 5).await;

    let err = services
        .shipments
        .create_shipment(shipment_input(
            order_id,
            product,
            5,
            vec![AllocationEntry {
                warehouse_id: wh1,
                quantity: 3,
            }],
        ))
        .await
        .unwrap_err();
    assert_matches!(
        err,
        ServiceError::ValidationError(msg) if msg.contains("sum to 3") && msg.contains("required 5")
    );
    assert_eq!(common::warehouse_quantity(&db, product, wh1).await, 5);
    assert_eq!(common::product_counters(&db, product).await, (10, 0));
}

#[tokio::test]
async fn warehouse_shortfall_rejects_whole_shipment() {
    let (db, services) = common::setup().await;
    let product = common::seed_product(&db, "SKU-1", 10).await;
    let wh1 = common::seed_warehouse(&db, "WH1").await;
    let wh2 = common::seed_warehouse(&db, "WH2").await;
    common::seed_stock(&db, product, wh1, 3).await;
    common::seed_stock(&db, product, wh2, 10).await;
    let order_id = order_for(&services, product, 6).await;

    // wh1 is short by 2; even though wh2 could cover its part, nothing
    // may persist
    let err = services
        .shipments
        .create_shipment(shipment_input(
            order_id,
            product,
            6,
            vec![
                AllocationEntry {
                    warehouse_id: wh1,
                    quantity: 5,
                },
                AllocationEntry {
                    warehouse_id: wh2,
                    quantity: 1,
                },
            ],
        ))
        .await
        .unwrap_err();
    assert_matches!(
        err,
        ServiceError::InsufficientStock(msg) if msg.contains("short by 2")
    );
    assert_eq!(common::warehouse_quantity(&db, product, wh1).await, 3);
    assert_eq!(common::warehouse_quantity(&db, product, wh2).await, 10);
    assert_eq!(common::product_counters(&db, product).await, (10, 0));
}

#[tokio::test]
async fn duplicate_warehouse_entries_cannot_jointly_overdraw() {
    let (db, services) = common::setup().await;
    let product = common::seed_product(&db, "SKU-1", 10).await;
    let wh1 = common::seed_warehouse(&db, "WH1").await;
    common::seed_stock(&db, product, wh1, 4).await;
    let order_id = order_for(&services, product, 6).await;

    // Each entry alone fits within the 4 available; together they do not
    let err = services
        .shipments
        .create_shipment(shipment_input(
            order_id,
            product,
            6,
            vec![
                AllocationEntry {
                    warehouse_id: wh1,
                    quantity: 3,
                },
                AllocationEntry {
                    warehouse_id: wh1,
                    quantity: 3,
                },
            ],
        ))
        .await
        .unwrap_err();
    assert_matches!(err, ServiceError::InsufficientStock(_));
    assert_eq!(common::warehouse_quantity(&db, product, wh1).await, 4);
    assert_eq!(common::product_counters(&db, product).await, (10, 0));
}

#[tokio::test]
async fn allow_negative_stock_overrides_the_gate() {
    let (db, services) = common::setup().await;
    let product = common::seed_product(&db, "SKU-1", 10).await;
    let wh1 = common::seed_warehouse(&db, "WH1").await;
    common::seed_stock(&db, product, wh1, 3).await;
    let order_id = order_for(&services, product, 5).await;

    let mut input = shipment_input(
        order_id,
        product,
        5,
        vec![AllocationEntry {
            warehouse_id: wh1,
            quantity: 5,
        }],
    );
    input.allow_negative_stock = true;
    let shipment = services.shipments.create_shipment(input).await.unwrap();

    assert_eq!(shipment.status, ShipmentStatus::Pending);
    assert_eq!(common::warehouse_quantity(&db, product, wh1).await, -2);
    assert_eq!(common::product_counters(&db, product).await, (5, 0));
}

#[tokio::test]
async fn preview_reports_progress_without_committing() {
    let (db, services) = common::setup().await;
    let product = common::seed_product(&db, "SKU-1", 10).await;
    let wh1 = common::seed_warehouse(&db, "WH1").await;
    common::seed_stock(&db, product, wh1, 5).await;
    let order_id = order_for(&services, product, 5).await;

    let input = shipment_input(
        order_id,
        product,
        5,
        vec![AllocationEntry {
            warehouse_id: wh1,
            quantity: 3,
        }],
    );
    let preview = services.shipments.preview_allocations(&input).await.unwrap();
    assert!(!preview.can_commit);
    assert_eq!(preview.lines[0].summary.allocated_quantity, 3);
    assert_eq!(preview.lines[0].summary.remaining, 2);
    assert!(!preview.lines[0].summary.fully_allocated);
    // Nothing moved
    assert_eq!(common::warehouse_quantity(&db, product, wh1).await, 5);
}

#[tokio::test]
async fn product_not_on_order_is_rejected() {
    let (db, services) = common::setup().await;
    let on_order = common::seed_product(&db, "SKU-1", 10).await;
    let other = common::seed_product(&db, "SKU-2", 10).await;
    let wh1 = common::seed_warehouse(&db, "WH1").await;
    common::seed_stock(&db, other, wh1, 10).await;
    let order_id = order_for(&services, on_order, 5).await;

    let err = services
        .shipments
        .create_shipment(shipment_input(
            order_id,
            other,
            2,
            vec![AllocationEntry {
                warehouse_id: wh1,
                quantity: 2,
            }],
        ))
        .await
        .unwrap_err();
    assert_matches!(err, ServiceError::ValidationError(msg) if msg.contains("not on order"));
}

#[tokio::test]
async fn shipment_status_graph() {
    let (db, services) = common::setup().await;
    let product = common::seed_product(&db, "SKU-1", 10).await;
    let wh1 = common::seed_warehouse(&db, "WH1").await;
    common::seed_stock(&db, product, wh1, 5).await;
    let order_id = order_for(&services, product, 2).await;

    let shipment = services
        .shipments
        .create_shipment(shipment_input(
            order_id,
            product,
            2,
            vec![AllocationEntry {
                warehouse_id: wh1,
                quantity: 2,
            }],
        ))
        .await
        .unwrap();

    let in_transit = services
        .shipments
        .transition(shipment.id, ShipmentStatus::InTransit)
        .await
        .unwrap();
    assert_eq!(in_transit.status, ShipmentStatus::InTransit);
    services
        .shipments
        .transition(shipment.id, ShipmentStatus::Delivered)
        .await
        .unwrap();

    let err = services
        .shipments
        .transition(shipment.id, ShipmentStatus::Pending)
        .await
        .unwrap_err();
    assert_matches!(err, ServiceError::InvalidStatus(_));
}

#[tokio::test]
async fn cancelled_shipment_may_return_to_pending() {
    let (db, services) = common::setup().await;
    let product = common::seed_product(&db, "SKU-1", 10).await;
    let wh1 = common::seed_warehouse(&db, "WH1").await;
    common::seed_stock(&db, product, wh1, 5).await;
    let order_id = order_for(&services, product, 2).await;

    let shipment = services
        .shipments
        .create_shipment(shipment_input(
            order_id,
            product,
            2,
            vec![AllocationEntry {
                warehouse_id: wh1,
                quantity: 2,
            }],
        ))
        .await
        .unwrap();

    services
        .shipments
        .transition(shipment.id, ShipmentStatus::Cancelled)
        .await
        .unwrap();
    let reopened = services
        .shipments
        .transition(shipment.id, ShipmentStatus::Pending)
        .await
        .unwrap();
    assert_eq!(reopened.status, ShipmentStatus::Pending);
}
