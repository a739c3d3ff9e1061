mod common;

use assert_matches::assert_matches;
use rust_decimal_macros::dec;
use uuid::Uuid;

use ordercash_api::errors::ServiceError;
use ordercash_api::services::orders::{CreateOrderInput, OrderLineInput};

async fn seeded_order(
    services: &ordercash_api::handlers::AppServices,
    product_id: Uuid,
    quantity: i32,
) -> Uuid {
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

#[tokio::test]
async fn reserve_with_sufficient_stock_has_no_warnings() {
    let (db, services) = common::setup().await;
    let product = common::seed_product(&db, "SKU-1", 10).await;
    let order_id = seeded_order(&services, product, 4).await;

    let (order, warnings) = services.reservations.reserve(order_id).await.unwrap();
    assert!(warnings.is_empty());
    assert!(order.reserved);
    assert_eq!(common::product_counters(&db, product).await, (10, 4));
}

#[tokio::test]
async fn reserve_proceeds_on_shortfall_with_warning() {
    let (db, services) = common::setup().await;
    let product = common::seed_product(&db, "SKU-1", 2).await;
    let order_id = seeded_order(&services, product, 5).await;

    let (order, warnings) = services.reservations.reserve(order_id).await.unwrap();
    // Soft-hold still lands; the shortfall is a warning, not a failure
    assert!(order.reserved);
    assert_eq!(warnings.len(), 1);
    assert_eq!(warnings[0].product_id, product);
    assert_eq!(warnings[0].requested, 5);
    assert_eq!(warnings[0].available, 2);
    assert_eq!(warnings[0].shortfall, 3);
    assert_eq!(warnings[0].message, "insufficient stock");
    assert_eq!(common::product_counters(&db, product).await, (2, 5));
}

#[tokio::test]
async fn release_restores_availability() {
    let (db, services) = common::setup().await;
    let product = common::seed_product(&db, "SKU-1", 10).await;
    let order_id = seeded_order(&services, product, 4).await;

    services.reservations.reserve(order_id).await.unwrap();
    let order = services.reservations.release(order_id).await.unwrap();
    assert!(!order.reserved);
    // Round trip: availability is back to its pre-reserve value
    assert_eq!(common::product_counters(&db, product).await, (10, 0));
}

#[tokio::test]
async fn release_is_idempotent() {
    let (db, services) = common::setup().await;
    let product = common::seed_product(&db, "SKU-1", 10).await;
    let order_id = seeded_order(&services, product, 4).await;

    services.reservations.reserve(order_id).await.unwrap();
    services.reservations.release(order_id).await.unwrap();
    let order = services.reservations.release(order_id).await.unwrap();
    assert!(!order.reserved);
    assert_eq!(common::product_counters(&db, product).await, (10, 0));
}

#[tokio::test]
async fn double_reserve_is_rejected() {
    let (db, services) = common::setup().await;
    let product = common::seed_product(&db, "SKU-1", 10).await;
    let order_id = seeded_order(&services, product, 4).await;

    services.reservations.reserve(order_id).await.unwrap();
    let err = services.reservations.reserve(order_id).await.unwrap_err();
    assert_matches!(err, ServiceError::ValidationError(_));
    // Counters unchanged by the rejected second attempt
    assert_eq!(common::product_counters(&db, product).await, (10, 4));
}

#[tokio::test]
async fn reserve_unknown_order_is_not_found() {
    let (_db, services) = common::setup().await;
    let err = services
        .reservations
        .reserve(Uuid::new_v4())
        .await
        .unwrap_err();
    assert_matches!(err, ServiceError::NotFound(_));
}
