mod common;

use assert_matches::assert_matches;
use rust_decimal_macros::dec;
use sea_orm::{ColumnTrait, EntityTrait, QueryFilter};
use uuid::Uuid;

use ordercash_api::entities::status_history;
use ordercash_api::errors::ServiceError;
use ordercash_api::models::status::OrderStatus;
use ordercash_api::services::orders::{CreateOrderInput, OrderLineInput, UpdateOrderLinesInput};

fn line(product_id: Uuid, quantity: i32, price: rust_decimal::Decimal) -> OrderLineInput {
    OrderLineInput {
        product_id,
        quantity,
        unit_price: price,
        discount_pct: dec!(0),
        vat_pct: dec!(0),
    }
}

fn order_input(number: &str, lines: Vec<OrderLineInput>) -> CreateOrderInput {
    CreateOrderInput {
        order_number: number.to_string(),
        customer_id: Uuid::new_v4(),
        currency: "USD".to_string(),
        exchange_rate: dec!(1),
        lines,
    }
}

#[tokio::test]
async fn create_order_computes_totals() {
    let (db, services) = common::setup().await;
    let product = common::seed_product(&db, "SKU-1", 100).await;

    let mut input = order_input(
        "ORD-1",
        vec![OrderLineInput {
            product_id: product,
            quantity: 10,
            unit_price: dec!(1000),
            discount_pct: dec!(10),
            vat_pct: dec!(0),
        }],
    );
    input.exchange_rate = dec!(1);
    let order = services.orders.create_order(input).await.unwrap();

    assert_eq!(order.status, OrderStatus::New);
    assert!(!order.reserved);
    assert_eq!(order.lines.len(), 1);
    assert_eq!(order.lines[0].discount_amount, dec!(1000));
    assert_eq!(order.lines[0].total, dec!(9000));
    assert_eq!(order.total_amount, dec!(9000));
    assert_eq!(order.discount_total, dec!(1000));
}

#[tokio::test]
async fn base_equivalent_is_derived_from_exchange_rate() {
    let (db, services) = common::setup().await;
    let product = common::seed_product(&db, "SKU-1", 100).await;

    let mut input = order_input("ORD-2", vec![line(product, 1, dec!(100))]);
    input.exchange_rate = dec!(12800);
    let order = services.orders.create_order(input).await.unwrap();

    assert_eq!(order.total_amount, dec!(100));
    assert_eq!(order.base_total_amount, dec!(1280000));
}

#[tokio::test]
async fn create_order_rejects_bad_lines() {
    let (db, services) = common::setup().await;
    let product = common::seed_product(&db, "SKU-1", 100).await;

    let err = services
        .orders
        .create_order(order_input("ORD-3", vec![line(product, 0, dec!(100))]))
        .await
        .unwrap_err();
    assert_matches!(err, ServiceError::ValidationError(msg) if msg.contains("line 1"));

    let err = services
        .orders
        .create_order(order_input("ORD-4", vec![line(product, 1, dec!(0))]))
        .await
        .unwrap_err();
    assert_matches!(err, ServiceError::ValidationError(_));
}

#[tokio::test]
async fn create_order_rejects_nonpositive_exchange_rate() {
    let (db, services) = common::setup().await;
    let product = common::seed_product(&db, "SKU-1", 100).await;

    let mut input = order_input("ORD-5", vec![line(product, 1, dec!(100))]);
    input.exchange_rate = dec!(0);
    let err = services.orders.create_order(input).await.unwrap_err();
    assert_matches!(err, ServiceError::ValidationError(msg) if msg.contains("exchange_rate"));
}

#[tokio::test]
async fn transitions_follow_the_graph_and_leave_an_audit_trail() {
    let (db, services) = common::setup().await;
    let product = common::seed_product(&db, "SKU-1", 100).await;
    let order = services
        .orders
        .create_order(order_input("ORD-6", vec![line(product, 1, dec!(100))]))
        .await
        .unwrap();

    let order_id = order.id;
    services
        .orders
        .transition(order_id, OrderStatus::Confirmed)
        .await
        .unwrap();
    services
        .orders
        .transition(order_id, OrderStatus::Shipped)
        .await
        .unwrap();
    let delivered = services
        .orders
        .transition(order_id, OrderStatus::Delivered)
        .await
        .unwrap();
    assert_eq!(delivered.status, OrderStatus::Delivered);

    // Only `returned` is reachable from `delivered`
    let err = services
        .orders
        .transition(order_id, OrderStatus::Confirmed)
        .await
        .unwrap_err();
    assert_matches!(err, ServiceError::InvalidStatus(_));

    services
        .orders
        .transition(order_id, OrderStatus::Returned)
        .await
        .unwrap();

    let audit_rows = status_history::Entity::find()
        .filter(status_history::Column::DocumentId.eq(order_id))
        .all(&*db)
        .await
        .unwrap();
    assert_eq!(audit_rows.len(), 4);
    assert_eq!(audit_rows[0].from_status, "new");
    assert_eq!(audit_rows[0].to_status, "confirmed");
}

#[tokio::test]
async fn cancellation_returns_to_initial_status() {
    let (db, services) = common::setup().await;
    let product = common::seed_product(&db, "SKU-1", 100).await;
    let order = services
        .orders
        .create_order(order_input("ORD-7", vec![line(product, 1, dec!(100))]))
        .await
        .unwrap();

    services
        .orders
        .transition(order.id, OrderStatus::Cancelled)
        .await
        .unwrap();
    let restarted = services
        .orders
        .transition(order.id, OrderStatus::New)
        .await
        .unwrap();
    assert_eq!(restarted.status, OrderStatus::New);
}

#[tokio::test]
async fn draft_lines_can_be_replaced_and_totals_recompute() {
    let (db, services) = common::setup().await;
    let product = common::seed_product(&db, "SKU-1", 100).await;
    let order = services
        .orders
        .create_order(order_input("ORD-8", vec![line(product, 1, dec!(100))]))
        .await
        .unwrap();
    assert_eq!(order.total_amount, dec!(100));

    let updated = services
        .orders
        .update_lines(
            order.id,
            UpdateOrderLinesInput {
                lines: vec![line(product, 3, dec!(200))],
            },
        )
        .await
        .unwrap();
    assert_eq!(updated.total_amount, dec!(600));
    assert_eq!(updated.lines.len(), 1);
    assert_eq!(updated.lines[0].quantity, 3);
}

#[tokio::test]
async fn lines_are_frozen_once_confirmed() {
    let (db, services) = common::setup().await;
    let product = common::seed_product(&db, "SKU-1", 100).await;
    let order = services
        .orders
        .create_order(order_input("ORD-9", vec![line(product, 1, dec!(100))]))
        .await
        .unwrap();
    services
        .orders
        .transition(order.id, OrderStatus::Confirmed)
        .await
        .unwrap();

    let err = services
        .orders
        .update_lines(
            order.id,
            UpdateOrderLinesInput {
                lines: vec![line(product, 2, dec!(100))],
            },
        )
        .await
        .unwrap_err();
    assert_matches!(err, ServiceError::ValidationError(_));
}
