//! Remote catalog: validation ahead of the gateway, and mapping of recorded
//! gateway responses.

#![allow(clippy::unwrap_used)]

use std::sync::Arc;
use std::time::Duration;

use rust_decimal::Decimal;
use secrecy::SecretString;

use tarstock_client::catalog::{
    CatalogStore, ReadIssueKind, RemoteCatalog, StoreError, inventory_from_result,
    products_from_result,
};
use tarstock_client::config::GatewayConfig;
use tarstock_client::gateway::{GatewayClient, StatementResult};
use tarstock_client::{ProductService, ServiceError};
use tarstock_core::{InventoryItem, NewProduct, ProductId, ValidationError};
use tarstock_integration_tests::product;

/// A catalog whose gateway nothing listens on. Any request that gets sent
/// fails with an HTTP error, so a validation error proves none was.
fn unreachable_catalog() -> RemoteCatalog {
    let gateway = GatewayClient::new(&GatewayConfig {
        pipeline_url: "http://127.0.0.1:9/v2/pipeline".to_string(),
        auth_token: SecretString::from("unused"),
        timeout: Duration::from_secs(2),
    })
    .unwrap();
    RemoteCatalog::new(gateway)
}

fn result(json: &str) -> StatementResult {
    serde_json::from_str(json).unwrap()
}

// =============================================================================
// Validation before any request
// =============================================================================

#[tokio::test]
async fn test_update_with_empty_name_never_reaches_gateway() {
    let catalog = unreachable_catalog();
    let mut blank = product(7, "Latte");
    blank.name = String::new();

    let err = catalog.update_product(&blank).await.unwrap_err();
    assert!(matches!(
        err,
        StoreError::Validation(ValidationError::EmptyProductName)
    ));
}

#[tokio::test]
async fn test_service_update_with_empty_name_never_reaches_gateway() {
    let service = ProductService::new(Arc::new(unreachable_catalog()), "S1", "pcs");
    let mut blank = product(7, "Latte");
    blank.name = " ".to_string();

    assert!(!service.update_product_details(blank).await);
    assert!(matches!(
        service.last_error().await,
        Some(ServiceError::Store(e)) if matches!(*e, StoreError::Validation(_))
    ));
}

#[tokio::test]
async fn test_create_with_empty_name_never_reaches_gateway() {
    let err = unreachable_catalog()
        .create_product(NewProduct::default())
        .await
        .unwrap_err();
    assert!(matches!(err, StoreError::Validation(_)));
}

#[tokio::test]
async fn test_inventory_without_sku_never_reaches_gateway() {
    let item = InventoryItem {
        name: "Large".to_string(),
        ..InventoryItem::draft(ProductId::new(42))
    };
    let err = unreachable_catalog()
        .create_inventory_item(item)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        StoreError::Validation(ValidationError::EmptySku)
    ));
}

#[tokio::test]
async fn test_valid_record_does_reach_gateway() {
    let err = unreachable_catalog()
        .update_product(&product(7, "Latte"))
        .await
        .unwrap_err();
    assert!(matches!(err, StoreError::Gateway(_)));
}

// =============================================================================
// Response mapping
// =============================================================================

#[test]
fn test_products_fixture() {
    let result = result(
        r#"{
            "cols": [
                {"name": "id", "decltype": "INTEGER"},
                {"name": "storeid", "decltype": "TEXT"},
                {"name": "name", "decltype": "TEXT"},
                {"name": "f1", "decltype": "TEXT"},
                {"name": "f2", "decltype": "TEXT"},
                {"name": "type", "decltype": "TEXT"},
                {"name": "price", "decltype": "REAL"},
                {"name": "stock", "decltype": "INTEGER"},
                {"name": "options", "decltype": "TEXT"},
                {"name": "modifiers", "decltype": "TEXT"},
                {"name": "metafields", "decltype": "TEXT"},
                {"name": "channels", "decltype": "TEXT"}
            ],
            "rows": [
                [
                    {"type": "integer", "value": "42"},
                    {"type": "text", "value": "S1"},
                    {"type": "text", "value": "Latte"},
                    {"type": "text", "value": "https://images.example.com/products/latte.jpg"},
                    {"type": "null"},
                    {"type": "text", "value": "Drink"},
                    {"type": "float", "value": 4.5},
                    {"type": "integer", "value": "12"},
                    {"type": "text", "value": "[{\"id\":\"7f0c1f8e-6a55-4d4f-9a53-0a4c3c8f2b11\",\"name\":\"Size\",\"values\":[\"S\",\"M\",\"L\"]}]"},
                    {"type": "text", "value": "{}"},
                    {"type": "null"},
                    {"type": "text", "value": "[{\"name\":\"POS\",\"enabled\":true}]"}
                ],
                [
                    {"type": "integer", "value": "43"},
                    {"type": "text", "value": "S1"},
                    {"type": "text", "value": "Tea"},
                    {"type": "null"},
                    {"type": "null"},
                    {"type": "null"},
                    {"type": "text", "value": "3.25"},
                    {"type": "text", "value": "lots"},
                    {"type": "text", "value": "{}"},
                    {"type": "text", "value": ""},
                    {"type": "text", "value": "{}"},
                    {"type": "text", "value": "{}"}
                ]
            ],
            "affected_row_count": 0,
            "last_insert_rowid": null
        }"#,
    );

    let fetched = products_from_result(&result);
    assert_eq!(fetched.records.len(), 2);

    let latte = &fetched.records[0];
    assert_eq!(latte.id, ProductId::new(42));
    assert_eq!(latte.product_type.as_deref(), Some("Drink"));
    assert_eq!(latte.image_urls().count(), 1);
    assert_eq!(latte.price, Decimal::new(45, 1));
    assert_eq!(latte.stock, 12);
    assert_eq!(latte.options[0].name, "Size");
    assert_eq!(latte.options[0].values, ["S", "M", "L"]);
    assert!(latte.modifiers.is_empty());
    assert!(latte.metafields.is_empty());
    assert!(latte.channel_enabled("POS"));

    let tea = &fetched.records[1];
    assert_eq!(tea.price, Decimal::new(325, 2));
    assert_eq!(tea.stock, 0);
    assert!(tea.options.is_empty() && tea.channels.is_empty());

    // Only the unparsable stock is reported.
    assert_eq!(fetched.issues.len(), 1);
    assert_eq!(fetched.issues[0].record_id, Some(43));
    assert_eq!(fetched.issues[0].column, "stock");
    assert_eq!(
        fetched.issues[0].kind,
        ReadIssueKind::InvalidNumber {
            raw: "lots".to_string()
        }
    );
}

#[test]
fn test_inventory_fixture() {
    let result = result(
        r#"{
            "cols": [
                {"name": "id"}, {"name": "product_id"}, {"name": "name"}, {"name": "f"},
                {"name": "sku"}, {"name": "barcode"}, {"name": "available"},
                {"name": "committed"}, {"name": "instock"}, {"name": "price"},
                {"name": "compare"}, {"name": "cost"}, {"name": "metafields"},
                {"name": "modifiers"}, {"name": "location"}
            ],
            "rows": [
                [
                    {"type": "integer", "value": "1"},
                    {"type": "integer", "value": "42"},
                    {"type": "text", "value": "Large"},
                    {"type": "null"},
                    {"type": "text", "value": "LAT-L"},
                    {"type": "text", "value": "0123456789012"},
                    {"type": "integer", "value": "10"},
                    {"type": "integer", "value": "3"},
                    {"type": "null"},
                    {"type": "float", "value": 5.5},
                    {"type": "float", "value": 6.0},
                    {"type": "null"},
                    {"type": "text", "value": "[{\"key\":\"origin\",\"value\":\"Kenya\"}]"},
                    {"type": "text", "value": "{}"},
                    {"type": "text", "value": "Front counter"}
                ]
            ]
        }"#,
    );

    let fetched = inventory_from_result(&result);
    assert!(!fetched.is_degraded());

    let item = &fetched.records[0];
    assert_eq!(item.product_id, ProductId::new(42));
    assert_eq!(item.instock, None);
    assert_eq!(item.effective_instock(), 7);
    assert_eq!(item.price, Some(Decimal::new(55, 1)));
    assert_eq!(item.compare_at_price, Some(Decimal::new(6, 0)));
    assert_eq!(item.cost, None);
    assert_eq!(item.metafields[0].key, "origin");
    assert!(item.modifiers.is_empty());
    assert_eq!(item.location.as_deref(), Some("Front counter"));
}

#[test]
fn test_malformed_json_column_is_reported() {
    let result = result(
        r#"{
            "cols": [{"name": "id"}, {"name": "name"}, {"name": "sku"}, {"name": "product_id"}, {"name": "modifiers"}],
            "rows": [[
                {"type": "integer", "value": "5"},
                {"type": "text", "value": "Small"},
                {"type": "text", "value": "LAT-S"},
                {"type": "integer", "value": "42"},
                {"type": "text", "value": "{\"name\": \"Milk\"}"}
            ]]
        }"#,
    );

    let fetched = inventory_from_result(&result);
    assert_eq!(fetched.records.len(), 1);
    assert!(fetched.records[0].modifiers.is_empty());
    assert!(matches!(
        fetched.issues[0].kind,
        ReadIssueKind::InvalidAttributes { .. }
    ));
}
