//! Integration test: snapshot load and order staging against an in-memory
//! OpenDAL store, so no live catalog service is required.

use opendal::Operator;
use ordrfs_catalog::{
    load_snapshot, CatalogError, CatalogSource, OpendalCatalog, OrderItem, OrderRequest,
};
use ordrfs_core::config::AccountConfig;

fn memory_operator() -> Operator {
    Operator::new(opendal::services::Memory::default())
        .expect("memory operator")
        .finish()
}

async fn put(op: &Operator, key: &str, json: &str) {
    op.write(key, json.as_bytes().to_vec())
        .await
        .expect("write fixture");
}

async fn seeded_catalog() -> OpendalCatalog {
    let op = memory_operator();
    put(
        &op,
        "catalog/restaurants.json",
        r#"[{"id": 1, "na": "Luigi's"}, {"id": 2, "na": "A/B Grill"}]"#,
    )
    .await;
    put(
        &op,
        "catalog/restaurants/1.json",
        r#"{"restaurant_id": 1, "name": "Luigi's", "cuisine": ["Italian"],
            "addr": "1 Main St", "city": "Springfield", "cs_contact_phone": "555-0100",
            "menu": [{"name": "Pizza", "children": [{"name": "Margherita", "price": "12.00", "id": 201}]}]}"#,
    )
    .await;
    put(
        &op,
        "catalog/restaurants/2.json",
        r#"{"restaurant_id": 2, "name": "A/B Grill", "cuisine": ["Italian", "American"],
            "addr": "2 Side St", "city": "Springfield", "cs_contact_phone": "555-0101", "menu": []}"#,
    )
    .await;
    OpendalCatalog::new(op, "catalog")
}

#[tokio::test]
async fn loads_full_snapshot() {
    let catalog = seeded_catalog().await;
    let snapshot = load_snapshot(&catalog).await.expect("snapshot");

    assert_eq!(snapshot.restaurant_count(), 2);
    assert_eq!(
        snapshot.categories().collect::<Vec<_>>(),
        ["American", "Italian"]
    );
    assert_eq!(
        snapshot.restaurants_in("Italian").collect::<Vec<_>>(),
        ["A\u{2215}B Grill", "Luigi's"]
    );
    let luigi = snapshot.restaurant_in("Italian", "Luigi's").unwrap();
    assert_eq!(luigi.id, "1");
    assert_eq!(luigi.menu.sections[0].items[0].id, "201");
}

#[tokio::test]
async fn missing_detail_aborts_load() {
    let op = memory_operator();
    put(&op, "catalog/restaurants.json", r#"[{"id": 1, "na": "Ghost"}]"#).await;
    let catalog = OpendalCatalog::new(op, "catalog");

    let err = load_snapshot(&catalog).await.unwrap_err();
    assert!(matches!(err, CatalogError::NotFound(_)), "got {err:?}");
}

#[tokio::test]
async fn missing_list_is_not_an_empty_catalog() {
    let catalog = OpendalCatalog::new(memory_operator(), "catalog");
    assert!(load_snapshot(&catalog).await.is_err());
}

#[tokio::test]
async fn empty_list_is_rejected() {
    let op = memory_operator();
    put(&op, "catalog/restaurants.json", "[]").await;
    let catalog = OpendalCatalog::new(op, "catalog");

    let err = load_snapshot(&catalog).await.unwrap_err();
    assert!(matches!(err, CatalogError::Empty));
}

#[tokio::test]
async fn malformed_detail_is_a_decode_error() {
    let op = memory_operator();
    put(&op, "catalog/restaurants.json", r#"[{"id": 5, "na": "Broken"}]"#).await;
    put(&op, "catalog/restaurants/5.json", "{not json").await;
    let catalog = OpendalCatalog::new(op, "catalog");

    let err = catalog.fetch_restaurant_detail("5").await.unwrap_err();
    assert!(matches!(err, CatalogError::Decode { .. }));
}

#[tokio::test]
async fn submit_order_stages_document() {
    let catalog = seeded_catalog().await;
    let order = OrderRequest {
        restaurant_id: "1".into(),
        items: vec![OrderItem::parse("201:2").unwrap()],
        tip: "2.50".into(),
        account: AccountConfig {
            email: Some("me@example.com".into()),
            ..Default::default()
        },
    };

    let receipt = catalog.submit_order(&order).await.expect("order");
    assert!(receipt.success);
    assert!(!receipt.reference_number.is_empty());

    let key = format!("catalog/orders/{}.json", receipt.reference_number);
    let staged = catalog.operator().read(&key).await.expect("staged order");
    let staged: serde_json::Value = serde_json::from_slice(&staged.to_vec()).unwrap();
    assert_eq!(staged["restaurant_id"], "1");
    assert_eq!(staged["reference_number"], receipt.reference_number.as_str());
    assert_eq!(staged["items"][0]["quantity"], 2);
}

#[tokio::test]
async fn empty_order_is_rejected() {
    let catalog = seeded_catalog().await;
    let order = OrderRequest {
        restaurant_id: "1".into(),
        items: Vec::new(),
        tip: "0".into(),
        account: AccountConfig::default(),
    };
    let err = catalog.submit_order(&order).await.unwrap_err();
    assert!(matches!(err, CatalogError::InvalidOrder(_)));
}
