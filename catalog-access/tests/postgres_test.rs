//! Tests against a live PostgreSQL catalog. Run with
//! `DATABASE_URL=postgres://... cargo test -- --ignored`.

use catalog_access::models::Role;
use catalog_access::services::{DataStore, PgDataStore};
use secrecy::SecretString;

async fn store() -> PgDataStore {
    let url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set");
    PgDataStore::connect(&SecretString::new(url), 2)
        .await
        .expect("connect to PostgreSQL")
}

#[tokio::test]
#[ignore = "requires a PostgreSQL catalog"]
async fn unknown_rows_are_empty_not_errors() {
    let store = store().await;

    assert_eq!(store.lookup_identity_by_api_key("no-such-key").await.unwrap(), None);
    assert_eq!(store.lookup_role(-1).await.unwrap(), Role::Normal);
    assert!(store.lookup_groups_of_identity(-1).await.unwrap().is_empty());
    assert!(store.lookup_records_by_keyword_ids(&[]).await.unwrap().is_empty());
    assert!(store.lookup_records_of_file(-1).await.unwrap().is_empty());
}

#[tokio::test]
#[ignore = "requires a PostgreSQL catalog"]
async fn tag_listing_honours_limit() {
    let store = store().await;

    let capped = store.lookup_records_by_tag(1, Some(5)).await.unwrap();
    assert!(capped.len() <= 5);
}

#[tokio::test]
#[ignore = "requires a PostgreSQL catalog"]
async fn groups_come_back_sorted_by_name() {
    let store = store().await;

    let groups = store.lookup_groups(None).await.unwrap();
    let mut names: Vec<_> = groups.iter().map(|g| g.name.clone()).collect();
    let listed = names.clone();
    names.sort();
    assert_eq!(listed, names);
}
