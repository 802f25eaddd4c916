//! Integration tests for group listing and group-based filtering.

mod common;

use common::*;

#[tokio::test]
async fn groups_are_listed_by_name() {
    let app = TestCore::new();

    let names: Vec<String> = app
        .core
        .groups(None)
        .await
        .unwrap()
        .into_iter()
        .map(|g| g.name)
        .collect();
    assert_eq!(names, vec!["Basso", "Dalla-Favera", "Staudt"]);

    let some = app.core.groups(Some(&[1, 3][..])).await.unwrap();
    assert_eq!(some.iter().map(|g| g.id).collect::<Vec<_>>(), vec![3, 1]);
    assert_eq!(some[1].color, "#ff0000");
}

#[tokio::test]
async fn any_mode_keeps_records_in_some_listed_group() {
    let app = TestCore::new();

    // record groups: 1 -> {3, 2}, 2 -> {3, 4}, 3 -> {1}, 4 -> {4}
    let kept = app
        .core
        .filter_by_groups(NORMAL_ID, &[1, 2, 3, 4], &[2, 4], false)
        .await
        .unwrap();
    assert_eq!(kept, vec![1, 2, 4]);

    let untouched = app
        .core
        .filter_by_groups(NORMAL_ID, &[4, 1], &[], false)
        .await
        .unwrap();
    assert_eq!(untouched, vec![4, 1]);
}

#[tokio::test]
async fn all_mode_requires_every_listed_group() {
    let app = TestCore::new();

    let kept = app
        .core
        .filter_by_groups(ADMIN_ID, &[1, 2, 3, 4], &[3, 4], true)
        .await
        .unwrap();
    assert_eq!(kept, vec![2]);
}

#[tokio::test]
async fn all_mode_without_groups_uses_the_callers_groups() {
    let app = TestCore::new();

    // identity groups {1, 2}: no record is in both
    let kept = app
        .core
        .filter_by_groups(NORMAL_ID, &[1, 2, 3, 4], &[], true)
        .await
        .unwrap();
    assert!(kept.is_empty());

    // an identity with no groups imposes no requirement
    let kept = app
        .core
        .filter_by_groups(LONER_ID, &[1, 4], &[], true)
        .await
        .unwrap();
    assert_eq!(kept, vec![1, 4]);
}
