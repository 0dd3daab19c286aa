//! Integration tests for the item registry against SQLite.
//!
//! Covers numbering, unique index conflicts, code re-derivation on update,
//! optimistic versions, filtering and the bulk operations.

mod common;

use std::sync::Arc;

use assert_matches::assert_matches;
use common::{item_draft, TestApp};
use partmaster_api::{
    entities::item,
    errors::ServiceError,
    models::SortOrder,
    services::{
        code_generator::{ItemDraft, ItemPatch},
        items::{ItemFilter, ItemService},
        spreadsheet::{self, Row},
    },
};
use serde_json::json;
use uuid::Uuid;

fn sequence_numbers(items: &[item::Model]) -> Vec<i64> {
    items.iter().map(|item| item.sequence_no).collect()
}

#[tokio::test]
async fn first_item_gets_sequence_one_and_initial_revision() {
    let app = TestApp::new().await;
    let items = &app.state.services.items;

    let created = items.create_item(item_draft("Cell module")).await.unwrap();

    assert_eq!(created.sequence_no, 1);
    assert_eq!(created.electronic_code, "A-E-A00-00001A");
    assert_eq!(created.revision, "A");
    assert_eq!(created.unit, "EA");
    assert_eq!(created.item_type, "제품");
    assert_eq!(created.status, "양산");
    assert_eq!(created.version, 1);
}

#[tokio::test]
async fn create_ignores_client_sequence_and_numbers_after_max() {
    let app = TestApp::new().await;
    let items = &app.state.services.items;

    items
        .insert_numbered(ItemDraft {
            sequence_no: Some(41),
            ..item_draft("Imported part")
        })
        .await
        .unwrap();

    let created = items
        .create_item(ItemDraft {
            sequence_no: Some(7),
            division: "B".into(),
            industry_code: "H".into(),
            part_group: "C00".into(),
            revision: Some("B".into()),
            ..item_draft("Stack plate")
        })
        .await
        .unwrap();

    assert_eq!(created.sequence_no, 42);
    assert_eq!(created.electronic_code, "B-H-C00-00042B");
    assert_eq!(items.last_sequence_no().await.unwrap(), Some(42));
}

#[tokio::test]
async fn empty_item_name_is_rejected_before_the_store() {
    let app = TestApp::new().await;
    let items = &app.state.services.items;

    let err = items.create_item(item_draft("   ")).await.unwrap_err();

    assert_matches!(err, ServiceError::ValidationError(msg) if msg.contains("itemName"));
    assert_eq!(items.last_sequence_no().await.unwrap(), None);
}

#[tokio::test]
async fn unknown_part_group_is_a_validation_error() {
    let app = TestApp::new().await;

    let err = app
        .state
        .services
        .items
        .create_item(ItemDraft {
            part_group: "Z99".into(),
            ..item_draft("Mystery")
        })
        .await
        .unwrap_err();

    assert_matches!(err, ServiceError::ValidationError(msg) if msg.contains("Z99"));
}

#[tokio::test]
async fn concurrent_inserts_with_same_sequence_yield_one_duplicate() {
    let app = TestApp::new().await;
    let items = app.state.services.items.clone();

    let draft = ItemDraft {
        sequence_no: Some(5),
        ..item_draft("Contended")
    };
    let (first, second) = tokio::join!(
        items.insert_numbered(draft.clone()),
        items.insert_numbered(draft)
    );

    let outcomes = [first, second];
    assert_eq!(outcomes.iter().filter(|r| r.is_ok()).count(), 1);
    let failure = outcomes.into_iter().find_map(Result::err).unwrap();
    assert_matches!(failure, ServiceError::DuplicateKey(_));
}

#[tokio::test]
async fn numbered_insert_collision_is_not_retried() {
    let app = TestApp::new().await;
    let items = &app.state.services.items;

    let numbered = ItemDraft {
        sequence_no: Some(3),
        ..item_draft("Original")
    };
    items.insert_numbered(numbered.clone()).await.unwrap();

    let err = items.insert_numbered(numbered).await.unwrap_err();
    assert!(err.is_duplicate_key());
    assert_eq!(items.list_items(&ItemFilter::default()).await.unwrap().len(), 1);
}

#[tokio::test]
async fn racing_auto_numbered_creates_all_land_on_distinct_numbers() {
    let app = TestApp::new().await;
    let items = Arc::new(
        ItemService::new(app.state.db.clone()).with_policy(10, SortOrder::Asc),
    );

    let handles: Vec<_> = (0..5)
        .map(|i| {
            let items = items.clone();
            tokio::spawn(async move { items.create_item(item_draft(&format!("Part {}", i))).await })
        })
        .collect();

    let mut numbers = Vec::new();
    for outcome in futures::future::join_all(handles).await {
        numbers.push(outcome.unwrap().unwrap().sequence_no);
    }
    numbers.sort_unstable();

    assert_eq!(numbers, vec![1, 2, 3, 4, 5]);
}

#[tokio::test]
async fn update_recomputes_code_when_classification_changes() {
    let app = TestApp::new().await;
    let items = &app.state.services.items;
    let created = items.create_item(item_draft("Busbar")).await.unwrap();

    let renamed = items
        .update_item(
            created.id,
            ItemPatch {
                item_name: Some("Copper busbar".into()),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(renamed.electronic_code, "A-E-A00-00001A");
    assert_eq!(renamed.version, 2);

    let moved = items
        .update_item(
            created.id,
            ItemPatch {
                division: Some("C".into()),
                revision: Some("D".into()),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(moved.electronic_code, "C-E-A00-00001D");
    assert_eq!(moved.item_name, "Copper busbar");
    assert_eq!(moved.version, 3);

    let found = items.find_by_code("C-E-A00-00001D").await.unwrap();
    assert_eq!(found.map(|item| item.id), Some(created.id));
}

#[tokio::test]
async fn stale_expected_version_is_a_conflict() {
    let app = TestApp::new().await;
    let items = &app.state.services.items;
    let created = items.create_item(item_draft("Sensor")).await.unwrap();

    items
        .update_item(
            created.id,
            ItemPatch {
                expected_version: Some(1),
                note: Some("first editor".into()),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    let err = items
        .update_item(
            created.id,
            ItemPatch {
                expected_version: Some(1),
                note: Some("second editor".into()),
                ..Default::default()
            },
        )
        .await
        .unwrap_err();
    assert_matches!(err, ServiceError::ConcurrentModification(id) if id == created.id);

    let stored = items.get_item(created.id).await.unwrap();
    assert_eq!(stored.note, "first editor");
}

#[tokio::test]
async fn update_without_version_is_last_write_wins() {
    let app = TestApp::new().await;
    let items = &app.state.services.items;
    let created = items.create_item(item_draft("Harness")).await.unwrap();

    for note in ["one", "two"] {
        items
            .update_item(
                created.id,
                ItemPatch {
                    note: Some(note.into()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
    }

    assert_eq!(items.get_item(created.id).await.unwrap().note, "two");
}

#[tokio::test]
async fn moving_onto_a_taken_sequence_is_a_duplicate() {
    let app = TestApp::new().await;
    let items = &app.state.services.items;
    items.create_item(item_draft("First")).await.unwrap();
    let second = items.create_item(item_draft("Second")).await.unwrap();

    let err = items
        .update_item(
            second.id,
            ItemPatch {
                sequence_no: Some(1),
                ..Default::default()
            },
        )
        .await
        .unwrap_err();

    assert_matches!(err, ServiceError::DuplicateKey(_));
}

#[tokio::test]
async fn filters_combine_equality_and_case_insensitive_substring() {
    let app = TestApp::new().await;
    let items = &app.state.services.items;
    items
        .create_item(ItemDraft {
            model: Some("PX-100".into()),
            ..item_draft("Pouch Cell")
        })
        .await
        .unwrap();
    items
        .create_item(ItemDraft {
            division: "B".into(),
            ..item_draft("Cell holder")
        })
        .await
        .unwrap();
    items
        .create_item(ItemDraft {
            status: Some("개발".into()),
            ..item_draft("Cooling plate")
        })
        .await
        .unwrap();

    let by_name = items
        .list_items(&ItemFilter {
            item_name: Some("cell".into()),
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(by_name.len(), 2);

    let narrowed = items
        .list_items(&ItemFilter {
            item_name: Some("CELL".into()),
            division: Some("A".into()),
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(narrowed.len(), 1);
    assert_eq!(narrowed[0].item_name, "Pouch Cell");

    let by_model = items
        .list_items(&ItemFilter {
            model: Some("px-1".into()),
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(by_model.len(), 1);

    let in_development = items
        .list_items(&ItemFilter {
            status: Some("개발".into()),
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(in_development.len(), 1);
    assert_eq!(in_development[0].item_name, "Cooling plate");
}

#[tokio::test]
async fn substring_filter_treats_wildcards_literally() {
    let app = TestApp::new().await;
    let items = &app.state.services.items;
    items.create_item(item_draft("Fuse 100%")).await.unwrap();
    items.create_item(item_draft("Fuse 1000")).await.unwrap();

    let matched = items
        .list_items(&ItemFilter {
            item_name: Some("100%".into()),
            ..Default::default()
        })
        .await
        .unwrap();

    assert_eq!(matched.len(), 1);
    assert_eq!(matched[0].item_name, "Fuse 100%");
}

#[tokio::test]
async fn listing_honours_sort_order() {
    let app = TestApp::new().await;
    let items = &app.state.services.items;
    for name in ["a", "b", "c"] {
        items.create_item(item_draft(name)).await.unwrap();
    }

    let ascending = items.list_items(&ItemFilter::default()).await.unwrap();
    let descending = items
        .list_items(&ItemFilter {
            sort_order: Some(SortOrder::Desc),
            ..Default::default()
        })
        .await
        .unwrap();

    assert_eq!(sequence_numbers(&ascending), vec![1, 2, 3]);
    assert_eq!(sequence_numbers(&descending), vec![3, 2, 1]);
}

#[tokio::test]
async fn last_code_is_the_greatest_code() {
    let app = TestApp::new().await;
    let items = &app.state.services.items;
    assert_eq!(items.last_code().await.unwrap(), None);

    items.create_item(item_draft("one")).await.unwrap();
    items
        .create_item(ItemDraft {
            division: "D".into(),
            ..item_draft("two")
        })
        .await
        .unwrap();
    items
        .create_item(ItemDraft {
            division: "B".into(),
            ..item_draft("three")
        })
        .await
        .unwrap();

    assert_eq!(
        items.last_code().await.unwrap().as_deref(),
        Some("D-E-A00-00002A")
    );
}

#[tokio::test]
async fn bulk_create_reports_failed_rows_and_keeps_the_rest() {
    let app = TestApp::new().await;
    let items = &app.state.services.items;

    let result = items
        .create_many(vec![
            item_draft("ok one"),
            item_draft(""),
            ItemDraft {
                sequence_no: Some(100),
                ..item_draft("numbered")
            },
            ItemDraft {
                sequence_no: Some(100),
                ..item_draft("numbered again")
            },
        ])
        .await;

    assert_eq!(result.succeeded.len(), 2);
    let failed: Vec<usize> = result.failed.iter().map(|f| f.index).collect();
    assert_eq!(failed, vec![1, 3]);
    assert!(result.failed[1].error.contains("Duplicate key"));
    assert!(!result.is_complete_success());
}

#[tokio::test]
async fn delete_many_reports_missing_ids() {
    let app = TestApp::new().await;
    let items = &app.state.services.items;
    let kept = items.create_item(item_draft("kept")).await.unwrap();
    let doomed = items.create_item(item_draft("doomed")).await.unwrap();
    let missing = Uuid::new_v4();

    let result = items.delete_many(vec![doomed.id, missing]).await;

    assert_eq!(result.succeeded, vec![doomed.id]);
    assert_eq!(result.failed.len(), 1);
    assert_eq!(result.failed[0].id, Some(missing));

    let remaining = items.list_items(&ItemFilter::default()).await.unwrap();
    assert_eq!(remaining.len(), 1);
    assert_eq!(remaining[0].id, kept.id);
}

#[tokio::test]
async fn deleting_a_missing_item_is_not_found() {
    let app = TestApp::new().await;

    let err = app
        .state
        .services
        .items
        .delete_item(Uuid::new_v4())
        .await
        .unwrap_err();

    assert_matches!(err, ServiceError::NotFound(_));
}

#[tokio::test]
async fn import_failures_point_at_the_sheet_row_past_blank_rows() {
    let app = TestApp::new().await;
    let items = &app.state.services.items;

    let rows: Vec<Row> = [
        json!({"division": "A", "industry": "E", "partGroup": "A00", "itemName": "Cell"}),
        json!({}),
        json!({"division": "A", "industry": "E", "partGroup": "Z99", "itemName": "Tab"}),
        json!({"division": "B", "industry": "H", "partGroup": "C00", "itemName": "Stack"}),
    ]
    .into_iter()
    .map(|value| match value {
        serde_json::Value::Object(map) => map,
        _ => unreachable!(),
    })
    .collect();
    let bytes = spreadsheet::encode(&rows, "Items").unwrap();

    let result = spreadsheet::import_items(items, &bytes).await.unwrap();

    assert_eq!(result.succeeded.len(), 2);
    assert_eq!(result.failed.len(), 1);
    assert_eq!(result.failed[0].index, 2);
    assert!(result.failed[0].error.contains("partGroup"));
}
