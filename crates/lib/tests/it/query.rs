//! Operator and directive behavior exercised through the store facade.
//!
//! The predicate engine has exhaustive unit coverage; these tests check that
//! operators, directives, and their errors behave through `find`/`update`
//! against persisted data.

use serde_json::json;

use crate::helpers::{seeded_collection, test_collection};

#[tokio::test]
async fn ge_selects_documents_at_or_above_threshold() {
    let (_store, streaks) = seeded_collection(
        "streaks",
        &[
            json!({"key": "A", "length": 3}),
            json!({"key": "B", "length": 5}),
            json!({"key": "C", "length": 7}),
        ],
    )
    .await;

    let long = streaks.find(&json!({"length": {"$ge": 5}})).await.unwrap();
    assert_eq!(long.len(), 2);
    for doc in &long {
        assert!(doc.get("length").unwrap().as_u64().unwrap() >= 5);
    }
}

#[tokio::test]
async fn ge_le_bound_a_range() {
    let (_store, streaks) = seeded_collection(
        "streaks",
        &[
            json!({"key": "A", "length": 3}),
            json!({"key": "B", "length": 5}),
            json!({"key": "C", "length": 7}),
        ],
    )
    .await;

    let mid = streaks
        .find(&json!({"length": {"$ge": 4, "$le": 6}}))
        .await
        .unwrap();
    assert_eq!(mid.len(), 1);
    assert_eq!(mid[0].get("key"), Some(&json!("B")));
}

#[tokio::test]
async fn literal_and_operator_fields_combine() {
    let (_store, entries) = seeded_collection(
        "journal",
        &[
            json!({"date": "2024-01-05", "mood": 4}),
            json!({"date": "2024-01-06", "mood": 2}),
            json!({"date": "2024-02-01", "mood": 5}),
        ],
    )
    .await;

    let good_january = entries
        .find(&json!({"date": {"$regex": "^2024-01"}, "mood": {"$ge": 3}}))
        .await
        .unwrap();
    assert_eq!(good_january.len(), 1);
    assert_eq!(good_january[0].get("date"), Some(&json!("2024-01-05")));
}

#[tokio::test]
async fn includes_works_on_strings_and_arrays() {
    let (_store, notes) = seeded_collection(
        "stickynotes",
        &[
            json!({"content": "buy milk", "tags": ["errand"]}),
            json!({"content": "call home", "tags": ["family", "phone"]}),
        ],
    )
    .await;

    let milk = notes
        .find(&json!({"content": {"$includes": "milk"}}))
        .await
        .unwrap();
    assert_eq!(milk.len(), 1);

    let phone = notes
        .find(&json!({"tags": {"$includes": "phone"}}))
        .await
        .unwrap();
    assert_eq!(phone.len(), 1);
    assert_eq!(phone[0].get("content"), Some(&json!("call home")));
}

#[tokio::test]
async fn type_mismatch_aborts_the_whole_scan() {
    // One document with a string length poisons a numeric comparison scan.
    let (_store, streaks) = seeded_collection(
        "streaks",
        &[
            json!({"key": "A", "length": 3}),
            json!({"key": "B", "length": "five"}),
        ],
    )
    .await;

    let err = streaks
        .find(&json!({"length": {"$ge": 1}}))
        .await
        .unwrap_err();
    assert!(err.is_type_mismatch());
}

#[tokio::test]
async fn unknown_operator_fails_before_scanning() {
    let (_store, streaks) = test_collection("streaks");
    let err = streaks
        .find(&json!({"length": {"$gt": 5}}))
        .await
        .unwrap_err();
    assert!(err.is_unknown_operator());
}

#[tokio::test]
async fn directives_are_rejected_in_find_predicates() {
    let (_store, streaks) = test_collection("streaks");
    let err = streaks
        .find(&json!({"activities": {"$append": "x"}}))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        slotdb::Error::Query(slotdb::QueryError::DirectiveInPredicate { .. })
    ));
}

#[tokio::test]
async fn streak_extension_appends_activity_and_bumps_length() {
    let (_store, streaks) = seeded_collection(
        "streaks",
        &[json!({
            "key": "A",
            "length": 1,
            "lastActivity": "2024-01-05",
            "activities": ["Logged in."],
        })],
    )
    .await;

    let updated = streaks
        .update_one(
            &json!({"key": "A"}),
            &json!({
                "length": 2,
                "lastActivity": "2024-01-06",
                "activities": {"$append": "Added a note."},
            }),
        )
        .await
        .unwrap()
        .expect("streak should exist");

    assert_eq!(updated.get("length"), Some(&json!(2)));
    assert_eq!(updated.get("lastActivity"), Some(&json!("2024-01-06")));
    assert_eq!(
        updated.get("activities"),
        Some(&json!(["Logged in.", "Added a note."]))
    );
}

#[tokio::test]
async fn append_via_update_creates_missing_array() {
    let (_store, streaks) =
        seeded_collection("streaks", &[json!({"key": "A", "length": 1})]).await;

    let updated = streaks
        .update_one(
            &json!({"key": "A"}),
            &json!({"activities": {"$append": "Logged in."}}),
        )
        .await
        .unwrap()
        .unwrap();
    assert_eq!(updated.get("activities"), Some(&json!(["Logged in."])));
}

#[tokio::test]
async fn remove_directive_deletes_field_and_array_elements() {
    let (_store, notes) = seeded_collection(
        "stickynotes",
        &[json!({"content": "x", "tags": ["a", "b", "a"], "draft": true})],
    )
    .await;

    let updated = notes
        .update_one(
            &json!({"content": "x"}),
            &json!({"tags": {"$remove": "a"}, "draft": {"$remove": true}}),
        )
        .await
        .unwrap()
        .unwrap();

    assert_eq!(updated.get("tags"), Some(&json!(["b"])));
    assert!(!updated.contains("draft"));
}

#[tokio::test]
async fn failed_directive_leaves_persisted_data_untouched() {
    let (store, streaks) = seeded_collection(
        "streaks",
        &[json!({"key": "A", "activities": "not a list"})],
    )
    .await;

    let err = streaks
        .update_one(
            &json!({"key": "A"}),
            &json!({"activities": {"$append": "x"}}),
        )
        .await
        .unwrap_err();
    assert!(err.is_type_mismatch());

    // The failure happened before persistence; another handle sees the
    // original value.
    let reader = store.open_collection("streaks");
    let doc = reader.find_one(&json!({"key": "A"})).await.unwrap().unwrap();
    assert_eq!(doc.get("activities"), Some(&json!("not a list")));
}

#[tokio::test]
async fn empty_predicate_matches_everything() {
    let (_store, notes) = seeded_collection(
        "stickynotes",
        &[json!({"n": 1}), json!({"n": 2}), json!({"n": 3})],
    )
    .await;
    assert_eq!(notes.find(&json!({})).await.unwrap().len(), 3);
}
