//! End-to-end CRUD coverage over the store facade.

use std::collections::HashSet;

use serde_json::json;

use crate::helpers::{seeded_collection, test_collection, test_store};

#[tokio::test]
async fn insert_returns_document_with_generated_id() {
    let (_store, streaks) = test_collection("streaks");

    let doc = streaks
        .insert_value(json!({"key": "A", "length": 1}))
        .await
        .unwrap();

    assert_eq!(doc.id().len(), 16);
    assert!(doc.id().chars().all(|c| c.is_ascii_hexdigit()));
    assert_eq!(doc.get("key"), Some(&json!("A")));
    assert_eq!(doc.get("length"), Some(&json!(1)));
}

#[tokio::test]
async fn inserted_document_is_findable_by_id() {
    let (_store, streaks) = test_collection("streaks");

    let a = streaks.insert_value(json!({"key": "A"})).await.unwrap();
    let b = streaks.insert_value(json!({"key": "B"})).await.unwrap();

    let found = streaks
        .find(&json!({"_id": a.id()}))
        .await
        .unwrap();
    assert_eq!(found, vec![a]);

    let found_one = streaks.find_one(&json!({"_id": b.id()})).await.unwrap();
    assert_eq!(found_one, Some(b));
}

#[tokio::test]
async fn repeated_inserts_yield_distinct_ids() {
    let (_store, notes) = test_collection("stickynotes");

    let mut ids = HashSet::new();
    for n in 0..40 {
        let doc = notes.insert_value(json!({"n": n})).await.unwrap();
        assert!(ids.insert(doc.id().to_string()), "duplicate id {}", doc.id());
    }
    assert_eq!(notes.find(&json!({})).await.unwrap().len(), 40);
}

#[tokio::test]
async fn find_on_never_written_collection_is_empty() {
    let (_store, notes) = test_collection("stickynotes");
    assert!(notes.find(&json!({})).await.unwrap().is_empty());
    assert_eq!(notes.find_one(&json!({"key": "A"})).await.unwrap(), None);
}

#[tokio::test]
async fn update_one_modifies_and_persists() {
    let (store, streaks) =
        seeded_collection("streaks", &[json!({"key": "A", "length": 1})]).await;

    let updated = streaks
        .update_one(&json!({"key": "A"}), &json!({"length": 2}))
        .await
        .unwrap()
        .expect("one document should match");
    assert_eq!(updated.get("length"), Some(&json!(2)));

    // A fresh handle reads the persisted blob, not this handle's cache.
    let reader = store.open_collection("streaks");
    let seen = reader.find_one(&json!({"key": "A"})).await.unwrap().unwrap();
    assert_eq!(seen.get("length"), Some(&json!(2)));
}

#[tokio::test]
async fn update_on_miss_returns_empty_not_error() {
    let (_store, streaks) =
        seeded_collection("streaks", &[json!({"key": "A", "length": 1})]).await;

    let updated = streaks
        .update(&json!({"key": "missing"}), &json!({"length": 9}))
        .await
        .unwrap();
    assert!(updated.is_empty());

    let one = streaks
        .update_one(&json!({"key": "missing"}), &json!({"length": 9}))
        .await
        .unwrap();
    assert_eq!(one, None);
}

#[tokio::test]
async fn update_touches_every_match() {
    let (_store, tasks) = seeded_collection(
        "tasks",
        &[
            json!({"state": "open", "n": 1}),
            json!({"state": "open", "n": 2}),
            json!({"state": "done", "n": 3}),
        ],
    )
    .await;

    let updated = tasks
        .update(&json!({"state": "open"}), &json!({"state": "done"}))
        .await
        .unwrap();
    assert_eq!(updated.len(), 2);

    let remaining = tasks.find(&json!({"state": "open"})).await.unwrap();
    assert!(remaining.is_empty());
    assert_eq!(tasks.find(&json!({"state": "done"})).await.unwrap().len(), 3);
}

#[tokio::test]
async fn patches_never_change_the_id() {
    let (_store, notes) = test_collection("stickynotes");
    let doc = notes.insert_value(json!({"content": "x"})).await.unwrap();

    let updated = notes
        .update_one(&json!({"_id": doc.id()}), &json!({"_id": "hijacked", "content": "y"}))
        .await
        .unwrap()
        .unwrap();

    assert_eq!(updated.id(), doc.id());
    assert_eq!(updated.get("content"), Some(&json!("y")));
    // Still findable under the original id.
    assert!(notes.find_one(&json!({"_id": doc.id()})).await.unwrap().is_some());
}

#[tokio::test]
async fn remove_deletes_all_matches() {
    let (store, streaks) = seeded_collection(
        "streaks",
        &[
            json!({"key": "A", "length": 1}),
            json!({"key": "A", "length": 2}),
            json!({"key": "B", "length": 3}),
        ],
    )
    .await;

    let removed = streaks.remove(&json!({"key": "A"})).await.unwrap();
    assert_eq!(removed.len(), 2);

    assert!(streaks.find(&json!({"key": "A"})).await.unwrap().is_empty());
    // The survivor persists for other handles too.
    let reader = store.open_collection("streaks");
    assert_eq!(reader.find(&json!({})).await.unwrap().len(), 1);
}

#[tokio::test]
async fn remove_one_deletes_a_single_match() {
    let (_store, streaks) = seeded_collection(
        "streaks",
        &[
            json!({"key": "A", "length": 1}),
            json!({"key": "A", "length": 2}),
        ],
    )
    .await;

    let removed = streaks.remove_one(&json!({"key": "A"})).await.unwrap();
    assert!(removed.is_some());
    assert_eq!(streaks.find(&json!({"key": "A"})).await.unwrap().len(), 1);

    let miss = streaks.remove_one(&json!({"key": "C"})).await.unwrap();
    assert_eq!(miss, None);
}

#[tokio::test]
async fn collections_share_one_blob_but_stay_separate() {
    let store = test_store();
    let notes = store.open_collection("stickynotes");
    let streaks = store.open_collection("streaks");

    notes.insert_value(json!({"content": "n"})).await.unwrap();
    streaks.insert_value(json!({"key": "A"})).await.unwrap();

    assert_eq!(notes.find(&json!({})).await.unwrap().len(), 1);
    assert_eq!(streaks.find(&json!({})).await.unwrap().len(), 1);
    assert!(notes
        .find(&json!({"key": "A"}))
        .await
        .unwrap()
        .is_empty());
}

#[tokio::test]
async fn typed_records_round_trip_through_insert_value() {
    #[derive(serde::Serialize, serde::Deserialize)]
    struct Streak {
        key: String,
        length: u32,
    }

    let (_store, streaks) = test_collection("streaks");
    let doc = streaks
        .insert_value(Streak {
            key: "A".into(),
            length: 7,
        })
        .await
        .unwrap();

    let stored = streaks
        .find_one(&json!({"_id": doc.id()}))
        .await
        .unwrap()
        .unwrap();
    let streak: Streak = stored.to_record().unwrap();
    assert_eq!(streak.key, "A");
    assert_eq!(streak.length, 7);
}
