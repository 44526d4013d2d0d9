//! Integration tests for Repository + RepositoryHandler over the in-memory store.
//!
//! Tests run on tokio's current-thread runtime: spawned remote writes only
//! make progress when the test awaits, so the optimistic state in between is
//! deterministic.

mod models;

use std::sync::{Arc, Mutex};

use models::{Deck, DeckPatch, Todo, TodoPatch};
use optimistic_repository::{
    use_repository, use_repository_document, Direction, Documents, FieldPatch, InMemoryRemoteStore,
    PatchError, Query, RemoteError, RemoteStore, Repository, RepositoryConfig, RepositoryError,
    WriteFailurePolicy,
};
use serde_json::json;

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn seeded(decks: &[(&str, Deck)]) -> Arc<InMemoryRemoteStore> {
    let store = Arc::new(InMemoryRemoteStore::new());
    for (id, deck) in decks {
        store.seed("decks", *id, serde_json::to_value(deck).unwrap());
    }
    store
}

fn ids(documents: &Documents<Deck>) -> Vec<String> {
    documents.iter().map(|doc| doc.id.clone()).collect()
}

fn rollback() -> RepositoryConfig {
    RepositoryConfig::default().with_write_failure_policy(WriteFailurePolicy::Rollback)
}

fn open_with_rollback(store: &Arc<InMemoryRemoteStore>) -> Repository<Deck, InMemoryRemoteStore> {
    Repository::open(store.clone(), Query::collection::<Deck>(), rollback()).unwrap()
}

// ============================================================================
// Snapshots
// ============================================================================

#[tokio::test]
async fn documents_are_none_until_first_snapshot() {
    let store = seeded(&[]);
    store.hold_snapshots();

    let repo = Repository::<Deck, _>::collection(store.clone()).unwrap();
    assert!(repo.documents().is_none());

    store.release_snapshots();
    let docs = repo.documents().unwrap();
    assert!(docs.is_empty());
}

#[tokio::test]
async fn snapshot_replaces_list_with_new_reference() {
    let store = seeded(&[("1", Deck::new("Spanish")), ("2", Deck::new("Biology"))]);
    let repo = Repository::<Deck, _>::collection(store.clone()).unwrap();

    let before = repo.documents().unwrap();
    assert_eq!(ids(&before), vec!["1", "2"]);
    assert!(before.iter().all(|doc| doc.synced_id()));

    store
        .add("decks", serde_json::to_value(Deck::new("History")).unwrap())
        .await
        .unwrap();

    let after = repo.documents().unwrap();
    assert!(!Arc::ptr_eq(&before, &after));
    assert_eq!(after.len(), 3);
    assert_eq!(after[2].data.name, "History");
    assert_eq!(
        after.iter().map(|d| d.id.clone()).collect::<Vec<_>>(),
        store.documents("decks").into_iter().map(|d| d.id).collect::<Vec<_>>()
    );
}

#[tokio::test]
async fn query_filters_and_orders_snapshot() {
    let store = seeded(&[
        ("1", Deck::new("B").with_description("mine")),
        ("2", Deck::new("A").with_description("mine")),
        ("3", Deck::new("C").with_description("shared")),
    ]);

    let query = Query::collection::<Deck>()
        .where_eq("description", json!("mine"))
        .order_by("name", Direction::Asc);
    let repo = Repository::<Deck, _>::open(store, query, RepositoryConfig::default()).unwrap();

    assert_eq!(ids(&repo.documents().unwrap()), vec!["2", "1"]);
}

#[tokio::test]
async fn subscription_error_leaves_documents_unset() {
    init_tracing();
    let store = seeded(&[("1", Deck::new("Spanish"))]);
    store.fail_subscriptions(RemoteError::PermissionDenied("rules".into()));

    let repo = Repository::<Deck, _>::collection(store).unwrap();
    assert!(repo.documents().is_none());
    assert_eq!(repo.last_error(), Some(RemoteError::PermissionDenied("rules".into())));
}

#[tokio::test]
async fn dropped_subscription_keeps_last_list() {
    let store = seeded(&[("1", Deck::new("Spanish"))]);
    let repo = Repository::<Deck, _>::collection(store.clone()).unwrap();
    let before = repo.documents().unwrap();

    store.drop_subscriptions(RemoteError::Unavailable("offline".into()));

    assert!(Arc::ptr_eq(&before, &repo.documents().unwrap()));
    assert_eq!(repo.last_error(), Some(RemoteError::Unavailable("offline".into())));
}

#[tokio::test]
async fn dropping_or_closing_unsubscribes() {
    let store = seeded(&[]);

    let repo = Repository::<Deck, _>::collection(store.clone()).unwrap();
    assert_eq!(store.subscriber_count(), 1);
    drop(repo);
    assert_eq!(store.subscriber_count(), 0);

    let repo = Repository::<Deck, _>::collection(store.clone()).unwrap();
    assert_eq!(store.subscriber_count(), 1);
    repo.close();
    assert_eq!(store.subscriber_count(), 0);
}

// ============================================================================
// Adds
// ============================================================================

#[tokio::test]
async fn add_is_visible_before_remote_confirms() {
    let store = seeded(&[]);
    store.queue_ids(["abc123"]);
    store.hold_snapshots();

    let repo = Repository::<Deck, _>::collection(store.clone()).unwrap();
    assert!(repo.documents().is_none());
    store.release_snapshots();
    assert!(repo.documents().unwrap().is_empty());

    let handler = repo.handler();
    let write = handler.add_document(Deck::new("Spanish")).unwrap();

    let docs = repo.documents().unwrap();
    assert_eq!(docs.len(), 1);
    assert!(!docs[0].synced_id());
    assert_eq!(Some(docs[0].id.as_str()), write.local_id());
    assert!(docs[0].id.starts_with("~local-"));
    assert!(store.documents("decks").is_empty());

    assert_eq!(write.await, Ok("abc123".to_string()));

    let docs = repo.documents().unwrap();
    assert_eq!(ids(&docs), vec!["abc123"]);
    assert!(docs[0].synced_id());
    assert_eq!(docs[0].data.name, "Spanish");
}

#[tokio::test]
async fn confirmed_add_is_reconciled_in_place() {
    let store = seeded(&[("1", Deck::new("Spanish"))]);
    store.queue_ids(["abc123"]);
    let repo = Repository::<Deck, _>::collection(store.clone()).unwrap();

    // Keep the confirming snapshot back so reconciliation does the work.
    store.hold_snapshots();
    let write = repo.handler().add_document(Deck::new("Biology")).unwrap();
    let fake_id = write.local_id().unwrap().to_string();

    assert_eq!(write.await, Ok("abc123".to_string()));

    let docs = repo.documents().unwrap();
    assert_eq!(ids(&docs), vec!["1", "abc123"]);
    assert!(docs[1].synced_id());
    assert_eq!(docs[1].fake_id(), Some(fake_id.as_str()));
    assert!(repo.document(&fake_id).is_none());

    store.release_snapshots();
    assert_eq!(ids(&repo.documents().unwrap()), vec!["1", "abc123"]);
}

#[tokio::test]
async fn add_before_first_snapshot_creates_list() {
    let store = seeded(&[]);
    store.hold_snapshots();
    let repo = Repository::<Deck, _>::collection(store.clone()).unwrap();

    let write = repo.handler().add_document(Deck::new("Spanish")).unwrap();
    let docs = repo.documents().unwrap();
    assert_eq!(docs.len(), 1);
    assert!(!docs[0].synced_id());

    write.await.unwrap();
}

#[tokio::test]
async fn ids_stay_unique_across_adds_and_deletes() {
    let store = seeded(&[("1", Deck::new("Spanish"))]);
    store.pause_writes();
    let repo = Repository::<Deck, _>::collection(store.clone()).unwrap();
    let handler = repo.handler();

    let a = handler.add_document(Deck::new("A")).unwrap();
    let b = handler.add_document(Deck::new("B")).unwrap();
    let deleted = handler.delete_document("1").unwrap().unwrap();
    let c = handler.add_document(Deck::new("C")).unwrap();

    let unique = |docs: &Documents<Deck>| {
        let mut seen = ids(docs);
        seen.sort();
        seen.dedup();
        seen.len() == docs.len()
    };
    assert!(unique(&repo.documents().unwrap()));
    assert_eq!(repo.documents().unwrap().len(), 3);

    store.resume_writes();
    a.await.unwrap();
    b.await.unwrap();
    c.await.unwrap();
    deleted.await.unwrap();

    let docs = repo.documents().unwrap();
    assert!(unique(&docs));
    assert_eq!(docs.len(), 3);
    assert!(docs.iter().all(|doc| doc.synced_id()));
}

#[tokio::test]
async fn foreign_add_during_pending_add_keeps_ids_unique() {
    let store = seeded(&[]);
    store.queue_ids(["foreign", "mine"]);
    let repo = Repository::<Deck, _>::collection(store.clone()).unwrap();

    let write = repo.handler().add_document(Deck::new("Mine")).unwrap();
    assert_eq!(repo.documents().unwrap().len(), 1);

    // Another client adds first; its snapshot replaces the optimistic list.
    store
        .add("decks", serde_json::to_value(Deck::new("Foreign")).unwrap())
        .await
        .unwrap();
    let docs = repo.documents().unwrap();
    assert_eq!(ids(&docs), vec!["foreign"]);
    assert!(docs.iter().all(|doc| doc.synced_id()));

    assert_eq!(write.await, Ok("mine".to_string()));

    let docs = repo.documents().unwrap();
    assert_eq!(ids(&docs), vec!["foreign", "mine"]);
    assert!(docs.iter().all(|doc| doc.synced_id()));
    assert_eq!(docs[1].data.name, "Mine");
}

#[tokio::test]
async fn delete_before_confirm_does_not_resurrect() {
    let store = seeded(&[]);
    store.queue_ids(["abc123"]);
    let repo = Repository::<Deck, _>::collection(store.clone()).unwrap();
    let handler = repo.handler();

    store.hold_snapshots();
    let add = handler.add_document(Deck::new("Spanish")).unwrap();
    let fake_id = add.local_id().unwrap().to_string();

    let delete = handler.delete_document(&fake_id).unwrap().unwrap();
    assert!(repo.documents().unwrap().is_empty());

    assert_eq!(add.await, Ok("abc123".to_string()));
    assert!(repo.documents().unwrap().is_empty());

    // The delete waited for the add and removed the confirmed document.
    assert_eq!(delete.await, Ok("abc123".to_string()));
    assert!(store.documents("decks").is_empty());

    store.release_snapshots();
    assert!(repo.documents().unwrap().is_empty());
}

#[tokio::test]
async fn failed_add_is_kept_by_default() {
    init_tracing();
    let store = seeded(&[]);
    store.fail_next_write(RemoteError::PermissionDenied("read only".into()));
    let repo = Repository::<Deck, _>::collection(store.clone()).unwrap();

    let write = repo.handler().add_document(Deck::new("Spanish")).unwrap();
    let fake_id = write.local_id().unwrap().to_string();

    assert_eq!(
        write.await,
        Err(RepositoryError::Remote(RemoteError::PermissionDenied("read only".into())))
    );

    let docs = repo.documents().unwrap();
    assert_eq!(ids(&docs), vec![fake_id]);
    assert!(!docs[0].synced_id());
}

#[tokio::test]
async fn failed_add_is_removed_under_rollback() {
    let store = seeded(&[]);
    store.fail_next_write(RemoteError::Unavailable("offline".into()));
    let repo = open_with_rollback(&store);

    let write = repo.handler().add_document(Deck::new("Spanish")).unwrap();
    assert_eq!(repo.documents().unwrap().len(), 1);

    assert!(write.await.is_err());
    assert!(repo.documents().unwrap().is_empty());
}

// ============================================================================
// Modifies
// ============================================================================

#[tokio::test]
async fn modify_merges_only_patched_field() {
    let store = seeded(&[("1", Deck::new("Spanish").with_description("verbs"))]);
    let repo = Repository::<Deck, _>::collection(store.clone()).unwrap();

    let write = repo
        .handler()
        .modify_document("1", &DeckPatch::new().name("Español"))
        .unwrap()
        .unwrap();

    let local = repo.document("1").unwrap();
    assert_eq!(local.data.name, "Español");
    assert_eq!(local.data.description, "verbs");
    assert_eq!(local.data.card_count, 0);

    assert_eq!(write.await, Ok("1".to_string()));

    let remote = store.document("decks", "1").unwrap();
    assert_eq!(remote.data, json!({ "name": "Español", "description": "verbs", "card_count": 0 }));
}

#[tokio::test]
async fn modify_unknown_id_is_a_noop() {
    let store = seeded(&[("1", Deck::new("Spanish"))]);
    let repo = Repository::<Deck, _>::collection(store.clone()).unwrap();
    let before = repo.documents().unwrap();

    let write = repo
        .handler()
        .modify_document("missing", &DeckPatch::new().name("X"))
        .unwrap();

    assert!(write.is_none());
    assert!(Arc::ptr_eq(&before, &repo.documents().unwrap()));
}

#[tokio::test]
async fn modify_sends_serialized_field_names() {
    let store = Arc::new(InMemoryRemoteStore::new());
    store.seed("todos", "t1", json!({ "title": "Revise", "isDone": false }));
    let repo = Repository::<Todo, _>::collection(store.clone()).unwrap();

    let write = repo
        .handler()
        .modify_document("t1", &TodoPatch::new().is_done(true))
        .unwrap()
        .unwrap();
    assert!(repo.document("t1").unwrap().data.is_done);

    write.await.unwrap();
    assert_eq!(
        store.document("todos", "t1").unwrap().data,
        json!({ "title": "Revise", "isDone": true })
    );
}

#[tokio::test]
async fn field_patch_rejects_unknown_fields() {
    let store = seeded(&[("1", Deck::new("Spanish"))]);
    let repo = Repository::<Deck, _>::collection(store.clone()).unwrap();
    let handler = repo.handler();

    let result = handler.modify_document("1", &FieldPatch::new().set("nmae", "typo"));
    assert!(matches!(
        result,
        Err(RepositoryError::Patch(PatchError::UnknownField(field))) if field == "nmae"
    ));
    assert_eq!(repo.document("1").unwrap().data.name, "Spanish");

    let write = handler
        .modify_document("1", &FieldPatch::new().set("card_count", 12))
        .unwrap()
        .unwrap();
    assert_eq!(repo.document("1").unwrap().data.card_count, 12);
    write.await.unwrap();
    assert_eq!(store.document("decks", "1").unwrap().data["card_count"], json!(12));
}

#[tokio::test]
async fn field_patch_with_unserializable_value_is_rejected() {
    let store = seeded(&[("1", Deck::new("Spanish"))]);
    let repo = Repository::<Deck, _>::collection(store.clone()).unwrap();
    let before = repo.documents().unwrap();

    // Maps with non-string keys have no JSON form.
    let mut cards = std::collections::HashMap::new();
    cards.insert((1u8, 2u8), "front");
    let patch = FieldPatch::new().set("name", "Español").set("card_count", cards);

    let result = repo.handler().modify_document("1", &patch);
    assert!(matches!(result, Err(RepositoryError::Patch(PatchError::Serde(_)))));
    assert!(Arc::ptr_eq(&before, &repo.documents().unwrap()));
    assert_eq!(store.document("decks", "1").unwrap().data["name"], json!("Spanish"));
}

#[tokio::test]
async fn modify_of_unconfirmed_add_targets_confirmed_id() {
    let store = seeded(&[]);
    store.queue_ids(["abc123"]);
    store.pause_writes();
    let repo = Repository::<Deck, _>::collection(store.clone()).unwrap();
    let handler = repo.handler();

    let add = handler.add_document(Deck::new("Spanish")).unwrap();
    let fake_id = add.local_id().unwrap().to_string();
    let modify = handler
        .modify_document(&fake_id, &DeckPatch::new().card_count(3u32))
        .unwrap()
        .unwrap();
    assert_eq!(repo.document(&fake_id).unwrap().data.card_count, 3);

    store.resume_writes();
    assert_eq!(add.await, Ok("abc123".to_string()));
    assert_eq!(modify.await, Ok("abc123".to_string()));

    assert_eq!(store.document("decks", "abc123").unwrap().data["card_count"], json!(3));
    assert_eq!(repo.document("abc123").unwrap().data.card_count, 3);
}

#[tokio::test]
async fn modify_of_failed_add_fails() {
    let store = seeded(&[]);
    store.pause_writes();
    store.fail_next_write(RemoteError::Rejected("quota".into()));
    let repo = Repository::<Deck, _>::collection(store.clone()).unwrap();
    let handler = repo.handler();

    let add = handler.add_document(Deck::new("Spanish")).unwrap();
    let fake_id = add.local_id().unwrap().to_string();
    let modify = handler
        .modify_document(&fake_id, &DeckPatch::new().name("Español"))
        .unwrap()
        .unwrap();

    store.resume_writes();
    assert!(add.await.is_err());
    assert_eq!(modify.await, Err(RepositoryError::Unconfirmed { fake_id }));
}

#[tokio::test]
async fn failed_modify_is_restored_under_rollback() {
    let store = seeded(&[("1", Deck::new("Spanish"))]);
    let repo = open_with_rollback(&store);

    store.fail_next_write(RemoteError::PermissionDenied("not owner".into()));
    let write = repo
        .handler()
        .modify_document("1", &DeckPatch::new().name("Español"))
        .unwrap()
        .unwrap();
    assert_eq!(repo.document("1").unwrap().data.name, "Español");

    assert!(write.await.is_err());
    assert_eq!(repo.document("1").unwrap().data.name, "Spanish");
}

#[tokio::test]
async fn failed_modify_rollback_keeps_newer_remote_fields() {
    init_tracing();
    let store = seeded(&[("1", Deck::new("Spanish").with_description("verbs"))]);
    let repo = open_with_rollback(&store);

    let write = repo
        .handler()
        .modify_document("1", &DeckPatch::new().name("Español"))
        .unwrap()
        .unwrap();

    // Another client changes a different field before our write is sent.
    let mut fields = serde_json::Map::new();
    fields.insert("description".to_string(), json!("irregular verbs"));
    store.update("decks", "1", fields).await.unwrap();
    assert_eq!(repo.document("1").unwrap().data.description, "irregular verbs");

    store.fail_next_write(RemoteError::PermissionDenied("not owner".into()));
    assert!(write.await.is_err());

    let local = repo.document("1").unwrap().data;
    let remote: Deck = serde_json::from_value(store.document("decks", "1").unwrap().data).unwrap();
    assert_eq!(local, remote);
    assert_eq!(local.description, "irregular verbs");
}

#[tokio::test]
async fn failed_modify_rollback_leaves_fields_changed_since() {
    let store = seeded(&[("1", Deck::new("Spanish"))]);
    let repo = open_with_rollback(&store);
    let handler = repo.handler();

    // Keep confirmations back so only the rollback changes the local list.
    store.hold_snapshots();

    store.fail_next_write(RemoteError::PermissionDenied("not owner".into()));
    let failing = handler
        .modify_document("1", &DeckPatch::new().name("Español").card_count(3u32))
        .unwrap()
        .unwrap();
    let later = handler
        .modify_document("1", &DeckPatch::new().card_count(5u32))
        .unwrap()
        .unwrap();

    assert!(failing.await.is_err());
    let deck = repo.document("1").unwrap().data;
    assert_eq!(deck.name, "Spanish");
    assert_eq!(deck.card_count, 5);

    later.await.unwrap();
    assert_eq!(store.document("decks", "1").unwrap().data["card_count"], json!(5));
}

// ============================================================================
// Deletes
// ============================================================================

#[tokio::test]
async fn delete_removes_synchronously() {
    let store = seeded(&[("1", Deck::new("A")), ("2", Deck::new("B"))]);
    let repo = Repository::<Deck, _>::collection(store.clone()).unwrap();
    let handler = repo.handler();

    let write = handler.delete_document("1").unwrap().unwrap();
    assert_eq!(ids(&repo.documents().unwrap()), vec!["2"]);
    assert_eq!(store.documents("decks").len(), 2);

    assert_eq!(write.await, Ok("1".to_string()));
    assert_eq!(store.documents("decks").len(), 1);

    assert!(handler.delete_document("1").unwrap().is_none());
}

#[tokio::test]
async fn delete_documents_resolves_after_all_remote_deletes() {
    let store = seeded(&[("1", Deck::new("A")), ("2", Deck::new("B"))]);
    let repo = Repository::<Deck, _>::collection(store.clone()).unwrap();

    store.pause_writes();
    let write = repo.handler().delete_documents(["1", "2", "missing"]).unwrap();
    assert_eq!(write.local_ids(), ["1".to_string(), "2".to_string()]);
    assert!(repo.documents().unwrap().is_empty());

    tokio::task::yield_now().await;
    assert!(!write.is_finished());
    assert_eq!(store.documents("decks").len(), 2);

    store.resume_writes();
    assert_eq!(write.await, Ok(vec!["1".to_string(), "2".to_string()]));
    assert!(store.documents("decks").is_empty());
    assert!(repo.documents().unwrap().is_empty());
}

#[tokio::test]
async fn failed_delete_is_reinserted_under_rollback() {
    let store = seeded(&[("1", Deck::new("A")), ("2", Deck::new("B")), ("3", Deck::new("C"))]);
    let repo = open_with_rollback(&store);

    store.fail_next_write(RemoteError::PermissionDenied("locked".into()));
    let write = repo.handler().delete_document("2").unwrap().unwrap();
    assert_eq!(ids(&repo.documents().unwrap()), vec!["1", "3"]);

    assert!(write.await.is_err());
    assert_eq!(ids(&repo.documents().unwrap()), vec!["1", "2", "3"]);
}

#[tokio::test]
async fn deleting_failed_add_leaves_nothing_behind_under_rollback() {
    let store = seeded(&[]);
    store.pause_writes();
    store.fail_next_write(RemoteError::Rejected("quota".into()));
    let repo = open_with_rollback(&store);
    let handler = repo.handler();

    let add = handler.add_document(Deck::new("Spanish")).unwrap();
    let fake_id = add.local_id().unwrap().to_string();
    let delete = handler.delete_document(&fake_id).unwrap().unwrap();
    assert!(repo.documents().unwrap().is_empty());

    store.resume_writes();
    assert!(add.await.is_err());
    assert_eq!(delete.await, Err(RepositoryError::Unconfirmed { fake_id: fake_id.clone() }));

    assert!(repo.documents().unwrap().is_empty());
    assert!(repo.document(&fake_id).is_none());
    assert!(store.documents("decks").is_empty());
}

#[tokio::test]
async fn partially_failed_delete_documents_converges_on_remote_state() {
    let store = seeded(&[("1", Deck::new("A")), ("2", Deck::new("B"))]);
    let repo = open_with_rollback(&store);

    store.fail_next_write(RemoteError::Unavailable("flaky".into()));
    let write = repo.handler().delete_documents(["1", "2"]).unwrap();
    assert!(repo.documents().unwrap().is_empty());

    assert!(write.await.is_err());

    let remote: Vec<String> = store.documents("decks").into_iter().map(|d| d.id).collect();
    assert_eq!(remote.len(), 1);
    assert_eq!(ids(&repo.documents().unwrap()), remote);
}

// ============================================================================
// Observers and hooks
// ============================================================================

#[tokio::test]
async fn on_change_fires_for_local_and_remote_updates() {
    let store = seeded(&[]);
    store.queue_ids(["abc123"]);
    let repo = Repository::<Deck, _>::collection(store.clone()).unwrap();

    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = seen.clone();
    let guard = repo.on_change(move |docs| {
        let count = docs.as_ref().map(|d| d.len()).unwrap_or(0);
        sink.lock().unwrap().push(count);
    });

    let write = repo.handler().add_document(Deck::new("Spanish")).unwrap();
    assert_eq!(*seen.lock().unwrap(), vec![1]);

    write.await.unwrap();
    assert!(seen.lock().unwrap().len() >= 2);

    drop(guard);
    let before = seen.lock().unwrap().len();
    repo.handler().delete_document("abc123").unwrap().unwrap().await.unwrap();
    assert_eq!(seen.lock().unwrap().len(), before);
}

#[tokio::test]
async fn hooks_return_state_and_handler() {
    let store = seeded(&[("1", Deck::new("Spanish"))]);
    let repo = Repository::<Deck, _>::collection(store.clone()).unwrap();

    let (documents, handler) = use_repository(&repo);
    assert_eq!(ids(&documents.unwrap()), vec!["1"]);

    let (document, _) = use_repository_document("1", &repo);
    assert_eq!(document.unwrap().data.name, "Spanish");
    let (missing, _) = use_repository_document("2", &repo);
    assert!(missing.is_none());

    handler
        .modify_document("1", &DeckPatch::new().name("Español"))
        .unwrap()
        .unwrap()
        .await
        .unwrap();
    let (document, _) = use_repository_document("1", &repo);
    assert_eq!(document.unwrap().data.name, "Español");
}

#[tokio::test]
async fn handler_outlives_repository() {
    let store = seeded(&[]);
    let repo = Repository::<Deck, _>::collection(store.clone()).unwrap();
    let handler = repo.handler();
    repo.close();

    let id = handler.add_document(Deck::new("Spanish")).unwrap().await.unwrap();
    assert!(store.document("decks", &id).is_some());
}

#[tokio::test]
async fn custom_fake_id_prefix() {
    let store = seeded(&[]);
    store.pause_writes();
    let config = RepositoryConfig::default().with_fake_id_prefix("tmp-");
    let repo = Repository::<Deck, _>::open(store.clone(), Query::collection::<Deck>(), config)
        .unwrap();

    let write = repo.handler().add_document(Deck::new("Spanish")).unwrap();
    assert!(write.local_id().unwrap().starts_with("tmp-"));
}

#[test]
fn open_outside_runtime_fails() {
    let store = seeded(&[]);
    assert!(matches!(
        Repository::<Deck, _>::collection(store),
        Err(RepositoryError::NoRuntime(_))
    ));
}
