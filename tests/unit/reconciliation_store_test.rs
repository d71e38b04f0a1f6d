//! Unit tests for the ReconciliationStore.
//!
//! External deltas are fed through the merge methods and optimistic writes
//! through `begin_mutation`/`settle`, so every interleaving of local writes,
//! remote results and feed events can be scripted without a backend.

#[path = "../support/mod.rs"]
mod support;

use std::sync::Arc;

use rstest::rstest;

use linkvault::managers::reconciliation_store::{
    Confirmed, MutationOutcome, OptimisticMutation, ReconciliationStore,
};
use linkvault::managers::temp_id::{is_temp_id, TempId};
use linkvault::types::bookmark::{derive_title, display_url, BookmarkItem};
use linkvault::types::change::ChangeDelta;
use linkvault::types::collection::Collection;
use linkvault::types::entity;
use linkvault::types::errors::{BookmarkError, RemoteError};

use support::{bookmark, bookmark_in, collection, RecordingNotifier};

fn setup() -> (ReconciliationStore, Arc<RecordingNotifier>) {
    let notifier = Arc::new(RecordingNotifier::default());
    (ReconciliationStore::new(notifier.clone()), notifier)
}

fn ids(store: &ReconciliationStore) -> Vec<String> {
    store.snapshot().bookmarks.iter().map(|b| b.id.clone()).collect()
}

fn retitle(id: &str, title: &str) -> OptimisticMutation {
    let (id, title) = (id.to_string(), title.to_string());
    OptimisticMutation::new("update bookmark", move |s| {
        s.update_bookmark(&id, |b| b.title = title.clone());
    })
}

fn archive(id: &str) -> OptimisticMutation {
    let id = id.to_string();
    OptimisticMutation::new("archive bookmark", move |s| {
        s.update_bookmark(&id, |b| b.archived = true);
    })
}

fn move_into(id: &str, target: &Collection) -> OptimisticMutation {
    let (id, target) = (id.to_string(), target.clone());
    OptimisticMutation::new("move bookmark", move |s| {
        s.update_bookmark(&id, |b| {
            b.collection_id = Some(target.id.clone());
            b.collection_name = Some(target.name.clone());
        });
    })
}

fn create_placeholder(url: &str) -> (OptimisticMutation, String) {
    let temp_id = TempId::generate();
    let placeholder = BookmarkItem {
        id: temp_id.to_string(),
        url: display_url(url),
        title: derive_title(url, ""),
        collection_id: None,
        collection_name: None,
        archived: false,
        created_at: 100,
    };
    let id = placeholder.id.clone();
    let mutation = OptimisticMutation::new("save bookmark", move |s| {
        entity::insert_unique(&mut s.bookmarks, placeholder.clone());
    })
    .with_temp_id(temp_id);
    (mutation, id)
}

fn network_down() -> RemoteError {
    RemoteError::Network("connection reset".to_string())
}

// === External merges ===

/// Merging the same insert twice leaves exactly one entry.
#[test]
fn test_external_insert_is_idempotent() {
    let (store, _) = setup();
    store.merge_bookmark_insert(bookmark("bm-1", 1));
    store.merge_bookmark_insert(bookmark("bm-1", 1));
    assert_eq!(ids(&store), vec!["bm-1"]);
}

/// New bookmarks go to the front, new collections to the back.
#[test]
fn test_insert_placement_per_kind() {
    let (store, _) = setup();
    store.merge_bookmark_insert(bookmark("old", 1));
    store.merge_bookmark_insert(bookmark("new", 2));
    store.merge_collection_insert(collection("c-1", 1));
    store.merge_collection_insert(collection("c-2", 2));

    let snapshot = store.snapshot();
    assert_eq!(ids(&store), vec!["new", "old"]);
    let cids: Vec<_> = snapshot.collections.iter().map(|c| c.id.as_str()).collect();
    assert_eq!(cids, vec!["c-1", "c-2"]);
}

/// An update replaces the entity in place without reordering.
#[test]
fn test_external_update_keeps_position() {
    let (store, _) = setup();
    store.replace_all(vec![bookmark("a", 3), bookmark("b", 2), bookmark("c", 1)], vec![]);

    let mut changed = bookmark("b", 2);
    changed.title = "Changed".to_string();
    store.merge_bookmark_update(changed);

    assert_eq!(ids(&store), vec!["a", "b", "c"]);
    assert_eq!(store.snapshot().bookmarks[1].title, "Changed");
}

/// An update for an unknown ID is not turned into an insert.
#[test]
fn test_external_update_of_absent_entity_is_noop() {
    let (store, _) = setup();
    store.merge_bookmark_update(bookmark("ghost", 1));
    store.merge_collection_update(collection("ghost", 1));
    assert!(store.snapshot().bookmarks.is_empty());
    assert!(store.snapshot().collections.is_empty());
}

/// A delete for an unknown ID does nothing visible.
#[test]
fn test_external_delete_of_absent_entity_is_noop() {
    let (store, _) = setup();
    store.merge_bookmark_insert(bookmark("keep", 1));
    store.merge_bookmark_delete("ghost");
    store.merge_collection_delete("ghost");
    assert_eq!(ids(&store), vec!["keep"]);
}

/// Once deleted, later inserts and updates with the same ID are ignored.
#[rstest]
#[case::bookmark_insert(ChangeDelta::BookmarkInserted(bookmark("x", 1)))]
#[case::bookmark_update(ChangeDelta::BookmarkUpdated(bookmark("x", 1)))]
fn test_bookmark_delete_wins(#[case] late: ChangeDelta) {
    let (store, _) = setup();
    store.merge_bookmark_insert(bookmark("x", 1));
    store.merge_bookmark_delete("x");
    store.merge(late);
    assert!(store.snapshot().bookmark("x").is_none());
}

#[rstest]
#[case::collection_insert(ChangeDelta::CollectionInserted(collection("c", 1)))]
#[case::collection_update(ChangeDelta::CollectionUpdated(collection("c", 1)))]
fn test_collection_delete_wins(#[case] late: ChangeDelta) {
    let (store, _) = setup();
    store.merge_collection_insert(collection("c", 1));
    store.merge_collection_delete("c");
    store.merge(late);
    assert!(store.snapshot().collection("c").is_none());
}

/// A delete that arrives before the insert still wins.
#[test]
fn test_delete_before_insert_wins() {
    let (store, _) = setup();
    store.merge_bookmark_delete("x");
    store.merge_bookmark_insert(bookmark("x", 1));
    assert!(store.snapshot().bookmarks.is_empty());
}

/// Deleting a collection detaches exactly the bookmarks that referenced it.
#[test]
fn test_collection_delete_cascades_to_bookmarks() {
    let (store, _) = setup();
    let c = collection("C", 1);
    let d = collection("D", 2);
    store.replace_all(
        vec![bookmark_in("B1", 3, &c), bookmark_in("B2", 2, &c), bookmark_in("B3", 1, &d)],
        vec![c.clone(), d.clone()],
    );

    store.merge_collection_delete("C");

    let snapshot = store.snapshot();
    assert!(snapshot.collection("C").is_none());
    for id in ["B1", "B2"] {
        let b = snapshot.bookmark(id).unwrap();
        assert_eq!(b.collection_id, None);
        assert_eq!(b.collection_name, None);
    }
    assert_eq!(snapshot.bookmark("B3").unwrap().collection_id.as_deref(), Some("D"));
    assert!(snapshot.bookmarks_in("C").is_empty());
    assert_eq!(snapshot.uncategorized().len(), 2);
}

/// A bookmark arriving after its collection was deleted comes in detached.
#[test]
fn test_insert_referencing_deleted_collection_is_detached() {
    let (store, _) = setup();
    let c = collection("C", 1);
    store.merge_collection_insert(c.clone());
    store.merge_collection_delete("C");
    store.merge_bookmark_insert(bookmark_in("late", 5, &c));

    let snapshot = store.snapshot();
    assert_eq!(snapshot.bookmark("late").unwrap().collection_id, None);
}

/// A reference to a collection the store never saw reads as uncategorized.
#[test]
fn test_dangling_collection_reference_is_tolerated() {
    let (store, _) = setup();
    let unseen = collection("unseen", 1);
    store.merge_bookmark_insert(bookmark_in("b", 1, &unseen));

    let snapshot = store.snapshot();
    let b = snapshot.bookmark("b").unwrap();
    assert_eq!(b.collection_id.as_deref(), Some("unseen"));
    assert_eq!(snapshot.collection_label(b), None);
    assert_eq!(snapshot.stats().uncategorized, 1);
}

/// Renaming a collection refreshes the name shown on its bookmarks.
#[test]
fn test_collection_update_renames_bookmark_labels() {
    let (store, _) = setup();
    let c = collection("C", 1);
    store.replace_all(vec![bookmark_in("b", 1, &c)], vec![c]);

    let mut renamed = collection("C", 1);
    renamed.name = "Reading list".to_string();
    store.merge_collection_update(renamed);

    let snapshot = store.snapshot();
    assert_eq!(snapshot.bookmark("b").unwrap().collection_name.as_deref(), Some("Reading list"));
    assert_eq!(snapshot.collection_label(snapshot.bookmark("b").unwrap()), Some("Reading list"));
}

/// Temporary IDs never satisfy a permanent-ID delete.
#[test]
fn test_permanent_delete_does_not_touch_placeholders() {
    let (store, _) = setup();
    let (create, temp) = create_placeholder("example.com");
    let _ticket = store.begin_mutation(create);

    store.merge_bookmark_delete("abc");

    assert_eq!(ids(&store), vec![temp]);
}

// === Optimistic mutations ===

/// The optimistic effect is visible before the remote result arrives.
#[test]
fn test_optimistic_effect_is_immediate() {
    let (store, _) = setup();
    store.replace_all(vec![bookmark("x", 1)], vec![]);

    let ticket = store.begin_mutation(archive("x"));
    assert!(store.snapshot().bookmark("x").unwrap().archived);
    assert_eq!(store.pending_mutations(), 1);

    assert_eq!(store.settle(ticket, Ok(Confirmed::Applied)), MutationOutcome::Confirmed);
    assert!(store.snapshot().bookmark("x").unwrap().archived);
    assert_eq!(store.pending_mutations(), 0);
}

/// A failed mutation reverts its effect and raises a failure notification.
#[test]
fn test_failed_mutation_rolls_back_and_notifies() {
    let (store, notifier) = setup();
    store.replace_all(vec![bookmark("x", 1)], vec![]);

    let ticket = store.begin_mutation(archive("x"));
    let outcome = store.settle(ticket, Err(network_down()));

    assert!(!store.snapshot().bookmark("x").unwrap().archived);
    assert!(matches!(outcome, MutationOutcome::RolledBack { .. }));
    assert_eq!(
        notifier.messages(),
        vec!["Failed to archive bookmark: Network error: connection reset".to_string()]
    );
}

/// The failure prefix is configurable.
#[test]
fn test_failure_prefix_override() {
    let notifier = Arc::new(RecordingNotifier::default());
    let store = ReconciliationStore::new(notifier.clone()).with_failure_prefix("Could not");
    store.replace_all(vec![bookmark("x", 1)], vec![]);

    let ticket = store.begin_mutation(archive("x"));
    store.settle(ticket, Err(network_down()));

    assert!(notifier.messages()[0].starts_with("Could not archive bookmark"));
}

/// Rolling back one mutation leaves an unrelated successful one alone.
#[rstest]
#[case::fail_first(true)]
#[case::succeed_first(false)]
fn test_rollback_isolation_across_entities(#[case] fail_first: bool) {
    let (store, _) = setup();
    store.replace_all(vec![bookmark("x", 2), bookmark("y", 1)], vec![]);

    let a = store.begin_mutation(retitle("x", "A"));
    let b = store.begin_mutation(retitle("y", "B"));

    let mut confirmed_y = bookmark("y", 1);
    confirmed_y.title = "B".to_string();
    if fail_first {
        store.settle(a, Err(network_down()));
        store.settle(b, Ok(Confirmed::Bookmark(confirmed_y)));
    } else {
        store.settle(b, Ok(Confirmed::Bookmark(confirmed_y)));
        store.settle(a, Err(network_down()));
    }

    let snapshot = store.snapshot();
    assert_eq!(snapshot.bookmark("x").unwrap().title, "Bookmark x");
    assert_eq!(snapshot.bookmark("y").unwrap().title, "B");
}

/// Two overlapping mutations on one bookmark: the failed one is reverted
/// without undoing the one that succeeded.
#[test]
fn test_rollback_isolation_on_same_entity() {
    let (store, _) = setup();
    store.replace_all(vec![bookmark("x", 1)], vec![]);

    let edit = store.begin_mutation(retitle("x", "Edited"));
    let arch = store.begin_mutation(archive("x"));
    store.settle(arch, Ok(Confirmed::Applied));
    store.settle(edit, Err(network_down()));

    let snapshot = store.snapshot();
    let x = snapshot.bookmark("x").unwrap();
    assert!(x.archived);
    assert_eq!(x.title, "Bookmark x");
}

/// For two edits of one bookmark, the confirmation that arrives last wins.
#[test]
fn test_later_arriving_confirmation_wins() {
    let (store, _) = setup();
    store.replace_all(vec![bookmark("x", 1)], vec![]);

    let first = store.begin_mutation(retitle("x", "First"));
    let second = store.begin_mutation(retitle("x", "Second"));

    let mut second_row = bookmark("x", 1);
    second_row.title = "Second".to_string();
    let mut first_row = bookmark("x", 1);
    first_row.title = "First".to_string();

    store.settle(second, Ok(Confirmed::Bookmark(second_row)));
    store.settle(first, Ok(Confirmed::Bookmark(first_row)));

    assert_eq!(store.snapshot().bookmark("x").unwrap().title, "First");
}

/// A pending local edit stays visible over an external update until it
/// settles; if it fails, the external value shows.
#[test]
fn test_external_update_during_pending_edit() {
    let (store, _) = setup();
    store.replace_all(vec![bookmark("x", 1)], vec![]);

    let edit = store.begin_mutation(retitle("x", "Local"));
    let mut remote_row = bookmark("x", 1);
    remote_row.title = "Remote".to_string();
    store.merge_bookmark_update(remote_row);

    assert_eq!(store.snapshot().bookmark("x").unwrap().title, "Local");

    store.settle(edit, Err(network_down()));
    assert_eq!(store.snapshot().bookmark("x").unwrap().title, "Remote");
}

/// A confirmation for an entity deleted meanwhile does not resurrect it.
#[test]
fn test_late_confirmation_after_delete_is_ignored() {
    let (store, _) = setup();
    store.replace_all(vec![bookmark("x", 1)], vec![]);

    let edit = store.begin_mutation(retitle("x", "Edited"));
    store.merge_bookmark_delete("x");
    assert!(store.snapshot().bookmark("x").is_none());

    let mut row = bookmark("x", 1);
    row.title = "Edited".to_string();
    let outcome = store.settle(edit, Ok(Confirmed::Bookmark(row)));

    assert!(outcome.is_confirmed());
    assert!(store.snapshot().bookmark("x").is_none());
}

/// A failed delete restores the bookmark at its previous position.
#[test]
fn test_failed_delete_restores_position() {
    let (store, _) = setup();
    store.replace_all(vec![bookmark("a", 3), bookmark("b", 2), bookmark("c", 1)], vec![]);

    let target = "b".to_string();
    let ticket = store.begin_mutation(OptimisticMutation::new("delete bookmark", move |s| {
        entity::remove_by_id(&mut s.bookmarks, &target);
    }));
    assert_eq!(ids(&store), vec!["a", "c"]);

    store.settle(ticket, Err(network_down()));
    assert_eq!(ids(&store), vec!["a", "b", "c"]);
}

/// A failed collection delete restores the collection and its references.
#[test]
fn test_failed_collection_delete_restores_references() {
    let (store, _) = setup();
    let c = collection("C", 1);
    store.replace_all(vec![bookmark_in("b", 1, &c)], vec![c]);

    let ticket = store.begin_mutation(OptimisticMutation::new("delete collection", |s| {
        entity::remove_by_id(&mut s.collections, "C");
        s.detach_collection_refs("C");
    }));
    assert_eq!(store.snapshot().bookmark("b").unwrap().collection_id, None);

    store.settle(ticket, Err(network_down()));
    let snapshot = store.snapshot();
    assert!(snapshot.collection("C").is_some());
    assert_eq!(snapshot.bookmark("b").unwrap().collection_id.as_deref(), Some("C"));
}

/// A confirmed local delete is terminal, like an external one.
#[test]
fn test_confirmed_delete_tombstones() {
    let (store, _) = setup();
    store.replace_all(vec![bookmark("x", 1)], vec![]);

    let ticket = store.begin_mutation(OptimisticMutation::new("delete bookmark", |s| {
        entity::remove_by_id(&mut s.bookmarks, "x");
    }));
    store.settle(ticket, Ok(Confirmed::BookmarkDeleted("x".to_string())));
    store.merge_bookmark_insert(bookmark("x", 1));

    assert!(store.snapshot().bookmark("x").is_none());
}

/// Rejections notify without touching state.
#[test]
fn test_reject_reports_without_applying() {
    let (store, notifier) = setup();
    store.replace_all(vec![bookmark("x", 1)], vec![]);
    let before = store.snapshot();

    let outcome = store.reject("save bookmark", BookmarkError::EmptyUrl);

    assert_eq!(
        outcome,
        MutationOutcome::Rejected {
            reason: "Failed to save bookmark: URL cannot be empty".to_string()
        }
    );
    assert_eq!(*store.snapshot(), *before);
    assert_eq!(notifier.messages().len(), 1);
}

// === Temporary IDs ===

/// Temp placeholder replaced by the confirmed entity, then deleted externally.
#[test]
fn test_create_then_external_delete() {
    let (store, _) = setup();
    let (create, temp) = create_placeholder("example.com");
    let ticket = store.begin_mutation(create);

    let snapshot = store.snapshot();
    assert_eq!(snapshot.bookmarks.len(), 1);
    let placeholder = &snapshot.bookmarks[0];
    assert!(is_temp_id(&placeholder.id));
    assert_eq!(placeholder.id, temp);
    assert_eq!(placeholder.title, "example.com");

    let mut confirmed = bookmark("bm-1", 100);
    confirmed.url = "example.com".to_string();
    confirmed.title = "example.com".to_string();
    store.settle(ticket, Ok(Confirmed::Bookmark(confirmed)));
    assert_eq!(ids(&store), vec!["bm-1"]);

    store.merge_bookmark_delete("bm-1");
    assert!(store.snapshot().bookmarks.is_empty());
}

/// However the feed insert and the confirmation interleave, exactly one
/// entry with the permanent ID remains.
#[rstest]
#[case::confirmation_only(false, false)]
#[case::feed_before_confirmation(true, false)]
#[case::feed_after_confirmation(false, true)]
fn test_create_never_duplicates(#[case] feed_before: bool, #[case] feed_after: bool) {
    let (store, _) = setup();
    let (create, _temp) = create_placeholder("example.com");
    let ticket = store.begin_mutation(create);

    if feed_before {
        store.merge_bookmark_insert(bookmark("abc", 100));
    }
    store.settle(ticket, Ok(Confirmed::Bookmark(bookmark("abc", 100))));
    if feed_after {
        store.merge_bookmark_insert(bookmark("abc", 100));
    }

    assert_eq!(ids(&store), vec!["abc"]);
}

/// A failed create removes the placeholder.
#[test]
fn test_failed_create_removes_placeholder() {
    let (store, notifier) = setup();
    let (create, _temp) = create_placeholder("example.com");
    let ticket = store.begin_mutation(create);

    store.settle(ticket, Err(RemoteError::Unauthorized("session expired".to_string())));

    assert!(store.snapshot().bookmarks.is_empty());
    assert_eq!(
        notifier.messages(),
        vec!["Failed to save bookmark: Not authorized: session expired".to_string()]
    );
}

/// A move confirmed after its target collection was deleted leaves the
/// bookmark detached, both while pending and once folded in.
#[test]
fn test_confirmed_move_into_deleted_collection_stays_detached() {
    let (store, _) = setup();
    let c1 = collection("c1", 1);
    store.merge_collection_insert(c1.clone());
    store.merge_bookmark_insert(bookmark("b1", 1));

    let ticket = store.begin_mutation(move_into("b1", &c1));
    store.merge_collection_delete("c1");
    assert_eq!(store.snapshot().bookmark("b1").unwrap().collection_id, None);

    assert_eq!(store.settle(ticket, Ok(Confirmed::Applied)), MutationOutcome::Confirmed);

    let snapshot = store.snapshot();
    let b1 = snapshot.bookmark("b1").unwrap();
    assert_eq!(b1.collection_id, None);
    assert_eq!(b1.collection_name, None);
    assert_eq!(snapshot.uncategorized().len(), 1);
}

/// A confirmed edit on a bookmark deleted meanwhile cannot bring it back.
#[test]
fn test_confirmed_edit_after_delete_stays_deleted() {
    let (store, _) = setup();
    store.replace_all(vec![bookmark("x", 1)], vec![]);

    let ticket = store.begin_mutation(archive("x"));
    store.merge_bookmark_delete("x");
    store.settle(ticket, Ok(Confirmed::Applied));

    assert!(store.snapshot().bookmarks.is_empty());
}

// === Full refetch and observation ===

/// A feed insert merged while the list query was in flight survives the
/// older response.
#[test]
fn test_refetch_keeps_insert_merged_during_fetch() {
    let (store, _) = setup();
    let token = store.begin_refetch();

    store.merge_bookmark_insert(bookmark("b1", 1));
    store.apply_refetch(token, vec![], vec![]);

    assert_eq!(ids(&store), vec!["b1"]);
}

/// The newer feed update wins over the fetched row for the same ID.
#[test]
fn test_refetch_keeps_update_merged_during_fetch() {
    let (store, _) = setup();
    store.replace_all(vec![bookmark("x", 1)], vec![]);
    let token = store.begin_refetch();

    let mut newer = bookmark("x", 1);
    newer.title = "Renamed elsewhere".to_string();
    store.merge_bookmark_update(newer);
    store.apply_refetch(token, vec![bookmark("x", 1)], vec![]);

    assert_eq!(store.snapshot().bookmark("x").unwrap().title, "Renamed elsewhere");
}

/// A create confirmed during the fetch is not lost with the placeholder.
#[test]
fn test_refetch_keeps_create_confirmed_during_fetch() {
    let (store, _) = setup();
    let token = store.begin_refetch();

    let (create, _) = create_placeholder("example.com");
    let ticket = store.begin_mutation(create);
    store.settle(ticket, Ok(Confirmed::Bookmark(bookmark("bm-1", 100))));
    store.apply_refetch(token, vec![], vec![]);

    assert_eq!(ids(&store), vec!["bm-1"]);
}

/// Untouched entities follow the fetch, including rows it no longer returns.
#[test]
fn test_refetch_is_authoritative_for_untouched_entities() {
    let (store, _) = setup();
    store.replace_all(vec![bookmark("x", 2), bookmark("y", 1)], vec![]);
    let token = store.begin_refetch();

    let mut fetched = bookmark("x", 2);
    fetched.archived = true;
    store.apply_refetch(token, vec![fetched], vec![]);

    assert_eq!(ids(&store), vec!["x"]);
    assert!(store.snapshot().bookmark("x").unwrap().archived);
}

/// A rename merged during the fetch relabels the fetched bookmarks too.
#[test]
fn test_refetch_applies_rename_merged_during_fetch() {
    let (store, _) = setup();
    let c = collection("c", 1);
    store.replace_all(vec![bookmark_in("b", 1, &c)], vec![c.clone()]);
    let token = store.begin_refetch();

    let renamed = Collection {
        name: "Later".to_string(),
        ..c.clone()
    };
    store.merge_collection_update(renamed);
    store.apply_refetch(token, vec![bookmark_in("b", 1, &c)], vec![c]);

    let snapshot = store.snapshot();
    assert_eq!(snapshot.collection("c").unwrap().name, "Later");
    assert_eq!(snapshot.bookmark("b").unwrap().collection_name.as_deref(), Some("Later"));
}

/// A response that lost the race to a later refetch only fills in gaps.
#[test]
fn test_older_refetch_only_fills_gaps() {
    let (store, _) = setup();
    let older = store.begin_refetch();
    let newer = store.begin_refetch();

    let mut current = bookmark("x", 2);
    current.title = "Current".to_string();
    store.apply_refetch(newer, vec![current], vec![]);
    store.apply_refetch(older, vec![bookmark("x", 2), bookmark("y", 1)], vec![]);

    let snapshot = store.snapshot();
    assert_eq!(ids(&store), vec!["x", "y"]);
    assert_eq!(snapshot.bookmark("x").unwrap().title, "Current");
}

/// A cancelled refetch leaves the state alone.
#[test]
fn test_cancelled_refetch_changes_nothing() {
    let (store, _) = setup();
    store.replace_all(vec![bookmark("x", 1)], vec![]);
    let token = store.begin_refetch();

    store.merge_bookmark_insert(bookmark("y", 2));
    store.cancel_refetch(token);

    assert_eq!(ids(&store), vec!["y", "x"]);
}

/// Clearing drops tombstones with everything else; a fetch issued before
/// the clear is ignored.
#[test]
fn test_clear_resets_everything() {
    let (store, _) = setup();
    store.merge_bookmark_insert(bookmark("x", 1));
    store.merge_bookmark_delete("x");
    let _pending = store.begin_mutation(archive("x"));
    let token = store.begin_refetch();

    store.clear();
    assert!(store.snapshot().bookmarks.is_empty());
    assert_eq!(store.pending_mutations(), 0);

    store.apply_refetch(token, vec![bookmark("stale", 1)], vec![]);
    assert!(store.snapshot().bookmarks.is_empty());

    store.merge_bookmark_insert(bookmark("x", 1));
    assert_eq!(ids(&store), vec!["x"]);
}

/// A refetch keeps pending mutations on top and drops tombstoned rows.
#[test]
fn test_replace_all_keeps_pending_and_tombstones() {
    let (store, _) = setup();
    store.replace_all(vec![bookmark("x", 2), bookmark("y", 1)], vec![]);
    let _pending = store.begin_mutation(archive("x"));
    store.merge_bookmark_delete("y");

    store.replace_all(vec![bookmark("x", 2), bookmark("y", 1), bookmark("z", 3)], vec![]);

    let snapshot = store.snapshot();
    assert_eq!(ids(&store), vec!["z", "x"]);
    assert!(snapshot.bookmark("x").unwrap().archived);
}

/// Subscribers wake on every visible change.
#[tokio::test]
async fn test_subscribers_observe_changes() {
    let (store, _) = setup();
    let mut rx = store.subscribe();

    store.merge_bookmark_insert(bookmark("x", 1));
    rx.changed().await.unwrap();
    assert_eq!(rx.borrow_and_update().bookmarks.len(), 1);

    store.merge_bookmark_delete("x");
    rx.changed().await.unwrap();
    assert!(rx.borrow_and_update().bookmarks.is_empty());
}

/// `apply_optimistic_mutation` shows the effect before the remote call runs.
#[tokio::test]
async fn test_apply_optimistic_mutation_order() {
    let (store, _) = setup();
    store.replace_all(vec![bookmark("x", 1)], vec![]);

    let view = &store;
    let outcome = store
        .apply_optimistic_mutation(archive("x"), move || async move {
            assert!(view.snapshot().bookmark("x").unwrap().archived);
            Err::<Confirmed, _>(network_down())
        })
        .await;

    assert!(matches!(outcome, MutationOutcome::RolledBack { .. }));
    assert!(!store.snapshot().bookmark("x").unwrap().archived);
}

/// Search matches title or URL, case-insensitively.
#[test]
fn test_snapshot_search_and_stats() {
    let (store, _) = setup();
    let mut rust = bookmark("r", 2);
    rust.title = "The Rust Book".to_string();
    let mut docs = bookmark("d", 1);
    docs.url = "docs.rs/serde".to_string();
    docs.archived = true;
    store.replace_all(vec![rust, docs], vec![collection("c", 1)]);

    let snapshot = store.snapshot();
    assert_eq!(snapshot.search("rust").len(), 1);
    assert_eq!(snapshot.search("DOCS.RS").len(), 1);
    let stats = snapshot.stats();
    assert_eq!((stats.total, stats.active, stats.archived), (2, 1, 1));
    assert_eq!(stats.collections, 1);
    assert_eq!(snapshot.active_bookmarks().len(), 1);
    assert_eq!(snapshot.archived_bookmarks().len(), 1);
}
