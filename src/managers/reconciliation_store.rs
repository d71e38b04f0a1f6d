//! Reconciliation Store for LinkVault.
//!
//! Keeps the client's copy of bookmarks and collections consistent with
//! optimistic local writes (which may fail) and with change-feed deltas
//! (which may race those writes, arrive out of order, or repeat).
//!
//! The store holds a confirmed *base* snapshot plus the list of pending
//! optimistic mutations. The visible snapshot is always the base with every
//! pending transform re-applied in issue order:
//!
//! - feed deltas and confirmations only ever change the base;
//! - a failed mutation is dropped from the pending list, which restores the
//!   entities it touched without undoing anything else;
//! - deletes leave a tombstone, so a late insert, update or confirmation for
//!   the same ID cannot resurrect the entity;
//! - a full refetch is merged around entities the base learned about after
//!   the fetch started, so a slow list response cannot undo newer events.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tracing::{debug, warn};

use crate::managers::temp_id::TempId;
use crate::services::change_feed::ChangeHandler;
use crate::services::notifier::Notifier;
use crate::types::bookmark::BookmarkItem;
use crate::types::change::ChangeDelta;
use crate::types::collection::Collection;
use crate::types::entity::{self, Entity};
use crate::types::errors::{BookmarkError, RemoteError};
use crate::types::notification::Notification;

/// The observable state: both entity sets in display order.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct StoreSnapshot {
    /// Newest first.
    pub bookmarks: Vec<BookmarkItem>,
    /// Creation order.
    pub collections: Vec<Collection>,
}

/// Counts shown on the profile page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SnapshotStats {
    pub total: usize,
    pub active: usize,
    pub archived: usize,
    pub uncategorized: usize,
    pub collections: usize,
}

impl StoreSnapshot {
    pub fn bookmark(&self, id: &str) -> Option<&BookmarkItem> {
        entity::find(&self.bookmarks, id)
    }

    pub fn collection(&self, id: &str) -> Option<&Collection> {
        entity::find(&self.collections, id)
    }

    /// Bookmarks that are not archived.
    pub fn active_bookmarks(&self) -> Vec<&BookmarkItem> {
        self.bookmarks.iter().filter(|b| !b.archived).collect()
    }

    pub fn archived_bookmarks(&self) -> Vec<&BookmarkItem> {
        self.bookmarks.iter().filter(|b| b.archived).collect()
    }

    /// Bookmarks whose collection reference resolves to `collection_id`.
    pub fn bookmarks_in(&self, collection_id: &str) -> Vec<&BookmarkItem> {
        if self.collection(collection_id).is_none() {
            return Vec::new();
        }
        self.bookmarks
            .iter()
            .filter(|b| b.collection_id.as_deref() == Some(collection_id))
            .collect()
    }

    /// Bookmarks without a resolvable collection, including dangling references.
    pub fn uncategorized(&self) -> Vec<&BookmarkItem> {
        self.bookmarks
            .iter()
            .filter(|b| self.collection_label(b).is_none())
            .collect()
    }

    /// Name of the bookmark's collection, or `None` for "uncategorized".
    ///
    /// A reference to a collection that is no longer in the local set is
    /// tolerated and reads as uncategorized.
    pub fn collection_label(&self, bookmark: &BookmarkItem) -> Option<&str> {
        bookmark
            .collection_id
            .as_deref()
            .and_then(|id| self.collection(id))
            .map(|c| c.name.as_str())
    }

    /// Case-insensitive substring match on title or URL.
    pub fn search(&self, query: &str) -> Vec<&BookmarkItem> {
        let needle = query.to_lowercase();
        self.bookmarks
            .iter()
            .filter(|b| {
                b.title.to_lowercase().contains(&needle) || b.url.to_lowercase().contains(&needle)
            })
            .collect()
    }

    pub fn stats(&self) -> SnapshotStats {
        let archived = self.bookmarks.iter().filter(|b| b.archived).count();
        SnapshotStats {
            total: self.bookmarks.len(),
            active: self.bookmarks.len() - archived,
            archived,
            uncategorized: self.uncategorized().len(),
            collections: self.collections.len(),
        }
    }

    /// Applies `f` to the bookmark with the given ID. Returns `false` if absent.
    pub fn update_bookmark(&mut self, id: &str, f: impl FnOnce(&mut BookmarkItem)) -> bool {
        match self.bookmarks.iter_mut().find(|b| b.id == id) {
            Some(b) => {
                f(b);
                true
            }
            None => false,
        }
    }

    /// Clears every bookmark reference to `collection_id`.
    pub fn detach_collection_refs(&mut self, collection_id: &str) {
        for b in self
            .bookmarks
            .iter_mut()
            .filter(|b| b.collection_id.as_deref() == Some(collection_id))
        {
            b.detach_collection();
        }
    }

    /// Refreshes the denormalized collection name on referencing bookmarks.
    pub fn rename_collection_refs(&mut self, collection: &Collection) {
        for b in self
            .bookmarks
            .iter_mut()
            .filter(|b| b.collection_id.as_deref() == Some(collection.id.as_str()))
        {
            b.collection_name = Some(collection.name.clone());
        }
    }

    fn sort(&mut self) {
        self.bookmarks.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        self.collections.sort_by(|a, b| a.created_at.cmp(&b.created_at));
    }
}

/// What the remote service confirmed for a mutation.
#[derive(Debug, Clone, PartialEq)]
pub enum Confirmed {
    /// The authoritative bookmark. For a create it replaces the temporary
    /// placeholder; otherwise it replaces the bookmark with the same ID if present.
    Bookmark(BookmarkItem),
    /// The authoritative collection, with the same rules as `Bookmark`.
    Collection(Collection),
    /// The bookmark is gone for good.
    BookmarkDeleted(String),
    /// The collection is gone for good; its bookmarks are detached.
    CollectionDeleted(String),
    /// The remote accepted the change exactly as predicted; the optimistic
    /// transform is folded into the confirmed state.
    Applied,
}

/// Completion signal handed back to the presentation layer.
#[derive(Debug, Clone, PartialEq)]
pub enum MutationOutcome {
    Confirmed,
    /// The remote call failed and the optimistic change was reverted.
    RolledBack { reason: String },
    /// Local validation failed; nothing was applied or sent.
    Rejected { reason: String },
}

impl MutationOutcome {
    pub fn is_confirmed(&self) -> bool {
        matches!(self, MutationOutcome::Confirmed)
    }
}

type Transform = Box<dyn Fn(&mut StoreSnapshot) + Send + Sync>;

/// A local change applied before the remote write completes.
///
/// The transform must be a pure function of the snapshot it is given: it is
/// re-run whenever the confirmed state underneath it changes.
pub struct OptimisticMutation {
    label: String,
    temp_id: Option<TempId>,
    transform: Transform,
}

impl OptimisticMutation {
    /// `label` completes the failure toast, e.g. "save bookmark".
    pub fn new(
        label: impl Into<String>,
        transform: impl Fn(&mut StoreSnapshot) + Send + Sync + 'static,
    ) -> Self {
        Self {
            label: label.into(),
            temp_id: None,
            transform: Box::new(transform),
        }
    }

    /// Marks this mutation as the creation of the entity carrying `temp_id`.
    pub fn with_temp_id(mut self, temp_id: TempId) -> Self {
        self.temp_id = Some(temp_id);
        self
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn temp_id(&self) -> Option<&TempId> {
        self.temp_id.as_ref()
    }
}

/// Handle for a mutation that has been applied locally but not settled.
#[must_use = "an unsettled mutation stays visible forever"]
#[derive(Debug)]
pub struct MutationTicket {
    id: u64,
}

/// Marks the point in the confirmed history at which a full fetch started.
///
/// Hand it back to [`ReconciliationStore::apply_refetch`] with the fetched
/// rows, or to [`ReconciliationStore::cancel_refetch`] if the fetch failed.
#[must_use = "an outstanding refetch keeps change tracking alive"]
#[derive(Debug)]
pub struct RefetchToken {
    id: u64,
    generation: u64,
}

/// Removes tombstoned entities and detaches references to tombstoned
/// collections.
fn apply_tombstones(
    snapshot: &mut StoreSnapshot,
    deleted_bookmarks: &HashSet<String>,
    deleted_collections: &HashSet<String>,
) {
    snapshot.bookmarks.retain(|b| !deleted_bookmarks.contains(&b.id));
    snapshot.collections.retain(|c| !deleted_collections.contains(&c.id));
    for b in snapshot.bookmarks.iter_mut() {
        if b.collection_id.as_ref().is_some_and(|cid| deleted_collections.contains(cid)) {
            b.detach_collection();
        }
    }
}

struct StoreState {
    base: StoreSnapshot,
    pending: BTreeMap<u64, OptimisticMutation>,
    next_mutation: u64,
    // Tombstones live as long as the session; `clear` drops them.
    deleted_bookmarks: HashSet<String>,
    deleted_collections: HashSet<String>,
    /// Bumped on every merge or confirmation that changes a base entity.
    generation: u64,
    /// Generation at which each entity last changed, kept while a refetch
    /// that could be older than the change is outstanding.
    touched_bookmarks: HashMap<String, u64>,
    touched_collections: HashMap<String, u64>,
    /// Outstanding refetches by token ID, with their starting generation.
    refetches: BTreeMap<u64, u64>,
    next_refetch: u64,
    /// Token ID of the most recently issued refetch applied so far.
    applied_refetch: Option<u64>,
}

impl StoreState {
    fn new() -> Self {
        Self {
            base: StoreSnapshot::default(),
            pending: BTreeMap::new(),
            next_mutation: 0,
            deleted_bookmarks: HashSet::new(),
            deleted_collections: HashSet::new(),
            generation: 0,
            touched_bookmarks: HashMap::new(),
            touched_collections: HashMap::new(),
            refetches: BTreeMap::new(),
            next_refetch: 0,
            applied_refetch: None,
        }
    }

    fn visible(&self) -> StoreSnapshot {
        let mut snapshot = self.base.clone();
        for mutation in self.pending.values() {
            (mutation.transform)(&mut snapshot);
        }
        apply_tombstones(&mut snapshot, &self.deleted_bookmarks, &self.deleted_collections);
        snapshot
    }

    fn touch_bookmark(&mut self, id: &str) {
        if self.refetches.is_empty() {
            return;
        }
        self.generation += 1;
        self.touched_bookmarks.insert(id.to_string(), self.generation);
    }

    fn touch_collection(&mut self, id: &str) {
        if self.refetches.is_empty() {
            return;
        }
        self.generation += 1;
        self.touched_collections.insert(id.to_string(), self.generation);
    }

    /// Records every base entity that differs from `before`.
    fn touch_changed(&mut self, before: &StoreSnapshot) {
        let bookmarks: Vec<String> = self
            .base
            .bookmarks
            .iter()
            .filter(|b| before.bookmark(&b.id) != Some(*b))
            .map(|b| b.id.clone())
            .collect();
        let collections: Vec<String> = self
            .base
            .collections
            .iter()
            .filter(|c| before.collection(&c.id) != Some(*c))
            .map(|c| c.id.clone())
            .collect();
        for id in bookmarks {
            self.touch_bookmark(&id);
        }
        for id in collections {
            self.touch_collection(&id);
        }
    }

    fn bookmark_touched_since(&self, id: &str, generation: u64) -> bool {
        self.touched_bookmarks.get(id).is_some_and(|g| *g > generation)
    }

    fn collection_touched_since(&self, id: &str, generation: u64) -> bool {
        self.touched_collections.get(id).is_some_and(|g| *g > generation)
    }

    /// Drops change records no outstanding refetch can still need.
    fn prune_touched(&mut self) {
        match self.refetches.values().min().copied() {
            Some(oldest) => {
                self.touched_bookmarks.retain(|_, g| *g > oldest);
                self.touched_collections.retain(|_, g| *g > oldest);
            }
            None => {
                self.touched_bookmarks.clear();
                self.touched_collections.clear();
            }
        }
    }

    /// Rebuilds the base from a full fetch started at `token`.
    ///
    /// Entities merged or confirmed after that point keep their base version;
    /// the fetch supplies everything else. A fetch issued before one already
    /// applied only fills in entities the base does not have.
    fn merge_refetch(
        &mut self,
        token: &RefetchToken,
        bookmarks: Vec<BookmarkItem>,
        collections: Vec<Collection>,
    ) {
        let generation = token.generation;
        let stale = self.applied_refetch.is_some_and(|applied| token.id < applied);
        let mut base = if stale {
            self.base.clone()
        } else {
            let mut kept = StoreSnapshot::default();
            for c in &self.base.collections {
                if self.collection_touched_since(&c.id, generation) {
                    entity::insert_unique(&mut kept.collections, c.clone());
                }
            }
            for b in &self.base.bookmarks {
                if self.bookmark_touched_since(&b.id, generation) {
                    entity::insert_unique(&mut kept.bookmarks, b.clone());
                }
            }
            self.applied_refetch = Some(token.id);
            kept
        };

        for c in collections {
            if !self.deleted_collections.contains(&c.id) {
                entity::insert_unique(&mut base.collections, c);
            }
        }
        for b in bookmarks {
            if !self.deleted_bookmarks.contains(&b.id) {
                entity::insert_unique(&mut base.bookmarks, self.sanitize(b));
            }
        }
        for c in base.collections.clone() {
            base.rename_collection_refs(&c);
        }
        base.sort();
        self.base = base;
    }

    fn sanitize(&self, mut bookmark: BookmarkItem) -> BookmarkItem {
        if let Some(cid) = &bookmark.collection_id {
            if self.deleted_collections.contains(cid) {
                bookmark.detach_collection();
            }
        }
        bookmark
    }

    fn insert_bookmark(&mut self, bookmark: BookmarkItem) -> bool {
        if self.deleted_bookmarks.contains(&bookmark.id) {
            return false;
        }
        let bookmark = self.sanitize(bookmark);
        let id = bookmark.id.clone();
        let inserted = entity::insert_unique(&mut self.base.bookmarks, bookmark);
        if inserted {
            self.touch_bookmark(&id);
        }
        inserted
    }

    fn update_bookmark(&mut self, bookmark: BookmarkItem) -> bool {
        if self.deleted_bookmarks.contains(&bookmark.id) {
            return false;
        }
        let bookmark = self.sanitize(bookmark);
        let id = bookmark.id.clone();
        let replaced = entity::replace_in_place(&mut self.base.bookmarks, bookmark);
        if replaced {
            self.touch_bookmark(&id);
        }
        replaced
    }

    fn upsert_bookmark(&mut self, bookmark: BookmarkItem) -> bool {
        self.update_bookmark(bookmark.clone()) || self.insert_bookmark(bookmark)
    }

    fn delete_bookmark(&mut self, id: &str) -> bool {
        self.deleted_bookmarks.insert(id.to_string());
        entity::remove_by_id(&mut self.base.bookmarks, id).is_some()
    }

    fn insert_collection(&mut self, collection: Collection) -> bool {
        if self.deleted_collections.contains(&collection.id) {
            return false;
        }
        let id = collection.id.clone();
        let inserted = entity::insert_unique(&mut self.base.collections, collection);
        if inserted {
            self.touch_collection(&id);
        }
        inserted
    }

    fn update_collection(&mut self, collection: Collection) -> bool {
        if self.deleted_collections.contains(&collection.id) {
            return false;
        }
        let before = self.base.clone();
        self.base.rename_collection_refs(&collection);
        let replaced = entity::replace_in_place(&mut self.base.collections, collection);
        self.touch_changed(&before);
        replaced
    }

    fn upsert_collection(&mut self, collection: Collection) -> bool {
        self.update_collection(collection.clone()) || self.insert_collection(collection)
    }

    fn delete_collection(&mut self, id: &str) -> bool {
        self.deleted_collections.insert(id.to_string());
        self.base.detach_collection_refs(id);
        entity::remove_by_id(&mut self.base.collections, id).is_some()
    }

    fn fold_confirmation(&mut self, mutation: &OptimisticMutation, confirmed: Confirmed) {
        let creates = mutation.temp_id.is_some();
        match confirmed {
            Confirmed::Bookmark(item) if creates => {
                self.upsert_bookmark(item);
            }
            Confirmed::Bookmark(item) => {
                self.update_bookmark(item);
            }
            Confirmed::Collection(collection) if creates => {
                self.upsert_collection(collection);
            }
            Confirmed::Collection(collection) => {
                self.update_collection(collection);
            }
            Confirmed::BookmarkDeleted(id) => {
                self.delete_bookmark(&id);
            }
            Confirmed::CollectionDeleted(id) => {
                self.delete_collection(&id);
            }
            Confirmed::Applied => {
                let before = self.base.clone();
                (mutation.transform)(&mut self.base);
                apply_tombstones(
                    &mut self.base,
                    &self.deleted_bookmarks,
                    &self.deleted_collections,
                );
                self.touch_changed(&before);
            }
        }
    }
}

/// Client-side owner of the bookmark and collection sets.
///
/// The sets are only mutated through the methods below. Readers take
/// [`snapshot`](Self::snapshot) or [`subscribe`](Self::subscribe) for change
/// notifications.
pub struct ReconciliationStore {
    state: Mutex<StoreState>,
    tx: watch::Sender<Arc<StoreSnapshot>>,
    notifier: Arc<dyn Notifier>,
    failure_prefix: String,
}

impl ReconciliationStore {
    pub fn new(notifier: Arc<dyn Notifier>) -> Self {
        let (tx, _rx) = watch::channel(Arc::new(StoreSnapshot::default()));
        Self {
            state: Mutex::new(StoreState::new()),
            tx,
            notifier,
            failure_prefix: "Failed to".to_string(),
        }
    }

    /// Overrides the text placed before the label in failure toasts.
    pub fn with_failure_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.failure_prefix = prefix.into();
        self
    }

    fn lock(&self) -> MutexGuard<'_, StoreState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Recomputes the visible snapshot and notifies subscribers if it changed.
    /// Called with the state lock held so publications follow state order.
    fn publish(&self, state: &StoreState) {
        let visible = state.visible();
        self.tx.send_if_modified(|current| {
            if **current == visible {
                false
            } else {
                *current = Arc::new(visible);
                true
            }
        });
    }

    /// Current visible snapshot.
    pub fn snapshot(&self) -> Arc<StoreSnapshot> {
        self.tx.borrow().clone()
    }

    /// Receiver that wakes whenever the visible snapshot changes.
    pub fn subscribe(&self) -> watch::Receiver<Arc<StoreSnapshot>> {
        self.tx.subscribe()
    }

    /// Number of optimistic mutations still awaiting their remote result.
    pub fn pending_mutations(&self) -> usize {
        self.lock().pending.len()
    }

    /// Starts tracking changes for a full fetch that is about to be issued.
    pub fn begin_refetch(&self) -> RefetchToken {
        let mut state = self.lock();
        let id = state.next_refetch;
        state.next_refetch += 1;
        let generation = state.generation;
        state.refetches.insert(id, generation);
        RefetchToken { id, generation }
    }

    /// Merges a full fetch into the confirmed state.
    ///
    /// Rows the fetch returns replace the base, except for entities merged or
    /// confirmed after `token` was issued, which are newer than the fetch.
    /// Pending mutations stay applied on top, and previously observed deletes
    /// still hold: tombstoned rows in the fetch are dropped.
    pub fn apply_refetch(
        &self,
        token: RefetchToken,
        bookmarks: Vec<BookmarkItem>,
        collections: Vec<Collection>,
    ) {
        let mut state = self.lock();
        if state.refetches.remove(&token.id).is_none() {
            debug!("ignoring refetch issued before the store was cleared");
            return;
        }
        state.merge_refetch(&token, bookmarks, collections);
        state.prune_touched();

        debug!(
            bookmarks = state.base.bookmarks.len(),
            collections = state.base.collections.len(),
            "merged full refetch"
        );
        self.publish(&state);
    }

    /// Releases a token whose fetch failed.
    pub fn cancel_refetch(&self, token: RefetchToken) {
        let mut state = self.lock();
        state.refetches.remove(&token.id);
        state.prune_touched();
    }

    /// Replaces the confirmed state with rows known to be current.
    pub fn replace_all(&self, bookmarks: Vec<BookmarkItem>, collections: Vec<Collection>) {
        let token = self.begin_refetch();
        self.apply_refetch(token, bookmarks, collections);
    }

    /// Drops every entity, tombstone and pending mutation. Used when the
    /// session ends.
    pub fn clear(&self) {
        let mut state = self.lock();
        let fresh = StoreState {
            next_mutation: state.next_mutation,
            next_refetch: state.next_refetch,
            ..StoreState::new()
        };
        *state = fresh;
        debug!("cleared store");
        self.publish(&state);
    }

    /// External insert: no-op if the ID is already present or was deleted.
    pub fn merge_bookmark_insert(&self, bookmark: BookmarkItem) {
        let mut state = self.lock();
        let id = bookmark.id.clone();
        if state.insert_bookmark(bookmark) {
            debug!(%id, "merged bookmark insert");
            self.publish(&state);
        }
    }

    /// External update: replaces in place; no-op if absent or deleted.
    pub fn merge_bookmark_update(&self, bookmark: BookmarkItem) {
        let mut state = self.lock();
        let id = bookmark.id.clone();
        if state.update_bookmark(bookmark) {
            debug!(%id, "merged bookmark update");
            self.publish(&state);
        }
    }

    /// External delete: removes the bookmark and makes the delete terminal.
    pub fn merge_bookmark_delete(&self, id: &str) {
        let mut state = self.lock();
        state.delete_bookmark(id);
        debug!(%id, "merged bookmark delete");
        self.publish(&state);
    }

    pub fn merge_collection_insert(&self, collection: Collection) {
        let mut state = self.lock();
        let id = collection.id.clone();
        if state.insert_collection(collection) {
            debug!(%id, "merged collection insert");
            self.publish(&state);
        }
    }

    /// External update; also refreshes the collection name on its bookmarks.
    pub fn merge_collection_update(&self, collection: Collection) {
        let mut state = self.lock();
        let id = collection.id.clone();
        if state.update_collection(collection) {
            debug!(%id, "merged collection update");
            self.publish(&state);
        }
    }

    /// External delete; every bookmark referencing the collection is detached
    /// as part of the same step.
    pub fn merge_collection_delete(&self, id: &str) {
        let mut state = self.lock();
        state.delete_collection(id);
        debug!(%id, "merged collection delete");
        self.publish(&state);
    }

    /// Dispatches a typed feed delta to the matching merge.
    pub fn merge(&self, delta: ChangeDelta) {
        match delta {
            ChangeDelta::BookmarkInserted(b) => self.merge_bookmark_insert(b),
            ChangeDelta::BookmarkUpdated(b) => self.merge_bookmark_update(b),
            ChangeDelta::BookmarkDeleted(id) => self.merge_bookmark_delete(&id),
            ChangeDelta::CollectionInserted(c) => self.merge_collection_insert(c),
            ChangeDelta::CollectionUpdated(c) => self.merge_collection_update(c),
            ChangeDelta::CollectionDeleted(id) => self.merge_collection_delete(&id),
        }
    }

    /// Applies `mutation` to the visible snapshot immediately.
    pub fn begin_mutation(&self, mutation: OptimisticMutation) -> MutationTicket {
        let mut state = self.lock();
        let id = state.next_mutation;
        state.next_mutation += 1;
        debug!(mutation = id, label = mutation.label(), "applying optimistic mutation");
        state.pending.insert(id, mutation);
        self.publish(&state);
        MutationTicket { id }
    }

    /// Settles a mutation with the remote result.
    ///
    /// On success the confirmation is folded into the confirmed state. On
    /// failure the mutation is discarded, reverting exactly the entities it
    /// touched, and a failure notification is raised.
    pub fn settle(
        &self,
        ticket: MutationTicket,
        result: Result<Confirmed, RemoteError>,
    ) -> MutationOutcome {
        let mut state = self.lock();
        let Some(mutation) = state.pending.remove(&ticket.id) else {
            return MutationOutcome::Confirmed;
        };

        let outcome = match result {
            Ok(confirmed) => {
                debug!(mutation = ticket.id, label = mutation.label(), "mutation confirmed");
                state.fold_confirmation(&mutation, confirmed);
                MutationOutcome::Confirmed
            }
            Err(err) => {
                warn!(
                    mutation = ticket.id,
                    label = mutation.label(),
                    error = %err,
                    "mutation failed, rolling back"
                );
                let reason = format!("{} {}: {}", self.failure_prefix, mutation.label(), err);
                self.notifier.notify(Notification::error(reason.clone()));
                MutationOutcome::RolledBack { reason }
            }
        };

        self.publish(&state);
        outcome
    }

    /// Applies `mutation` locally, then runs `remote` and settles with its result.
    ///
    /// The optimistic effect is visible before `remote` is invoked. Failures
    /// are reported through the notifier and never returned as errors.
    pub async fn apply_optimistic_mutation<F, Fut>(
        &self,
        mutation: OptimisticMutation,
        remote: F,
    ) -> MutationOutcome
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Confirmed, RemoteError>>,
    {
        let ticket = self.begin_mutation(mutation);
        let result = remote().await;
        self.settle(ticket, result)
    }

    /// Reports a validation failure without touching any state.
    pub fn reject(&self, label: &str, err: BookmarkError) -> MutationOutcome {
        let reason = format!("{} {}: {}", self.failure_prefix, label, err);
        debug!(label, error = %err, "mutation rejected");
        self.notifier.notify(Notification::error(reason.clone()));
        MutationOutcome::Rejected { reason }
    }
}

impl ChangeHandler for ReconciliationStore {
    fn on_change(&self, delta: ChangeDelta) {
        self.merge(delta);
    }
}
