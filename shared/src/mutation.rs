//! Optimistic mutations applied to a single layer.
//!
//! Every mutation has a start transition (applied synchronously, before the
//! network call) and a success or failure transition applied when the call
//! resolves. Routing a completion to the right layer, and discarding it when
//! that layer is gone, is the caller's job (see `Tabs::resolve`); the
//! functions here only ever see the layer they were handed.

use tracing::{debug, warn};

use crate::layer::{with_state, Layer, LayerState, OperationKind};
use crate::model::{Document, Draft, Entity, EntityId, UnixTimeMs, UserRef};
use crate::FeedError;

fn missing<E: Entity>(id: &EntityId) -> FeedError {
    FeedError::not_found(format!("{} {} is not on this screen", E::KIND, id.base()))
}

impl<E: Entity> LayerState<E> {
    // --- like / unlike: apply, then compensate on failure ---

    /// Flips the like flag and adjusts the counter. `Ok(false)` means the
    /// record already shows the requested state and nothing was sent.
    pub fn start_like(&mut self, id: &EntityId, liked: bool) -> Result<bool, FeedError> {
        if id.is_provisional() {
            return Err(missing::<E>(id));
        }
        let item = self.find_mut(id).ok_or_else(|| missing::<E>(id))?;
        if item.is_liked() == liked {
            return Ok(false);
        }
        let likes = if liked {
            item.likes().saturating_add(1)
        } else {
            item.likes().saturating_sub(1)
        };
        item.set_like_state(liked, likes);
        self.clear_error(OperationKind::for_like(liked));
        Ok(true)
    }

    /// Undoes a failed like/unlike. The counter is only touched while the
    /// record still shows the optimistic value. A record that is no longer
    /// listed, or is pending deletion, takes no error either.
    pub fn compensate_like(&mut self, id: &EntityId, liked: bool, error: FeedError) {
        match self.find_mut(id) {
            Some(item) if item.is_liked() == liked => {
                let likes = if liked {
                    item.likes().saturating_sub(1)
                } else {
                    item.likes().saturating_add(1)
                };
                item.set_like_state(!liked, likes);
            }
            Some(_) => debug!(id = %id, "like state moved on; leaving counter alone"),
            None => {
                debug!(id = %id, error = %error, "liked record no longer listed; dropping failure");
                return;
            }
        }
        self.set_error(OperationKind::for_like(liked), error);
    }

    // --- create: optimistic insert, reconcile on success ---

    /// Appends the provisional record under the pending-create id, replacing
    /// any pending record left behind by an earlier create.
    pub fn start_create(&mut self, entity: E) {
        self.items.retain(|item| !item.id().is_pending());
        self.items.push(entity);
        self.loading.mutate = true;
        self.clear_error(OperationKind::Create);
    }

    pub fn start_create_from(
        &mut self,
        draft: &Draft,
        author: &UserRef,
        now: UnixTimeMs,
    ) -> Result<(), FeedError> {
        let entity = E::provisional(draft, &self.scope_id, author, now)?;
        self.start_create(entity);
        Ok(())
    }

    /// Swaps the pending record for the server's copy and drops any other
    /// copy of the same id a concurrent fetch may have delivered. Returns
    /// `false` when the pending record was already gone.
    pub fn confirm_create(&mut self, confirmed: E) -> bool {
        self.loading.mutate = false;
        self.clear_error(OperationKind::Create);

        let Some(index) = self.position(&EntityId::pending()) else {
            debug!(id = %confirmed.id(), "pending record vanished before confirmation");
            return false;
        };

        let confirmed_id = confirmed.id().base().to_string();
        self.items[index] = confirmed;

        let mut position = 0;
        self.items.retain(|item| {
            let keep = position == index || item.id().base() != confirmed_id;
            position += 1;
            keep
        });
        true
    }

    pub fn confirm_document(&mut self, doc: Document) -> bool {
        let type_name = doc.type_name();
        match E::from_document(doc) {
            Some(entity) => self.confirm_create(entity),
            None => {
                warn!(expected = E::KIND, got = type_name, "create returned the wrong document type");
                self.fail_create(
                    FeedError::remote("Unexpected response")
                        .with_internal(format!("expected {}, got {type_name}", E::KIND)),
                );
                false
            }
        }
    }

    pub fn fail_create(&mut self, error: FeedError) {
        self.items.retain(|item| !item.id().is_pending());
        self.loading.mutate = false;
        self.set_error(OperationKind::Create, error);
    }

    // --- delete: soft-mark, remove on success ---

    /// Tombstones the record in place so list positions stay put while the
    /// request is outstanding. An earlier tombstone is restored first.
    pub fn start_delete(&mut self, id: &EntityId) -> Result<(), FeedError> {
        if id.is_provisional() || self.find(id).is_none() {
            return Err(missing::<E>(id));
        }
        self.restore_tombstones();
        if let Some(item) = self.find_mut(id) {
            item.set_id(id.tombstoned());
        }
        self.clear_error(OperationKind::Delete);
        Ok(())
    }

    fn restore_tombstones(&mut self) {
        for item in &mut self.items {
            if item.id().is_deleting() {
                let restored = EntityId::new(item.id().base());
                item.set_id(restored);
            }
        }
    }

    /// Removes the record whatever marker its id carries.
    pub fn confirm_delete(&mut self, id: &EntityId) -> bool {
        let before = self.items.len();
        self.items.retain(|item| item.id().base() != id.base());
        self.clear_error(OperationKind::Delete);
        before != self.items.len()
    }

    pub fn fail_delete(&mut self, id: &EntityId, error: FeedError) {
        if let Some(item) = self.find_mut(&id.tombstoned()) {
            item.set_id(EntityId::new(id.base()));
        }
        self.set_error(OperationKind::Delete, error);
    }
}

impl Layer {
    pub fn start_like(&mut self, id: &EntityId, liked: bool) -> Result<bool, FeedError> {
        with_state!(self, state => state.start_like(id, liked))
    }

    pub fn compensate_like(&mut self, id: &EntityId, liked: bool, error: FeedError) {
        with_state!(self, state => state.compensate_like(id, liked, error));
    }

    pub fn start_create(&mut self, draft: &Draft, author: &UserRef, now: UnixTimeMs) -> Result<(), FeedError> {
        let draft = draft.clone().scoped_to(self.feed(), self.scope_id());
        with_state!(self, state => state.start_create_from(&draft, author, now))
    }

    pub fn confirm_create(&mut self, doc: Document) -> bool {
        with_state!(self, state => state.confirm_document(doc))
    }

    pub fn fail_create(&mut self, error: FeedError) {
        with_state!(self, state => state.fail_create(error));
    }

    pub fn start_delete(&mut self, id: &EntityId) -> Result<(), FeedError> {
        with_state!(self, state => state.start_delete(id))
    }

    pub fn confirm_delete(&mut self, id: &EntityId) -> bool {
        with_state!(self, state => state.confirm_delete(id))
    }

    pub fn fail_delete(&mut self, id: &EntityId, error: FeedError) {
        with_state!(self, state => state.fail_delete(id, error));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layer::{FeedKind, SortKey};
    use crate::model::{Comment, Post, ScopeId};
    use crate::ErrorKind;

    fn ada() -> UserRef {
        UserRef::new("u1", "ada")
    }

    fn comment(id: &str, likes: u32, liked: bool) -> Comment {
        Comment {
            id: EntityId::new(id),
            post_id: EntityId::new("P1"),
            author: ada(),
            content: id.to_string(),
            likes,
            is_liked: liked,
            reply_count: 0,
            created_at: UnixTimeMs(1),
        }
    }

    fn thread(items: Vec<Comment>) -> LayerState<Comment> {
        let mut state = LayerState::new(ScopeId::new("P1"), SortKey::Chronological);
        state.items = items;
        state
    }

    #[test]
    fn like_failure_restores_exact_state() {
        let mut state = thread(vec![comment("c1", 4, false)]);
        let before = state.clone();

        assert!(state.start_like(&EntityId::new("c1"), true).unwrap());
        assert_eq!(state.items[0].likes, 5);
        assert!(state.items[0].is_liked);

        state.compensate_like(&EntityId::new("c1"), true, FeedError::remote("down"));
        assert_eq!(state.items, before.items);
        assert_eq!(state.error(OperationKind::Like).unwrap().kind, ErrorKind::RemoteFailure);
    }

    #[test]
    fn unlike_then_failure_round_trips() {
        let mut state = thread(vec![comment("c1", 1, true)]);
        assert!(state.start_like(&EntityId::new("c1"), false).unwrap());
        assert_eq!((state.items[0].likes, state.items[0].is_liked), (0, false));
        state.compensate_like(&EntityId::new("c1"), false, FeedError::remote("down"));
        assert_eq!((state.items[0].likes, state.items[0].is_liked), (1, true));
        assert!(state.error(OperationKind::Unlike).is_some());
    }

    #[test]
    fn like_already_liked_is_noop() {
        let mut state = thread(vec![comment("c1", 3, true)]);
        assert!(!state.start_like(&EntityId::new("c1"), true).unwrap());
        assert_eq!(state.items[0].likes, 3);
    }

    #[test]
    fn compensation_skips_counter_when_state_moved_on() {
        let mut state = thread(vec![comment("c1", 0, false)]);
        state.start_like(&EntityId::new("c1"), true).unwrap();
        state.start_like(&EntityId::new("c1"), false).unwrap();
        state.compensate_like(&EntityId::new("c1"), true, FeedError::remote("late"));
        assert_eq!((state.items[0].likes, state.items[0].is_liked), (0, false));
    }

    #[test]
    fn like_failure_on_record_pending_deletion_keeps_tombstone_quiet() {
        let mut state = thread(vec![comment("c1", 0, false)]);
        state.start_like(&EntityId::new("c1"), true).unwrap();
        state.start_delete(&EntityId::new("c1")).unwrap();

        state.compensate_like(&EntityId::new("c1"), true, FeedError::remote("down"));
        assert!(state.error(OperationKind::Like).is_none());
        assert_eq!(state.items[0].id, EntityId::new("c1").tombstoned());
        assert_eq!((state.items[0].likes, state.items[0].is_liked), (1, true));
        assert_eq!(state.deleting_count(), 1);
    }

    #[test]
    fn like_on_missing_or_tombstoned_is_not_found() {
        let mut state = thread(vec![comment("c1", 0, false)]);
        let err = state.start_like(&EntityId::new("nope"), true).unwrap_err();
        assert_eq!(err.kind, ErrorKind::NotFound);

        state.start_delete(&EntityId::new("c1")).unwrap();
        let err = state.start_like(&EntityId::new("c1"), true).unwrap_err();
        assert_eq!(err.kind, ErrorKind::NotFound);
        let err = state.start_like(&EntityId::new("c1").tombstoned(), true).unwrap_err();
        assert_eq!(err.kind, ErrorKind::NotFound);
    }

    #[test]
    fn create_then_confirm_replaces_sentinel() {
        let mut state = thread(Vec::new());
        state.start_create_from(&Draft::comment("hi"), &ada(), UnixTimeMs(7)).unwrap();
        assert_eq!(state.pending_count(), 1);
        assert!(state.loading.mutate);
        assert_eq!(state.items[0].content, "hi");

        let mut confirmed = state.items[0].clone();
        confirmed.id = EntityId::new("srv1");
        confirmed.created_at = UnixTimeMs(9);
        assert!(state.confirm_create(confirmed));
        assert_eq!(state.items.len(), 1);
        assert_eq!(state.items[0].id.as_str(), "srv1");
        assert_eq!(state.items[0].content, "hi");
        assert_eq!(state.items[0].likes, 0);
        assert!(!state.loading.mutate);
    }

    #[test]
    fn confirm_create_drops_copy_from_concurrent_fetch() {
        let mut state = thread(Vec::new());
        state.start_create_from(&Draft::comment("hi"), &ada(), UnixTimeMs(7)).unwrap();
        state.items.push(comment("srv1", 0, false));

        assert!(state.confirm_create(comment("srv1", 0, false)));
        assert_eq!(state.items.len(), 1);
        assert_eq!(state.items[0].id.as_str(), "srv1");
        assert_eq!(state.pending_count(), 0);
    }

    #[test]
    fn at_most_one_sentinel() {
        let mut state = thread(Vec::new());
        state.start_create_from(&Draft::comment("one"), &ada(), UnixTimeMs(1)).unwrap();
        state.start_create_from(&Draft::comment("two"), &ada(), UnixTimeMs(2)).unwrap();
        assert_eq!(state.pending_count(), 1);
        assert_eq!(state.items[0].content, "two");
    }

    #[test]
    fn create_failure_removes_sentinel() {
        let mut state = thread(vec![comment("c1", 0, false)]);
        state.start_create_from(&Draft::comment("hi"), &ada(), UnixTimeMs(1)).unwrap();
        state.fail_create(FeedError::remote("nope"));
        assert_eq!(state.items.len(), 1);
        assert_eq!(state.pending_count(), 0);
        assert!(!state.loading.mutate);
        assert!(state.error(OperationKind::Create).is_some());
    }

    #[test]
    fn invalid_draft_leaves_layer_untouched() {
        let mut state = thread(Vec::new());
        assert!(state.start_create_from(&Draft::reply("x"), &ada(), UnixTimeMs(1)).is_err());
        assert!(state.items.is_empty());
        assert!(!state.loading.mutate);
    }

    #[test]
    fn delete_marks_then_removes() {
        let mut state = thread(vec![comment("c1", 0, false), comment("c2", 0, false)]);
        state.start_delete(&EntityId::new("c1")).unwrap();
        assert!(state.items[0].id.is_deleting());
        assert_eq!(state.items.len(), 2);

        assert!(state.confirm_delete(&EntityId::new("c1")));
        assert_eq!(state.items.len(), 1);
        assert_eq!(state.items[0].id.as_str(), "c2");
    }

    #[test]
    fn delete_failure_restores_id() {
        let mut state = thread(vec![comment("c1", 0, false)]);
        state.start_delete(&EntityId::new("c1")).unwrap();
        state.fail_delete(&EntityId::new("c1"), FeedError::remote("nope"));
        assert_eq!(state.items[0].id.as_str(), "c1");
        assert!(state.error(OperationKind::Delete).is_some());
    }

    #[test]
    fn at_most_one_tombstone() {
        let mut state = thread(vec![comment("c1", 0, false), comment("c2", 0, false)]);
        state.start_delete(&EntityId::new("c1")).unwrap();
        state.start_delete(&EntityId::new("c2")).unwrap();
        assert_eq!(state.deleting_count(), 1);
        assert_eq!(state.items[0].id.as_str(), "c1");
        assert!(state.items[1].id.is_deleting());

        // the first delete still lands by base id
        assert!(state.confirm_delete(&EntityId::new("c1")));
        assert_eq!(state.items.len(), 1);
    }

    #[test]
    fn layer_dispatch_fills_place_from_scope() {
        let mut layer = Layer::new(FeedKind::Places, ScopeId::new("pl1"));
        layer.start_create(&Draft::post("view", None), &ada(), UnixTimeMs(1)).unwrap();
        let posts = layer.as_posts().unwrap();
        let post: &Post = &posts.items[0];
        assert_eq!(post.place.as_ref().unwrap().id.as_str(), "pl1");
    }

    #[test]
    fn wrong_confirmation_type_fails_create() {
        let mut layer = Layer::new(FeedKind::Comments, ScopeId::new("P1"));
        layer.start_create(&Draft::comment("hi"), &ada(), UnixTimeMs(1)).unwrap();
        let reply = crate::model::Reply {
            id: EntityId::new("r1"),
            comment_id: EntityId::new("c1"),
            author: ada(),
            content: "x".into(),
            likes: 0,
            is_liked: false,
            created_at: UnixTimeMs(1),
        };
        assert!(!layer.confirm_create(Document::Reply(reply)));
        assert!(layer.is_empty());
        assert!(layer.error(OperationKind::Create).is_some());
    }
}
