//! One navigation-history frame.
//!
//! A [`Layer`] is the state behind a single screen: which scope it shows, the
//! paginated items loaded so far, and per-operation loading/error slots. The
//! five feeds are explicit variants so nothing ever has to guess which kind of
//! record a frame holds.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::model::{Comment, Entity, EntityId, Post, Reply, ScopeId};
use crate::FeedError;

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum FeedKind {
    /// Posts authored by the scoped user.
    Posts,
    /// Posts by the users the scoped user follows.
    Following,
    /// Posts tagged with the scoped place.
    Places,
    /// Comments under the scoped post.
    Comments,
    /// Replies under the scoped comment.
    Replies,
}

impl FeedKind {
    pub const ALL: [FeedKind; 5] = [
        Self::Posts,
        Self::Following,
        Self::Places,
        Self::Comments,
        Self::Replies,
    ];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Posts => "posts",
            Self::Following => "following",
            Self::Places => "places",
            Self::Comments => "comments",
            Self::Replies => "replies",
        }
    }

    /// Threads read oldest first; post grids surface the most liked.
    #[must_use]
    pub const fn default_sort(self) -> SortKey {
        match self {
            Self::Comments | Self::Replies | Self::Following => SortKey::Chronological,
            Self::Posts | Self::Places => SortKey::Popularity,
        }
    }
}

impl fmt::Display for FeedKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum SortKey {
    /// Oldest first.
    #[default]
    Chronological,
    /// Most liked first.
    Popularity,
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum OperationKind {
    Fetch,
    Create,
    Delete,
    Like,
    Unlike,
}

impl OperationKind {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Fetch => "fetch",
            Self::Create => "create",
            Self::Delete => "delete",
            Self::Like => "like",
            Self::Unlike => "unlike",
        }
    }

    #[must_use]
    pub const fn for_like(liked: bool) -> Self {
        if liked {
            Self::Like
        } else {
            Self::Unlike
        }
    }
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What the race guard compares: the feed and the scope a layer shows.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq, Hash)]
pub struct LayerKey {
    pub feed: FeedKind,
    pub scope: ScopeId,
}

impl fmt::Display for LayerKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.feed, self.scope)
    }
}

/// Opaque pagination token marking the last fetched item.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq, Hash)]
pub struct Cursor(pub String);

impl Cursor {
    /// Pagination key derived from an item, used when the store does not
    /// return one.
    pub fn after<E: Entity>(item: &E, sort: SortKey) -> Self {
        match sort {
            SortKey::Chronological => Self(format!("{}:{}", item.created_at().0, item.id().base())),
            SortKey::Popularity => Self(format!(
                "{}:{}:{}",
                item.likes(),
                item.created_at().0,
                item.id().base()
            )),
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct LoadingFlags {
    pub fetch: bool,
    pub mutate: bool,
}

/// State of one frame, generic over the record it lists.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct LayerState<E> {
    pub scope_id: ScopeId,
    pub items: Vec<E>,
    pub cursor: Option<Cursor>,
    pub sort: SortKey,
    pub loading: LoadingFlags,
    pub errors: BTreeMap<OperationKind, FeedError>,
    /// The last page came back short; nothing more to load.
    pub exhausted: bool,
}

impl<E: Entity> LayerState<E> {
    pub fn new(scope_id: ScopeId, sort: SortKey) -> Self {
        Self {
            scope_id,
            items: Vec::new(),
            cursor: None,
            sort,
            loading: LoadingFlags::default(),
            errors: BTreeMap::new(),
            exhausted: false,
        }
    }

    pub fn position(&self, id: &EntityId) -> Option<usize> {
        self.items.iter().position(|item| item.id() == id)
    }

    pub fn find(&self, id: &EntityId) -> Option<&E> {
        self.items.iter().find(|item| item.id() == id)
    }

    pub fn find_mut(&mut self, id: &EntityId) -> Option<&mut E> {
        self.items.iter_mut().find(|item| item.id() == id)
    }

    pub fn error(&self, op: OperationKind) -> Option<&FeedError> {
        self.errors.get(&op)
    }

    pub fn set_error(&mut self, op: OperationKind, error: FeedError) {
        self.errors.insert(op, error);
    }

    pub fn clear_error(&mut self, op: OperationKind) {
        self.errors.remove(&op);
    }

    pub fn pending_count(&self) -> usize {
        self.items.iter().filter(|item| item.id().is_pending()).count()
    }

    pub fn deleting_count(&self) -> usize {
        self.items.iter().filter(|item| item.id().is_deleting()).count()
    }

    /// Bumps the child counter of the record with `id`, if this frame holds it.
    pub fn adjust_child_count(&mut self, id: &EntityId, delta: i32) -> bool {
        match self.find_mut(id) {
            Some(item) => {
                item.adjust_child_count(delta);
                true
            }
            None => false,
        }
    }
}

/// A navigation frame, discriminated by feed.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(tag = "feed", content = "state", rename_all = "snake_case")]
pub enum Layer {
    Posts(LayerState<Post>),
    Following(LayerState<Post>),
    Places(LayerState<Post>),
    Comments(LayerState<Comment>),
    Replies(LayerState<Reply>),
}

/// Runs `$body` against the typed state of any layer variant.
macro_rules! with_state {
    ($layer:expr, $state:ident => $body:expr) => {
        match $layer {
            $crate::layer::Layer::Posts($state)
            | $crate::layer::Layer::Following($state)
            | $crate::layer::Layer::Places($state) => $body,
            $crate::layer::Layer::Comments($state) => $body,
            $crate::layer::Layer::Replies($state) => $body,
        }
    };
}

pub(crate) use with_state;

impl Layer {
    /// A freshly pushed frame: no items, no cursor, no errors.
    pub fn new(feed: FeedKind, scope_id: ScopeId) -> Self {
        let sort = feed.default_sort();
        match feed {
            FeedKind::Posts => Self::Posts(LayerState::new(scope_id, sort)),
            FeedKind::Following => Self::Following(LayerState::new(scope_id, sort)),
            FeedKind::Places => Self::Places(LayerState::new(scope_id, sort)),
            FeedKind::Comments => Self::Comments(LayerState::new(scope_id, sort)),
            FeedKind::Replies => Self::Replies(LayerState::new(scope_id, sort)),
        }
    }

    #[must_use]
    pub const fn feed(&self) -> FeedKind {
        match self {
            Self::Posts(_) => FeedKind::Posts,
            Self::Following(_) => FeedKind::Following,
            Self::Places(_) => FeedKind::Places,
            Self::Comments(_) => FeedKind::Comments,
            Self::Replies(_) => FeedKind::Replies,
        }
    }

    pub fn scope_id(&self) -> &ScopeId {
        with_state!(self, state => &state.scope_id)
    }

    pub fn key(&self) -> LayerKey {
        LayerKey {
            feed: self.feed(),
            scope: self.scope_id().clone(),
        }
    }

    pub fn sort(&self) -> SortKey {
        with_state!(self, state => state.sort)
    }

    pub fn cursor(&self) -> Option<&Cursor> {
        with_state!(self, state => state.cursor.as_ref())
    }

    pub fn loading(&self) -> LoadingFlags {
        with_state!(self, state => state.loading)
    }

    pub fn is_exhausted(&self) -> bool {
        with_state!(self, state => state.exhausted)
    }

    pub fn len(&self) -> usize {
        with_state!(self, state => state.items.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn item_ids(&self) -> Vec<EntityId> {
        with_state!(self, state => state.items.iter().map(|item| item.id().clone()).collect())
    }

    pub fn error(&self, op: OperationKind) -> Option<&FeedError> {
        with_state!(self, state => state.error(op))
    }

    pub fn errors(&self) -> &BTreeMap<OperationKind, FeedError> {
        with_state!(self, state => &state.errors)
    }

    pub fn set_error(&mut self, op: OperationKind, error: FeedError) {
        with_state!(self, state => state.set_error(op, error));
    }

    pub fn clear_error(&mut self, op: OperationKind) {
        with_state!(self, state => state.clear_error(op));
    }

    pub fn adjust_child_count(&mut self, id: &EntityId, delta: i32) -> bool {
        with_state!(self, state => state.adjust_child_count(id, delta))
    }

    pub fn as_posts(&self) -> Option<&LayerState<Post>> {
        match self {
            Self::Posts(state) | Self::Following(state) | Self::Places(state) => Some(state),
            _ => None,
        }
    }

    pub fn as_comments(&self) -> Option<&LayerState<Comment>> {
        match self {
            Self::Comments(state) => Some(state),
            _ => None,
        }
    }

    pub fn as_replies(&self) -> Option<&LayerState<Reply>> {
        match self {
            Self::Replies(state) => Some(state),
            _ => None,
        }
    }
}
