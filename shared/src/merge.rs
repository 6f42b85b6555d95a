//! Paginated fetch and the dedupe-and-resort merge of a page into a layer.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::HashSet;
use tracing::{debug, warn};

use crate::layer::{with_state, Cursor, Layer, LayerKey, LayerState, OperationKind, SortKey};
use crate::model::{Document, Entity};
use crate::FeedError;

/// What a started fetch asks the document store for.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct PageQuery {
    pub key: LayerKey,
    pub sort: SortKey,
    /// `None` asks for the first page; otherwise continue strictly after it.
    pub cursor: Option<Cursor>,
}

/// Order used by both sort keys. Ties fall back to creation time and then
/// id so the order is total.
pub fn compare<E: Entity>(a: &E, b: &E, sort: SortKey) -> Ordering {
    let by_time = || a.created_at().cmp(&b.created_at());
    let by_id = || a.id().base().cmp(b.id().base());
    match sort {
        SortKey::Chronological => by_time().then_with(by_id),
        SortKey::Popularity => b.likes().cmp(&a.likes()).then_with(by_time).then_with(by_id),
    }
}

pub fn sort_items<E: Entity>(items: &mut [E], sort: SortKey) {
    items.sort_by(|a, b| compare(a, b, sort));
}

pub fn is_sorted<E: Entity>(items: &[E], sort: SortKey) -> bool {
    items
        .windows(2)
        .all(|pair| compare(&pair[0], &pair[1], sort) != Ordering::Greater)
}

/// Keeps, for each id, the occurrence merged last. Ids are compared with any
/// pending-delete marker stripped.
pub fn dedupe<E: Entity>(items: Vec<E>) -> Vec<E> {
    let mut seen = HashSet::with_capacity(items.len());
    let mut kept: Vec<E> = items
        .into_iter()
        .rev()
        .filter(|item| seen.insert(item.id().base().to_string()))
        .collect();
    kept.reverse();
    kept
}

/// `sort(dedupe(existing ++ incoming))`.
pub fn merge<E: Entity>(existing: Vec<E>, incoming: Vec<E>, sort: SortKey) -> Vec<E> {
    let mut all = existing;
    all.extend(incoming);
    let mut merged = dedupe(all);
    sort_items(&mut merged, sort);
    merged
}

impl<E: Entity> LayerState<E> {
    /// Marks a fetch as outstanding. Returns `false` when one already is.
    pub fn begin_fetch(&mut self) -> bool {
        if self.loading.fetch {
            return false;
        }
        self.loading.fetch = true;
        self.clear_error(OperationKind::Fetch);
        true
    }

    /// Drops a fetch flag whose request can no longer complete here.
    pub fn abandon_fetch(&mut self) {
        self.loading.fetch = false;
    }

    pub fn apply_page(&mut self, incoming: Vec<E>, next_cursor: Option<Cursor>, page_size: u32) {
        self.loading.fetch = false;
        self.clear_error(OperationKind::Fetch);

        if incoming.is_empty() {
            self.exhausted = true;
            return;
        }

        self.exhausted = incoming.len() < page_size as usize;
        let cursor = next_cursor.or_else(|| incoming.last().map(|item| Cursor::after(item, self.sort)));
        let existing = std::mem::take(&mut self.items);
        self.items = merge(existing, incoming, self.sort);
        self.cursor = cursor;
    }

    /// Cursor state can't be trusted after a failure of unknown cause, so the
    /// frame collapses and the next fetch starts from the first page.
    pub fn fail_fetch(&mut self, error: FeedError) {
        self.items.clear();
        self.cursor = None;
        self.exhausted = false;
        self.loading.fetch = false;
        self.set_error(OperationKind::Fetch, error);
    }

    pub fn reset_for_refresh(&mut self) {
        self.items.clear();
        self.cursor = None;
        self.exhausted = false;
        self.loading.fetch = false;
        self.clear_error(OperationKind::Fetch);
    }

    /// Re-sorts what is loaded and restarts pagination from the first page.
    /// Any outstanding fetch was paging the old order and is abandoned.
    pub fn set_sort(&mut self, sort: SortKey) {
        self.sort = sort;
        sort_items(&mut self.items, sort);
        self.cursor = None;
        self.exhausted = false;
        self.loading.fetch = false;
    }
}

fn typed_documents<E: Entity>(documents: Vec<Document>) -> Vec<E> {
    let total = documents.len();
    let items: Vec<E> = documents.into_iter().filter_map(E::from_document).collect();
    if items.len() != total {
        warn!(
            expected = E::KIND,
            dropped = total - items.len(),
            "page contained documents of the wrong type"
        );
    }
    items
}

impl Layer {
    pub fn begin_fetch(&mut self) -> Option<PageQuery> {
        let key = self.key();
        with_state!(self, state => {
            if state.begin_fetch() {
                Some(PageQuery {
                    key,
                    sort: state.sort,
                    cursor: state.cursor.clone(),
                })
            } else {
                debug!(layer = %key, "fetch already outstanding");
                None
            }
        })
    }

    pub fn abandon_fetch(&mut self) {
        with_state!(self, state => state.abandon_fetch());
    }

    pub fn apply_page(&mut self, documents: Vec<Document>, next_cursor: Option<Cursor>, page_size: u32) {
        with_state!(self, state => {
            let items = typed_documents(documents);
            state.apply_page(items, next_cursor, page_size);
        });
    }

    pub fn fail_fetch(&mut self, error: FeedError) {
        with_state!(self, state => state.fail_fetch(error));
    }

    pub fn reset_for_refresh(&mut self) {
        with_state!(self, state => state.reset_for_refresh());
    }

    pub fn set_sort(&mut self, sort: SortKey) {
        with_state!(self, state => state.set_sort(sort));
    }
}
