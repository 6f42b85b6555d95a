//! What the shell renders. Plain data, rebuilt from the model on every
//! render request.

use serde::{Deserialize, Serialize};

use crate::layer::{with_state, FeedKind, Layer, OperationKind, SortKey};
use crate::model::{Entity, Model, UserId};
use crate::tabs::{Tab, Tabs};

#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
pub struct ViewModel {
    pub current_tab: Tab,
    pub signed_in: bool,
    pub username: Option<String>,
    /// Tab owning the most recent outstanding request, if any.
    pub pending_owner_tab: Option<Tab>,
    pub tabs: Vec<TabView>,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct TabView {
    pub tab: Tab,
    pub depth: usize,
    pub top: Option<LayerView>,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct LayerView {
    pub feed: FeedKind,
    pub scope_id: String,
    pub sort: SortKey,
    pub items: Vec<ItemView>,
    pub is_fetching: bool,
    pub is_mutating: bool,
    pub has_more: bool,
    pub errors: Vec<UserFacingError>,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct ItemView {
    pub id: String,
    pub author_username: String,
    pub author_avatar_url: Option<String>,
    pub text: String,
    pub image_url: Option<String>,
    pub likes: u32,
    pub is_liked: bool,
    pub child_count: u32,
    pub created_at_ms: u64,
    /// Optimistic create not yet confirmed.
    pub is_pending: bool,
    /// Delete in flight; the row is shown but not interactive.
    pub is_deleting: bool,
    pub is_mine: bool,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct UserFacingError {
    pub op: OperationKind,
    pub message: String,
    pub code: String,
}

impl ViewModel {
    pub fn project(model: &Model) -> Self {
        let viewer = model.user.as_ref().map(|user| &user.id);
        Self {
            current_tab: model.tabs.current_tab(),
            signed_in: model.is_authenticated(),
            username: model.user.as_ref().map(|user| user.username.clone()),
            pending_owner_tab: model.tabs.pending_owner_tab(),
            tabs: Tab::ALL
                .into_iter()
                .map(|tab| TabView::project(&model.tabs, tab, viewer))
                .collect(),
        }
    }

    pub fn tab(&self, tab: Tab) -> Option<&TabView> {
        self.tabs.iter().find(|view| view.tab == tab)
    }
}

impl TabView {
    fn project(tabs: &Tabs, tab: Tab, viewer: Option<&UserId>) -> Self {
        Self {
            tab,
            depth: tabs.depth(tab),
            top: tabs.top_layer_of(tab).map(|layer| LayerView::project(layer, viewer)),
        }
    }
}

impl LayerView {
    pub fn project(layer: &Layer, viewer: Option<&UserId>) -> Self {
        let loading = layer.loading();
        let items: Vec<ItemView> =
            with_state!(layer, state => state.items.iter().map(|item| ItemView::project(item, viewer)).collect());
        Self {
            feed: layer.feed(),
            scope_id: layer.scope_id().to_string(),
            sort: layer.sort(),
            items,
            is_fetching: loading.fetch,
            is_mutating: loading.mutate,
            has_more: !layer.is_exhausted(),
            errors: layer
                .errors()
                .iter()
                .filter(|(_, error)| error.kind.is_user_visible())
                .map(|(op, error)| UserFacingError {
                    op: *op,
                    message: error.user_facing_message(*op),
                    code: error.code().to_string(),
                })
                .collect(),
        }
    }
}

impl ItemView {
    fn project<E: Entity>(item: &E, viewer: Option<&UserId>) -> Self {
        let author = item.author();
        Self {
            id: item.id().base().to_string(),
            author_username: author.username.clone(),
            author_avatar_url: author.avatar_url.clone(),
            text: item.text().to_string(),
            image_url: item.image_url().map(str::to_string),
            likes: item.likes(),
            is_liked: item.is_liked(),
            child_count: item.child_count(),
            created_at_ms: item.created_at().0,
            is_pending: item.id().is_pending(),
            is_deleting: item.id().is_deleting(),
            is_mine: viewer == Some(&author.id),
        }
    }
}
