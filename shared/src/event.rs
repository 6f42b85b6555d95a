use serde::{Deserialize, Serialize};

use crate::capabilities::DocStoreResult;
use crate::config::FeedConfig;
use crate::layer::{FeedKind, OperationKind, SortKey};
use crate::model::{Draft, EntityId, ScopeId, UserRef};
use crate::tabs::{Tab, Ticket};

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub enum Event {
    // Session
    SignedIn {
        user: UserRef,
    },
    SignedOut,
    Configure(FeedConfig),

    // Navigation
    SetCurrentTab {
        tab: Tab,
    },
    PushLayer {
        tab: Tab,
        feed: FeedKind,
        scope_id: ScopeId,
    },
    PopLayer {
        tab: Tab,
    },
    ClearTab {
        tab: Tab,
    },
    ResetAll,

    // Fetch
    FetchRequested {
        tab: Tab,
    },
    RefreshRequested {
        tab: Tab,
    },
    SortChanged {
        tab: Tab,
        sort: SortKey,
    },

    // Mutations
    CreateRequested {
        tab: Tab,
        draft: Draft,
    },
    DeleteRequested {
        tab: Tab,
        id: EntityId,
    },
    LikeRequested {
        tab: Tab,
        id: EntityId,
    },
    UnlikeRequested {
        tab: Tab,
        id: EntityId,
    },
    DismissError {
        tab: Tab,
        op: OperationKind,
    },

    // Completions. Each carries the ticket issued when its operation started.
    #[serde(skip)]
    FetchResponse {
        ticket: Ticket,
        result: Box<DocStoreResult>,
    },
    #[serde(skip)]
    CreateResponse {
        ticket: Ticket,
        result: Box<DocStoreResult>,
    },
    #[serde(skip)]
    DeleteResponse {
        ticket: Ticket,
        id: EntityId,
        result: Box<DocStoreResult>,
    },
    #[serde(skip)]
    LikeResponse {
        ticket: Ticket,
        id: EntityId,
        liked: bool,
        result: Box<DocStoreResult>,
    },
}

impl Event {
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::SignedIn { .. } => "signed_in",
            Self::SignedOut => "signed_out",
            Self::Configure(_) => "configure",
            Self::SetCurrentTab { .. } => "set_current_tab",
            Self::PushLayer { .. } => "push_layer",
            Self::PopLayer { .. } => "pop_layer",
            Self::ClearTab { .. } => "clear_tab",
            Self::ResetAll => "reset_all",
            Self::FetchRequested { .. } => "fetch_requested",
            Self::RefreshRequested { .. } => "refresh_requested",
            Self::SortChanged { .. } => "sort_changed",
            Self::CreateRequested { .. } => "create_requested",
            Self::DeleteRequested { .. } => "delete_requested",
            Self::LikeRequested { .. } => "like_requested",
            Self::UnlikeRequested { .. } => "unlike_requested",
            Self::DismissError { .. } => "dismiss_error",
            Self::FetchResponse { .. } => "fetch_response",
            Self::CreateResponse { .. } => "create_response",
            Self::DeleteResponse { .. } => "delete_response",
            Self::LikeResponse { .. } => "like_response",
        }
    }

    /// Completions come from the core's own effects, never from the shell.
    #[must_use]
    pub const fn is_completion(&self) -> bool {
        matches!(
            self,
            Self::FetchResponse { .. }
                | Self::CreateResponse { .. }
                | Self::DeleteResponse { .. }
                | Self::LikeResponse { .. }
        )
    }
}
