//! Backend document store, reached through the shell.
//!
//! The shell owns the network client. The core describes each query or
//! transaction as a [`DocStoreOperation`] and gets a [`DocStoreResult`] back.
//! Like/unlike and create/delete are expected to run as one atomic
//! transaction on the backend (counter and child document together).

use crux_core::capability::{Capability, CapabilityContext, Operation};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::layer::{Cursor, FeedKind, SortKey};
use crate::model::{Document, Draft, EntityId, ScopeId, UserRef};

pub struct DocStore<Ev> {
    context: CapabilityContext<DocStoreOperation, Ev>,
}

impl<Ev> Clone for DocStore<Ev> {
    fn clone(&self) -> Self {
        Self {
            context: self.context.clone(),
        }
    }
}

impl<Ev> Capability<Ev> for DocStore<Ev> {
    type Operation = DocStoreOperation;
    type MappedSelf<MappedEv> = DocStore<MappedEv>;

    fn map_event<F, NewEv>(&self, f: F) -> Self::MappedSelf<NewEv>
    where
        F: Fn(NewEv) -> Ev + Send + Sync + 'static,
        Ev: 'static,
        NewEv: 'static + Send,
    {
        DocStore::new(self.context.map_event(f))
    }
}

impl<Ev> DocStore<Ev>
where
    Ev: Send + 'static,
{
    pub fn new(context: CapabilityContext<DocStoreOperation, Ev>) -> Self {
        Self { context }
    }

    /// Sends `operation` to the shell and feeds its answer back to the app
    /// as the event built by `make_event`.
    pub fn request<F>(&self, operation: DocStoreOperation, make_event: F)
    where
        F: FnOnce(DocStoreResult) -> Ev + Send + 'static,
    {
        debug!(op = operation.name(), "document store request");
        let ctx = self.context.clone();
        self.context.spawn(async move {
            let result = ctx.request_from_shell(operation).await;
            ctx.update_app(make_event(result));
        });
    }

    pub fn query_page<F>(
        &self,
        feed: FeedKind,
        scope: ScopeId,
        sort: SortKey,
        cursor: Option<Cursor>,
        page_size: u32,
        make_event: F,
    ) where
        F: FnOnce(DocStoreResult) -> Ev + Send + 'static,
    {
        self.request(
            DocStoreOperation::QueryPage {
                feed,
                scope,
                sort,
                cursor,
                page_size,
            },
            make_event,
        );
    }

    pub fn create<F>(&self, feed: FeedKind, scope: ScopeId, draft: Draft, author: UserRef, make_event: F)
    where
        F: FnOnce(DocStoreResult) -> Ev + Send + 'static,
    {
        self.request(
            DocStoreOperation::Create {
                feed,
                scope,
                draft,
                author,
            },
            make_event,
        );
    }

    pub fn delete<F>(&self, feed: FeedKind, scope: ScopeId, id: EntityId, make_event: F)
    where
        F: FnOnce(DocStoreResult) -> Ev + Send + 'static,
    {
        self.request(DocStoreOperation::Delete { feed, scope, id }, make_event);
    }

    pub fn set_like<F>(
        &self,
        feed: FeedKind,
        scope: ScopeId,
        id: EntityId,
        user: UserRef,
        liked: bool,
        make_event: F,
    ) where
        F: FnOnce(DocStoreResult) -> Ev + Send + 'static,
    {
        self.request(
            DocStoreOperation::SetLike {
                feed,
                scope,
                id,
                user,
                liked,
            },
            make_event,
        );
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub enum DocStoreOperation {
    /// One page of `feed` under `scope`, strictly after `cursor`.
    QueryPage {
        feed: FeedKind,
        scope: ScopeId,
        sort: SortKey,
        cursor: Option<Cursor>,
        page_size: u32,
    },
    /// Adds the child document and bumps the parent's counter.
    Create {
        feed: FeedKind,
        scope: ScopeId,
        draft: Draft,
        author: UserRef,
    },
    /// Removes the child document and decrements the parent's counter.
    Delete {
        feed: FeedKind,
        scope: ScopeId,
        id: EntityId,
    },
    SetLike {
        feed: FeedKind,
        scope: ScopeId,
        id: EntityId,
        user: UserRef,
        liked: bool,
    },
}

impl DocStoreOperation {
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::QueryPage { .. } => "query_page",
            Self::Create { .. } => "create",
            Self::Delete { .. } => "delete",
            Self::SetLike { .. } => "set_like",
        }
    }
}

impl Operation for DocStoreOperation {
    type Output = DocStoreResult;
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub enum DocStoreOutput {
    Page {
        documents: Vec<Document>,
        next_cursor: Option<Cursor>,
    },
    Created(Document),
    Deleted,
    /// Counter value after the transaction.
    LikeSet { likes: u32 },
}

impl DocStoreOutput {
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Page { .. } => "page",
            Self::Created(_) => "created",
            Self::Deleted => "deleted",
            Self::LikeSet { .. } => "like_set",
        }
    }
}

#[derive(Debug, Clone, Error, Serialize, Deserialize, PartialEq, Eq)]
pub enum DocStoreError {
    #[error("not found: {what}")]
    NotFound { what: String },

    #[error("permission denied")]
    PermissionDenied,

    #[error("store unavailable: {message}")]
    Unavailable { message: String },

    #[error("timeout after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },

    #[error("rejected by store: {message}")]
    Rejected { message: String },
}

impl DocStoreError {
    /// Whether trying the same request again could succeed.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::Unavailable { .. } | Self::Timeout { .. })
    }
}

pub type DocStoreResult = Result<DocStoreOutput, DocStoreError>;
