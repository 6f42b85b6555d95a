// lib.rs - Social feed client core

#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::too_many_lines)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::missing_errors_doc)]

pub mod app;
pub mod capabilities;
pub mod config;
pub mod event;
pub mod layer;
pub mod merge;
pub mod model;
pub mod mutation;
pub mod stack;
pub mod tabs;
pub mod view;

use serde::{Deserialize, Serialize};

pub use app::App;
pub use capabilities::{
    Capabilities, DocStoreError, DocStoreOperation, DocStoreOutput, DocStoreResult, Effect,
};
pub use config::{ConfigError, FeedConfig};
pub use crux_core::{render::Render, App as CruxApp};
pub use event::Event;
pub use layer::{Cursor, FeedKind, Layer, LayerKey, LayerState, LoadingFlags, OperationKind, SortKey};
pub use model::{
    Comment, Document, Draft, Entity, EntityId, Model, PlaceId, PlaceRef, Post, Reply, ScopeId,
    UnixTimeMs, UserId, UserRef,
};
pub use stack::NavigationStack;
pub use tabs::{Tab, Tabs, Ticket, TicketId};
pub use view::{ItemView, LayerView, TabView, UserFacingError, ViewModel};

pub const DEFAULT_PAGE_SIZE: u32 = 20;
pub const MAX_PAGE_SIZE: u32 = 100;
pub const DEFAULT_MAX_STACK_DEPTH: usize = 32;
pub const MAX_TEXT_LENGTH: usize = 2_200;
pub const PENDING_CREATE_ID: &str = "__pending_create__";
pub const DELETE_SUFFIX: &str = "__deleting";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Mutation attempted with nobody signed in.
    Unauthenticated,
    /// A completion arrived for a screen that is no longer showing.
    ScopeMismatch,
    /// Anything the transport or backend reported.
    RemoteFailure,
    /// The addressed screen or record does not exist.
    NotFound,
    Validation,
}

impl ErrorKind {
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::Unauthenticated => "UNAUTHENTICATED",
            Self::ScopeMismatch => "SCOPE_MISMATCH",
            Self::RemoteFailure => "REMOTE_FAILURE",
            Self::NotFound => "NOT_FOUND",
            Self::Validation => "VALIDATION_ERROR",
        }
    }

    /// Stale completions are dropped silently; everything else reaches a
    /// layer's error slot.
    #[must_use]
    pub const fn is_user_visible(self) -> bool {
        !matches!(self, Self::ScopeMismatch)
    }
}

/// Error value stored in a layer's per-operation slot. Plain data, so layers
/// clone without any reconstruction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedError {
    pub kind: ErrorKind,
    pub message: String,
    pub internal_message: Option<String>,
}

impl FeedError {
    #[must_use]
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            internal_message: None,
        }
    }

    #[must_use]
    pub fn unauthenticated() -> Self {
        Self::new(ErrorKind::Unauthenticated, "Not signed in")
    }

    #[must_use]
    pub fn not_found(what: impl Into<String>) -> Self {
        Self::new(ErrorKind::NotFound, what)
    }

    #[must_use]
    pub fn remote(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::RemoteFailure, message)
    }

    #[must_use]
    pub fn scope_mismatch() -> Self {
        Self::new(ErrorKind::ScopeMismatch, "Completion no longer matches the visible screen")
    }

    #[must_use]
    pub fn validation(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Validation, message)
    }

    #[must_use]
    pub fn with_internal(mut self, internal: impl Into<String>) -> Self {
        self.internal_message = Some(internal.into());
        self
    }

    #[must_use]
    pub const fn code(&self) -> &'static str {
        self.kind.code()
    }

    /// One message per operation kind; the transport's own wording never
    /// reaches the user.
    #[must_use]
    pub fn user_facing_message(&self, op: OperationKind) -> String {
        match self.kind {
            ErrorKind::Unauthenticated => "Please sign in to do that.".into(),
            ErrorKind::NotFound => "This item could not be found. It may have been removed.".into(),
            ErrorKind::Validation => self.message.clone(),
            ErrorKind::ScopeMismatch => String::new(),
            ErrorKind::RemoteFailure => match op {
                OperationKind::Fetch => "Couldn't load this page. Pull to try again.".into(),
                OperationKind::Create => "Couldn't post that. Please try again.".into(),
                OperationKind::Delete => "Couldn't delete that. Please try again.".into(),
                OperationKind::Like => "Couldn't like that. Please try again.".into(),
                OperationKind::Unlike => "Couldn't remove your like. Please try again.".into(),
            },
        }
    }
}

impl std::fmt::Display for FeedError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {}", self.code(), self.message)?;
        if let Some(internal) = &self.internal_message {
            write!(f, " (internal: {internal})")?;
        }
        Ok(())
    }
}

impl std::error::Error for FeedError {}

impl From<&DocStoreError> for FeedError {
    fn from(e: &DocStoreError) -> Self {
        match e {
            DocStoreError::NotFound { what } => FeedError::not_found(what.clone()),
            other => FeedError::remote("Request failed").with_internal(other.to_string()),
        }
    }
}

pub type FeedResult<T> = Result<T, FeedError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn remote_messages_are_normalized_per_operation() {
        let err = FeedError::remote("socket closed").with_internal("ECONNRESET");
        assert_eq!(
            err.user_facing_message(OperationKind::Fetch),
            "Couldn't load this page. Pull to try again."
        );
        assert_ne!(
            err.user_facing_message(OperationKind::Like),
            err.user_facing_message(OperationKind::Unlike)
        );
        assert!(!err.user_facing_message(OperationKind::Create).contains("socket"));
    }

    #[test]
    fn display_includes_code_and_internal() {
        let err = FeedError::not_found("comment c1").with_internal("404");
        assert_eq!(err.to_string(), "[NOT_FOUND] comment c1 (internal: 404)");
    }

    #[test]
    fn store_errors_map_to_kinds() {
        let not_found = DocStoreError::NotFound { what: "post p1".into() };
        assert_eq!(FeedError::from(&not_found).kind, ErrorKind::NotFound);

        let timeout = DocStoreError::Timeout { timeout_ms: 30_000 };
        let mapped = FeedError::from(&timeout);
        assert_eq!(mapped.kind, ErrorKind::RemoteFailure);
        assert!(mapped.internal_message.unwrap().contains("30000"));
    }

    #[test]
    fn scope_mismatch_is_never_user_visible() {
        assert!(!ErrorKind::ScopeMismatch.is_user_visible());
        assert!(ErrorKind::RemoteFailure.is_user_visible());
        assert!(FeedError::scope_mismatch()
            .user_facing_message(OperationKind::Delete)
            .is_empty());
    }
}
