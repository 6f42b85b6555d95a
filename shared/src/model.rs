use serde::{Deserialize, Serialize};
use std::fmt;

use crate::config::FeedConfig;
use crate::layer::FeedKind;
use crate::tabs::Tabs;
use crate::{FeedError, DELETE_SUFFIX, MAX_TEXT_LENGTH, PENDING_CREATE_ID};

// --- Typed IDs ---

macro_rules! typed_id {
    ($name:ident) => {
        #[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub struct $name(pub String);

        impl $name {
            pub fn new(s: impl Into<String>) -> Self {
                Self(s.into())
            }
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }
    };
}

typed_id!(EntityId);
typed_id!(ScopeId);
typed_id!(UserId);
typed_id!(PlaceId);

impl EntityId {
    /// The reserved id carried by an optimistically inserted entity.
    #[must_use]
    pub fn pending() -> Self {
        Self(PENDING_CREATE_ID.to_string())
    }

    #[must_use]
    pub fn is_pending(&self) -> bool {
        self.0 == PENDING_CREATE_ID
    }

    #[must_use]
    pub fn is_deleting(&self) -> bool {
        self.0.ends_with(DELETE_SUFFIX)
    }

    /// Soft tombstone: same id with the pending-delete marker appended.
    #[must_use]
    pub fn tombstoned(&self) -> Self {
        if self.is_deleting() {
            return self.clone();
        }
        Self(format!("{}{}", self.0, DELETE_SUFFIX))
    }

    /// The id with any pending-delete marker stripped.
    #[must_use]
    pub fn base(&self) -> &str {
        self.0.strip_suffix(DELETE_SUFFIX).unwrap_or(&self.0)
    }

    /// True for ids the UI must treat as non-interactive.
    #[must_use]
    pub fn is_provisional(&self) -> bool {
        self.is_pending() || self.is_deleting()
    }
}

impl From<&ScopeId> for EntityId {
    fn from(scope: &ScopeId) -> Self {
        Self(scope.0.clone())
    }
}

/// Milliseconds since the Unix epoch.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct UnixTimeMs(pub u64);

impl UnixTimeMs {
    #[must_use]
    pub fn now() -> Self {
        Self(
            std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .unwrap_or_default()
                .as_millis() as u64,
        )
    }
}

/// Identity of a signed-in user, as supplied by the auth collaborator.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct UserRef {
    pub id: UserId,
    pub username: String,
    pub avatar_url: Option<String>,
}

impl UserRef {
    pub fn new(id: impl Into<String>, username: impl Into<String>) -> Self {
        Self {
            id: UserId::new(id),
            username: username.into(),
            avatar_url: None,
        }
    }

    #[must_use]
    pub fn with_avatar(mut self, url: impl Into<String>) -> Self {
        self.avatar_url = Some(url.into());
        self
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct PlaceRef {
    pub id: PlaceId,
    pub name: String,
}

// --- Entities ---

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct Post {
    pub id: EntityId,
    pub author: UserRef,
    pub caption: String,
    pub image_url: Option<String>,
    pub place: Option<PlaceRef>,
    pub likes: u32,
    pub is_liked: bool,
    pub comment_count: u32,
    pub created_at: UnixTimeMs,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct Comment {
    pub id: EntityId,
    pub post_id: EntityId,
    pub author: UserRef,
    pub content: String,
    pub likes: u32,
    pub is_liked: bool,
    pub reply_count: u32,
    pub created_at: UnixTimeMs,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct Reply {
    pub id: EntityId,
    pub comment_id: EntityId,
    pub author: UserRef,
    pub content: String,
    pub likes: u32,
    pub is_liked: bool,
    pub created_at: UnixTimeMs,
}

/// Wire form of a record exchanged with the document store.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Document {
    Post(Post),
    Comment(Comment),
    Reply(Reply),
}

impl Document {
    #[must_use]
    pub const fn type_name(&self) -> &'static str {
        match self {
            Self::Post(_) => "post",
            Self::Comment(_) => "comment",
            Self::Reply(_) => "reply",
        }
    }
}

/// User-authored payload of a create intent.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Draft {
    Post {
        caption: String,
        image_url: Option<String>,
        place: Option<PlaceRef>,
    },
    Comment {
        content: String,
    },
    Reply {
        content: String,
    },
}

impl Draft {
    pub fn comment(content: impl Into<String>) -> Self {
        Self::Comment {
            content: content.into(),
        }
    }

    pub fn reply(content: impl Into<String>) -> Self {
        Self::Reply {
            content: content.into(),
        }
    }

    pub fn post(caption: impl Into<String>, image_url: Option<String>) -> Self {
        Self::Post {
            caption: caption.into(),
            image_url,
            place: None,
        }
    }

    /// Fills in what the addressed feed implies, e.g. the place of a post
    /// created from a place screen.
    #[must_use]
    pub fn scoped_to(self, feed: FeedKind, scope: &ScopeId) -> Self {
        match self {
            Self::Post {
                caption,
                image_url,
                place: None,
            } if feed == FeedKind::Places => Self::Post {
                caption,
                image_url,
                place: Some(PlaceRef {
                    id: PlaceId::new(scope.as_str()),
                    name: String::new(),
                }),
            },
            other => other,
        }
    }

    fn validated_text(text: &str) -> Result<String, FeedError> {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return Err(FeedError::validation("text cannot be empty"));
        }
        if trimmed.len() > MAX_TEXT_LENGTH {
            return Err(FeedError::validation(format!(
                "text too long ({} > {MAX_TEXT_LENGTH})",
                trimmed.len()
            )));
        }
        Ok(trimmed.to_string())
    }
}

/// Common surface of every record a layer can hold.
pub trait Entity: Clone + fmt::Debug + PartialEq + Send + 'static {
    const KIND: &'static str;

    fn id(&self) -> &EntityId;
    fn set_id(&mut self, id: EntityId);
    fn author(&self) -> &UserRef;
    fn text(&self) -> &str;
    fn image_url(&self) -> Option<&str> {
        None
    }
    fn likes(&self) -> u32;
    fn is_liked(&self) -> bool;
    fn set_like_state(&mut self, liked: bool, likes: u32);
    fn created_at(&self) -> UnixTimeMs;

    /// Replies or comments hanging off this record.
    fn child_count(&self) -> u32;
    fn adjust_child_count(&mut self, delta: i32);

    /// Builds the optimistic record shown before the server confirms.
    fn provisional(
        draft: &Draft,
        scope: &ScopeId,
        author: &UserRef,
        now: UnixTimeMs,
    ) -> Result<Self, FeedError>;

    fn from_document(doc: Document) -> Option<Self>;
}

fn apply_delta(count: u32, delta: i32) -> u32 {
    if delta >= 0 {
        count.saturating_add(delta.unsigned_abs())
    } else {
        count.saturating_sub(delta.unsigned_abs())
    }
}

macro_rules! entity_accessors {
    () => {
        fn id(&self) -> &EntityId {
            &self.id
        }
        fn set_id(&mut self, id: EntityId) {
            self.id = id;
        }
        fn author(&self) -> &UserRef {
            &self.author
        }
        fn likes(&self) -> u32 {
            self.likes
        }
        fn is_liked(&self) -> bool {
            self.is_liked
        }
        fn set_like_state(&mut self, liked: bool, likes: u32) {
            self.is_liked = liked;
            self.likes = likes;
        }
        fn created_at(&self) -> UnixTimeMs {
            self.created_at
        }
    };
}

impl Entity for Post {
    const KIND: &'static str = "post";

    entity_accessors!();

    fn text(&self) -> &str {
        &self.caption
    }

    fn image_url(&self) -> Option<&str> {
        self.image_url.as_deref()
    }

    fn child_count(&self) -> u32 {
        self.comment_count
    }

    fn adjust_child_count(&mut self, delta: i32) {
        self.comment_count = apply_delta(self.comment_count, delta);
    }

    fn provisional(
        draft: &Draft,
        _scope: &ScopeId,
        author: &UserRef,
        now: UnixTimeMs,
    ) -> Result<Self, FeedError> {
        let Draft::Post {
            caption,
            image_url,
            place,
        } = draft
        else {
            return Err(FeedError::validation("a post screen only accepts post drafts"));
        };
        if image_url.is_none() && caption.trim().is_empty() {
            return Err(FeedError::validation("a post needs a caption or an image"));
        }
        let caption = if caption.trim().is_empty() {
            String::new()
        } else {
            Draft::validated_text(caption)?
        };
        Ok(Self {
            id: EntityId::pending(),
            author: author.clone(),
            caption,
            image_url: image_url.clone(),
            place: place.clone(),
            likes: 0,
            is_liked: false,
            comment_count: 0,
            created_at: now,
        })
    }

    fn from_document(doc: Document) -> Option<Self> {
        match doc {
            Document::Post(post) => Some(post),
            _ => None,
        }
    }
}

impl Entity for Comment {
    const KIND: &'static str = "comment";

    entity_accessors!();

    fn text(&self) -> &str {
        &self.content
    }

    fn child_count(&self) -> u32 {
        self.reply_count
    }

    fn adjust_child_count(&mut self, delta: i32) {
        self.reply_count = apply_delta(self.reply_count, delta);
    }

    fn provisional(
        draft: &Draft,
        scope: &ScopeId,
        author: &UserRef,
        now: UnixTimeMs,
    ) -> Result<Self, FeedError> {
        let Draft::Comment { content } = draft else {
            return Err(FeedError::validation("a comment thread only accepts comment drafts"));
        };
        Ok(Self {
            id: EntityId::pending(),
            post_id: EntityId::from(scope),
            author: author.clone(),
            content: Draft::validated_text(content)?,
            likes: 0,
            is_liked: false,
            reply_count: 0,
            created_at: now,
        })
    }

    fn from_document(doc: Document) -> Option<Self> {
        match doc {
            Document::Comment(comment) => Some(comment),
            _ => None,
        }
    }
}

impl Entity for Reply {
    const KIND: &'static str = "reply";

    entity_accessors!();

    fn text(&self) -> &str {
        &self.content
    }

    fn child_count(&self) -> u32 {
        0
    }

    fn adjust_child_count(&mut self, _delta: i32) {}

    fn provisional(
        draft: &Draft,
        scope: &ScopeId,
        author: &UserRef,
        now: UnixTimeMs,
    ) -> Result<Self, FeedError> {
        let Draft::Reply { content } = draft else {
            return Err(FeedError::validation("a reply thread only accepts reply drafts"));
        };
        Ok(Self {
            id: EntityId::pending(),
            comment_id: EntityId::from(scope),
            author: author.clone(),
            content: Draft::validated_text(content)?,
            likes: 0,
            is_liked: false,
            created_at: now,
        })
    }

    fn from_document(doc: Document) -> Option<Self> {
        match doc {
            Document::Reply(reply) => Some(reply),
            _ => None,
        }
    }
}

/// Root of all client state. Owned by the Crux core; the shell only sees the
/// `ViewModel` projection.
#[derive(Serialize, Deserialize, Clone, Debug, Default)]
pub struct Model {
    pub tabs: Tabs,
    pub user: Option<UserRef>,
    pub config: FeedConfig,
}

impl Model {
    #[must_use]
    pub fn new(config: FeedConfig) -> Self {
        Self {
            tabs: Tabs::default(),
            user: None,
            config,
        }
    }

    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.user.is_some()
    }
}
