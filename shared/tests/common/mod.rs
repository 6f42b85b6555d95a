#![allow(dead_code)]

use crux_core::testing::{AppTester, Update};
use crux_core::Request;
use social_core::{
    App, Comment, DocStoreOperation, DocStoreOutput, DocStoreResult, Document, Effect, EntityId, Event, FeedKind,
    Model, Reply, ScopeId, Tab, UnixTimeMs, UserRef,
};

pub type Tester = AppTester<App, Effect>;

pub fn ada() -> UserRef {
    UserRef::new("u1", "ada")
}

pub fn signed_in() -> (Tester, Model) {
    let app = Tester::default();
    let mut model = Model::default();
    app.update(Event::SignedIn { user: ada() }, &mut model);
    (app, model)
}

pub fn push(app: &Tester, model: &mut Model, tab: Tab, feed: FeedKind, scope: &str) {
    app.update(
        Event::PushLayer {
            tab,
            feed,
            scope_id: ScopeId::new(scope),
        },
        model,
    );
}

pub fn renders(update: &Update<Effect, Event>) -> bool {
    update.effects.iter().any(|effect| matches!(effect, Effect::Render(_)))
}

pub fn doc_store_requests(update: Update<Effect, Event>) -> Vec<Request<DocStoreOperation>> {
    update
        .effects
        .into_iter()
        .filter_map(|effect| match effect {
            Effect::DocStore(request) => Some(request),
            _ => None,
        })
        .collect()
}

pub fn single_request(update: Update<Effect, Event>) -> Request<DocStoreOperation> {
    let mut requests = doc_store_requests(update);
    assert_eq!(requests.len(), 1, "expected exactly one document store request");
    requests.remove(0)
}

/// Answers a shell request and feeds the resulting events back in.
pub fn resolve(
    app: &Tester,
    model: &mut Model,
    request: &mut Request<DocStoreOperation>,
    result: DocStoreResult,
) {
    let update = app.resolve(request, result).expect("request resolves");
    for event in update.events {
        app.update(event, model);
    }
}

pub fn comment(id: &str, post: &str, created: u64, likes: u32) -> Comment {
    Comment {
        id: EntityId::new(id),
        post_id: EntityId::new(post),
        author: UserRef::new("u2", "bo"),
        content: format!("comment {id}"),
        likes,
        is_liked: false,
        reply_count: 0,
        created_at: UnixTimeMs(created),
    }
}

pub fn reply(id: &str, parent: &str, created: u64) -> Reply {
    Reply {
        id: EntityId::new(id),
        comment_id: EntityId::new(parent),
        author: ada(),
        content: format!("reply {id}"),
        likes: 0,
        is_liked: false,
        created_at: UnixTimeMs(created),
    }
}

pub fn page(documents: Vec<Document>) -> DocStoreOutput {
    DocStoreOutput::Page {
        documents,
        next_cursor: None,
    }
}

/// Pushes a comment thread on `tab` and loads it with `comments`.
pub fn loaded_thread(app: &Tester, model: &mut Model, tab: Tab, post: &str, comments: Vec<Comment>) {
    push(app, model, tab, FeedKind::Comments, post);
    let mut request = single_request(app.update(Event::FetchRequested { tab }, model));
    let documents = comments.into_iter().map(Document::Comment).collect();
    resolve(app, model, &mut request, Ok(page(documents)));
}

pub fn top_comments(model: &Model, tab: Tab) -> Vec<Comment> {
    model
        .tabs
        .top_layer_of(tab)
        .and_then(|layer| layer.as_comments())
        .map(|state| state.items.clone())
        .unwrap_or_default()
}
