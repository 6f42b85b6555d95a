//! The Crux app: routes intents to the owning tab, starts optimistic
//! transitions, issues document-store requests and applies their completions.

use tracing::{debug, info, instrument, warn};

use crate::capabilities::{Capabilities, DocStoreOutput, DocStoreResult};
use crate::event::Event;
use crate::layer::{Layer, LayerKey, OperationKind, SortKey};
use crate::model::{Document, Draft, EntityId, Model, UnixTimeMs};
use crate::tabs::{Tab, Ticket};
use crate::view::ViewModel;
use crate::FeedError;

#[derive(Default)]
pub struct App;

impl crux_core::App for App {
    type Event = Event;
    type Model = Model;
    type ViewModel = ViewModel;
    type Capabilities = Capabilities;

    #[instrument(skip_all, fields(event = event.name(), completion = event.is_completion()))]
    fn update(&self, event: Event, model: &mut Model, caps: &Capabilities) {
        match event {
            Event::SignedIn { user } => {
                info!(user = %user.id, "signed in");
                model.tabs.reset_all();
                model.user = Some(user);
            }

            Event::SignedOut => {
                info!("signed out");
                model.user = None;
                model.tabs.reset_all();
            }

            Event::Configure(config) => match config.validate() {
                Ok(()) => model.config = config,
                Err(e) => warn!(error = %e, "ignoring invalid feed config"),
            },

            Event::SetCurrentTab { tab } => model.tabs.set_current_tab(tab),

            Event::PushLayer { tab, feed, scope_id } => {
                let dropped =
                    model
                        .tabs
                        .push_layer(tab, Layer::new(feed, scope_id), model.config.max_stack_depth);
                if dropped > 0 {
                    debug!(%tab, dropped, "oldest screens dropped");
                }
            }

            Event::PopLayer { tab } => {
                if model.tabs.pop_layer(tab).is_none() {
                    debug!(%tab, "back pressed on an empty history");
                }
            }

            Event::ClearTab { tab } => model.tabs.clear_tab(tab),

            Event::ResetAll => model.tabs.reset_all(),

            Event::FetchRequested { tab } => Self::start_fetch(tab, model, caps),

            Event::RefreshRequested { tab } => Self::refresh(tab, model, caps),

            Event::SortChanged { tab, sort } => Self::change_sort(tab, sort, model, caps),

            Event::CreateRequested { tab, draft } => Self::start_create(tab, &draft, model, caps),

            Event::DeleteRequested { tab, id } => Self::start_delete(tab, id, model, caps),

            Event::LikeRequested { tab, id } => Self::start_like(tab, id, true, model, caps),

            Event::UnlikeRequested { tab, id } => Self::start_like(tab, id, false, model, caps),

            Event::DismissError { tab, op } => {
                let cleared = model.tabs.update_top(tab, |layer| {
                    layer.clear_error(op);
                    Ok(())
                });
                if cleared.is_err() {
                    debug!(%tab, %op, "no screen to dismiss an error on");
                }
            }

            Event::FetchResponse { ticket, result } => Self::complete_fetch(&ticket, *result, model),

            Event::CreateResponse { ticket, result } => Self::complete_create(&ticket, *result, model),

            Event::DeleteResponse { ticket, id, result } => {
                Self::complete_delete(&ticket, &id, *result, model);
            }

            Event::LikeResponse {
                ticket,
                id,
                liked,
                result,
            } => Self::complete_like(&ticket, &id, liked, *result, model),
        }

        caps.render.render();
    }

    fn view(&self, model: &Model) -> ViewModel {
        ViewModel::project(model)
    }
}

impl App {
    // --- fetch ---

    fn start_fetch(tab: Tab, model: &mut Model, caps: &Capabilities) {
        let page_size = model.config.page_size;
        // The fetch flag only counts while its ticket is still registered.
        let in_flight = model
            .tabs
            .top_layer_of(tab)
            .map(Layer::key)
            .is_some_and(|key| model.tabs.has_outstanding(tab, &key, OperationKind::Fetch));
        let started = model.tabs.update_top(tab, |layer| {
            if !in_flight && layer.loading().fetch {
                debug!(%tab, layer = %layer.key(), "clearing fetch flag with no request in flight");
                layer.abandon_fetch();
            }
            Ok(layer.begin_fetch())
        });
        match started {
            Ok(Some(query)) => {
                let ticket = model.tabs.begin(tab, query.key.clone(), OperationKind::Fetch);
                debug!(%tab, layer = %query.key, ticket = %ticket.id, "fetching page");
                caps.doc_store.query_page(
                    query.key.feed,
                    query.key.scope,
                    query.sort,
                    query.cursor,
                    page_size,
                    move |result| Event::FetchResponse {
                        ticket,
                        result: Box::new(result),
                    },
                );
            }
            Ok(None) => {}
            Err(error) => debug!(%tab, %error, "nothing to fetch"),
        }
    }

    fn refresh(tab: Tab, model: &mut Model, caps: &Capabilities) {
        match model.tabs.update_top(tab, |layer| {
            layer.reset_for_refresh();
            Ok(layer.key())
        }) {
            Ok(key) => {
                model.tabs.forget(tab, &key, OperationKind::Fetch);
                Self::start_fetch(tab, model, caps);
            }
            Err(error) => debug!(%tab, %error, "nothing to refresh"),
        }
    }

    fn change_sort(tab: Tab, sort: SortKey, model: &mut Model, caps: &Capabilities) {
        let changed = model.tabs.update_top(tab, |layer| {
            if layer.sort() == sort {
                return Ok(None);
            }
            layer.set_sort(sort);
            Ok(Some(layer.key()))
        });
        match changed {
            Ok(Some(key)) => {
                model.tabs.forget(tab, &key, OperationKind::Fetch);
                Self::start_fetch(tab, model, caps);
            }
            Ok(None) => {}
            Err(error) => debug!(%tab, %error, "nothing to sort"),
        }
    }

    fn complete_fetch(ticket: &Ticket, result: DocStoreResult, model: &mut Model) {
        let page_size = model.config.page_size;
        let outcome = Self::expect_output(OperationKind::Fetch, result).and_then(|output| match output {
            DocStoreOutput::Page {
                documents,
                next_cursor,
            } => Ok((documents, next_cursor)),
            other => Err(Self::unexpected(OperationKind::Fetch, &other)),
        });

        let applied = model.tabs.resolve(ticket, |layer| match outcome {
            Ok((documents, next_cursor)) => {
                debug!(layer = %ticket.key, count = documents.len(), "page arrived");
                layer.apply_page(documents, next_cursor, page_size);
            }
            Err(error) => layer.fail_fetch(error),
        });
        if Self::routed(ticket, applied).is_some() {
            debug!(layer = %ticket.key, "fetch settled");
        }
    }

    // --- mutations ---

    /// Records an error that was caught before anything was sent.
    fn reject(model: &mut Model, tab: Tab, op: OperationKind, error: FeedError) {
        debug!(%tab, %op, %error, "rejected locally");
        let recorded = model.tabs.update_top(tab, |layer| {
            layer.set_error(op, error);
            Ok(())
        });
        if recorded.is_err() {
            debug!(%tab, "no screen to show the error on");
        }
    }

    fn start_like(tab: Tab, id: EntityId, liked: bool, model: &mut Model, caps: &Capabilities) {
        let op = OperationKind::for_like(liked);
        let Some(user) = model.user.clone() else {
            Self::reject(model, tab, op, FeedError::unauthenticated());
            return;
        };

        let started = model.tabs.update_top(tab, |layer| {
            let applied = layer.start_like(&id, liked)?;
            Ok(applied.then(|| layer.key()))
        });
        match started {
            Ok(Some(key)) => {
                let ticket = model.tabs.begin(tab, key.clone(), op);
                debug!(%tab, layer = %key, %id, ticket = %ticket.id, %op, "optimistic like applied");
                let LayerKey { feed, scope } = key;
                caps.doc_store
                    .set_like(feed, scope, id.clone(), user, liked, move |result| Event::LikeResponse {
                        ticket,
                        id,
                        liked,
                        result: Box::new(result),
                    });
            }
            Ok(None) => debug!(%tab, %id, %op, "already in the requested state"),
            Err(error) => Self::reject(model, tab, op, error),
        }
    }

    fn complete_like(ticket: &Ticket, id: &EntityId, liked: bool, result: DocStoreResult, model: &mut Model) {
        match Self::expect_output(ticket.op, result) {
            // The optimistic counter stands; the store's count is picked up
            // on the next fetch.
            Ok(DocStoreOutput::LikeSet { likes }) => {
                if model.tabs.settle(ticket) {
                    debug!(%id, likes, "like confirmed");
                }
            }
            Ok(other) => {
                let error = Self::unexpected(ticket.op, &other);
                let compensated = model.tabs.resolve(ticket, |layer| layer.compensate_like(id, liked, error));
                Self::routed(ticket, compensated);
            }
            Err(error) => {
                let compensated = model.tabs.resolve(ticket, |layer| layer.compensate_like(id, liked, error));
                Self::routed(ticket, compensated);
            }
        }
    }

    fn start_create(tab: Tab, draft: &Draft, model: &mut Model, caps: &Capabilities) {
        let Some(user) = model.user.clone() else {
            Self::reject(model, tab, OperationKind::Create, FeedError::unauthenticated());
            return;
        };

        let now = UnixTimeMs::now();
        let started = model.tabs.update_top(tab, |layer| {
            layer.start_create(draft, &user, now)?;
            Ok(layer.key())
        });
        match started {
            Ok(key) => {
                let ticket = model.tabs.begin(tab, key.clone(), OperationKind::Create);
                debug!(%tab, layer = %key, ticket = %ticket.id, "optimistic create applied");
                let draft = draft.clone().scoped_to(key.feed, &key.scope);
                caps.doc_store
                    .create(key.feed, key.scope, draft, user, move |result| Event::CreateResponse {
                        ticket,
                        result: Box::new(result),
                    });
            }
            Err(error) => Self::reject(model, tab, OperationKind::Create, error),
        }
    }

    fn complete_create(ticket: &Ticket, result: DocStoreResult, model: &mut Model) {
        let outcome: Result<Document, FeedError> =
            Self::expect_output(OperationKind::Create, result).and_then(|output| match output {
                DocStoreOutput::Created(doc) => Ok(doc),
                other => Err(Self::unexpected(OperationKind::Create, &other)),
            });

        match outcome {
            Ok(doc) => {
                let confirmed = model.tabs.resolve(ticket, |layer| layer.confirm_create(doc));
                if Self::routed(ticket, confirmed) == Some(true) {
                    model.tabs.adjust_parent_counts(ticket.owner, &ticket.key, 1);
                }
            }
            Err(error) => {
                let rolled_back = model.tabs.resolve(ticket, |layer| layer.fail_create(error));
                Self::routed(ticket, rolled_back);
            }
        }
    }

    fn start_delete(tab: Tab, id: EntityId, model: &mut Model, caps: &Capabilities) {
        if model.user.is_none() {
            Self::reject(model, tab, OperationKind::Delete, FeedError::unauthenticated());
            return;
        }

        let started = model.tabs.update_top(tab, |layer| {
            layer.start_delete(&id)?;
            Ok(layer.key())
        });
        match started {
            Ok(key) => {
                let ticket = model.tabs.begin(tab, key.clone(), OperationKind::Delete);
                debug!(%tab, layer = %key, %id, ticket = %ticket.id, "optimistic delete applied");
                let LayerKey { feed, scope } = key;
                caps.doc_store
                    .delete(feed, scope, id.clone(), move |result| Event::DeleteResponse {
                        ticket,
                        id,
                        result: Box::new(result),
                    });
            }
            Err(error) => Self::reject(model, tab, OperationKind::Delete, error),
        }
    }

    fn complete_delete(ticket: &Ticket, id: &EntityId, result: DocStoreResult, model: &mut Model) {
        let outcome = Self::expect_output(OperationKind::Delete, result).and_then(|output| match output {
            DocStoreOutput::Deleted => Ok(()),
            other => Err(Self::unexpected(OperationKind::Delete, &other)),
        });

        match outcome {
            Ok(()) => {
                let removed = model.tabs.resolve(ticket, |layer| layer.confirm_delete(id));
                if Self::routed(ticket, removed) == Some(true) {
                    model.tabs.adjust_parent_counts(ticket.owner, &ticket.key, -1);
                }
            }
            Err(error) => {
                let restored = model.tabs.resolve(ticket, |layer| layer.fail_delete(id, error));
                Self::routed(ticket, restored);
            }
        }
    }

    // --- results ---

    /// Unwraps a completion routed through the race guard. A refused one is
    /// logged with its ticket and dropped.
    fn routed<T>(ticket: &Ticket, outcome: Result<T, FeedError>) -> Option<T> {
        match outcome {
            Ok(value) => Some(value),
            Err(error) => {
                debug!(
                    ticket = %ticket.id,
                    tab = %ticket.owner,
                    layer = %ticket.key,
                    op = %ticket.op,
                    %error,
                    "completion discarded"
                );
                None
            }
        }
    }

    fn expect_output(op: OperationKind, result: DocStoreResult) -> Result<DocStoreOutput, FeedError> {
        result.map_err(|e| {
            warn!(%op, error = %e, retryable = e.is_retryable(), "document store request failed");
            FeedError::from(&e)
        })
    }

    fn unexpected(op: OperationKind, output: &DocStoreOutput) -> FeedError {
        warn!(%op, got = output.name(), "unexpected document store output");
        FeedError::remote("Unexpected response").with_internal(format!("{op} answered with {}", output.name()))
    }
}
