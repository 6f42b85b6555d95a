mod common;

use common::*;
use social_core::{
    Cursor, DocStoreError, DocStoreOperation, Document, Draft, ErrorKind, Event, FeedConfig,
    FeedKind, OperationKind, SortKey, Tab,
};

fn small_pages(app: &Tester, model: &mut social_core::Model, page_size: u32) {
    app.update(
        Event::Configure(FeedConfig {
            page_size,
            ..FeedConfig::default()
        }),
        model,
    );
}

fn ids(model: &social_core::Model, tab: Tab) -> Vec<String> {
    top_comments(model, tab)
        .into_iter()
        .map(|c| c.id.as_str().to_string())
        .collect()
}

#[test]
fn two_overlapping_pages_merge_without_duplicates() {
    let (app, mut model) = signed_in();
    small_pages(&app, &mut model, 2);
    push(&app, &mut model, Tab::Home, FeedKind::Comments, "P1");

    let mut first = single_request(app.update(Event::FetchRequested { tab: Tab::Home }, &mut model));
    match &first.operation {
        DocStoreOperation::QueryPage {
            cursor, page_size, sort, ..
        } => {
            assert!(cursor.is_none());
            assert_eq!(*page_size, 2);
            assert_eq!(*sort, SortKey::Chronological);
        }
        other => panic!("unexpected operation {other:?}"),
    }
    resolve(
        &app,
        &mut model,
        &mut first,
        Ok(page(vec![
            Document::Comment(comment("c1", "P1", 10, 0)),
            Document::Comment(comment("c2", "P1", 20, 0)),
        ])),
    );
    assert_eq!(
        model.tabs.top_layer_of(Tab::Home).unwrap().cursor(),
        Some(&Cursor("20:c2".into()))
    );

    let mut second = single_request(app.update(Event::FetchRequested { tab: Tab::Home }, &mut model));
    assert!(matches!(
        &second.operation,
        DocStoreOperation::QueryPage { cursor: Some(Cursor(c)), .. } if c == "20:c2"
    ));
    resolve(
        &app,
        &mut model,
        &mut second,
        Ok(page(vec![
            Document::Comment(comment("c2", "P1", 20, 3)),
            Document::Comment(comment("c3", "P1", 15, 0)),
        ])),
    );

    assert_eq!(ids(&model, Tab::Home), vec!["c1", "c3", "c2"]);
    assert_eq!(top_comments(&model, Tab::Home)[2].likes, 3);
}

#[test]
fn short_page_means_no_more() {
    let (app, mut model) = signed_in();
    loaded_thread(&app, &mut model, Tab::Home, "P1", vec![comment("c1", "P1", 1, 0)]);
    let view = app.view(&model);
    assert!(!view.tab(Tab::Home).unwrap().top.as_ref().unwrap().has_more);
}

#[test]
fn second_fetch_waits_for_the_first() {
    let (app, mut model) = signed_in();
    push(&app, &mut model, Tab::Home, FeedKind::Comments, "P1");
    let first = app.update(Event::FetchRequested { tab: Tab::Home }, &mut model);
    let second = app.update(Event::FetchRequested { tab: Tab::Home }, &mut model);
    assert_eq!(doc_store_requests(first).len(), 1);
    assert!(doc_store_requests(second).is_empty());
    assert!(app.view(&model).tab(Tab::Home).unwrap().top.as_ref().unwrap().is_fetching);
}

#[test]
fn fetch_restarts_after_its_page_was_dropped_elsewhere() {
    let (app, mut model) = signed_in();
    push(&app, &mut model, Tab::Home, FeedKind::Comments, "P1");
    let mut first = single_request(app.update(Event::FetchRequested { tab: Tab::Home }, &mut model));

    // the page lands while a reply thread is open on top and is dropped
    push(&app, &mut model, Tab::Home, FeedKind::Replies, "C1");
    resolve(
        &app,
        &mut model,
        &mut first,
        Ok(page(vec![Document::Comment(comment("stale", "P1", 1, 0))])),
    );
    app.update(Event::PopLayer { tab: Tab::Home }, &mut model);
    assert!(model.tabs.in_flight().is_empty());

    let mut retry = single_request(app.update(Event::FetchRequested { tab: Tab::Home }, &mut model));
    assert!(matches!(
        retry.operation,
        DocStoreOperation::QueryPage { cursor: None, .. }
    ));
    resolve(
        &app,
        &mut model,
        &mut retry,
        Ok(page(vec![Document::Comment(comment("c1", "P1", 2, 0))])),
    );
    assert_eq!(ids(&model, Tab::Home), vec!["c1"]);
    assert!(!model.tabs.top_layer_of(Tab::Home).unwrap().loading().fetch);
}

#[test]
fn fetch_failure_collapses_the_screen() {
    let (app, mut model) = signed_in();
    loaded_thread(&app, &mut model, Tab::Home, "P1", vec![comment("c1", "P1", 1, 0)]);

    let mut request = single_request(app.update(Event::FetchRequested { tab: Tab::Home }, &mut model));
    resolve(
        &app,
        &mut model,
        &mut request,
        Err(DocStoreError::NotFound {
            what: "post P1".into(),
        }),
    );

    let layer = model.tabs.top_layer_of(Tab::Home).unwrap();
    assert!(layer.is_empty());
    assert!(layer.cursor().is_none());
    assert!(!layer.loading().fetch);
    assert_eq!(layer.error(OperationKind::Fetch).unwrap().kind, ErrorKind::NotFound);
}

#[test]
fn refresh_restarts_from_the_first_page() {
    let (app, mut model) = signed_in();
    loaded_thread(&app, &mut model, Tab::Home, "P1", vec![comment("c1", "P1", 1, 0)]);

    let mut stale = single_request(app.update(Event::FetchRequested { tab: Tab::Home }, &mut model));
    let mut fresh = single_request(app.update(Event::RefreshRequested { tab: Tab::Home }, &mut model));
    assert!(matches!(
        fresh.operation,
        DocStoreOperation::QueryPage { cursor: None, .. }
    ));
    assert!(model.tabs.top_layer_of(Tab::Home).unwrap().is_empty());

    resolve(
        &app,
        &mut model,
        &mut fresh,
        Ok(page(vec![Document::Comment(comment("c5", "P1", 5, 0))])),
    );
    // the superseded page request is ignored when it finally lands
    resolve(
        &app,
        &mut model,
        &mut stale,
        Ok(page(vec![Document::Comment(comment("old", "P1", 2, 0))])),
    );
    assert_eq!(ids(&model, Tab::Home), vec!["c5"]);
}

#[test]
fn sort_change_resorts_and_refetches() {
    let (app, mut model) = signed_in();
    loaded_thread(
        &app,
        &mut model,
        Tab::Home,
        "P1",
        vec![comment("a", "P1", 1, 1), comment("b", "P1", 2, 9)],
    );

    let update = app.update(
        Event::SortChanged {
            tab: Tab::Home,
            sort: SortKey::Popularity,
        },
        &mut model,
    );
    assert_eq!(ids(&model, Tab::Home), vec!["b", "a"]);
    let request = single_request(update);
    assert!(matches!(
        request.operation,
        DocStoreOperation::QueryPage {
            sort: SortKey::Popularity,
            cursor: None,
            ..
        }
    ));

    let unchanged = app.update(
        Event::SortChanged {
            tab: Tab::Home,
            sort: SortKey::Popularity,
        },
        &mut model,
    );
    assert!(doc_store_requests(unchanged).is_empty());
}

#[test]
fn tabs_keep_independent_histories() {
    let (app, mut model) = signed_in();
    push(&app, &mut model, Tab::Home, FeedKind::Following, "u1");
    push(&app, &mut model, Tab::Home, FeedKind::Comments, "P1");
    push(&app, &mut model, Tab::Places, FeedKind::Places, "pl1");

    app.update(Event::PopLayer { tab: Tab::Home }, &mut model);
    assert_eq!(model.tabs.depth(Tab::Home), 1);
    assert_eq!(
        model.tabs.top_layer_of(Tab::Home).unwrap().feed(),
        FeedKind::Following
    );
    assert_eq!(model.tabs.depth(Tab::Places), 1);

    app.update(Event::ClearTab { tab: Tab::Places }, &mut model);
    assert!(model.tabs.top_layer_of(Tab::Places).is_none());
    assert_eq!(model.tabs.depth(Tab::Home), 1);

    // popping an empty history is harmless
    app.update(Event::PopLayer { tab: Tab::Places }, &mut model);
    assert_eq!(model.tabs.depth(Tab::Places), 0);
}

#[test]
fn deep_history_drops_the_oldest_screen() {
    let (app, mut model) = signed_in();
    app.update(
        Event::Configure(FeedConfig {
            max_stack_depth: 2,
            ..FeedConfig::default()
        }),
        &mut model,
    );
    for scope in ["a", "b", "c"] {
        push(&app, &mut model, Tab::Explore, FeedKind::Comments, scope);
    }
    let stack = model.tabs.stack(Tab::Explore).unwrap();
    let scopes: Vec<_> = stack.iter().map(|l| l.scope_id().as_str().to_string()).collect();
    assert_eq!(scopes, vec!["b", "c"]);
}

#[test]
fn invalid_config_is_ignored() {
    let (app, mut model) = signed_in();
    app.update(
        Event::Configure(FeedConfig {
            page_size: 0,
            ..FeedConfig::default()
        }),
        &mut model,
    );
    assert_eq!(model.config, FeedConfig::default());
}

#[test]
fn sign_out_resets_everything_and_drops_late_results() {
    let (app, mut model) = signed_in();
    loaded_thread(&app, &mut model, Tab::Home, "P1", vec![comment("c1", "P1", 1, 0)]);
    let mut request = single_request(app.update(
        Event::CreateRequested {
            tab: Tab::Home,
            draft: Draft::comment("late"),
        },
        &mut model,
    ));

    let update = app.update(Event::SignedOut, &mut model);
    assert!(renders(&update));
    assert!(!model.is_authenticated());
    assert_eq!(model.tabs.depth(Tab::Home), 0);
    assert!(model.tabs.pending_owner_tab().is_none());

    app.update(Event::SignedIn { user: ada() }, &mut model);
    push(&app, &mut model, Tab::Home, FeedKind::Comments, "P1");
    resolve(
        &app,
        &mut model,
        &mut request,
        Ok(social_core::DocStoreOutput::Created(Document::Comment(comment(
            "srv1", "P1", 3, 0,
        )))),
    );
    assert!(model.tabs.top_layer_of(Tab::Home).unwrap().is_empty());
}

#[test]
fn view_reports_current_and_pending_owner_tabs() {
    let (app, mut model) = signed_in();
    push(&app, &mut model, Tab::Home, FeedKind::Comments, "P1");
    app.update(Event::FetchRequested { tab: Tab::Home }, &mut model);
    app.update(Event::SetCurrentTab { tab: Tab::Activity }, &mut model);

    let view = app.view(&model);
    assert!(view.signed_in);
    assert_eq!(view.username.as_deref(), Some("ada"));
    assert_eq!(view.current_tab, Tab::Activity);
    assert_eq!(view.pending_owner_tab, Some(Tab::Home));
}
