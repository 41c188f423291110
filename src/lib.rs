pub mod appresult;
pub mod auth;
pub mod config;
pub mod feed;
pub mod listings;
pub mod live;
pub mod messages;
pub mod models;
pub mod profiles;
pub mod res;
pub mod session;
pub mod store;

use std::time::Duration;

use axum::{
    extract::{ws, FromRef},
    http::{header::CONTENT_TYPE, Method},
    Router,
};
use serde::Serialize;
use tower_http::cors::CorsLayer;
use tower_sessions::{cookie::SameSite, Expiry, MemoryStore, SessionManagerLayer};

pub use appresult::{AppError, AppResult};

use feed::FeedRanker;
use store::Store;

#[derive(Clone, FromRef)]
pub struct AppState {
    pub store: Store,
    pub ranker: FeedRanker,
}

pub fn router(state: AppState, session_minutes: i64) -> Router {
    let session_layer = SessionManagerLayer::new(MemoryStore::default())
        .with_secure(false)
        .with_same_site(SameSite::Lax)
        .with_expiry(Expiry::OnInactivity(time::Duration::minutes(session_minutes)));

    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::DELETE, Method::OPTIONS])
        .allow_headers([CONTENT_TYPE])
        .max_age(Duration::from_secs(60 * 60));

    Router::new()
        .merge(auth::router())
        .merge(listings::router())
        .merge(profiles::router())
        .nest("/messages", messages::router())
        .with_state(state)
        .layer(session_layer)
        .layer(cors)
}

/// Markdown to HTML. Raw HTML in the source is shown as text, never rendered,
/// and link or image targets outside http, https and mailto become `#`.
pub fn render_markdown(source: &str) -> String {
    use pulldown_cmark::{Event, Options, Parser, Tag};

    let parser = Parser::new_ext(source, Options::ENABLE_STRIKETHROUGH).map(|event| match event {
        Event::Html(html) | Event::InlineHtml(html) => Event::Text(html),
        Event::Start(Tag::Link { link_type, dest_url, title, id }) if !safe_url(&dest_url) => {
            Event::Start(Tag::Link { link_type, dest_url: "#".into(), title, id })
        }
        Event::Start(Tag::Image { link_type, dest_url, title, id }) if !safe_url(&dest_url) => {
            Event::Start(Tag::Image { link_type, dest_url: "#".into(), title, id })
        }
        _ => event,
    });

    let mut html_output = String::new();
    pulldown_cmark::html::push_html(&mut html_output, parser);
    html_output
}

// relative urls have no scheme; browsers ignore whitespace and control chars inside one
fn safe_url(url: &str) -> bool {
    let url: String = url.chars().filter(|c| !c.is_ascii_whitespace() && !c.is_ascii_control()).collect();
    let Some(colon) = url.find(':') else {
        return true;
    };
    if url[..colon].contains(['/', '?', '#']) {
        return true;
    }

    let scheme = url[..colon].to_ascii_lowercase();
    matches!(scheme.as_str(), "http" | "https" | "mailto")
}

pub(crate) fn json_frame<T: Serialize>(value: &T) -> AppResult<ws::Message> {
    Ok(ws::Message::Text(serde_json::to_string(value)?.into()))
}
