use axum::{debug_handler, extract::{State, WebSocketUpgrade}, response::Response, Json};
use futures_util::{SinkExt, StreamExt};
use tower_sessions::Session;
use tracing::warn;

use crate::{
    feed::{self, Feed, FeedRanker},
    json_frame,
    models::Listing,
    session::current_user_id,
    store::Store,
    AppError, AppResult, AppState,
};

/// Ranks `listings` for the viewer as they are right now, so history picked
/// up since the last snapshot reaches the oracle.
async fn ranked_for(
    store: &Store,
    ranker: &FeedRanker,
    viewer_id: Option<&str>,
    listings: Vec<Listing>,
) -> AppResult<Feed> {
    let viewer = match viewer_id {
        Some(id) => match store.user(id).await {
            Ok(user) => Some(user),
            Err(AppError::NotFound(_)) => None,
            Err(e) => return Err(e),
        },
        None => None,
    };

    Ok(ranker.feed(listings, viewer.as_ref()).await)
}

#[debug_handler(state = AppState)]
pub(crate) async fn feed(
    State(store): State<Store>,
    State(ranker): State<FeedRanker>,
    session: Session,
) -> AppResult<Json<Feed>> {
    let viewer_id = current_user_id(&session).await?;
    let listings = store.active_listings().await?;

    Ok(Json(ranked_for(&store, &ranker, viewer_id.as_deref(), listings).await?))
}

#[debug_handler(state = AppState)]
pub(crate) async fn trending(State(store): State<Store>) -> AppResult<Json<Vec<Listing>>> {
    Ok(Json(feed::trending(store.active_listings().await?)))
}

/// Pushes a freshly ranked feed whenever listings change.
#[debug_handler(state = AppState)]
pub(crate) async fn feed_ws(
    State(store): State<Store>,
    State(ranker): State<FeedRanker>,
    session: Session,

    ws: WebSocketUpgrade,
) -> AppResult<Response> {
    let viewer_id = current_user_id(&session).await?;
    let mut listings = store.watch_listings();

    Ok(ws.on_upgrade(async move |stream| {
        let (mut sender, mut receiver) = stream.split();

        let mut push_task = tokio::spawn(async move {
            while let Some(snapshot) = listings.next().await {
                let feed = match snapshot {
                    Ok(listings) => ranked_for(&store, &ranker, viewer_id.as_deref(), listings).await,
                    Err(e) => Err(e),
                };
                let feed = match feed {
                    Ok(feed) => feed,
                    Err(e) => {
                        warn!("feed refresh failed: {e}");
                        continue;
                    }
                };

                let Ok(frame) = json_frame(&feed) else {
                    break;
                };
                if sender.send(frame).await.is_err() {
                    break;
                }
            }
        });

        // nothing to read; wait for the client to go away
        let mut recv_task = tokio::spawn(async move {
            while let Some(Ok(_)) = receiver.next().await {}
        });

        tokio::select! {
            _ = &mut push_task => recv_task.abort(),
            _ = &mut recv_task => push_task.abort(),
        };
    }))
}
