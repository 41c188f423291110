use axum::{debug_handler, extract::{ws, Path, State, WebSocketUpgrade}, response::Response};
use futures_util::{SinkExt, StreamExt};
use tower_sessions::Session;
use tracing::{debug, warn};

use crate::{json_frame, session::require_user, store::Store, AppResult, AppState};

use super::thread::SendMessage;

/// Live thread. Pushes the full message list on every change and accepts
/// `{"text": ...}` frames as sends.
#[debug_handler(state = AppState)]
pub(crate) async fn thread_ws(
    Path(conversation_id): Path<String>,
    State(store): State<Store>,
    session: Session,

    ws: WebSocketUpgrade,
) -> AppResult<Response> {
    let user_id = require_user(&session).await?;
    let mut thread = store.watch_thread(&user_id, &conversation_id).await?;

    Ok(ws.on_upgrade(async move |stream| {
        let (mut sender, mut receiver) = stream.split();

        let mut push_task = tokio::spawn(async move {
            while let Some(snapshot) = thread.next().await {
                let frame = match snapshot.and_then(|messages| json_frame(&messages)) {
                    Ok(frame) => frame,
                    Err(e) => {
                        // the conversation is gone or no longer ours
                        debug!("closing thread socket: {e}");
                        break;
                    }
                };
                if sender.send(frame).await.is_err() {
                    break;
                }
            }
        });

        let mut recv_task = tokio::spawn(async move {
            while let Some(Ok(frame)) = receiver.next().await {
                let ws::Message::Text(text) = frame else {
                    continue;
                };
                let Ok(SendMessage { text }) = serde_json::from_str(text.as_str()) else {
                    continue;
                };

                if let Err(e) = store.send_message(&user_id, &conversation_id, &text).await {
                    warn!("u/{user_id} could not send to c/{conversation_id}: {e}");
                }
            }
        });

        tokio::select! {
            _ = &mut push_task => recv_task.abort(),
            _ = &mut recv_task => push_task.abort(),
        };
    }))
}

/// Live inbox for the signed-in user.
#[debug_handler(state = AppState)]
pub(crate) async fn inbox_ws(
    State(store): State<Store>,
    session: Session,

    ws: WebSocketUpgrade,
) -> AppResult<Response> {
    let user_id = require_user(&session).await?;
    let mut inbox = store.watch_inbox(&user_id);

    Ok(ws.on_upgrade(async move |stream| {
        let (mut sender, mut receiver) = stream.split();

        let mut push_task = tokio::spawn(async move {
            while let Some(snapshot) = inbox.next().await {
                let frame = match snapshot.and_then(|entries| json_frame(&entries)) {
                    Ok(frame) => frame,
                    Err(e) => {
                        warn!("inbox refresh for u/{user_id} failed: {e}");
                        continue;
                    }
                };
                if sender.send(frame).await.is_err() {
                    break;
                }
            }
        });

        let mut recv_task = tokio::spawn(async move {
            while let Some(Ok(_)) = receiver.next().await {}
        });

        tokio::select! {
            _ = &mut push_task => recv_task.abort(),
            _ = &mut recv_task => push_task.abort(),
        };
    }))
}
