use axum::{debug_handler, extract::{Path, State}, http::StatusCode, Json};
use serde::{Deserialize, Serialize};
use tower_sessions::Session;

use crate::{
    models::{Conversation, Listing, Message, SellerCard},
    session::require_user,
    store::Store,
    AppError, AppResult, AppState,
};

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct Thread {
    conversation: Conversation,
    listing: Option<Listing>,
    other_participant: Option<SellerCard>,
    messages: Vec<Message>,
}

#[derive(Deserialize)]
pub(crate) struct SendMessage {
    pub(crate) text: String,
}

#[debug_handler(state = AppState)]
pub(crate) async fn thread(
    Path(conversation_id): Path<String>,
    State(store): State<Store>,
    session: Session,
) -> AppResult<Json<Thread>> {
    let user_id = require_user(&session).await?;

    let conversation = store.conversation(&user_id, &conversation_id).await?;
    let messages = store.messages(&user_id, &conversation_id).await?;
    let listing = store.find_listing(&conversation.listing_id).await?;
    let other_participant = match conversation.other_participant(&user_id) {
        Some(other_id) => match store.user(other_id).await {
            Ok(user) => Some(SellerCard::from(user)),
            Err(AppError::NotFound(_)) => None,
            Err(e) => return Err(e),
        },
        None => None,
    };

    Ok(Json(Thread {
        conversation,
        listing,
        other_participant,
        messages,
    }))
}

#[debug_handler(state = AppState)]
pub(crate) async fn send(
    Path(conversation_id): Path<String>,
    State(store): State<Store>,
    session: Session,

    Json(SendMessage { text }): Json<SendMessage>,
) -> AppResult<(StatusCode, Json<Message>)> {
    let user_id = require_user(&session).await?;
    let message = store.send_message(&user_id, &conversation_id, &text).await?;

    Ok((StatusCode::CREATED, Json(message)))
}

#[debug_handler(state = AppState)]
pub(crate) async fn delete(
    Path(conversation_id): Path<String>,
    State(store): State<Store>,
    session: Session,
) -> AppResult<StatusCode> {
    let user_id = require_user(&session).await?;
    store.delete_conversation(&user_id, &conversation_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
