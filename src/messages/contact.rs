use axum::{debug_handler, extract::State, Json};
use serde::{Deserialize, Serialize};
use tower_sessions::Session;

use crate::{models::Conversation, session::require_user, store::Store, AppError, AppResult, AppState};

#[derive(Deserialize)]
pub(crate) struct ContactRequest {
    listing_id: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ContactResponse {
    conversation_id: String,
}

/// The "message seller" action: `viewer`'s thread with the seller of
/// `listing_id`, opened on first contact.
///
/// Sellers cannot message themselves and sold listings take no new contact.
pub async fn open_thread(store: &Store, viewer: &str, listing_id: &str) -> AppResult<Conversation> {
    let listing = store.listing(listing_id).await?;

    if listing.seller_id == viewer {
        return Err(AppError::bad_request("this is your own listing"));
    }
    if !listing.is_active() {
        return Err(AppError::Conflict("this listing has been sold".to_owned()));
    }

    store.resolve_conversation(&listing.id, viewer, &listing.seller_id).await
}

#[debug_handler(state = AppState)]
pub(crate) async fn contact(
    State(store): State<Store>,
    session: Session,

    Json(ContactRequest { listing_id }): Json<ContactRequest>,
) -> AppResult<Json<ContactResponse>> {
    let user_id = require_user(&session).await?;
    let conversation = open_thread(&store, &user_id, &listing_id).await?;

    Ok(Json(ContactResponse { conversation_id: conversation.id }))
}
