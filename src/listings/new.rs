use axum::{debug_handler, extract::State, http::StatusCode, Json};
use tower_sessions::Session;

use crate::{models::{Listing, NewListing}, session::require_user, store::Store, AppResult, AppState};

#[debug_handler(state = AppState)]
pub(crate) async fn new_listing(
    State(store): State<Store>,
    session: Session,

    Json(new): Json<NewListing>,
) -> AppResult<(StatusCode, Json<Listing>)> {
    let seller_id = require_user(&session).await?;
    let listing = store.create_listing(&seller_id, new).await?;

    Ok((StatusCode::CREATED, Json(listing)))
}
