use axum::{debug_handler, extract::{Path, State}, http::StatusCode, Json};
use tower_sessions::Session;

use crate::{models::Listing, session::require_user, store::Store, AppResult, AppState};

#[debug_handler(state = AppState)]
pub(crate) async fn mark_sold(
    Path(listing_id): Path<String>,
    State(store): State<Store>,
    session: Session,
) -> AppResult<Json<Listing>> {
    let user_id = require_user(&session).await?;
    Ok(Json(store.mark_sold(&user_id, &listing_id).await?))
}

#[debug_handler(state = AppState)]
pub(crate) async fn delete(
    Path(listing_id): Path<String>,
    State(store): State<Store>,
    session: Session,
) -> AppResult<StatusCode> {
    let user_id = require_user(&session).await?;
    store.delete_listing(&user_id, &listing_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
