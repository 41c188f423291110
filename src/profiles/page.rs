use axum::{debug_handler, extract::{Path, State}, Json};
use serde::Serialize;
use tower_sessions::Session;

use crate::{models::{Listing, UserProfile}, session::require_user, store::Store, AppResult, AppState};

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct PublicProfile {
    id: String,
    name: String,
    avatar_url: String,
    active_listings: Vec<Listing>,
}

#[debug_handler(state = AppState)]
pub(crate) async fn me(
    State(store): State<Store>,
    session: Session,
) -> AppResult<Json<UserProfile>> {
    let user_id = require_user(&session).await?;
    Ok(Json(store.user(&user_id).await?))
}

/// What anyone may see about a seller.
#[debug_handler(state = AppState)]
pub(crate) async fn profile(
    Path(user_id): Path<String>,
    State(store): State<Store>,
) -> AppResult<Json<PublicProfile>> {
    let user = store.user(&user_id).await?;
    let active_listings = store
        .listings_by_seller(&user.id)
        .await?
        .into_iter()
        .filter(Listing::is_active)
        .collect();

    Ok(Json(PublicProfile {
        id: user.id,
        name: user.name,
        avatar_url: user.avatar_url,
        active_listings,
    }))
}
