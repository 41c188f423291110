use axum::{debug_handler, extract::State, Json};
use serde::Serialize;
use tower_sessions::Session;

use crate::{models::Listing, session::require_user, store::Store, AppResult, AppState};

#[derive(Serialize)]
pub(crate) struct MyListings {
    active: Vec<Listing>,
    sold: Vec<Listing>,
}

#[debug_handler(state = AppState)]
pub(crate) async fn my_listings(
    State(store): State<Store>,
    session: Session,
) -> AppResult<Json<MyListings>> {
    let user_id = require_user(&session).await?;

    let (active, sold): (Vec<Listing>, Vec<Listing>) = store
        .listings_by_seller(&user_id)
        .await?
        .into_iter()
        .partition(Listing::is_active);

    Ok(Json(MyListings { active, sold }))
}
