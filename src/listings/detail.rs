use axum::{debug_handler, extract::{Path, State}, Json};
use serde::Serialize;
use tower_sessions::Session;

use crate::{
    models::{Listing, SellerCard},
    render_markdown,
    session::current_user_id,
    store::Store,
    AppError, AppResult, AppState,
};

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ListingDetail {
    listing: Listing,
    seller: Option<SellerCard>,
    description_html: String,
    is_seller: bool,
    /// Whether to offer "message seller".
    can_message: bool,
}

#[debug_handler(state = AppState)]
pub(crate) async fn listing(
    Path(listing_id): Path<String>,
    State(store): State<Store>,
    session: Session,
) -> AppResult<Json<ListingDetail>> {
    let viewer = current_user_id(&session).await?;
    let listing = store.record_view(viewer.as_deref(), &listing_id).await?;

    let seller = match store.user(&listing.seller_id).await {
        Ok(user) => Some(SellerCard::from(user)),
        Err(AppError::NotFound(_)) => None,
        Err(e) => return Err(e),
    };

    let is_seller = viewer.as_deref() == Some(listing.seller_id.as_str());
    let can_message = viewer.is_some() && !is_seller && listing.is_active();

    Ok(Json(ListingDetail {
        description_html: render_markdown(&listing.description),
        listing,
        seller,
        is_seller,
        can_message,
    }))
}
