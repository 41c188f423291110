mod actions;
mod detail;
mod feed;
mod mine;
mod new;

use axum::{routing::{get, post}, Router};

use crate::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(feed::feed))
        .route("/ws", get(feed::feed_ws))
        .route("/trending", get(feed::trending))
        .route("/my-listings", get(mine::my_listings))
        .route("/listings", post(new::new_listing))
        .route("/listings/{listing_id}", get(detail::listing).delete(actions::delete))
        .route("/listings/{listing_id}/sold", post(actions::mark_sold))
}
