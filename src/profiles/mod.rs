mod page;

use axum::{routing::get, Router};

use crate::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/me", get(page::me))
        .route("/p/{user_id}", get(page::profile))
}
