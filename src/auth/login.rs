use axum::{debug_handler, extract::State, Json};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::info;

use crate::{models::UserProfile, session::USER_ID, store::Store, AppError, AppResult, AppState};

#[derive(Deserialize)]
pub(crate) struct LoginRequest {
    email: String,
}

#[debug_handler(state = AppState)]
pub(crate) async fn login(
    State(store): State<Store>,
    session: Session,
    Json(LoginRequest { email }): Json<LoginRequest>,
) -> AppResult<Json<UserProfile>> {
    let Some(user) = store.user_by_email(&email).await? else {
        return Err(AppError::NotFound("account"));
    };

    session.cycle_id().await?;
    session.insert(USER_ID, &user.id).await?;

    info!("welcome u/{}", user.id);
    Ok(Json(user))
}
