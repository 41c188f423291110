use tower_sessions::Session;

use crate::{AppError, AppResult};

pub const USER_ID: &str = "user_id";

/// The signed-in user's id, if any.
pub async fn current_user_id(session: &Session) -> AppResult<Option<String>> {
    Ok(session.get::<String>(USER_ID).await?)
}

pub async fn require_user(session: &Session) -> AppResult<String> {
    current_user_id(session).await?.ok_or(AppError::Unauthenticated)
}
