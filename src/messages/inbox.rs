use axum::{debug_handler, extract::State, Json};
use tower_sessions::Session;

use crate::{session::require_user, store::{InboxEntry, Store}, AppResult, AppState};

#[debug_handler(state = AppState)]
pub(crate) async fn inbox(
    State(store): State<Store>,
    session: Session,
) -> AppResult<Json<Vec<InboxEntry>>> {
    let user_id = require_user(&session).await?;
    Ok(Json(store.inbox(&user_id).await?))
}
