use axum::{debug_handler, extract::State, Json};
use tower_sessions::Session;

use crate::{models::{NewUser, UserProfile}, session::USER_ID, store::Store, AppResult, AppState};

#[debug_handler(state = AppState)]
pub(crate) async fn signup(
    State(store): State<Store>,
    session: Session,
    Json(new): Json<NewUser>,
) -> AppResult<Json<UserProfile>> {
    let user = store.create_user(new).await?;

    session.cycle_id().await?;
    session.insert(USER_ID, &user.id).await?;

    Ok(Json(user))
}
