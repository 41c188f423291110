mod contact;
mod inbox;
mod thread;
mod ws;

use axum::{routing::{get, post}, Router};

use crate::AppState;

pub use contact::open_thread;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(inbox::inbox))
        .route("/ws", get(ws::inbox_ws))
        .route("/contact", post(contact::contact))
        .route(
            "/{conversation_id}",
            get(thread::thread).post(thread::send).delete(thread::delete),
        )
        .route("/{conversation_id}/ws", get(ws::thread_ws))
}
