//! Binds a session to a profile. Credential checks live with the identity
//! provider; the rest of the crate only ever asks "who is signed in".

mod login;
mod logout;
mod signup;

use axum::{routing::{get, post}, Router};

use crate::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/signup", post(signup::signup))
        .route("/login", post(login::login))
        .route("/logout", get(logout::logout))
}
