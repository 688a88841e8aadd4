//! A minimal Identity Toolkit (Firebase Auth) REST emulator: enough of
//! `accounts:signUp` / `:signInWithPassword` / `:lookup` / `:delete` /
//! `:update` for a client pointed at `FIREBASE_AUTH_EMULATOR_HOST` to
//! exercise email/password auth against an in-memory user store.

mod handlers;
mod store;
mod token;

use std::sync::Arc;

use axum::routing::post;
use axum::Router;

pub use store::UserStore;

/// Build the Identity Toolkit router over a shared user store.
pub fn router(store: Arc<UserStore>) -> Router {
    Router::new()
        .route(
            "/identitytoolkit.googleapis.com/v1/accounts:signUp",
            post(handlers::sign_up),
        )
        .route(
            "/identitytoolkit.googleapis.com/v1/accounts:signInWithPassword",
            post(handlers::sign_in_with_password),
        )
        .route(
            "/identitytoolkit.googleapis.com/v1/accounts:lookup",
            post(handlers::lookup),
        )
        .route(
            "/identitytoolkit.googleapis.com/v1/accounts:delete",
            post(handlers::delete),
        )
        .route(
            "/identitytoolkit.googleapis.com/v1/accounts:update",
            post(handlers::update),
        )
        .with_state(store)
}
