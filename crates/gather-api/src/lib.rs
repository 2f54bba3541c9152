pub mod auth;
pub mod error;
pub mod events;
pub mod images;
pub mod middleware;
pub mod password;
pub mod profile;
pub mod token;

use axum::{
    Router, middleware as axum_middleware,
    routing::{get, post, put},
};

use auth::AppState;
use middleware::require_auth;

/// Build the API router. Public routes carry no identity; everything else
/// sits behind the access gate, which is the only place tokens are parsed.
pub fn router(state: AppState) -> Router {
    let public_routes = Router::new()
        .route("/auth/register", post(auth::register))
        .route("/auth/login", post(auth::login))
        .route("/events", get(events::get_events))
        .route("/events/{id}", get(events::get_event))
        .with_state(state.clone());

    let protected_routes = Router::new()
        .route("/events", post(events::create_event))
        .route(
            "/events/{id}",
            put(events::update_event).delete(events::delete_event),
        )
        .route("/events/save/{id}", post(events::save_event))
        .route("/events/{id}/like", post(events::like_event))
        .route("/events/{id}/interested", post(events::mark_interested))
        .route("/events/{id}/share", post(events::share_event))
        .route(
            "/profile",
            get(profile::get_profile).put(profile::update_profile),
        )
        .route("/profile/password", put(profile::change_password))
        .layer(axum_middleware::from_fn_with_state(
            state.clone(),
            require_auth,
        ))
        .with_state(state);

    Router::new().nest("/api", public_routes.merge(protected_routes))
}
