pub mod handlers;
pub mod middleware;
pub mod state;

use axum::{
    routing::{get, patch, post},
    Router,
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::realtime::socket;
use state::AppState;

pub fn create_app(state: AppState) -> Router {
    Router::new()
        // Root and health endpoints
        .route("/", get(handlers::root::root))
        .route("/health", get(handlers::root::health_check))
        // Realtime channel (token-authenticated at connect time)
        .route("/ws", get(socket::ws_handler))
        // API routes
        .nest("/api", api_routes(state.clone()))
        // Add state to the router
        .with_state(state)
        // Middleware
        .layer(CorsLayer::permissive()) // Configure properly for production
        .layer(TraceLayer::new_for_http())
}

fn api_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/pricing", get(handlers::pricing::list))
        .nest("/payments", payment_routes(state.clone()))
        .nest("/purchases", purchase_routes(state))
}

fn payment_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/", post(handlers::payments::create))
        .route("/:id/status", get(handlers::payments::status))
        .route_layer(axum::middleware::from_fn_with_state(
            state,
            middleware::auth::require_auth,
        ))
        // Gateway webhook: the provider cannot authenticate, so this route
        // is added after the auth layer to stay outside it.
        .route("/webhook", post(handlers::payments::webhook))
}

fn purchase_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/", post(handlers::purchases::create))
        .route("/me", get(handlers::purchases::my_purchases))
        .route_layer(axum::middleware::from_fn_with_state(
            state.clone(),
            middleware::auth::require_auth,
        ))
        .merge(
            Router::new()
                .route("/user/:user_id", get(handlers::purchases::list_by_user))
                .route("/:id/status", patch(handlers::purchases::update_status))
                .route_layer(axum::middleware::from_fn_with_state(
                    state,
                    middleware::auth::require_admin,
                )),
        )
}
