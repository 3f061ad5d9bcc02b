use axum::{
    Router,
    http::{Method, header},
    routing::{get, post},
};
use tower::ServiceBuilder;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use mailcode_core::health::{healthz, readyz};
use mailcode_core::middleware::{propagate_request_id_layer, request_id_layer};

use crate::handlers::otc::{send_code, verify_code};
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    // The login page is served from a different origin.
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::POST])
        .allow_headers([header::CONTENT_TYPE]);

    Router::new()
        // Health
        .route("/healthz", get(healthz))
        .route("/readyz", get(readyz))
        // One-time codes
        .route("/send-otp", post(send_code))
        .route("/verify-otp", post(verify_code))
        .layer(
            ServiceBuilder::new()
                .layer(request_id_layer())
                .layer(TraceLayer::new_for_http())
                .layer(propagate_request_id_layer())
                .layer(cors),
        )
        .with_state(state)
}
