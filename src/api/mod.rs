//! HTTP API over the orchestration core
//!
//! This module is `pub` so integration tests can build the router directly
//! without starting the binary.

mod error;
mod extract;
mod handlers;
mod middleware;
mod state;

pub use error::ApiError;
pub use extract::AuthenticatedOwner;
pub use handlers::{
    HealthResponse, JobAccepted, LoginRequest, LoginResponse, ReadinessResponse,
    ScheduleDeleted, SERVICE_NAME,
};
pub use middleware::REQUEST_ID_HEADER;
pub use state::AppState;

use axum::http::header::{
    HeaderName, HeaderValue, REFERRER_POLICY, X_CONTENT_TYPE_OPTIONS, X_FRAME_OPTIONS,
};
use axum::routing::{delete, get, post};
use axum::Router;
use tower_http::set_header::SetResponseHeaderLayer;
use tower_http::trace::TraceLayer;

/// Builds the application router
///
/// Every route is throttled, traced and carries the security headers.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::health))
        .route("/ops/readiness", get(handlers::readiness))
        .route("/auth/login", post(handlers::login))
        .route("/scrape-aggregate", post(handlers::scrape_aggregate))
        .route(
            "/jobs/scrape",
            post(handlers::submit_job).get(handlers::list_jobs),
        )
        .route("/jobs/scrape/{job_id}", get(handlers::get_job))
        .route(
            "/crawler/schedules",
            post(handlers::create_schedule).get(handlers::list_schedules),
        )
        .route(
            "/crawler/schedules/{schedule_id}",
            delete(handlers::delete_schedule),
        )
        .fallback(handlers::not_found)
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            middleware::throttle,
        ))
        .layer(axum::middleware::from_fn(middleware::request_id))
        .layer(security_header(X_CONTENT_TYPE_OPTIONS, "nosniff"))
        .layer(security_header(X_FRAME_OPTIONS, "DENY"))
        .layer(security_header(
            REFERRER_POLICY,
            "strict-origin-when-cross-origin",
        ))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn security_header(name: HeaderName, value: &'static str) -> SetResponseHeaderLayer<HeaderValue> {
    SetResponseHeaderLayer::overriding(name, HeaderValue::from_static(value))
}
