use crate::api::error::ApiError;
use crate::api::state::AppState;
use crate::throttle::Route;
use axum::extract::{ConnectInfo, Request, State};
use axum::http::header::AUTHORIZATION;
use axum::http::HeaderValue;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use std::net::SocketAddr;
use uuid::Uuid;

pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Rejects the request with 429 once its route budget for this client is spent
pub async fn throttle(State(state): State<AppState>, request: Request, next: Next) -> Response {
    let route = Route::from_path(request.uri().path());
    let client = client_identity(&request);

    if !state.limiter.check(route, &client).await {
        tracing::warn!("Rate limit exceeded on {} route", route);
        return ApiError::too_many_requests("Rate limit exceeded").into_response();
    }

    next.run(request).await
}

/// Echoes the caller's `X-Request-Id`, or assigns a fresh one
pub async fn request_id(request: Request, next: Next) -> Response {
    let id = request
        .headers()
        .get(REQUEST_ID_HEADER)
        .cloned()
        .or_else(|| HeaderValue::from_str(&Uuid::new_v4().to_string()).ok());

    let mut response = next.run(request).await;
    if let Some(id) = id {
        response.headers_mut().insert(REQUEST_ID_HEADER, id);
    }
    response
}

/// Who a request is counted against: its credentials if any, else its peer address
fn client_identity(request: &Request) -> String {
    if let Some(auth) = request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .filter(|value| !value.is_empty())
    {
        return auth.to_string();
    }

    request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip().to_string())
        .unwrap_or_else(|| "unknown".to_string())
}
