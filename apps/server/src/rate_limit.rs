use std::{net::SocketAddr, sync::Arc};

use axum::{
    body::Body,
    extract::{ConnectInfo, State},
    http::{header::AUTHORIZATION, Request},
    middleware::Next,
    response::Response,
};
use purchasefx_exchange_rates::{rate_limit_key, Admission, ExchangeRateError};

use crate::{error::ApiError, main_lib::AppState};

/// Admit or reject a request before any handler runs.
///
/// Callers are keyed by bearer token when present, otherwise by peer address.
pub async fn enforce_rate_limit(
    State(state): State<Arc<AppState>>,
    request: Request<Body>,
    next: Next,
) -> Result<Response, ApiError> {
    let authorization = request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok());
    let remote = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| *addr);

    let key = rate_limit_key(authorization, remote);
    match state.rate_limiter.admit(&key) {
        Admission::Allowed => Ok(next.run(request).await),
        Admission::Denied { retry_after_secs } => {
            Err(ExchangeRateError::RateLimitExceeded { retry_after_secs }.into())
        }
    }
}
