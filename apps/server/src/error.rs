use std::collections::BTreeMap;

use axum::{
    extract::rejection::{JsonRejection, PathRejection, QueryRejection},
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use chrono::{DateTime, Utc};
use purchasefx_exchange_rates::ExchangeRateError;
use serde::Serialize;
use thiserror::Error;

const INTERNAL_ERROR_MESSAGE: &str = "An unexpected error occurred";

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("{0}")]
    ExchangeRate(#[from] ExchangeRateError),
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    BadRequest(String),
    /// Field-level validation failures, keyed by field name.
    #[error("Validation failed")]
    Validation(BTreeMap<String, String>),
}

#[derive(Serialize)]
struct ErrorBody {
    status: u16,
    error: String,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<BTreeMap<String, String>>,
    timestamp: DateTime<Utc>,
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            ApiError::ExchangeRate(e) => match e {
                ExchangeRateError::RateLimitExceeded { .. } => StatusCode::TOO_MANY_REQUESTS,
                ExchangeRateError::RateNotFound { .. } => StatusCode::NOT_FOUND,
                ExchangeRateError::UpstreamTransient { .. } => StatusCode::SERVICE_UNAVAILABLE,
                ExchangeRateError::UpstreamFatal { .. } => StatusCode::BAD_GATEWAY,
                ExchangeRateError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::BadRequest(_) | ApiError::Validation(_) => StatusCode::BAD_REQUEST,
        }
    }
}

/// `TOO_MANY_REQUESTS` style name for a status.
fn status_name(status: StatusCode) -> String {
    status
        .canonical_reason()
        .unwrap_or("UNKNOWN")
        .to_ascii_uppercase()
        .replace([' ', '-'], "_")
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();

        let retry_after = match &self {
            ApiError::ExchangeRate(ExchangeRateError::RateLimitExceeded { retry_after_secs }) => {
                Some(*retry_after_secs)
            }
            _ => None,
        };

        let message = if status == StatusCode::INTERNAL_SERVER_ERROR {
            tracing::error!(error = %self, "Unexpected error");
            INTERNAL_ERROR_MESSAGE.to_string()
        } else {
            if status.is_server_error() {
                tracing::warn!(error = %self, "Upstream rate service failure");
            }
            self.to_string()
        };

        let details = match self {
            ApiError::Validation(details) => Some(details),
            _ => None,
        };

        let body = Json(ErrorBody {
            status: status.as_u16(),
            error: status_name(status),
            message,
            details,
            timestamp: Utc::now(),
        });

        let mut response = (status, body).into_response();
        if let Some(secs) = retry_after {
            response
                .headers_mut()
                .insert(header::RETRY_AFTER, HeaderValue::from(secs));
        }
        response
    }
}

pub type ApiResult<T> = Result<T, ApiError>;

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;
    use chrono::NaiveDate;
    use purchasefx_exchange_rates::RateWindow;

    async fn body_json(response: Response) -> serde_json::Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn rate_limit_maps_to_429_with_retry_after() {
        let response =
            ApiError::from(ExchangeRateError::RateLimitExceeded { retry_after_secs: 42 })
                .into_response();
        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(response.headers()[header::RETRY_AFTER], "42");

        let body = body_json(response).await;
        assert_eq!(body["status"], 429);
        assert_eq!(body["error"], "TOO_MANY_REQUESTS");
    }

    #[tokio::test]
    async fn not_found_rate_keeps_message() {
        let window = RateWindow::ending_on(NaiveDate::from_ymd_opt(2024, 1, 15).unwrap(), 6);
        let response = ApiError::from(ExchangeRateError::RateNotFound {
            currency: "Euro".to_string(),
            window,
        })
        .into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let body = body_json(response).await;
        assert_eq!(
            body["message"],
            "No exchange rate available for currency 'Euro' within the allowed lookup window (2023-07-15 → 2024-01-15)"
        );
        assert!(body.get("details").is_none());
    }

    #[tokio::test]
    async fn upstream_errors_map_to_gateway_statuses() {
        let transient = ApiError::from(ExchangeRateError::UpstreamTransient {
            message: "HTTP 503".to_string(),
        })
        .into_response();
        assert_eq!(transient.status(), StatusCode::SERVICE_UNAVAILABLE);

        let fatal = ApiError::from(ExchangeRateError::UpstreamFatal {
            status: Some(400),
            message: "HTTP 400".to_string(),
        })
        .into_response();
        assert_eq!(fatal.status(), StatusCode::BAD_GATEWAY);
    }

    #[tokio::test]
    async fn internal_errors_are_opaque() {
        let response = ApiError::from(ExchangeRateError::Internal(
            "Conversion overflow".to_string(),
        ))
        .into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = body_json(response).await;
        assert_eq!(body["message"], INTERNAL_ERROR_MESSAGE);
    }

    #[tokio::test]
    async fn validation_carries_details() {
        let mut details = BTreeMap::new();
        details.insert("description".to_string(), "must not be blank".to_string());
        let response = ApiError::Validation(details).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let body = body_json(response).await;
        assert_eq!(body["message"], "Validation failed");
        assert_eq!(body["details"]["description"], "must not be blank");
    }
}
