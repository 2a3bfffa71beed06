use std::sync::Arc;

use axum::{
    extract::{rejection::QueryRejection, Query, State},
    routing::get,
    Json, Router,
};

use crate::{
    error::{ApiError, ApiResult},
    main_lib::AppState,
    models::{ExchangeRateQuery, ExchangeRateResponse},
};

/// Rate that applied to a purchase of `currency` made on `date`.
async fn get_exchange_rate(
    State(state): State<Arc<AppState>>,
    query: Result<Query<ExchangeRateQuery>, QueryRejection>,
) -> ApiResult<Json<ExchangeRateResponse>> {
    let Query(query) = query?;
    let currency = query
        .currency
        .map(|c| c.trim().to_string())
        .filter(|c| !c.is_empty())
        .ok_or_else(|| ApiError::BadRequest("Query parameter 'currency' is required".into()))?;
    let date = query
        .date
        .ok_or_else(|| ApiError::BadRequest("Query parameter 'date' is required".into()))?;

    let quote = state.exchange_rates.resolve_rate(&currency, date).await?;
    let window = state.exchange_rates.window_for(date);
    Ok(Json(ExchangeRateResponse::new(currency, date, quote, window)))
}

pub fn router() -> Router<Arc<AppState>> {
    Router::new().route("/exchange-rates", get(get_exchange_rate))
}
