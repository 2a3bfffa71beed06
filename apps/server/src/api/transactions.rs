use std::sync::Arc;

use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection, QueryRejection},
        Path, Query, State,
    },
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use uuid::Uuid;

use crate::{
    error::{ApiError, ApiResult},
    main_lib::AppState,
    models::{
        ConvertQuery, ConvertedTransactionResponse, TransactionCreatedResponse,
        TransactionRequest,
    },
};

async fn create_transaction(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<TransactionRequest>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<TransactionCreatedResponse>)> {
    let Json(payload) = payload?;
    let new = payload.validate().map_err(ApiError::Validation)?;
    let stored = state.transactions.insert(new);
    tracing::info!(id = %stored.id, transaction_date = %stored.transaction_date, "Transaction stored");
    Ok((StatusCode::CREATED, Json(stored.into())))
}

async fn get_converted_transaction(
    State(state): State<Arc<AppState>>,
    id: Result<Path<Uuid>, PathRejection>,
    query: Result<Query<ConvertQuery>, QueryRejection>,
) -> ApiResult<Json<ConvertedTransactionResponse>> {
    let Path(id) = id?;
    let Query(query) = query?;
    let target_currency = query
        .target_currency
        .map(|c| c.trim().to_string())
        .filter(|c| !c.is_empty())
        .ok_or_else(|| {
            ApiError::BadRequest("Query parameter 'targetCurrency' is required".into())
        })?;

    tracing::debug!(%id, target_currency = %target_currency, "Retrieving converted transaction");

    let transaction = state
        .transactions
        .get(id)
        .ok_or_else(|| ApiError::NotFound(format!("Transaction not found: {}", id)))?;

    let converted = state
        .exchange_rates
        .convert_amount(
            transaction.purchase_amount_usd,
            &target_currency,
            transaction.transaction_date,
        )
        .await?;

    Ok(Json(ConvertedTransactionResponse::new(
        transaction,
        converted,
        target_currency,
    )))
}

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/transactions", post(create_transaction))
        .route(
            "/transactions/{id}/converted",
            get(get_converted_transaction),
        )
}
