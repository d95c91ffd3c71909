//! Position, order and chain endpoints

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{error, info};
use unipredict_core::{Blockchain, Side, TradingError};

use super::{error_response, parse_param, platform_filter, platform_name, timeout_from_ms, FanOutResponse};
use crate::AppState;

const DEFAULT_CONFIRM_TIMEOUT_SECS: u64 = 60;
const MAX_CONFIRM_TIMEOUT_SECS: u64 = 600;

#[derive(Debug, Deserialize)]
pub struct AccountQuery {
    pub platform: Option<String>,
    pub timeout_ms: Option<u64>,
}

/// Request body for opening a position
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatePositionRequest {
    pub platform: String,
    pub market_id: String,
    pub side: Side,
    pub amount: Decimal,
    pub max_price: Option<Decimal>,
}

#[derive(Debug, Deserialize)]
pub struct CloseQuery {
    /// Shares to sell; the whole position when absent
    pub shares: Option<Decimal>,
}

#[derive(Debug, Serialize)]
pub struct TransactionResponse {
    pub platform: String,
    pub transaction: String,
}

#[derive(Debug, Deserialize)]
pub struct BalanceQuery {
    /// Token contract or mint; native balance when absent
    pub token: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct BalanceResponse {
    pub blockchain: Blockchain,
    pub address: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
    pub balance: Decimal,
}

#[derive(Debug, Deserialize)]
pub struct ConfirmQuery {
    pub timeout_secs: Option<u64>,
}

#[derive(Debug, Serialize)]
pub struct ConfirmResponse {
    pub blockchain: Blockchain,
    pub transaction: String,
    pub confirmed: bool,
}

/// Create trading routes
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/positions", post(create_position))
        .route("/positions/{address}", get(get_positions))
        .route("/positions/{platform}/{id}/close", post(close_position))
        .route("/orders/{address}", get(get_orders))
        .route("/chains/{blockchain}/balance/{address}", get(get_balance))
        .route("/chains/{blockchain}/tx/{tx}/confirm", get(wait_for_confirmation))
}

async fn get_positions(
    State(state): State<AppState>,
    Path(address): Path<String>,
    Query(params): Query<AccountQuery>,
) -> impl IntoResponse {
    let platform = platform_filter(&params.platform);
    match state
        .router
        .get_positions(&address, platform.as_deref(), timeout_from_ms(params.timeout_ms))
        .await
    {
        Ok(merged) => (StatusCode::OK, Json(FanOutResponse::from(merged))).into_response(),
        Err(e) => {
            error!("Failed to get positions for {}: {}", address, e);
            error_response(&e)
        }
    }
}

async fn get_orders(
    State(state): State<AppState>,
    Path(address): Path<String>,
    Query(params): Query<AccountQuery>,
) -> impl IntoResponse {
    let platform = platform_filter(&params.platform);
    match state
        .router
        .get_orders(&address, platform.as_deref(), timeout_from_ms(params.timeout_ms))
        .await
    {
        Ok(merged) => (StatusCode::OK, Json(FanOutResponse::from(merged))).into_response(),
        Err(e) => {
            error!("Failed to get orders for {}: {}", address, e);
            error_response(&e)
        }
    }
}

async fn create_position(
    State(state): State<AppState>,
    Json(request): Json<CreatePositionRequest>,
) -> impl IntoResponse {
    info!("Create position request: {:?}", request);

    if request.amount <= Decimal::ZERO {
        return error_response(&TradingError::invalid_input("amount must be positive"));
    }
    if let Some(max_price) = request.max_price {
        if max_price <= Decimal::ZERO || max_price > Decimal::ONE {
            return error_response(&TradingError::invalid_input("maxPrice must be within (0, 1]"));
        }
    }

    let platform = platform_name(&request.platform);
    match state
        .router
        .create_position(
            &platform,
            &request.market_id,
            request.side,
            request.amount,
            request.max_price,
        )
        .await
    {
        Ok(transaction) => (
            StatusCode::OK,
            Json(TransactionResponse {
                platform: platform.clone(),
                transaction,
            }),
        )
            .into_response(),
        Err(e) => {
            error!("Failed to create position on {}: {}", platform, e);
            error_response(&e)
        }
    }
}

async fn close_position(
    State(state): State<AppState>,
    Path((platform, id)): Path<(String, String)>,
    Query(params): Query<CloseQuery>,
) -> impl IntoResponse {
    if matches!(params.shares, Some(shares) if shares <= Decimal::ZERO) {
        return error_response(&TradingError::invalid_input("shares must be positive"));
    }
    let platform = platform_name(&platform);

    match state.router.close_position(&platform, &id, params.shares).await {
        Ok(transaction) => (StatusCode::OK, Json(TransactionResponse { platform, transaction })).into_response(),
        Err(e) => {
            error!("Failed to close position {} on {}: {}", id, platform, e);
            error_response(&e)
        }
    }
}

async fn get_balance(
    State(state): State<AppState>,
    Path((blockchain, address)): Path<(String, String)>,
    Query(params): Query<BalanceQuery>,
) -> impl IntoResponse {
    let blockchain = match parse_param::<Blockchain>(&blockchain, "blockchain") {
        Ok(blockchain) => blockchain,
        Err(response) => return response,
    };

    match state
        .router
        .get_balance(blockchain, &address, params.token.as_deref())
        .await
    {
        Ok(balance) => (
            StatusCode::OK,
            Json(BalanceResponse {
                blockchain,
                address,
                token: params.token,
                balance,
            }),
        )
            .into_response(),
        Err(e) => {
            error!("Failed to get {} balance for {}: {}", blockchain, address, e);
            error_response(&e)
        }
    }
}

async fn wait_for_confirmation(
    State(state): State<AppState>,
    Path((blockchain, tx)): Path<(String, String)>,
    Query(params): Query<ConfirmQuery>,
) -> impl IntoResponse {
    let blockchain = match parse_param::<Blockchain>(&blockchain, "blockchain") {
        Ok(blockchain) => blockchain,
        Err(response) => return response,
    };
    let timeout = Duration::from_secs(
        params
            .timeout_secs
            .unwrap_or(DEFAULT_CONFIRM_TIMEOUT_SECS)
            .min(MAX_CONFIRM_TIMEOUT_SECS),
    );

    match state.router.wait_for_confirmation(blockchain, &tx, timeout).await {
        Ok(confirmed) => (
            StatusCode::OK,
            Json(ConfirmResponse {
                blockchain,
                transaction: tx,
                confirmed,
            }),
        )
            .into_response(),
        Err(e) => {
            error!("Failed waiting for {} tx {}: {}", blockchain, tx, e);
            error_response(&e)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::routes::test_support::{empty_state, hedgehog_state, send};
    use rust_decimal_macros::dec;

    #[test]
    fn test_create_request_accepts_camel_case() {
        let request: CreatePositionRequest = serde_json::from_str(
            r#"{"platform":"polymarket","marketId":"m1","side":"yes","amount":"25","maxPrice":"0.55"}"#,
        )
        .unwrap();
        assert_eq!(request.market_id, "m1");
        assert_eq!(request.side, Side::Yes);
        assert_eq!(request.amount, dec!(25));
        assert_eq!(request.max_price, Some(dec!(0.55)));
    }

    #[tokio::test]
    async fn test_unknown_blockchain_is_bad_request() {
        let (status, body) = send(empty_state(), "GET", "/api/chains/tron/balance/0xabc").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], "invalid_input");
    }

    #[tokio::test]
    async fn test_unconnected_chain_is_unavailable() {
        let (status, body) = send(empty_state(), "GET", "/api/chains/solana/balance/abc").await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body["code"], "not_connected");
    }

    #[tokio::test]
    async fn test_close_on_unknown_platform() {
        let (status, body) = send(empty_state(), "POST", "/api/positions/augur/p1/close?shares=2").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["code"], "platform_not_found");
    }

    #[tokio::test]
    async fn test_trade_platform_name_is_case_insensitive() {
        // Reaches the adapter, which cannot place orders, instead of 404
        let (status, body) = send(hedgehog_state(), "POST", "/api/positions/HedgeHog/p1/close").await;
        assert_eq!(status, StatusCode::NOT_IMPLEMENTED);
        assert_eq!(body["code"], "unsupported_operation");

        let (status, _) = send(hedgehog_state(), "POST", "/api/positions/hedgehog/p1/close").await;
        assert_eq!(status, StatusCode::NOT_IMPLEMENTED);
    }

    #[tokio::test]
    async fn test_positions_fan_out_over_nothing() {
        let (status, body) = send(empty_state(), "GET", "/api/positions/0xabc").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["items"].as_array().map(|i| i.len()), Some(0));
    }
}
