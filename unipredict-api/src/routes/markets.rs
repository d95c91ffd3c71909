//! Market discovery endpoints

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{error, info};
use unipredict_core::{MarketQuery, MarketStatus, Side, TradingError};

use super::{error_response, parse_param, platform_filter, platform_name, timeout_from_ms, FanOutResponse};
use crate::AppState;

/// Query parameters for listing markets
#[derive(Debug, Deserialize)]
pub struct ListMarketsQuery {
    /// Filter by platform (a registered name, or all)
    pub platform: Option<String>,
    pub category: Option<String>,
    /// open, closed, resolved or cancelled
    pub status: Option<String>,
    /// Page size requested from each platform
    pub limit: Option<usize>,
    /// Per-platform deadline
    pub timeout_ms: Option<u64>,
}

#[derive(Debug, Deserialize)]
pub struct PriceQuery {
    pub side: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct PriceResponse {
    pub platform: String,
    pub market_id: String,
    pub side: Side,
    pub price: Decimal,
}

#[derive(Debug, Serialize)]
pub struct PlatformsResponse {
    pub platforms: Vec<String>,
    pub count: usize,
}

/// Create market routes
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/platforms", get(list_platforms))
        .route("/markets", get(list_markets))
        .route("/markets/{platform}/{id}", get(get_market))
        .route("/markets/{platform}/{id}/price", get(get_price))
        .route("/markets/{platform}/{id}/orderbook", get(get_orderbook))
}

async fn list_platforms(State(state): State<AppState>) -> impl IntoResponse {
    let platforms: Vec<String> = state.router.list_platforms().into_iter().collect();
    Json(PlatformsResponse {
        count: platforms.len(),
        platforms,
    })
}

/// List markets from one platform, or from all of them
async fn list_markets(
    State(state): State<AppState>,
    Query(params): Query<ListMarketsQuery>,
) -> impl IntoResponse {
    info!("Listing markets with params: {:?}", params);

    let status = match params.status.as_deref() {
        Some(raw) => match parse_param::<MarketStatus>(raw, "status") {
            Ok(status) => Some(status),
            Err(response) => return response,
        },
        None => None,
    };

    let mut query = match params.limit {
        Some(limit) => MarketQuery::with_limit(limit),
        None => MarketQuery::default(),
    };
    query.category = params.category.clone();
    query.status = status;

    let platform = platform_filter(&params.platform);
    match state
        .router
        .get_markets(platform.as_deref(), &query, timeout_from_ms(params.timeout_ms))
        .await
    {
        Ok(merged) => (StatusCode::OK, Json(FanOutResponse::from(merged))).into_response(),
        Err(e) => {
            error!("Failed to list markets: {}", e);
            error_response(&e)
        }
    }
}

async fn get_market(
    State(state): State<AppState>,
    Path((platform, id)): Path<(String, String)>,
) -> impl IntoResponse {
    let platform = platform_name(&platform);
    match state.router.get_market(&id, &platform).await {
        Ok(Some(market)) => (StatusCode::OK, Json(market)).into_response(),
        Ok(None) => error_response(&TradingError::not_found(format!(
            "Market {} not found on {}",
            id, platform
        ))),
        Err(e) => {
            error!("Failed to get market {}/{}: {}", platform, id, e);
            error_response(&e)
        }
    }
}

async fn get_price(
    State(state): State<AppState>,
    Path((platform, id)): Path<(String, String)>,
    Query(params): Query<PriceQuery>,
) -> impl IntoResponse {
    let platform = platform_name(&platform);
    let side = match params.side.as_deref() {
        Some(raw) => match parse_param::<Side>(raw, "side") {
            Ok(side) => side,
            Err(response) => return response,
        },
        None => Side::Yes,
    };

    match state.router.get_price(&platform, &id, side).await {
        Ok(price) => (
            StatusCode::OK,
            Json(PriceResponse {
                platform,
                market_id: id,
                side,
                price,
            }),
        )
            .into_response(),
        Err(e) => {
            error!("Failed to get {} price for {}/{}: {}", side, platform, id, e);
            error_response(&e)
        }
    }
}

async fn get_orderbook(
    State(state): State<AppState>,
    Path((platform, id)): Path<(String, String)>,
) -> impl IntoResponse {
    let platform = platform_name(&platform);
    match state.router.get_orderbook(&platform, &id).await {
        Ok(book) => (StatusCode::OK, Json(book)).into_response(),
        Err(e) => {
            error!("Failed to get orderbook for {}/{}: {}", platform, id, e);
            error_response(&e)
        }
    }
}
