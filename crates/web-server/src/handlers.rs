use crate::{error::AppError, AppState};
use analytics::PortfolioReport;
use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    Json,
};
use core_types::{Account, Instrument, Lot, Transaction};
use executor::{BuyReceipt, SellReceipt};
use rust_decimal::Decimal;
use serde::Deserialize;
use std::sync::Arc;
use uuid::Uuid;

#[derive(Debug, Deserialize)]
pub struct CreateInstrument {
    pub symbol: String,
    pub name: String,
    #[serde(default)]
    pub sector: String,
    pub price: Decimal,
}

#[derive(Debug, Deserialize)]
pub struct UpdatePrice {
    pub price: Decimal,
}

#[derive(Debug, Deserialize)]
pub struct OpenAccount {
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub struct TradeRequest {
    pub symbol: String,
    pub quantity: i64,
    pub price: Decimal,
}

/// # GET /api/instruments
pub async fn list_instruments(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<Instrument>>, AppError> {
    Ok(Json(state.instruments.list().await?))
}

/// # POST /api/instruments
pub async fn create_instrument(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<CreateInstrument>, JsonRejection>,
) -> Result<(StatusCode, Json<Instrument>), AppError> {
    let Json(body) = payload?;
    let instrument = state
        .instruments
        .register(&body.symbol, &body.name, &body.sector, body.price)
        .await?;
    Ok((StatusCode::CREATED, Json(instrument)))
}

/// # GET /api/instruments/:symbol
pub async fn get_instrument(
    Path(symbol): Path<String>,
    State(state): State<Arc<AppState>>,
) -> Result<Json<Instrument>, AppError> {
    Ok(Json(state.instruments.get(&symbol).await?))
}

/// # PUT /api/instruments/:symbol/price
/// The price-feed entry point. Cached account totals are not touched.
pub async fn update_price(
    Path(symbol): Path<String>,
    State(state): State<Arc<AppState>>,
    payload: Result<Json<UpdatePrice>, JsonRejection>,
) -> Result<Json<Instrument>, AppError> {
    let Json(body) = payload?;
    Ok(Json(state.instruments.update_price(&symbol, body.price).await?))
}

/// # POST /api/accounts
pub async fn open_account(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<OpenAccount>, JsonRejection>,
) -> Result<(StatusCode, Json<Account>), AppError> {
    let Json(body) = payload?;
    let account = state.portfolio.open_account(&body.name).await?;
    Ok((StatusCode::CREATED, Json(account)))
}

/// # GET /api/accounts/:account_id
pub async fn get_account(
    Path(account_id): Path<Uuid>,
    State(state): State<Arc<AppState>>,
) -> Result<Json<Account>, AppError> {
    Ok(Json(state.portfolio.account(account_id).await?))
}

/// # POST /api/accounts/:account_id/buy
pub async fn buy(
    Path(account_id): Path<Uuid>,
    State(state): State<Arc<AppState>>,
    payload: Result<Json<TradeRequest>, JsonRejection>,
) -> Result<Json<BuyReceipt>, AppError> {
    let Json(order) = payload?;
    let receipt = state
        .executor
        .buy(account_id, &order.symbol, order.quantity, order.price)
        .await?;
    Ok(Json(receipt))
}

/// # POST /api/accounts/:account_id/sell
pub async fn sell(
    Path(account_id): Path<Uuid>,
    State(state): State<Arc<AppState>>,
    payload: Result<Json<TradeRequest>, JsonRejection>,
) -> Result<Json<SellReceipt>, AppError> {
    let Json(order) = payload?;
    let receipt = state
        .executor
        .sell(account_id, &order.symbol, order.quantity, order.price)
        .await?;
    Ok(Json(receipt))
}

/// # POST /api/accounts/:account_id/revalue
pub async fn revalue(
    Path(account_id): Path<Uuid>,
    State(state): State<Arc<AppState>>,
) -> Result<Json<Account>, AppError> {
    Ok(Json(state.executor.revalue(account_id).await?))
}

/// # GET /api/accounts/:account_id/positions
pub async fn positions(
    Path(account_id): Path<Uuid>,
    State(state): State<Arc<AppState>>,
) -> Result<Json<PortfolioReport>, AppError> {
    Ok(Json(state.portfolio.positions(account_id).await?))
}

/// # GET /api/accounts/:account_id/transactions
/// Newest first.
pub async fn transactions(
    Path(account_id): Path<Uuid>,
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<Transaction>>, AppError> {
    Ok(Json(state.portfolio.transaction_history(account_id).await?))
}

/// # GET /api/accounts/:account_id/lots
pub async fn lots(
    Path(account_id): Path<Uuid>,
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<Lot>>, AppError> {
    Ok(Json(state.portfolio.lots(account_id).await?))
}
