//! Fundry ledger daemon.
//!
//! Serves the in-memory double-entry [`Ledger`] over HTTP. The whole book of
//! record sits behind one reader-writer lock: postings (deposit, withdraw,
//! transfer, deal completion) take the write side, so a posting validates and
//! commits as a single unit and the check-then-debit race on the balance
//! cannot interleave; queries take the read side and always see committed
//! state.

use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::{Method, StatusCode};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tower_http::cors::{Any, CorsLayer};
use tracing::{info, warn};

use fundry_common::currency::{format_amount, Currency};
use fundry_common::deal::{DealId, DealStatus, FundingDeal};
use fundry_common::error::LedgerError;
use fundry_common::ledger::Ledger;
use fundry_common::wallet::{Transaction, TransactionKind, UserId, Wallet};

pub mod seed;

/// Shared daemon state. The write side of the lock is the posting boundary.
#[derive(Clone, Default)]
pub struct AppState {
    pub ledger: Arc<RwLock<Ledger>>,
}

// ─── API types ───────────────────────────────────────────────────────────────

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct OpenWalletRequest {
    user_id: UserId,
    #[serde(default)]
    currency: Option<Currency>,
    /// Minor units, recorded as an initial deposit entry.
    #[serde(default)]
    opening_balance: Option<i64>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct MovementRequest {
    /// Minor units, positive.
    amount: i64,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    payment_method: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct TransferRequest {
    from_user_id: UserId,
    to_user_id: UserId,
    amount: i64,
    #[serde(default)]
    description: Option<String>,
    /// Optional idempotency reference: replaying a transfer with a known
    /// reference returns the previously posted pair.
    #[serde(default)]
    reference: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreateDealRequest {
    investor_id: UserId,
    entrepreneur_id: UserId,
    amount: i64,
    equity: f64,
    description: String,
}

#[derive(Deserialize)]
struct HistoryQuery {
    #[serde(rename = "type")]
    kind: Option<TransactionKind>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct HealthResponse {
    status: &'static str,
    wallets: usize,
    entries: usize,
    deals: usize,
    balances_consistent: bool,
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
    kind: &'static str,
}

type ApiError = (StatusCode, Json<ErrorResponse>);

fn error_response(err: LedgerError) -> ApiError {
    let status = match &err {
        LedgerError::WalletNotFound(_) | LedgerError::DealNotFound(_) => StatusCode::NOT_FOUND,
        LedgerError::WalletExists(_)
        | LedgerError::InsufficientFunds { .. }
        | LedgerError::CurrencyMismatch { .. }
        | LedgerError::InvalidTransition { .. } => StatusCode::CONFLICT,
        LedgerError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
    };
    warn!("rejected: {err}");
    (
        status,
        Json(ErrorResponse {
            error: err.to_string(),
            kind: err.kind(),
        }),
    )
}

// ─── Wallet handlers ─────────────────────────────────────────────────────────

async fn open_wallet(
    State(state): State<AppState>,
    Json(req): Json<OpenWalletRequest>,
) -> Result<Json<Wallet>, ApiError> {
    let mut ledger = state.ledger.write().await;
    let wallet = ledger
        .open_wallet(
            req.user_id,
            req.currency.unwrap_or_default(),
            req.opening_balance.unwrap_or(0),
        )
        .map_err(error_response)?;
    info!(
        "opened wallet {} for {} with {}",
        wallet.id,
        wallet.user_id,
        format_amount(wallet.balance, &wallet.currency)
    );
    Ok(Json(wallet))
}

async fn get_wallet(
    State(state): State<AppState>,
    Path(user_id): Path<UserId>,
) -> Result<Json<Wallet>, ApiError> {
    let ledger = state.ledger.read().await;
    let wallet = ledger.wallet_by_user(&user_id).map_err(error_response)?;
    Ok(Json(wallet.clone()))
}

async fn deposit(
    State(state): State<AppState>,
    Path(user_id): Path<UserId>,
    Json(req): Json<MovementRequest>,
) -> Result<Json<Transaction>, ApiError> {
    let description = req
        .description
        .unwrap_or_else(|| "Bank transfer deposit".to_string());
    let mut ledger = state.ledger.write().await;
    let tx = ledger
        .deposit(&user_id, req.amount, &description, req.payment_method)
        .map_err(error_response)?;
    info!(
        "posted deposit of {} to {user_id}",
        format_amount(tx.amount, &tx.currency)
    );
    Ok(Json(tx))
}

async fn withdraw(
    State(state): State<AppState>,
    Path(user_id): Path<UserId>,
    Json(req): Json<MovementRequest>,
) -> Result<Json<Transaction>, ApiError> {
    let description = req
        .description
        .unwrap_or_else(|| "Withdrawal to bank account".to_string());
    let mut ledger = state.ledger.write().await;
    let tx = ledger
        .withdraw(&user_id, req.amount, &description, req.payment_method)
        .map_err(error_response)?;
    info!(
        "posted withdrawal of {} from {user_id}",
        format_amount(-tx.amount, &tx.currency)
    );
    Ok(Json(tx))
}

async fn wallet_transactions(
    State(state): State<AppState>,
    Path(user_id): Path<UserId>,
    Query(query): Query<HistoryQuery>,
) -> Result<Json<Vec<Transaction>>, ApiError> {
    let ledger = state.ledger.read().await;
    let mut entries = ledger.entries_for_user(&user_id).map_err(error_response)?;
    if let Some(kind) = query.kind {
        entries.retain(|tx| tx.kind == kind);
    }
    Ok(Json(entries))
}

// ─── Transfer handler ────────────────────────────────────────────────────────

async fn create_transfer(
    State(state): State<AppState>,
    Json(req): Json<TransferRequest>,
) -> Result<Json<(Transaction, Transaction)>, ApiError> {
    let debit_description = req
        .description
        .clone()
        .unwrap_or_else(|| format!("Transfer to {}", req.to_user_id));
    let credit_description = req
        .description
        .unwrap_or_else(|| format!("Transfer from {}", req.from_user_id));

    let mut ledger = state.ledger.write().await;
    let (debit, credit) = ledger
        .transfer(
            &req.from_user_id,
            &req.to_user_id,
            req.amount,
            &debit_description,
            &credit_description,
            req.reference,
        )
        .map_err(error_response)?;
    info!(
        "posted transfer of {} from {} to {} ({})",
        format_amount(credit.amount, &credit.currency),
        req.from_user_id,
        req.to_user_id,
        credit.metadata.reference.as_deref().unwrap_or("-"),
    );
    Ok(Json((debit, credit)))
}

// ─── Deal handlers ───────────────────────────────────────────────────────────

async fn create_deal(
    State(state): State<AppState>,
    Json(req): Json<CreateDealRequest>,
) -> Result<Json<FundingDeal>, ApiError> {
    let mut ledger = state.ledger.write().await;
    let deal = ledger
        .create_deal(
            &req.investor_id,
            &req.entrepreneur_id,
            req.amount,
            req.equity,
            &req.description,
        )
        .map_err(error_response)?;
    info!(
        "created deal {} ({} for {}% equity)",
        deal.id,
        format_amount(deal.amount, &deal.currency),
        deal.equity
    );
    Ok(Json(deal))
}

async fn get_deal(
    State(state): State<AppState>,
    Path(deal_id): Path<DealId>,
) -> Result<Json<FundingDeal>, ApiError> {
    let ledger = state.ledger.read().await;
    let deal = ledger.deal(&deal_id).map_err(error_response)?;
    Ok(Json(deal.clone()))
}

async fn user_deals(
    State(state): State<AppState>,
    Path(user_id): Path<UserId>,
) -> Result<Json<Vec<FundingDeal>>, ApiError> {
    let ledger = state.ledger.read().await;
    // A user without a wallet has no deals either; report it as such.
    ledger.wallet_by_user(&user_id).map_err(error_response)?;
    Ok(Json(ledger.deals_for_user(&user_id)))
}

async fn transition_deal(
    state: AppState,
    deal_id: DealId,
    next: DealStatus,
) -> Result<Json<FundingDeal>, ApiError> {
    let mut ledger = state.ledger.write().await;
    let deal = ledger
        .transition_deal(&deal_id, next)
        .map_err(error_response)?;
    info!("deal {} is now {}", deal.id, deal.status);
    Ok(Json(deal))
}

async fn approve_deal(
    State(state): State<AppState>,
    Path(deal_id): Path<DealId>,
) -> Result<Json<FundingDeal>, ApiError> {
    transition_deal(state, deal_id, DealStatus::Approved).await
}

async fn complete_deal(
    State(state): State<AppState>,
    Path(deal_id): Path<DealId>,
) -> Result<Json<FundingDeal>, ApiError> {
    transition_deal(state, deal_id, DealStatus::Completed).await
}

async fn cancel_deal(
    State(state): State<AppState>,
    Path(deal_id): Path<DealId>,
) -> Result<Json<FundingDeal>, ApiError> {
    transition_deal(state, deal_id, DealStatus::Cancelled).await
}

// ─── Health ──────────────────────────────────────────────────────────────────

async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    let ledger = state.ledger.read().await;
    Json(HealthResponse {
        status: "ok",
        wallets: ledger.wallet_count(),
        entries: ledger.entry_count(),
        deals: ledger.deal_count(),
        balances_consistent: ledger.verify_balances().is_ok(),
    })
}

// ─── Router ──────────────────────────────────────────────────────────────────

pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers(Any);

    Router::new()
        .route("/wallets", post(open_wallet))
        .route("/wallets/{user_id}", get(get_wallet))
        .route("/wallets/{user_id}/deposit", post(deposit))
        .route("/wallets/{user_id}/withdraw", post(withdraw))
        .route("/wallets/{user_id}/transactions", get(wallet_transactions))
        .route("/transfers", post(create_transfer))
        .route("/deals", post(create_deal))
        .route("/deals/{deal_id}", get(get_deal))
        .route("/deals/{deal_id}/approve", post(approve_deal))
        .route("/deals/{deal_id}/complete", post(complete_deal))
        .route("/deals/{deal_id}/cancel", post(cancel_deal))
        .route("/users/{user_id}/deals", get(user_deals))
        .route("/health", get(health))
        .layer(cors)
        .with_state(state)
}
