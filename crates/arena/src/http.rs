//! The HTTP API.
//!
//! | Route                                   | Purpose                            |
//! |-----------------------------------------|------------------------------------|
//! | `POST /create-room`                     | allocate a room code               |
//! | `POST /join-room`                       | check a code names a live room     |
//! | `DELETE /rooms/{code}`                  | close a room, notify its members   |
//! | `GET /skins`                            | current asset per category         |
//! | `POST /skins/reset`                     | every category back to default     |
//! | `POST /skins/select`                    | entitlement-checked selection      |
//! | `GET /accounts/{address}/entitlements`  | resolved entitlements              |
//! | `DELETE /accounts/{address}/entitlements` | drop cached state (disconnect)   |
//! | `POST /accounts/{address}/shape-key`    | force a shape key re-check         |
//! | `GET /items`                            | ledger items                       |
//! | `POST /items/{id}/buy`                  | buy an item at its exact price     |

use std::collections::BTreeMap;
use std::sync::Arc;

use arena_entitlement::{
    AssetRef, DenyReason, Entitlements, ItemId, LedgerError, LedgerItem, OwnershipOracle,
    PurchaseError, PurchaseLedger, Selection, SkinCategory, TransactionReceipt, Wei,
};
use arena_protocol::{
    Address, CreateRoomResponse, ErrorBody, JoinRoomRequest, JoinRoomResponse, RoomCode,
};
use arena_session::SessionError;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{delete, get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use tower_http::cors::CorsLayer;

use crate::handler::broadcast_closed;
use crate::server::ServerState;

type AppState<L, O> = State<Arc<ServerState<L, O>>>;

pub(crate) fn router<L, O>(state: Arc<ServerState<L, O>>) -> Router
where
    L: PurchaseLedger,
    O: OwnershipOracle,
{
    Router::new()
        .route("/create-room", post(create_room::<L, O>))
        .route("/join-room", post(join_room::<L, O>))
        .route("/rooms/{code}", delete(close_room::<L, O>))
        .route("/skins", get(skins::<L, O>))
        .route("/skins/reset", post(reset_skins::<L, O>))
        .route("/skins/select", post(select_skin::<L, O>))
        .route(
            "/accounts/{address}/entitlements",
            get(entitlements::<L, O>).delete(forget_account::<L, O>),
        )
        .route("/accounts/{address}/shape-key", post(recheck_shape_key::<L, O>))
        .route("/items", get(items::<L, O>))
        .route("/items/{id}/buy", post(buy_item::<L, O>))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Everything a handler can fail with, mapped to a status and an
/// [`ErrorBody`].
#[derive(Debug)]
pub(crate) enum ApiError {
    BadRequest(String),
    Session(SessionError),
    Ledger(LedgerError),
    Purchase(PurchaseError),
}

impl From<SessionError> for ApiError {
    fn from(e: SessionError) -> Self {
        Self::Session(e)
    }
}

impl From<LedgerError> for ApiError {
    fn from(e: LedgerError) -> Self {
        Self::Ledger(e)
    }
}

impl From<PurchaseError> for ApiError {
    fn from(e: PurchaseError) -> Self {
        match e {
            PurchaseError::Ledger(e) => Self::Ledger(e),
            other => Self::Purchase(other),
        }
    }
}

fn ledger_status(e: &LedgerError) -> StatusCode {
    match e {
        LedgerError::Timeout(_) => StatusCode::GATEWAY_TIMEOUT,
        LedgerError::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
        LedgerError::Rejected(_) => StatusCode::BAD_GATEWAY,
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            Self::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            Self::Session(e) if e.is_not_found() => (StatusCode::NOT_FOUND, e.to_string()),
            Self::Session(e) if e.is_retryable() => {
                (StatusCode::SERVICE_UNAVAILABLE, e.to_string())
            }
            Self::Session(e) => (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()),
            Self::Ledger(e) => (ledger_status(e), e.to_string()),
            Self::Purchase(e) => {
                let status = match e {
                    PurchaseError::UnknownItem(_) => StatusCode::NOT_FOUND,
                    PurchaseError::AlreadyOwned(_) => StatusCode::CONFLICT,
                    PurchaseError::PriceMismatch { .. } => StatusCode::BAD_REQUEST,
                    PurchaseError::Reverted(_) => StatusCode::UNPROCESSABLE_ENTITY,
                    PurchaseError::Ledger(e) => ledger_status(e),
                };
                (status, e.to_string())
            }
        };

        if status.is_server_error() {
            tracing::warn!(%status, error = %message, "request failed");
        }
        (status, Json(ErrorBody { error: message })).into_response()
    }
}

type ApiResult<T> = Result<Json<T>, ApiError>;

fn parse_address(raw: &str) -> Result<Address, ApiError> {
    Address::parse(raw).map_err(|e| ApiError::BadRequest(e.to_string()))
}

// ---------------------------------------------------------------------------
// Rooms
// ---------------------------------------------------------------------------

async fn create_room<L, O>(State(state): AppState<L, O>) -> ApiResult<CreateRoomResponse>
where
    L: PurchaseLedger,
    O: OwnershipOracle,
{
    let room_code = state.gateway.create_room().await?;
    Ok(Json(CreateRoomResponse { room_code }))
}

async fn join_room<L, O>(
    State(state): AppState<L, O>,
    Json(body): Json<JoinRoomRequest>,
) -> Json<JoinRoomResponse>
where
    L: PurchaseLedger,
    O: OwnershipOracle,
{
    let success = state.gateway.join_room_by_code(&body.room_code).await;
    Json(JoinRoomResponse { success })
}

async fn close_room<L, O>(
    State(state): AppState<L, O>,
    Path(code): Path<String>,
) -> Result<StatusCode, ApiError>
where
    L: PurchaseLedger,
    O: OwnershipOracle,
{
    let code = RoomCode::parse(&code).map_err(|e| ApiError::BadRequest(e.to_string()))?;
    let members = state.gateway.close_room(&code).await?;
    broadcast_closed(&state, &code, &members).await;
    Ok(StatusCode::NO_CONTENT)
}

// ---------------------------------------------------------------------------
// Skins
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct SelectSkinRequest {
    address: String,
    category: String,
    asset: String,
}

#[derive(Debug, Serialize)]
struct SelectSkinResponse {
    selected: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    reason: Option<DenyReason>,
}

async fn skins<L, O>(State(state): AppState<L, O>) -> Json<BTreeMap<SkinCategory, AssetRef>>
where
    L: PurchaseLedger,
    O: OwnershipOracle,
{
    Json(state.entitlements.store().snapshot().await)
}

async fn reset_skins<L, O>(
    State(state): AppState<L, O>,
) -> Json<BTreeMap<SkinCategory, AssetRef>>
where
    L: PurchaseLedger,
    O: OwnershipOracle,
{
    let store = state.entitlements.store();
    store.reset_all().await;
    Json(store.snapshot().await)
}

async fn select_skin<L, O>(
    State(state): AppState<L, O>,
    Json(body): Json<SelectSkinRequest>,
) -> ApiResult<SelectSkinResponse>
where
    L: PurchaseLedger,
    O: OwnershipOracle,
{
    let address = parse_address(&body.address)?;
    let category: SkinCategory = body
        .category
        .parse()
        .map_err(|e: arena_entitlement::EntitlementError| ApiError::BadRequest(e.to_string()))?;

    let selection = state
        .entitlements
        .select_for(&address, category, AssetRef::new(body.asset))
        .await;

    Ok(Json(match selection {
        Selection::Selected => SelectSkinResponse {
            selected: true,
            reason: None,
        },
        Selection::Denied(reason) => SelectSkinResponse {
            selected: false,
            reason: Some(reason),
        },
    }))
}

// ---------------------------------------------------------------------------
// Accounts
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ShapeKeyResponse {
    address: Address,
    possessed: bool,
}

async fn entitlements<L, O>(
    State(state): AppState<L, O>,
    Path(address): Path<String>,
) -> ApiResult<Entitlements>
where
    L: PurchaseLedger,
    O: OwnershipOracle,
{
    let address = parse_address(&address)?;
    Ok(Json(state.entitlements.current_entitlements(&address).await))
}

async fn forget_account<L, O>(
    State(state): AppState<L, O>,
    Path(address): Path<String>,
) -> Result<StatusCode, ApiError>
where
    L: PurchaseLedger,
    O: OwnershipOracle,
{
    let address = parse_address(&address)?;
    state.entitlements.forget(&address).await;
    Ok(StatusCode::NO_CONTENT)
}

async fn recheck_shape_key<L, O>(
    State(state): AppState<L, O>,
    Path(address): Path<String>,
) -> ApiResult<ShapeKeyResponse>
where
    L: PurchaseLedger,
    O: OwnershipOracle,
{
    let address = parse_address(&address)?;
    let possessed = state.entitlements.resolve_shape_key(&address).await;
    Ok(Json(ShapeKeyResponse { address, possessed }))
}

// ---------------------------------------------------------------------------
// Items
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct BuyItemRequest {
    address: String,
    value: Wei,
}

async fn items<L, O>(State(state): AppState<L, O>) -> ApiResult<Vec<LedgerItem>>
where
    L: PurchaseLedger,
    O: OwnershipOracle,
{
    Ok(Json(state.entitlements.items().await?))
}

async fn buy_item<L, O>(
    State(state): AppState<L, O>,
    Path(id): Path<u64>,
    Json(body): Json<BuyItemRequest>,
) -> ApiResult<TransactionReceipt>
where
    L: PurchaseLedger,
    O: OwnershipOracle,
{
    let buyer = parse_address(&body.address)?;
    let receipt = state
        .entitlements
        .purchase(&buyer, ItemId::new(id), body.value)
        .await?;
    Ok(Json(receipt))
}
