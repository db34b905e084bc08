use axum::{
    extract::{Json, Path, Query, State},
    response::IntoResponse,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use uuid::Uuid;

use super::common::{
    created_response, map_service_error, success_response, PaginatedResponse, PaginationParams,
};
use crate::auth::AuthUser;
use crate::errors::{ApiError, ServiceError};
use crate::handlers::AppState;
use crate::services::transactions::{
    DepositRequest, TransactionDto, TransferRequest, TransferResult, WithdrawRequest,
};

/// Checks the account exists and belongs to the caller.
///
/// Money can only be moved out of (or into, for deposits) an account the
/// authenticated user owns; anything else is `Forbidden`.
async fn ensure_owned(
    state: &AppState,
    current_user: &AuthUser,
    account_id: Uuid,
    not_found_message: &str,
) -> Result<(), ApiError> {
    let account = state
        .services
        .accounts
        .get_account(account_id)
        .await
        .map_err(|e| match e {
            ServiceError::NotFound(_) => {
                ApiError::ServiceError(ServiceError::NotFound(not_found_message.to_string()))
            }
            other => map_service_error(other),
        })?;

    if account.user_id != current_user.user_id {
        return Err(ApiError::ServiceError(ServiceError::Forbidden(
            "account does not belong to the authenticated user".to_string(),
        )));
    }
    Ok(())
}

/// Deposit funds into an owned account
#[utoipa::path(
    post,
    path = "/api/v1/transactions/deposit",
    request_body = DepositRequest,
    responses(
        (status = 201, description = "Deposit recorded", body = TransactionDto,
            headers(("X-Request-Id" = String, description = "Unique request id"))
        ),
        (status = 400, description = "Invalid amount", body = crate::errors::ErrorResponse),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse),
        (status = 403, description = "Forbidden", body = crate::errors::ErrorResponse),
        (status = 404, description = "Account not found", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "transactions"
)]
pub async fn deposit(
    State(state): State<Arc<AppState>>,
    current_user: AuthUser,
    Json(payload): Json<DepositRequest>,
) -> Result<impl IntoResponse, ApiError> {
    ensure_owned(&state, &current_user, payload.account_id, "account not found").await?;

    let entry = state
        .services
        .transactions
        .deposit(payload)
        .await
        .map_err(map_service_error)?;

    Ok(created_response(entry))
}

/// Withdraw funds from an owned account
#[utoipa::path(
    post,
    path = "/api/v1/transactions/withdraw",
    request_body = WithdrawRequest,
    responses(
        (status = 201, description = "Withdrawal recorded", body = TransactionDto,
            headers(("X-Request-Id" = String, description = "Unique request id"))
        ),
        (status = 400, description = "Invalid amount", body = crate::errors::ErrorResponse),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse),
        (status = 403, description = "Forbidden", body = crate::errors::ErrorResponse),
        (status = 404, description = "Account not found", body = crate::errors::ErrorResponse),
        (status = 422, description = "Insufficient funds", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "transactions"
)]
pub async fn withdraw(
    State(state): State<Arc<AppState>>,
    current_user: AuthUser,
    Json(payload): Json<WithdrawRequest>,
) -> Result<impl IntoResponse, ApiError> {
    ensure_owned(&state, &current_user, payload.account_id, "account not found").await?;

    let entry = state
        .services
        .transactions
        .withdraw(payload)
        .await
        .map_err(map_service_error)?;

    Ok(created_response(entry))
}

/// Transfer funds between two accounts atomically
#[utoipa::path(
    post,
    path = "/api/v1/transactions/transfer",
    request_body = TransferRequest,
    responses(
        (status = 201, description = "Transfer committed", body = TransferResult,
            headers(("X-Request-Id" = String, description = "Unique request id"))
        ),
        (status = 400, description = "Invalid amount or self-transfer", body = crate::errors::ErrorResponse),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse),
        (status = 403, description = "Forbidden", body = crate::errors::ErrorResponse),
        (status = 404, description = "Account not found", body = crate::errors::ErrorResponse),
        (status = 422, description = "Insufficient funds", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "transactions"
)]
pub async fn transfer(
    State(state): State<Arc<AppState>>,
    current_user: AuthUser,
    Json(payload): Json<TransferRequest>,
) -> Result<impl IntoResponse, ApiError> {
    // Input validation first, so a bad amount or self-transfer is reported
    // identically whether or not the source account exists.
    if payload.amount <= rust_decimal::Decimal::ZERO {
        return Err(ApiError::ServiceError(ServiceError::ValidationError(
            "transfer amount must be positive".to_string(),
        )));
    }
    if payload.source_account_id == payload.target_account_id {
        return Err(ApiError::ServiceError(ServiceError::ValidationError(
            "cannot transfer to the same account".to_string(),
        )));
    }

    ensure_owned(
        &state,
        &current_user,
        payload.source_account_id,
        "source account not found",
    )
    .await?;

    let result = state
        .services
        .transactions
        .transfer(payload)
        .await
        .map_err(map_service_error)?;

    Ok(created_response(result))
}

/// List all ledger entries
#[utoipa::path(
    get,
    path = "/api/v1/transactions",
    params(PaginationParams),
    responses(
        (status = 200, description = "Transactions returned", body = [TransactionDto]),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "transactions"
)]
pub async fn list_transactions(
    State(state): State<Arc<AppState>>,
    _current_user: AuthUser,
    Query(pagination): Query<PaginationParams>,
) -> Result<impl IntoResponse, ApiError> {
    let (entries, total) = state
        .services
        .transactions
        .list_transactions(pagination.page, pagination.per_page)
        .await
        .map_err(map_service_error)?;

    Ok(success_response(PaginatedResponse::new(
        entries,
        pagination.page,
        pagination.per_page,
        total,
    )))
}

/// Ledger entries for one account, newest first
#[utoipa::path(
    get,
    path = "/api/v1/transactions/account/:account_id",
    params(
        ("account_id" = Uuid, Path, description = "Account ID"),
        PaginationParams
    ),
    responses(
        (status = 200, description = "Transactions returned", body = [TransactionDto]),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse),
        (status = 404, description = "Account not found", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "transactions"
)]
pub async fn list_account_transactions(
    State(state): State<Arc<AppState>>,
    _current_user: AuthUser,
    Path(account_id): Path<Uuid>,
    Query(pagination): Query<PaginationParams>,
) -> Result<impl IntoResponse, ApiError> {
    let (entries, total) = state
        .services
        .transactions
        .list_account_transactions(account_id, pagination.page, pagination.per_page)
        .await
        .map_err(map_service_error)?;

    Ok(success_response(PaginatedResponse::new(
        entries,
        pagination.page,
        pagination.per_page,
        total,
    )))
}

/// Get a ledger entry by ID
#[utoipa::path(
    get,
    path = "/api/v1/transactions/:id",
    params(("id" = Uuid, Path, description = "Transaction ID")),
    responses(
        (status = 200, description = "Transaction returned", body = TransactionDto),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse),
        (status = 404, description = "Not found", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "transactions"
)]
pub async fn get_transaction(
    State(state): State<Arc<AppState>>,
    _current_user: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let entry = state
        .services
        .transactions
        .get_transaction(id)
        .await
        .map_err(map_service_error)?;

    Ok(success_response(entry))
}

/// Creates the router for transaction endpoints
pub fn transaction_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(list_transactions))
        .route("/deposit", post(deposit))
        .route("/withdraw", post(withdraw))
        .route("/transfer", post(transfer))
        .route("/account/:account_id", get(list_account_transactions))
        .route("/:id", get(get_transaction))
}
