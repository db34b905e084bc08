use axum::{
    extract::{Json, Path, Query, State},
    response::IntoResponse,
    routing::{delete, get, post},
    Router,
};
use std::sync::Arc;
use uuid::Uuid;

use super::common::{
    created_response, map_service_error, no_content_response, success_response, validate_input,
    PaginatedResponse, PaginationParams,
};
use crate::auth::AuthUser;
use crate::errors::{ApiError, ServiceError};
use crate::handlers::AppState;
use crate::services::accounts::{AccountDto, CreateAccountRequest};

/// Resolves an account and checks it belongs to the caller
async fn owned_account(
    state: &AppState,
    current_user: &AuthUser,
    account_id: Uuid,
) -> Result<AccountDto, ApiError> {
    let account = state
        .services
        .accounts
        .get_account(account_id)
        .await
        .map_err(map_service_error)?;

    if account.user_id != current_user.user_id {
        return Err(ApiError::ServiceError(ServiceError::Forbidden(
            "account does not belong to the authenticated user".to_string(),
        )));
    }
    Ok(account)
}

/// Open a new account for the authenticated user
#[utoipa::path(
    post,
    path = "/api/v1/accounts",
    request_body = CreateAccountRequest,
    responses(
        (status = 201, description = "Account created", body = AccountDto,
            headers(("X-Request-Id" = String, description = "Unique request id"))
        ),
        (status = 400, description = "Invalid request", body = crate::errors::ErrorResponse),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse),
        (status = 403, description = "Forbidden", body = crate::errors::ErrorResponse),
        (status = 409, description = "Account number already exists", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "accounts"
)]
pub async fn create_account(
    State(state): State<Arc<AppState>>,
    current_user: AuthUser,
    Json(payload): Json<CreateAccountRequest>,
) -> Result<impl IntoResponse, ApiError> {
    validate_input(&payload)?;

    if payload.user_id != current_user.user_id {
        return Err(ApiError::ServiceError(ServiceError::Forbidden(
            "accounts can only be opened for the authenticated user".to_string(),
        )));
    }

    let account = state
        .services
        .accounts
        .create_account(payload)
        .await
        .map_err(map_service_error)?;

    Ok(created_response(account))
}

/// List all accounts
#[utoipa::path(
    get,
    path = "/api/v1/accounts",
    params(PaginationParams),
    responses(
        (status = 200, description = "Accounts returned", body = [AccountDto]),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "accounts"
)]
pub async fn list_accounts(
    State(state): State<Arc<AppState>>,
    _current_user: AuthUser,
    Query(pagination): Query<PaginationParams>,
) -> Result<impl IntoResponse, ApiError> {
    let (accounts, total) = state
        .services
        .accounts
        .list_accounts(pagination.page, pagination.per_page)
        .await
        .map_err(map_service_error)?;

    Ok(success_response(PaginatedResponse::new(
        accounts,
        pagination.page,
        pagination.per_page,
        total,
    )))
}

/// List accounts owned by a user, newest first
#[utoipa::path(
    get,
    path = "/api/v1/accounts/user/:user_id",
    params(("user_id" = Uuid, Path, description = "User ID")),
    responses(
        (status = 200, description = "Accounts returned", body = [AccountDto]),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "accounts"
)]
pub async fn list_user_accounts(
    State(state): State<Arc<AppState>>,
    _current_user: AuthUser,
    Path(user_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let accounts = state
        .services
        .accounts
        .list_user_accounts(user_id)
        .await
        .map_err(map_service_error)?;

    Ok(success_response(accounts))
}

/// Get an account by ID
#[utoipa::path(
    get,
    path = "/api/v1/accounts/:id",
    params(("id" = Uuid, Path, description = "Account ID")),
    responses(
        (status = 200, description = "Account returned", body = AccountDto),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse),
        (status = 404, description = "Not found", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "accounts"
)]
pub async fn get_account(
    State(state): State<Arc<AppState>>,
    _current_user: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let account = state
        .services
        .accounts
        .get_account(id)
        .await
        .map_err(map_service_error)?;

    Ok(success_response(account))
}

/// Close an account. Only the owner may close it; ledger history is kept.
#[utoipa::path(
    delete,
    path = "/api/v1/accounts/:id",
    params(("id" = Uuid, Path, description = "Account ID")),
    responses(
        (status = 204, description = "Account deleted"),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse),
        (status = 403, description = "Forbidden", body = crate::errors::ErrorResponse),
        (status = 404, description = "Not found", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "accounts"
)]
pub async fn delete_account(
    State(state): State<Arc<AppState>>,
    current_user: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    owned_account(&state, &current_user, id).await?;

    state
        .services
        .accounts
        .delete_account(id)
        .await
        .map_err(map_service_error)?;

    Ok(no_content_response())
}

/// Creates the router for account endpoints
pub fn account_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", post(create_account))
        .route("/", get(list_accounts))
        .route("/user/:user_id", get(list_user_accounts))
        .route("/:id", get(get_account))
        .route("/:id", delete(delete_account))
}
