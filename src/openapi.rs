use utoipa::{
    openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    Modify, OpenApi,
};
use utoipa_swagger_ui::SwaggerUi;

struct BearerAuth;

impl Modify for BearerAuth {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Drank Banking API",
        version = "0.2.0",
        description = r#"
# Drank Banking API

A demo banking backend exposing users, accounts, and an append-only
transaction ledger with an atomic funds-transfer operation.

## Authentication

All endpoints except `/auth/login` and `/auth/register` require a JWT:

```
Authorization: Bearer <your-jwt-token>
```

## Pagination

List endpoints accept `page` (default 1) and `per_page` (default 20).
        "#,
        license(
            name = "MIT",
            url = "https://opensource.org/licenses/MIT"
        )
    ),
    servers(
        (url = "http://localhost:8080", description = "Local development")
    ),
    tags(
        (name = "auth", description = "Login and registration"),
        (name = "users", description = "User management endpoints"),
        (name = "accounts", description = "Account management endpoints"),
        (name = "transactions", description = "Deposits, withdrawals, transfers, and ledger queries")
    ),
    paths(
        crate::handlers::auth::login,
        crate::handlers::auth::register,
        crate::handlers::users::list_users,
        crate::handlers::users::get_current_user,
        crate::handlers::users::get_user,
        crate::handlers::users::update_user,
        crate::handlers::users::delete_user,
        crate::handlers::accounts::create_account,
        crate::handlers::accounts::list_accounts,
        crate::handlers::accounts::list_user_accounts,
        crate::handlers::accounts::get_account,
        crate::handlers::accounts::delete_account,
        crate::handlers::transactions::deposit,
        crate::handlers::transactions::withdraw,
        crate::handlers::transactions::transfer,
        crate::handlers::transactions::list_transactions,
        crate::handlers::transactions::list_account_transactions,
        crate::handlers::transactions::get_transaction,
    ),
    components(
        schemas(
            crate::services::users::UserDto,
            crate::services::users::CreateUserRequest,
            crate::services::users::UpdateUserRequest,
            crate::services::users::LoginRequest,
            crate::services::users::LoginResponse,
            crate::services::accounts::AccountDto,
            crate::services::accounts::CreateAccountRequest,
            crate::services::transactions::TransactionDto,
            crate::services::transactions::TransferResult,
            crate::services::transactions::DepositRequest,
            crate::services::transactions::WithdrawRequest,
            crate::services::transactions::TransferRequest,
            crate::entities::account::AccountType,
            crate::entities::transaction::TransactionType,
            crate::errors::ErrorResponse
        )
    ),
    modifiers(&BearerAuth)
)]
pub struct ApiDoc;

pub fn swagger_ui() -> SwaggerUi {
    SwaggerUi::new("/swagger-ui")
        .url("/api-docs/openapi.json", ApiDoc::openapi())
        .config(utoipa_swagger_ui::Config::from("/api-docs/openapi.json").try_it_out_enabled(true))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn openapi_document_includes_core_paths() {
        let openapi = ApiDoc::openapi();
        let json = serde_json::to_string_pretty(&openapi).unwrap();
        assert!(json.contains("Drank Banking API"));
        assert!(json.contains("/api/v1/transactions/transfer"));
        assert!(json.contains("bearer_auth"));
    }
}
