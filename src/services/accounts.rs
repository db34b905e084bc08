use chrono::{DateTime, Utc};
use rand::Rng;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument, warn};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::entities::account::{self, AccountType};
use crate::entities::transaction::TransactionType;
use crate::errors::ServiceError;
use crate::events::{Event, EventSender};
use crate::repositories::{AccountRepository, TransactionRepository};

/// How many times account-number generation retries on a collision
const ACCOUNT_NUMBER_ATTEMPTS: usize = 5;

/// Account representation returned to clients
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct AccountDto {
    pub id: Uuid,
    pub user_id: Uuid,
    #[schema(example = "1234567890")]
    pub account_number: String,
    pub account_type: AccountType,
    #[schema(value_type = String, example = "100.00")]
    pub balance: Decimal,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<account::Model> for AccountDto {
    fn from(model: account::Model) -> Self {
        Self {
            id: model.id,
            user_id: model.user_id,
            account_number: model.account_number,
            account_type: model.account_type,
            balance: model.balance,
            created_at: model.created_at,
            updated_at: model.updated_at,
        }
    }
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateAccountRequest {
    pub user_id: Uuid,
    pub account_type: AccountType,
    /// Assigned by the system when absent
    #[validate(length(equal = 10))]
    pub account_number: Option<String>,
    /// Recorded as an opening-balance deposit when positive
    #[schema(value_type = Option<String>, example = "100.00")]
    pub initial_balance: Option<Decimal>,
}

/// Service for managing accounts
#[derive(Clone)]
pub struct AccountService {
    account_repo: Arc<dyn AccountRepository>,
    transaction_repo: Arc<dyn TransactionRepository>,
    event_sender: EventSender,
}

fn generate_account_number() -> String {
    let mut rng = rand::thread_rng();
    rng.gen_range(1_000_000_000u64..10_000_000_000u64).to_string()
}

impl AccountService {
    pub fn new(
        account_repo: Arc<dyn AccountRepository>,
        transaction_repo: Arc<dyn TransactionRepository>,
        event_sender: EventSender,
    ) -> Self {
        Self {
            account_repo,
            transaction_repo,
            event_sender,
        }
    }

    /// Opens a new account. A positive initial balance is recorded as an
    /// opening-balance DEPOSIT entry so the ledger stays complete.
    #[instrument(skip(self, request), fields(user_id = %request.user_id))]
    pub async fn create_account(
        &self,
        request: CreateAccountRequest,
    ) -> Result<AccountDto, ServiceError> {
        request.validate()?;

        let initial_balance = request.initial_balance.unwrap_or(Decimal::ZERO);
        if initial_balance < Decimal::ZERO {
            return Err(ServiceError::ValidationError(
                "initial balance cannot be negative".to_string(),
            ));
        }

        let now = Utc::now();
        let mut created = None;

        // Retry on generated-number collisions; a caller-supplied number
        // that collides surfaces the Conflict directly.
        for attempt in 0..ACCOUNT_NUMBER_ATTEMPTS {
            let account_number = request
                .account_number
                .clone()
                .unwrap_or_else(generate_account_number);

            let candidate = account::Model {
                id: Uuid::new_v4(),
                user_id: request.user_id,
                account_number,
                account_type: request.account_type,
                balance: Decimal::ZERO,
                created_at: now,
                updated_at: now,
            };

            match self.account_repo.create(candidate).await {
                Ok(model) => {
                    created = Some(model);
                    break;
                }
                Err(ServiceError::Conflict(msg)) => {
                    if request.account_number.is_some() {
                        return Err(ServiceError::Conflict(msg));
                    }
                    warn!(attempt, "Generated account number collided, retrying");
                }
                Err(e) => return Err(e),
            }
        }

        let mut created = created.ok_or_else(|| {
            ServiceError::InternalError("could not allocate a unique account number".to_string())
        })?;

        if initial_balance > Decimal::ZERO {
            let entry = self
                .transaction_repo
                .create_entry_atomic(
                    created.id,
                    initial_balance,
                    TransactionType::Deposit,
                    "Opening balance".to_string(),
                )
                .await?;
            created.balance = entry.balance;
        }

        info!(account_id = %created.id, account_number = %created.account_number, "Created account");
        if let Err(e) = self
            .event_sender
            .send(Event::AccountCreated(created.id))
            .await
        {
            warn!("Failed to publish AccountCreated event: {}", e);
        }

        Ok(created.into())
    }

    #[instrument(skip(self))]
    pub async fn get_account(&self, id: Uuid) -> Result<AccountDto, ServiceError> {
        self.account_repo
            .find_by_id(id)
            .await?
            .map(AccountDto::from)
            .ok_or_else(|| ServiceError::NotFound("account not found".to_string()))
    }

    /// Accounts owned by one user, newest first
    #[instrument(skip(self))]
    pub async fn list_user_accounts(&self, user_id: Uuid) -> Result<Vec<AccountDto>, ServiceError> {
        let accounts = self.account_repo.find_by_user_id(user_id).await?;
        Ok(accounts.into_iter().map(AccountDto::from).collect())
    }

    #[instrument(skip(self))]
    pub async fn list_accounts(
        &self,
        page: u64,
        per_page: u64,
    ) -> Result<(Vec<AccountDto>, u64), ServiceError> {
        let (accounts, total) = self.account_repo.find_all(page, per_page).await?;
        Ok((accounts.into_iter().map(AccountDto::from).collect(), total))
    }

    /// Removes the account. Its ledger entries are kept.
    #[instrument(skip(self))]
    pub async fn delete_account(&self, id: Uuid) -> Result<(), ServiceError> {
        if !self.account_repo.delete(id).await? {
            return Err(ServiceError::NotFound("account not found".to_string()));
        }

        info!(account_id = %id, "Deleted account");
        if let Err(e) = self.event_sender.send(Event::AccountDeleted(id)).await {
            warn!("Failed to publish AccountDeleted event: {}", e);
        }
        Ok(())
    }
}
