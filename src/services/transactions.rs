use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument, warn};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::entities::transaction::{self, TransactionType};
use crate::errors::ServiceError;
use crate::events::{Event, EventSender};
use crate::repositories::{AccountRepository, TransactionRepository};

/// Ledger entry representation returned to clients
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct TransactionDto {
    pub id: Uuid,
    pub account_id: Uuid,
    pub source_account_id: Option<Uuid>,
    pub target_account_id: Option<Uuid>,
    /// Signed amount, negative for debits
    #[schema(value_type = String, example = "-25.00")]
    pub amount: Decimal,
    /// Account balance after this entry was applied
    #[schema(value_type = String, example = "75.00")]
    pub balance: Decimal,
    pub transaction_type: TransactionType,
    pub description: String,
    pub transaction_date: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

impl From<transaction::Model> for TransactionDto {
    fn from(model: transaction::Model) -> Self {
        Self {
            id: model.id,
            account_id: model.account_id,
            source_account_id: model.source_account_id,
            target_account_id: model.target_account_id,
            amount: model.amount,
            balance: model.balance,
            transaction_type: model.transaction_type,
            description: model.description,
            transaction_date: model.transaction_date,
            created_at: model.created_at,
        }
    }
}

/// Both legs of a committed transfer
#[derive(Debug, Serialize, ToSchema)]
pub struct TransferResult {
    pub source_transaction: TransactionDto,
    pub target_transaction: TransactionDto,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct DepositRequest {
    pub account_id: Uuid,
    #[schema(value_type = String, example = "50.00")]
    pub amount: Decimal,
    pub description: Option<String>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct WithdrawRequest {
    pub account_id: Uuid,
    #[schema(value_type = String, example = "25.00")]
    pub amount: Decimal,
    pub description: Option<String>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct TransferRequest {
    pub source_account_id: Uuid,
    pub target_account_id: Uuid,
    #[schema(value_type = String, example = "25.00")]
    pub amount: Decimal,
    pub description: Option<String>,
}

/// Service for ledger operations: deposits, withdrawals, transfers, listings
#[derive(Clone)]
pub struct TransactionService {
    account_repo: Arc<dyn AccountRepository>,
    transaction_repo: Arc<dyn TransactionRepository>,
    event_sender: EventSender,
}

impl TransactionService {
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

    /// Credits an account and appends a DEPOSIT entry.
    #[instrument(skip(self, request), fields(account_id = %request.account_id))]
    pub async fn deposit(&self, request: DepositRequest) -> Result<TransactionDto, ServiceError> {
        if request.amount <= Decimal::ZERO {
            return Err(ServiceError::ValidationError(
                "deposit amount must be positive".to_string(),
            ));
        }

        let description = request.description.unwrap_or_else(|| "Deposit".to_string());
        let entry = self
            .transaction_repo
            .create_entry_atomic(
                request.account_id,
                request.amount,
                TransactionType::Deposit,
                description,
            )
            .await?;

        info!(entry_id = %entry.id, amount = %request.amount, "Recorded deposit");
        if let Err(e) = self
            .event_sender
            .send(Event::DepositRecorded {
                account_id: request.account_id,
                amount: request.amount,
            })
            .await
        {
            warn!("Failed to publish DepositRecorded event: {}", e);
        }

        Ok(entry.into())
    }

    /// Debits an account and appends a WITHDRAWAL entry with a negative
    /// amount. Fails with `InsufficientFunds` rather than overdraw.
    #[instrument(skip(self, request), fields(account_id = %request.account_id))]
    pub async fn withdraw(&self, request: WithdrawRequest) -> Result<TransactionDto, ServiceError> {
        if request.amount <= Decimal::ZERO {
            return Err(ServiceError::ValidationError(
                "withdrawal amount must be positive".to_string(),
            ));
        }

        let description = request
            .description
            .unwrap_or_else(|| "Withdrawal".to_string());
        let entry = self
            .transaction_repo
            .create_entry_atomic(
                request.account_id,
                -request.amount,
                TransactionType::Withdrawal,
                description,
            )
            .await?;

        info!(entry_id = %entry.id, amount = %request.amount, "Recorded withdrawal");
        if let Err(e) = self
            .event_sender
            .send(Event::WithdrawalRecorded {
                account_id: request.account_id,
                amount: request.amount,
            })
            .await
        {
            warn!("Failed to publish WithdrawalRecorded event: {}", e);
        }

        Ok(entry.into())
    }

    /// Moves funds between two accounts atomically.
    ///
    /// Validation happens in a fixed order before any storage access:
    /// non-positive amounts and self-transfers are rejected without
    /// touching the database. Existence, funds checks, balance updates
    /// and both ledger legs then commit as a single unit.
    #[instrument(skip(self, request), fields(
        source_account_id = %request.source_account_id,
        target_account_id = %request.target_account_id,
    ))]
    pub async fn transfer(&self, request: TransferRequest) -> Result<TransferResult, ServiceError> {
        if request.amount <= Decimal::ZERO {
            return Err(ServiceError::ValidationError(
                "transfer amount must be positive".to_string(),
            ));
        }

        if request.source_account_id == request.target_account_id {
            return Err(ServiceError::ValidationError(
                "cannot transfer to the same account".to_string(),
            ));
        }

        let description = request.description.unwrap_or_else(|| "Transfer".to_string());
        let record = self
            .transaction_repo
            .create_transfer_atomic(
                request.source_account_id,
                request.target_account_id,
                request.amount,
                description,
            )
            .await?;

        info!(
            source_entry = %record.source_entry.id,
            target_entry = %record.target_entry.id,
            amount = %request.amount,
            "Completed transfer"
        );
        if let Err(e) = self
            .event_sender
            .send(Event::TransferCompleted {
                source_account_id: request.source_account_id,
                target_account_id: request.target_account_id,
                amount: request.amount,
            })
            .await
        {
            warn!("Failed to publish TransferCompleted event: {}", e);
        }

        Ok(TransferResult {
            source_transaction: record.source_entry.into(),
            target_transaction: record.target_entry.into(),
        })
    }

    #[instrument(skip(self))]
    pub async fn get_transaction(&self, id: Uuid) -> Result<TransactionDto, ServiceError> {
        self.transaction_repo
            .find_by_id(id)
            .await?
            .map(TransactionDto::from)
            .ok_or_else(|| ServiceError::NotFound("transaction not found".to_string()))
    }

    /// Ledger entries for one account, newest first. The account must exist.
    #[instrument(skip(self))]
    pub async fn list_account_transactions(
        &self,
        account_id: Uuid,
        page: u64,
        per_page: u64,
    ) -> Result<(Vec<TransactionDto>, u64), ServiceError> {
        self.account_repo
            .find_by_id(account_id)
            .await?
            .ok_or_else(|| ServiceError::NotFound("account not found".to_string()))?;

        let (entries, total) = self
            .transaction_repo
            .find_by_account_id(account_id, page, per_page)
            .await?;

        Ok((entries.into_iter().map(TransactionDto::from).collect(), total))
    }

    #[instrument(skip(self))]
    pub async fn list_transactions(
        &self,
        page: u64,
        per_page: u64,
    ) -> Result<(Vec<TransactionDto>, u64), ServiceError> {
        let (entries, total) = self.transaction_repo.find_all(page, per_page).await?;
        Ok((entries.into_iter().map(TransactionDto::from).collect(), total))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::event_channel;
    use crate::repositories::{MockAccountRepository, MockTransactionRepository, TransferRecord};
    use rust_decimal_macros::dec;

    fn service(
        account_repo: MockAccountRepository,
        transaction_repo: MockTransactionRepository,
    ) -> (TransactionService, tokio::sync::mpsc::Receiver<Event>) {
        let (sender, rx) = event_channel(16);
        (
            TransactionService::new(Arc::new(account_repo), Arc::new(transaction_repo), sender),
            rx,
        )
    }

    fn entry(
        account_id: Uuid,
        amount: Decimal,
        balance: Decimal,
        transaction_type: TransactionType,
        description: &str,
    ) -> transaction::Model {
        let now = Utc::now();
        transaction::Model {
            id: Uuid::new_v4(),
            account_id,
            source_account_id: None,
            target_account_id: None,
            amount,
            balance,
            transaction_type,
            description: description.to_string(),
            transaction_date: now,
            created_at: now,
            updated_at: now,
        }
    }

    // Mocks with no expectations panic on any call, so these tests also
    // prove invalid requests never reach storage.
    #[tokio::test]
    async fn transfer_rejects_zero_amount_before_touching_storage() {
        let (service, _rx) = service(
            MockAccountRepository::new(),
            MockTransactionRepository::new(),
        );

        let err = service
            .transfer(TransferRequest {
                source_account_id: Uuid::new_v4(),
                target_account_id: Uuid::new_v4(),
                amount: Decimal::ZERO,
                description: None,
            })
            .await
            .unwrap_err();

        assert!(
            matches!(err, ServiceError::ValidationError(ref msg) if msg == "transfer amount must be positive")
        );
    }

    #[tokio::test]
    async fn transfer_rejects_negative_amount() {
        let (service, _rx) = service(
            MockAccountRepository::new(),
            MockTransactionRepository::new(),
        );

        let err = service
            .transfer(TransferRequest {
                source_account_id: Uuid::new_v4(),
                target_account_id: Uuid::new_v4(),
                amount: dec!(-10.00),
                description: None,
            })
            .await
            .unwrap_err();

        assert!(
            matches!(err, ServiceError::ValidationError(ref msg) if msg == "transfer amount must be positive")
        );
    }

    #[tokio::test]
    async fn transfer_rejects_same_account() {
        let (service, _rx) = service(
            MockAccountRepository::new(),
            MockTransactionRepository::new(),
        );

        let id = Uuid::new_v4();
        let err = service
            .transfer(TransferRequest {
                source_account_id: id,
                target_account_id: id,
                amount: dec!(10.00),
                description: None,
            })
            .await
            .unwrap_err();

        assert!(
            matches!(err, ServiceError::ValidationError(ref msg) if msg == "cannot transfer to the same account")
        );
    }

    #[tokio::test]
    async fn amount_check_precedes_same_account_check() {
        let (service, _rx) = service(
            MockAccountRepository::new(),
            MockTransactionRepository::new(),
        );

        // Both validations would fail; the amount error must win.
        let id = Uuid::new_v4();
        let err = service
            .transfer(TransferRequest {
                source_account_id: id,
                target_account_id: id,
                amount: Decimal::ZERO,
                description: None,
            })
            .await
            .unwrap_err();

        assert!(
            matches!(err, ServiceError::ValidationError(ref msg) if msg == "transfer amount must be positive")
        );
    }

    #[tokio::test]
    async fn transfer_delegates_to_atomic_repository_operation() {
        let source_id = Uuid::new_v4();
        let target_id = Uuid::new_v4();

        let mut transaction_repo = MockTransactionRepository::new();
        transaction_repo
            .expect_create_transfer_atomic()
            .withf(move |s, t, amount, description| {
                *s == source_id
                    && *t == target_id
                    && *amount == dec!(25.00)
                    && description == "rent"
            })
            .times(1)
            .returning(move |s, t, amount, _| {
                Ok(TransferRecord {
                    source_entry: entry(
                        s,
                        -amount,
                        dec!(75.00),
                        TransactionType::Transfer,
                        "Transfer to account 2222222222: rent",
                    ),
                    target_entry: entry(
                        t,
                        amount,
                        dec!(125.00),
                        TransactionType::Transfer,
                        "Transfer from account 1111111111: rent",
                    ),
                })
            });

        let (service, mut rx) = service(MockAccountRepository::new(), transaction_repo);
        let result = service
            .transfer(TransferRequest {
                source_account_id: source_id,
                target_account_id: target_id,
                amount: dec!(25.00),
                description: Some("rent".into()),
            })
            .await
            .unwrap();

        // Conservation: the legs cancel out
        assert_eq!(
            result.source_transaction.amount + result.target_transaction.amount,
            Decimal::ZERO
        );
        assert_eq!(result.source_transaction.amount, dec!(-25.00));
        assert!(matches!(
            rx.recv().await,
            Some(Event::TransferCompleted { .. })
        ));
    }

    #[tokio::test]
    async fn transfer_propagates_insufficient_funds() {
        let mut transaction_repo = MockTransactionRepository::new();
        transaction_repo
            .expect_create_transfer_atomic()
            .returning(|_, _, _, _| {
                Err(ServiceError::InsufficientFunds("balance too low".into()))
            });

        let (service, _rx) = service(MockAccountRepository::new(), transaction_repo);
        let err = service
            .transfer(TransferRequest {
                source_account_id: Uuid::new_v4(),
                target_account_id: Uuid::new_v4(),
                amount: dec!(1000.00),
                description: None,
            })
            .await
            .unwrap_err();

        assert!(matches!(err, ServiceError::InsufficientFunds(_)));
    }

    #[tokio::test]
    async fn withdraw_negates_amount_for_the_ledger() {
        let account_id = Uuid::new_v4();
        let mut transaction_repo = MockTransactionRepository::new();
        transaction_repo
            .expect_create_entry_atomic()
            .withf(move |id, amount, entry_type, _| {
                *id == account_id
                    && *amount == dec!(-30.00)
                    && *entry_type == TransactionType::Withdrawal
            })
            .times(1)
            .returning(|id, amount, entry_type, description| {
                Ok(entry(id, amount, dec!(70.00), entry_type, &description))
            });

        let (service, _rx) = service(MockAccountRepository::new(), transaction_repo);
        let dto = service
            .withdraw(WithdrawRequest {
                account_id,
                amount: dec!(30.00),
                description: None,
            })
            .await
            .unwrap();

        assert_eq!(dto.amount, dec!(-30.00));
        assert_eq!(dto.balance, dec!(70.00));
    }

    #[tokio::test]
    async fn deposit_rejects_non_positive_amounts() {
        let (service, _rx) = service(
            MockAccountRepository::new(),
            MockTransactionRepository::new(),
        );

        for amount in [Decimal::ZERO, dec!(-5.00)] {
            let err = service
                .deposit(DepositRequest {
                    account_id: Uuid::new_v4(),
                    amount,
                    description: None,
                })
                .await
                .unwrap_err();
            assert!(matches!(err, ServiceError::ValidationError(_)));
        }
    }

    #[tokio::test]
    async fn listing_for_missing_account_is_not_found() {
        let mut account_repo = MockAccountRepository::new();
        account_repo.expect_find_by_id().returning(|_| Ok(None));

        let (service, _rx) = service(account_repo, MockTransactionRepository::new());
        let err = service
            .list_account_transactions(Uuid::new_v4(), 1, 20)
            .await
            .unwrap_err();

        assert!(matches!(err, ServiceError::NotFound(_)));
    }
}
