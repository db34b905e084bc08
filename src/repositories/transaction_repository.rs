use async_trait::async_trait;
use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::{
    sea_query::Expr, ActiveModelTrait, ColumnTrait, DatabaseConnection, DatabaseTransaction,
    EntityTrait, PaginatorTrait, QueryFilter, QueryOrder, Set, TransactionError, TransactionTrait,
};
use std::sync::Arc;
use uuid::Uuid;

use crate::entities::{account, transaction, transaction::TransactionType};
use crate::errors::ServiceError;
use crate::repositories::account_repository::find_by_id_for_update;

/// Both ledger legs written by a committed transfer
#[derive(Debug, Clone)]
pub struct TransferRecord {
    pub source_entry: transaction::Model,
    pub target_entry: transaction::Model,
}

/// Storage operations for the append-only transaction ledger
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TransactionRepository: Send + Sync {
    /// Inserts a pre-built ledger row as-is. Balance maintenance is the
    /// caller's concern; prefer the atomic operations below.
    async fn create(&self, entry: transaction::Model)
        -> Result<transaction::Model, ServiceError>;

    async fn find_by_id(&self, id: Uuid) -> Result<Option<transaction::Model>, ServiceError>;

    /// Ledger entries for one account, newest first
    async fn find_by_account_id(
        &self,
        account_id: Uuid,
        page: u64,
        per_page: u64,
    ) -> Result<(Vec<transaction::Model>, u64), ServiceError>;

    async fn find_all(
        &self,
        page: u64,
        per_page: u64,
    ) -> Result<(Vec<transaction::Model>, u64), ServiceError>;

    /// Applies a single signed entry (deposit or withdrawal) to one account:
    /// balance update plus ledger row in one transaction. A debit that would
    /// take the balance negative fails with `InsufficientFunds` and writes
    /// nothing.
    async fn create_entry_atomic(
        &self,
        account_id: Uuid,
        amount: Decimal,
        entry_type: TransactionType,
        description: String,
    ) -> Result<transaction::Model, ServiceError>;

    /// Moves `amount` between two accounts as one unit: both balance
    /// updates and both ledger legs commit together or not at all.
    async fn create_transfer_atomic(
        &self,
        source_account_id: Uuid,
        target_account_id: Uuid,
        amount: Decimal,
        description: String,
    ) -> Result<TransferRecord, ServiceError>;
}

/// SeaORM-backed transaction repository
#[derive(Clone)]
pub struct SqlTransactionRepository {
    db: Arc<DatabaseConnection>,
}

impl SqlTransactionRepository {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }
}

fn to_active_model(entry: transaction::Model) -> transaction::ActiveModel {
    transaction::ActiveModel {
        id: Set(entry.id),
        account_id: Set(entry.account_id),
        source_account_id: Set(entry.source_account_id),
        target_account_id: Set(entry.target_account_id),
        amount: Set(entry.amount),
        balance: Set(entry.balance),
        transaction_type: Set(entry.transaction_type),
        description: Set(entry.description),
        transaction_date: Set(entry.transaction_date),
        created_at: Set(entry.created_at),
        updated_at: Set(entry.updated_at),
    }
}

/// Debits `amount` from an account, guarded so a stale read can never
/// overdraw: the update only matches while `balance >= amount`.
async fn guarded_debit(
    txn: &DatabaseTransaction,
    account_id: Uuid,
    amount: Decimal,
) -> Result<(), ServiceError> {
    let result = account::Entity::update_many()
        .col_expr(
            account::Column::Balance,
            Expr::col(account::Column::Balance).sub(amount),
        )
        .col_expr(account::Column::UpdatedAt, Expr::value(Utc::now()))
        .filter(account::Column::Id.eq(account_id))
        .filter(account::Column::Balance.gte(amount))
        .exec(txn)
        .await
        .map_err(ServiceError::db_error)?;

    if result.rows_affected == 0 {
        return Err(ServiceError::InsufficientFunds(format!(
            "account {} has insufficient funds for amount {}",
            account_id, amount
        )));
    }
    Ok(())
}

async fn credit(
    txn: &DatabaseTransaction,
    account_id: Uuid,
    amount: Decimal,
) -> Result<(), ServiceError> {
    account::Entity::update_many()
        .col_expr(
            account::Column::Balance,
            Expr::col(account::Column::Balance).add(amount),
        )
        .col_expr(account::Column::UpdatedAt, Expr::value(Utc::now()))
        .filter(account::Column::Id.eq(account_id))
        .exec(txn)
        .await
        .map_err(ServiceError::db_error)?;
    Ok(())
}

/// Authoritative post-update balance, read inside the same transaction
async fn reread_balance(
    txn: &DatabaseTransaction,
    account_id: Uuid,
) -> Result<Decimal, ServiceError> {
    account::Entity::find_by_id(account_id)
        .one(txn)
        .await
        .map_err(ServiceError::db_error)?
        .map(|a| a.balance)
        .ok_or_else(|| {
            ServiceError::InternalError(format!("account {} vanished mid-transaction", account_id))
        })
}

#[async_trait]
impl TransactionRepository for SqlTransactionRepository {
    async fn create(
        &self,
        entry: transaction::Model,
    ) -> Result<transaction::Model, ServiceError> {
        to_active_model(entry)
            .insert(&*self.db)
            .await
            .map_err(ServiceError::db_error)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<transaction::Model>, ServiceError> {
        transaction::Entity::find_by_id(id)
            .one(&*self.db)
            .await
            .map_err(ServiceError::db_error)
    }

    async fn find_by_account_id(
        &self,
        account_id: Uuid,
        page: u64,
        per_page: u64,
    ) -> Result<(Vec<transaction::Model>, u64), ServiceError> {
        let paginator = transaction::Entity::find()
            .filter(transaction::Column::AccountId.eq(account_id))
            .order_by_desc(transaction::Column::TransactionDate)
            .paginate(&*self.db, per_page);

        let total = paginator.num_items().await.map_err(ServiceError::db_error)?;
        let entries = paginator
            .fetch_page(page.saturating_sub(1))
            .await
            .map_err(ServiceError::db_error)?;

        Ok((entries, total))
    }

    async fn find_all(
        &self,
        page: u64,
        per_page: u64,
    ) -> Result<(Vec<transaction::Model>, u64), ServiceError> {
        let paginator = transaction::Entity::find()
            .order_by_desc(transaction::Column::TransactionDate)
            .paginate(&*self.db, per_page);

        let total = paginator.num_items().await.map_err(ServiceError::db_error)?;
        let entries = paginator
            .fetch_page(page.saturating_sub(1))
            .await
            .map_err(ServiceError::db_error)?;

        Ok((entries, total))
    }

    async fn create_entry_atomic(
        &self,
        account_id: Uuid,
        amount: Decimal,
        entry_type: TransactionType,
        description: String,
    ) -> Result<transaction::Model, ServiceError> {
        let db = self.db.clone();
        db.transaction::<_, transaction::Model, ServiceError>(move |txn| {
            Box::pin(async move {
                let account = find_by_id_for_update(txn, account_id)
                    .await?
                    .ok_or_else(|| ServiceError::NotFound("account not found".to_string()))?;

                if amount < Decimal::ZERO {
                    guarded_debit(txn, account_id, -amount).await?;
                } else {
                    credit(txn, account_id, amount).await?;
                }

                let balance = reread_balance(txn, account_id).await?;
                let now = Utc::now();

                let entry = transaction::ActiveModel {
                    id: Set(Uuid::new_v4()),
                    account_id: Set(account.id),
                    source_account_id: Set(None),
                    target_account_id: Set(None),
                    amount: Set(amount),
                    balance: Set(balance),
                    transaction_type: Set(entry_type),
                    description: Set(description),
                    transaction_date: Set(now),
                    created_at: Set(now),
                    updated_at: Set(now),
                };

                entry.insert(txn).await.map_err(ServiceError::db_error)
            })
        })
        .await
        .map_err(|e| match e {
            TransactionError::Connection(db_err) => ServiceError::db_error(db_err),
            TransactionError::Transaction(service_err) => service_err,
        })
    }

    async fn create_transfer_atomic(
        &self,
        source_account_id: Uuid,
        target_account_id: Uuid,
        amount: Decimal,
        description: String,
    ) -> Result<TransferRecord, ServiceError> {
        let db = self.db.clone();
        db.transaction::<_, TransferRecord, ServiceError>(move |txn| {
            Box::pin(async move {
                // Lock both rows in ascending id order so concurrent
                // transfers between the same pair cannot deadlock.
                let (first_id, second_id) = if source_account_id < target_account_id {
                    (source_account_id, target_account_id)
                } else {
                    (target_account_id, source_account_id)
                };

                let first = find_by_id_for_update(txn, first_id).await?;
                let second = find_by_id_for_update(txn, second_id).await?;

                let (source, target) = if first_id == source_account_id {
                    (first, second)
                } else {
                    (second, first)
                };

                let source = source.ok_or_else(|| {
                    ServiceError::NotFound("source account not found".to_string())
                })?;
                let target = target.ok_or_else(|| {
                    ServiceError::NotFound("target account not found".to_string())
                })?;

                if source.balance < amount {
                    return Err(ServiceError::InsufficientFunds(format!(
                        "account {} balance {} is less than transfer amount {}",
                        source.account_number, source.balance, amount
                    )));
                }

                guarded_debit(txn, source.id, amount).await?;
                credit(txn, target.id, amount).await?;

                let source_balance = reread_balance(txn, source.id).await?;
                let target_balance = reread_balance(txn, target.id).await?;
                let now = Utc::now();

                let debit_entry = transaction::ActiveModel {
                    id: Set(Uuid::new_v4()),
                    account_id: Set(source.id),
                    source_account_id: Set(Some(source.id)),
                    target_account_id: Set(Some(target.id)),
                    amount: Set(-amount),
                    balance: Set(source_balance),
                    transaction_type: Set(TransactionType::Transfer),
                    description: Set(format!(
                        "Transfer to account {}: {}",
                        target.account_number, description
                    )),
                    transaction_date: Set(now),
                    created_at: Set(now),
                    updated_at: Set(now),
                };

                let credit_entry = transaction::ActiveModel {
                    id: Set(Uuid::new_v4()),
                    account_id: Set(target.id),
                    source_account_id: Set(Some(source.id)),
                    target_account_id: Set(Some(target.id)),
                    amount: Set(amount),
                    balance: Set(target_balance),
                    transaction_type: Set(TransactionType::Transfer),
                    description: Set(format!(
                        "Transfer from account {}: {}",
                        source.account_number, description
                    )),
                    transaction_date: Set(now),
                    created_at: Set(now),
                    updated_at: Set(now),
                };

                let source_entry =
                    debit_entry.insert(txn).await.map_err(ServiceError::db_error)?;
                let target_entry =
                    credit_entry.insert(txn).await.map_err(ServiceError::db_error)?;

                Ok(TransferRecord {
                    source_entry,
                    target_entry,
                })
            })
        })
        .await
        .map_err(|e| match e {
            TransactionError::Connection(db_err) => ServiceError::db_error(db_err),
            TransactionError::Transaction(service_err) => service_err,
        })
    }
}
