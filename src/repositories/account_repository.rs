use async_trait::async_trait;
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, DatabaseTransaction,
    DbBackend, DbErr, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, Set,
};
use std::sync::Arc;
use uuid::Uuid;

use crate::entities::account;
use crate::errors::ServiceError;

/// Storage operations for accounts
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait AccountRepository: Send + Sync {
    /// Persists a new account. A duplicate account number is a `Conflict`.
    async fn create(&self, account: account::Model) -> Result<account::Model, ServiceError>;

    async fn find_by_id(&self, id: Uuid) -> Result<Option<account::Model>, ServiceError>;

    /// All accounts belonging to a user, newest first
    async fn find_by_user_id(&self, user_id: Uuid) -> Result<Vec<account::Model>, ServiceError>;

    async fn find_all(
        &self,
        page: u64,
        per_page: u64,
    ) -> Result<(Vec<account::Model>, u64), ServiceError>;

    async fn update(&self, account: account::Model) -> Result<account::Model, ServiceError>;

    /// Removes the account row. Ledger entries referencing it are kept.
    async fn delete(&self, id: Uuid) -> Result<bool, ServiceError>;
}

/// Row-locked read inside an open transaction.
///
/// Postgres takes FOR UPDATE; SQLite has no row locks, so the plain read
/// relies on the single-writer serialization of the transaction itself.
pub async fn find_by_id_for_update(
    txn: &DatabaseTransaction,
    id: Uuid,
) -> Result<Option<account::Model>, ServiceError> {
    let mut query = account::Entity::find_by_id(id);
    if txn.get_database_backend() == DbBackend::Postgres {
        query = query.lock_exclusive();
    }
    query.one(txn).await.map_err(ServiceError::db_error)
}

/// SeaORM-backed account repository
#[derive(Clone)]
pub struct SqlAccountRepository {
    db: Arc<DatabaseConnection>,
}

impl SqlAccountRepository {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }
}

#[async_trait]
impl AccountRepository for SqlAccountRepository {
    async fn create(&self, model: account::Model) -> Result<account::Model, ServiceError> {
        let active = account::ActiveModel {
            id: Set(model.id),
            user_id: Set(model.user_id),
            account_number: Set(model.account_number.clone()),
            account_type: Set(model.account_type),
            balance: Set(model.balance),
            created_at: Set(model.created_at),
            updated_at: Set(model.updated_at),
        };

        active.insert(&*self.db).await.map_err(|e| {
            if matches!(e.sql_err(), Some(sea_orm::SqlErr::UniqueConstraintViolation(_))) {
                ServiceError::Conflict(format!(
                    "account number {} already exists",
                    model.account_number
                ))
            } else {
                ServiceError::db_error(e)
            }
        })
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<account::Model>, ServiceError> {
        account::Entity::find_by_id(id)
            .one(&*self.db)
            .await
            .map_err(ServiceError::db_error)
    }

    async fn find_by_user_id(&self, user_id: Uuid) -> Result<Vec<account::Model>, ServiceError> {
        account::Entity::find()
            .filter(account::Column::UserId.eq(user_id))
            .order_by_desc(account::Column::CreatedAt)
            .all(&*self.db)
            .await
            .map_err(ServiceError::db_error)
    }

    async fn find_all(
        &self,
        page: u64,
        per_page: u64,
    ) -> Result<(Vec<account::Model>, u64), ServiceError> {
        let paginator = account::Entity::find()
            .order_by_desc(account::Column::CreatedAt)
            .paginate(&*self.db, per_page);

        let total = paginator.num_items().await.map_err(ServiceError::db_error)?;
        let accounts = paginator
            .fetch_page(page.saturating_sub(1))
            .await
            .map_err(ServiceError::db_error)?;

        Ok((accounts, total))
    }

    async fn update(&self, model: account::Model) -> Result<account::Model, ServiceError> {
        let active = account::ActiveModel {
            id: Set(model.id),
            user_id: Set(model.user_id),
            account_number: Set(model.account_number),
            account_type: Set(model.account_type),
            balance: Set(model.balance),
            created_at: Set(model.created_at),
            updated_at: Set(Utc::now()),
        };

        active.update(&*self.db).await.map_err(|e| match e {
            DbErr::RecordNotUpdated => ServiceError::NotFound("account not found".to_string()),
            other => ServiceError::db_error(other),
        })
    }

    async fn delete(&self, id: Uuid) -> Result<bool, ServiceError> {
        let result = account::Entity::delete_by_id(id)
            .exec(&*self.db)
            .await
            .map_err(ServiceError::db_error)?;

        Ok(result.rows_affected > 0)
    }
}
