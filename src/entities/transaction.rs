use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Ledger entry categories
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize, ToSchema,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(32))")]
pub enum TransactionType {
    #[sea_orm(string_value = "DEPOSIT")]
    #[serde(rename = "DEPOSIT")]
    Deposit,
    #[sea_orm(string_value = "WITHDRAWAL")]
    #[serde(rename = "WITHDRAWAL")]
    Withdrawal,
    #[sea_orm(string_value = "TRANSFER")]
    #[serde(rename = "TRANSFER")]
    Transfer,
}

/// Append-only ledger entry recording one movement on one account
///
/// A transfer produces exactly two rows in one commit: a negative-amount
/// entry on the source account and a matching positive entry on the target.
/// `balance` snapshots the account's balance after the entry was applied.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "transactions")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    /// Account whose balance this entry affected
    pub account_id: Uuid,

    /// Transfer provenance, None for single-leg operations
    pub source_account_id: Option<Uuid>,
    pub target_account_id: Option<Uuid>,

    /// Signed amount, negative for debits
    #[sea_orm(column_type = "Decimal(Some((16, 2)))")]
    pub amount: Decimal,

    /// Account balance after this entry was applied
    #[sea_orm(column_type = "Decimal(Some((16, 2)))")]
    pub balance: Decimal,

    pub transaction_type: TransactionType,

    pub description: String,

    pub transaction_date: DateTime<Utc>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::account::Entity",
        from = "Column::AccountId",
        to = "super::account::Column::Id"
    )]
    Account,
}

impl Related<super::account::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Account.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    /// True for debit legs (withdrawals and outgoing transfers)
    pub fn is_debit(&self) -> bool {
        self.amount < Decimal::ZERO
    }
}
