pub mod account_repository;
pub mod transaction_repository;

pub use account_repository::{AccountRepository, SqlAccountRepository};
pub use transaction_repository::{SqlTransactionRepository, TransactionRepository, TransferRecord};

#[cfg(test)]
pub use account_repository::MockAccountRepository;
#[cfg(test)]
pub use transaction_repository::MockTransactionRepository;
