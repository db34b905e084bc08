pub mod accounts;
pub mod transactions;
pub mod users;

pub use accounts::AccountService;
pub use transactions::TransactionService;
pub use users::UserService;
