pub mod account;
pub mod transaction;
pub mod user;
