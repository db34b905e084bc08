pub mod accounts;
pub mod auth;
pub mod common;
pub mod transactions;
pub mod users;

use sea_orm::DatabaseConnection;
use std::sync::Arc;

use crate::auth::AuthService;
use crate::config::AppConfig;
use crate::events::EventSender;
use crate::services::{AccountService, TransactionService, UserService};

/// Bundle of the domain services handlers dispatch into
#[derive(Clone)]
pub struct AppServices {
    pub users: Arc<UserService>,
    pub accounts: Arc<AccountService>,
    pub transactions: Arc<TransactionService>,
}

/// Shared application state available to every handler
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<DatabaseConnection>,
    pub config: AppConfig,
    pub event_sender: EventSender,
    pub auth_service: Arc<AuthService>,
    pub services: AppServices,
}
