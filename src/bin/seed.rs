//! Seeds the database with demo users, accounts, and transaction history.

use anyhow::Context;
use rand::Rng;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use sea_orm::{ConnectionTrait, Statement};
use tracing::info;

use drank_api as api;
use drank_api::entities::account::AccountType;
use drank_api::services::accounts::CreateAccountRequest;
use drank_api::services::transactions::{DepositRequest, WithdrawRequest};
use drank_api::services::users::CreateUserRequest;

const DEMO_PASSWORD: &str = "password123";
const OPENING_BALANCE: Decimal = dec!(5000.00);

const DEPOSIT_DESCRIPTIONS: &[&str] = &[
    "Salary deposit",
    "Refund",
    "Interest earned",
    "Client payment",
    "Tax return",
];

const WITHDRAWAL_DESCRIPTIONS: &[&str] = &[
    "ATM withdrawal",
    "Online purchase",
    "Bill payment",
    "Subscription payment",
    "Rent payment",
];

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let mut cfg = api::config::load_config()?;
    cfg.auto_migrate = true;
    api::config::init_tracing(cfg.log_level(), cfg.log_json);

    let (state, event_rx) = api::build_state(cfg).await?;
    tokio::spawn(api::events::process_events(event_rx));

    clear_data(&state).await?;

    let demo_users = [
        ("john.doe@example.com", "John", "Doe"),
        ("jane.smith@example.com", "Jane", "Smith"),
    ];

    for (email, first_name, last_name) in demo_users {
        let user = state
            .services
            .users
            .create_user(CreateUserRequest {
                email: email.to_string(),
                password: DEMO_PASSWORD.to_string(),
                first_name: first_name.to_string(),
                last_name: last_name.to_string(),
            })
            .await
            .with_context(|| format!("seeding user {}", email))?;

        info!(email, user_id = %user.id, "Seeded user");

        for account_type in [AccountType::Checking, AccountType::Savings] {
            let account = state
                .services
                .accounts
                .create_account(CreateAccountRequest {
                    user_id: user.id,
                    account_type,
                    account_number: None,
                    initial_balance: Some(OPENING_BALANCE),
                })
                .await
                .context("seeding account")?;

            info!(account_number = %account.account_number, "Seeded account");
            seed_activity(&state, account.id).await?;
        }
    }

    info!("Seed complete");
    Ok(())
}

/// Removes existing rows so the seed is repeatable. Children first to
/// respect foreign keys.
async fn clear_data(state: &api::AppState) -> anyhow::Result<()> {
    let backend = state.db.get_database_backend();
    for table in ["transactions", "accounts", "users"] {
        state
            .db
            .execute(Statement::from_string(
                backend,
                format!("DELETE FROM {}", table),
            ))
            .await
            .with_context(|| format!("clearing table {}", table))?;
    }
    Ok(())
}

/// Adds 10-15 random deposits and withdrawals to an account
async fn seed_activity(state: &api::AppState, account_id: uuid::Uuid) -> anyhow::Result<()> {
    let count = rand::thread_rng().gen_range(10..=15);

    for _ in 0..count {
        let cents: i64 = rand::thread_rng().gen_range(1_000..=100_000);
        let amount = Decimal::new(cents, 2);
        let is_deposit = rand::thread_rng().gen_bool(0.5);

        if is_deposit {
            let description = random_choice(DEPOSIT_DESCRIPTIONS);
            state
                .services
                .transactions
                .deposit(DepositRequest {
                    account_id,
                    amount,
                    description: Some(description),
                })
                .await
                .context("seeding deposit")?;
        } else {
            let description = random_choice(WITHDRAWAL_DESCRIPTIONS);
            // Skip withdrawals the balance cannot cover
            let result = state
                .services
                .transactions
                .withdraw(WithdrawRequest {
                    account_id,
                    amount,
                    description: Some(description),
                })
                .await;
            if let Err(api::errors::ServiceError::InsufficientFunds(_)) = result {
                continue;
            }
            result.context("seeding withdrawal")?;
        }
    }

    Ok(())
}

fn random_choice(options: &[&str]) -> String {
    let idx = rand::thread_rng().gen_range(0..options.len());
    options[idx].to_string()
}
