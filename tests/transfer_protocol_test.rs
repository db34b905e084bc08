mod common;

use axum::http::{Method, StatusCode};
use rust_decimal_macros::dec;
use sea_orm::{ConnectionTrait, Statement};
use serde_json::json;
use uuid::Uuid;

use common::{decimal_field, read_json, TestApp};
use drank_api::errors::ServiceError;
use drank_api::services::transactions::TransferRequest;

#[tokio::test]
async fn transfer_moves_funds_and_records_both_ledger_legs() {
    let app = TestApp::new().await;
    let (token, user_id) = app.register_and_login("alice@example.com").await;

    let source = app.create_account(&token, user_id, Some("100.00")).await;
    let target = app.create_account(&token, user_id, Some("50.00")).await;
    let source_id = source["id"].as_str().unwrap();
    let target_id = target["id"].as_str().unwrap();
    let source_number = source["account_number"].as_str().unwrap();
    let target_number = target["account_number"].as_str().unwrap();

    let response = app
        .request(
            Method::POST,
            "/api/v1/transactions/transfer",
            Some(json!({
                "source_account_id": source_id,
                "target_account_id": target_id,
                "amount": "25.00",
                "description": "rent",
            })),
            Some(&token),
        )
        .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let result = read_json(response).await;

    let debit = &result["source_transaction"];
    let credit = &result["target_transaction"];

    assert_eq!(decimal_field(debit, "amount"), dec!(-25.00));
    assert_eq!(decimal_field(debit, "balance"), dec!(75.00));
    assert_eq!(debit["transaction_type"], "TRANSFER");
    assert_eq!(debit["account_id"].as_str().unwrap(), source_id);
    assert_eq!(
        debit["description"].as_str().unwrap(),
        format!("Transfer to account {}: rent", target_number)
    );

    assert_eq!(decimal_field(credit, "amount"), dec!(25.00));
    assert_eq!(decimal_field(credit, "balance"), dec!(75.00));
    assert_eq!(credit["transaction_type"], "TRANSFER");
    assert_eq!(credit["account_id"].as_str().unwrap(), target_id);
    assert_eq!(
        credit["description"].as_str().unwrap(),
        format!("Transfer from account {}: rent", source_number)
    );

    // Both legs reference the same pair of accounts
    for leg in [debit, credit] {
        assert_eq!(leg["source_account_id"].as_str().unwrap(), source_id);
        assert_eq!(leg["target_account_id"].as_str().unwrap(), target_id);
    }

    assert_eq!(app.account_balance(&token, source_id).await, dec!(75.00));
    assert_eq!(app.account_balance(&token, target_id).await, dec!(75.00));
}

#[tokio::test]
async fn insufficient_funds_returns_422_and_leaves_state_untouched() {
    let app = TestApp::new().await;
    let (token, user_id) = app.register_and_login("bob@example.com").await;

    let source = app.create_account(&token, user_id, Some("10.00")).await;
    let target = app.create_account(&token, user_id, Some("0.00")).await;
    let source_id = source["id"].as_str().unwrap();
    let target_id = target["id"].as_str().unwrap();

    let response = app
        .request(
            Method::POST,
            "/api/v1/transactions/transfer",
            Some(json!({
                "source_account_id": source_id,
                "target_account_id": target_id,
                "amount": "100.00",
            })),
            Some(&token),
        )
        .await;
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let body = read_json(response).await;
    assert!(body["message"]
        .as_str()
        .unwrap()
        .contains("Insufficient funds"));

    assert_eq!(app.account_balance(&token, source_id).await, dec!(10.00));
    assert_eq!(app.account_balance(&token, target_id).await, dec!(0.00));

    // Only the opening deposit is on the source ledger; no transfer leg
    // was written.
    let response = app
        .request(
            Method::GET,
            &format!("/api/v1/transactions/account/{}", source_id),
            None,
            Some(&token),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let listing = read_json(response).await;
    assert_eq!(listing["data"].as_array().unwrap().len(), 1);
    assert_eq!(listing["data"][0]["transaction_type"], "DEPOSIT");
}

#[tokio::test]
async fn transfer_to_missing_target_is_404_without_partial_debit() {
    let app = TestApp::new().await;
    let (token, user_id) = app.register_and_login("carol@example.com").await;

    let source = app.create_account(&token, user_id, Some("100.00")).await;
    let source_id = source["id"].as_str().unwrap();

    let response = app
        .request(
            Method::POST,
            "/api/v1/transactions/transfer",
            Some(json!({
                "source_account_id": source_id,
                "target_account_id": Uuid::new_v4(),
                "amount": "25.00",
            })),
            Some(&token),
        )
        .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let body = read_json(response).await;
    assert!(body["message"]
        .as_str()
        .unwrap()
        .contains("target account not found"));

    // All-or-nothing: the source was not debited
    assert_eq!(app.account_balance(&token, source_id).await, dec!(100.00));
}

#[tokio::test]
async fn transfer_from_missing_source_is_404() {
    let app = TestApp::new().await;
    let (token, user_id) = app.register_and_login("dave@example.com").await;

    let target = app.create_account(&token, user_id, None).await;

    let response = app
        .request(
            Method::POST,
            "/api/v1/transactions/transfer",
            Some(json!({
                "source_account_id": Uuid::new_v4(),
                "target_account_id": target["id"].as_str().unwrap(),
                "amount": "25.00",
            })),
            Some(&token),
        )
        .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let body = read_json(response).await;
    assert!(body["message"]
        .as_str()
        .unwrap()
        .contains("source account not found"));
}

#[tokio::test]
async fn self_transfer_is_rejected() {
    let app = TestApp::new().await;
    let (token, user_id) = app.register_and_login("erin@example.com").await;

    let account = app.create_account(&token, user_id, Some("100.00")).await;
    let account_id = account["id"].as_str().unwrap();

    let response = app
        .request(
            Method::POST,
            "/api/v1/transactions/transfer",
            Some(json!({
                "source_account_id": account_id,
                "target_account_id": account_id,
                "amount": "25.00",
            })),
            Some(&token),
        )
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = read_json(response).await;
    assert!(body["message"]
        .as_str()
        .unwrap()
        .contains("cannot transfer to the same account"));

    assert_eq!(app.account_balance(&token, account_id).await, dec!(100.00));
}

#[tokio::test]
async fn non_positive_amounts_are_rejected_before_account_lookup() {
    let app = TestApp::new().await;
    let (token, _user_id) = app.register_and_login("frank@example.com").await;

    // Accounts do not exist; the amount error must still win.
    for amount in ["0.00", "-5.00"] {
        let response = app
            .request(
                Method::POST,
                "/api/v1/transactions/transfer",
                Some(json!({
                    "source_account_id": Uuid::new_v4(),
                    "target_account_id": Uuid::new_v4(),
                    "amount": amount,
                })),
                Some(&token),
            )
            .await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = read_json(response).await;
        assert!(body["message"]
            .as_str()
            .unwrap()
            .contains("transfer amount must be positive"));
    }
}

#[tokio::test]
async fn transfer_from_another_users_account_is_forbidden() {
    let app = TestApp::new().await;
    let (alice_token, alice_id) = app.register_and_login("alice2@example.com").await;
    let (mallory_token, mallory_id) = app.register_and_login("mallory@example.com").await;

    let alice_account = app
        .create_account(&alice_token, alice_id, Some("100.00"))
        .await;
    let mallory_account = app
        .create_account(&mallory_token, mallory_id, None)
        .await;

    let response = app
        .request(
            Method::POST,
            "/api/v1/transactions/transfer",
            Some(json!({
                "source_account_id": alice_account["id"].as_str().unwrap(),
                "target_account_id": mallory_account["id"].as_str().unwrap(),
                "amount": "100.00",
            })),
            Some(&mallory_token),
        )
        .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    assert_eq!(
        app.account_balance(&alice_token, alice_account["id"].as_str().unwrap())
            .await,
        dec!(100.00)
    );
}

#[tokio::test]
async fn transfer_without_token_is_unauthorized() {
    let app = TestApp::new().await;

    let response = app
        .request(
            Method::POST,
            "/api/v1/transactions/transfer",
            Some(json!({
                "source_account_id": Uuid::new_v4(),
                "target_account_id": Uuid::new_v4(),
                "amount": "25.00",
            })),
            None,
        )
        .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn failure_after_debit_rolls_back_balances_and_ledger() {
    let app = TestApp::new().await;
    let (token, user_id) = app.register_and_login("holly@example.com").await;

    let source = app.create_account(&token, user_id, Some("100.00")).await;
    let target = app.create_account(&token, user_id, Some("40.00")).await;
    let source_id = Uuid::parse_str(source["id"].as_str().unwrap()).unwrap();
    let target_id = Uuid::parse_str(target["id"].as_str().unwrap()).unwrap();

    // Reject the credit-leg insert, which runs after both balance
    // updates and the debit leg have already been applied inside the
    // transfer transaction.
    let backend = app.state.db.get_database_backend();
    app.state
        .db
        .execute(Statement::from_string(
            backend,
            "CREATE TRIGGER reject_credit_leg BEFORE INSERT ON transactions \
             WHEN NEW.description LIKE 'Transfer from%storage drill%' \
             BEGIN SELECT RAISE(ABORT, 'credit leg rejected'); END",
        ))
        .await
        .expect("install fault trigger");

    let err = app
        .state
        .services
        .transactions
        .transfer(TransferRequest {
            source_account_id: source_id,
            target_account_id: target_id,
            amount: dec!(25.00),
            description: Some("storage drill".into()),
        })
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::DatabaseError(_)));

    // Everything rolled back: balances untouched, only the opening
    // deposits on either ledger.
    assert_eq!(
        app.account_balance(&token, &source_id.to_string()).await,
        dec!(100.00)
    );
    assert_eq!(
        app.account_balance(&token, &target_id.to_string()).await,
        dec!(40.00)
    );

    for id in [source_id, target_id] {
        let response = app
            .request(
                Method::GET,
                &format!("/api/v1/transactions/account/{}", id),
                None,
                Some(&token),
            )
            .await;
        assert_eq!(response.status(), StatusCode::OK);
        let listing = read_json(response).await;
        let entries = listing["data"].as_array().unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0]["transaction_type"], "DEPOSIT");
    }
}

#[tokio::test]
async fn concurrent_overdraw_lets_exactly_one_transfer_through() {
    let app = TestApp::new().await;
    let (token, user_id) = app.register_and_login("grace@example.com").await;

    let source = app.create_account(&token, user_id, Some("100.00")).await;
    let target = app.create_account(&token, user_id, Some("0.00")).await;
    let source_id = Uuid::parse_str(source["id"].as_str().unwrap()).unwrap();
    let target_id = Uuid::parse_str(target["id"].as_str().unwrap()).unwrap();

    // Two simultaneous transfers of 80.00 out of a 100.00 account. The
    // guarded debit allows at most one to commit.
    let mut handles = Vec::new();
    for _ in 0..2 {
        let transactions = app.state.services.transactions.clone();
        handles.push(tokio::spawn(async move {
            transactions
                .transfer(TransferRequest {
                    source_account_id: source_id,
                    target_account_id: target_id,
                    amount: dec!(80.00),
                    description: None,
                })
                .await
        }));
    }

    let mut successes = 0;
    let mut insufficient = 0;
    for handle in handles {
        match handle.await.expect("transfer task panicked") {
            Ok(_) => successes += 1,
            Err(ServiceError::InsufficientFunds(_)) => insufficient += 1,
            Err(other) => panic!("unexpected transfer error: {}", other),
        }
    }
    assert_eq!(successes, 1);
    assert_eq!(insufficient, 1);

    let source_balance = app.account_balance(&token, &source_id.to_string()).await;
    let target_balance = app.account_balance(&token, &target_id.to_string()).await;
    assert_eq!(source_balance, dec!(20.00));
    assert_eq!(target_balance, dec!(80.00));
    // Money is conserved across the pair
    assert_eq!(source_balance + target_balance, dec!(100.00));
}
