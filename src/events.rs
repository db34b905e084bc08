use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::info;
use uuid::Uuid;

/// Domain events emitted after state changes commit.
///
/// Publishing is best-effort: a full or closed channel never fails the
/// request that produced the event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Event {
    UserCreated(Uuid),
    AccountCreated(Uuid),
    AccountDeleted(Uuid),
    DepositRecorded {
        account_id: Uuid,
        amount: Decimal,
    },
    WithdrawalRecorded {
        account_id: Uuid,
        amount: Decimal,
    },
    TransferCompleted {
        source_account_id: Uuid,
        target_account_id: Uuid,
        amount: Decimal,
    },
}

#[derive(Debug, Clone)]
pub struct EventSender {
    sender: mpsc::Sender<Event>,
}

impl EventSender {
    /// Creates a new EventSender
    pub fn new(sender: mpsc::Sender<Event>) -> Self {
        Self { sender }
    }

    /// Sends an event asynchronously
    pub async fn send(&self, event: Event) -> Result<(), String> {
        self.sender
            .send(event)
            .await
            .map_err(|e| format!("Failed to send event: {}", e))
    }
}

/// Creates a bounded event channel with the given capacity
pub fn event_channel(capacity: usize) -> (EventSender, mpsc::Receiver<Event>) {
    let (tx, rx) = mpsc::channel(capacity);
    (EventSender::new(tx), rx)
}

/// Drains the event channel, logging each event as it arrives.
/// Runs until every sender is dropped.
pub async fn process_events(mut rx: mpsc::Receiver<Event>) {
    info!("Starting event processing loop");

    while let Some(event) = rx.recv().await {
        match &event {
            Event::UserCreated(user_id) => {
                info!(user_id = %user_id, "User created");
            }
            Event::AccountCreated(account_id) => {
                info!(account_id = %account_id, "Account created");
            }
            Event::AccountDeleted(account_id) => {
                info!(account_id = %account_id, "Account deleted");
            }
            Event::DepositRecorded { account_id, amount } => {
                info!(account_id = %account_id, amount = %amount, "Deposit recorded");
            }
            Event::WithdrawalRecorded { account_id, amount } => {
                info!(account_id = %account_id, amount = %amount, "Withdrawal recorded");
            }
            Event::TransferCompleted {
                source_account_id,
                target_account_id,
                amount,
            } => {
                info!(
                    source_account_id = %source_account_id,
                    target_account_id = %target_account_id,
                    amount = %amount,
                    "Transfer completed"
                );
            }
        }
    }

    info!("Event processing loop stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[tokio::test]
    async fn send_succeeds_while_receiver_alive() {
        let (sender, mut rx) = event_channel(4);
        sender
            .send(Event::DepositRecorded {
                account_id: Uuid::new_v4(),
                amount: dec!(25.00),
            })
            .await
            .unwrap();

        assert!(matches!(
            rx.recv().await,
            Some(Event::DepositRecorded { .. })
        ));
    }

    #[tokio::test]
    async fn send_reports_error_after_receiver_dropped() {
        let (sender, rx) = event_channel(1);
        drop(rx);
        let result = sender.send(Event::UserCreated(Uuid::new_v4())).await;
        assert!(result.is_err());
    }
}
