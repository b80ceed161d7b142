use futures::stream::{self, StreamExt};
use sea_orm::{DatabaseConnection, DbErr};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{error, warn};

use super::cooldown::SendCooldown;
use super::{SenderError, SmsSender};
use crate::db::entities::contact;
use crate::db::services::{contact_service, sms_log_service};

/// Minimum interval between accepted broadcast calls.
pub const SEND_COOLDOWN: Duration = Duration::from_millis(5000);

/// Upper bound on simultaneous in-flight provider calls during one fan-out.
const MAX_IN_FLIGHT_SENDS: usize = 16;

#[derive(Error, Debug)]
pub enum BroadcastError {
    #[error("Please wait {0} seconds before sending again")]
    CoolingDown(u64),
    #[error("Message is required")]
    EmptyMessage,
    #[error("No contacts found")]
    NoContacts,
    #[error("Gateway error: {0}")]
    Gateway(#[from] SenderError),
    #[error("Database error: {0}")]
    Database(#[from] DbErr),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BroadcastOutcome {
    pub sent_count: usize,
    pub failed_count: usize,
    pub total_attempted: usize,
}

enum DispatchOutcome {
    Sent,
    Failed,
}

/// Fan-out dispatch of one message body to a resolved recipient set, with a
/// log row persisted per recipient. All-settle semantics: one recipient's
/// failure never aborts its siblings, and the caller only sees counts.
pub struct BroadcastService {
    db: DatabaseConnection,
    sender: Arc<dyn SmsSender>,
    cooldown: SendCooldown,
}

impl BroadcastService {
    pub fn new(db: DatabaseConnection, sender: Arc<dyn SmsSender>, cooldown: SendCooldown) -> Self {
        Self {
            db,
            sender,
            cooldown,
        }
    }

    pub async fn broadcast(
        &self,
        message: &str,
        category_id: Option<i32>,
    ) -> Result<BroadcastOutcome, BroadcastError> {
        if let Some(remaining) = self.cooldown.remaining() {
            return Err(BroadcastError::CoolingDown(
                remaining.as_secs_f64().ceil() as u64
            ));
        }

        if message.is_empty() {
            return Err(BroadcastError::EmptyMessage);
        }

        let contacts = contact_service::list_recipients(&self.db, category_id).await?;
        if contacts.is_empty() {
            return Err(BroadcastError::NoContacts);
        }

        // A misconfigured gateway fails the whole call here, before the first
        // dispatch, rather than once per recipient.
        self.sender.ensure_configured()?;

        // Armed once per accepted call, not per message.
        self.cooldown.arm();

        let total_attempted = contacts.len();
        let outcomes: Vec<DispatchOutcome> = stream::iter(contacts)
            .map(|recipient| self.dispatch_one(recipient, message))
            .buffer_unordered(MAX_IN_FLIGHT_SENDS)
            .collect()
            .await;

        let sent_count = outcomes
            .iter()
            .filter(|o| matches!(o, DispatchOutcome::Sent))
            .count();

        Ok(BroadcastOutcome {
            sent_count,
            failed_count: total_attempted - sent_count,
            total_attempted,
        })
    }

    async fn dispatch_one(&self, recipient: contact::Model, message: &str) -> DispatchOutcome {
        match self.sender.send(&recipient.phone_number, message).await {
            Ok(provider_msg) => {
                match sms_log_service::create_log(
                    &self.db,
                    &recipient.phone_number,
                    message,
                    &provider_msg.status,
                    Some(recipient.category_id),
                    Some(provider_msg.sid),
                )
                .await
                {
                    Ok(()) => DispatchOutcome::Sent,
                    Err(db_err) => {
                        error!(
                            recipient = %recipient.phone_number,
                            error = %db_err,
                            "message sent but log insert failed"
                        );
                        DispatchOutcome::Failed
                    }
                }
            }
            Err(send_err) => {
                warn!(
                    recipient = %recipient.phone_number,
                    error = %send_err,
                    "message dispatch failed"
                );
                if let Err(db_err) = sms_log_service::create_log(
                    &self.db,
                    &recipient.phone_number,
                    message,
                    sms_log_service::FAILED_STATUS,
                    Some(recipient.category_id),
                    None,
                )
                .await
                {
                    error!(
                        recipient = %recipient.phone_number,
                        error = %db_err,
                        "failed to record failed dispatch"
                    );
                }
                DispatchOutcome::Failed
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::messaging::ProviderMessage;
    use async_trait::async_trait;
    use chrono::Utc;
    use sea_orm::{DatabaseBackend, MockDatabase, MockExecResult};
    use std::sync::Mutex;

    struct FakeSender {
        configured: bool,
        fail_numbers: Vec<&'static str>,
        sent_to: Mutex<Vec<String>>,
    }

    impl FakeSender {
        fn new() -> Self {
            Self {
                configured: true,
                fail_numbers: Vec::new(),
                sent_to: Mutex::new(Vec::new()),
            }
        }

        fn failing_for(numbers: Vec<&'static str>) -> Self {
            Self {
                fail_numbers: numbers,
                ..Self::new()
            }
        }

        fn unconfigured() -> Self {
            Self {
                configured: false,
                ..Self::new()
            }
        }

        fn call_count(&self) -> usize {
            self.sent_to.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl SmsSender for FakeSender {
        fn ensure_configured(&self) -> Result<(), SenderError> {
            if self.configured {
                Ok(())
            } else {
                Err(SenderError::InvalidConfiguration(
                    "Twilio credentials are not configured".to_string(),
                ))
            }
        }

        async fn send(&self, to: &str, _body: &str) -> Result<ProviderMessage, SenderError> {
            self.sent_to.lock().unwrap().push(to.to_string());
            if self.fail_numbers.iter().any(|n| *n == to) {
                return Err(SenderError::SendFailed("provider rejected".to_string()));
            }
            Ok(ProviderMessage {
                sid: format!("SM-{to}"),
                status: "queued".to_string(),
            })
        }
    }

    fn contact(id: i32, phone: &str) -> contact::Model {
        contact::Model {
            id,
            phone_number: phone.to_string(),
            category_id: 1,
            created_at: Utc::now(),
        }
    }

    fn insert_ok() -> MockExecResult {
        MockExecResult {
            last_insert_id: 1,
            rows_affected: 1,
        }
    }

    #[tokio::test]
    async fn partial_failure_settles_every_recipient() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![
                contact(1, "+15550000001"),
                contact(2, "+15550000002"),
                contact(3, "+15550000003"),
            ]])
            .append_exec_results([insert_ok(), insert_ok(), insert_ok()])
            .into_connection();

        let sender = Arc::new(FakeSender::failing_for(vec!["+15550000002"]));
        let service = BroadcastService::new(
            db.clone(),
            sender.clone(),
            SendCooldown::new(SEND_COOLDOWN),
        );

        let outcome = service.broadcast("hello", Some(1)).await.unwrap();
        assert_eq!(
            outcome,
            BroadcastOutcome {
                sent_count: 2,
                failed_count: 1,
                total_attempted: 3,
            }
        );
        assert_eq!(sender.call_count(), 3);

        // One recipient select plus one log insert per recipient.
        let log = db.into_transaction_log();
        assert_eq!(log.len(), 4);
    }

    #[tokio::test]
    async fn cooldown_rejects_before_touching_the_store() {
        let db = MockDatabase::new(DatabaseBackend::Postgres).into_connection();
        let cooldown = SendCooldown::new(SEND_COOLDOWN);
        cooldown.arm();

        let sender = Arc::new(FakeSender::new());
        let service = BroadcastService::new(db.clone(), sender.clone(), cooldown);

        match service.broadcast("hello", None).await {
            Err(BroadcastError::CoolingDown(seconds)) => {
                assert!((1..=5).contains(&seconds), "{seconds}");
            }
            other => panic!("expected CoolingDown, got {other:?}"),
        }
        assert_eq!(sender.call_count(), 0);
        assert!(db.into_transaction_log().is_empty());
    }

    #[tokio::test]
    async fn empty_message_rejects_before_resolving_recipients() {
        let db = MockDatabase::new(DatabaseBackend::Postgres).into_connection();
        let sender = Arc::new(FakeSender::new());
        let service =
            BroadcastService::new(db.clone(), sender, SendCooldown::new(SEND_COOLDOWN));

        assert!(matches!(
            service.broadcast("", None).await,
            Err(BroadcastError::EmptyMessage)
        ));
        assert!(db.into_transaction_log().is_empty());
    }

    #[tokio::test]
    async fn empty_recipient_set_rejects() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([Vec::<contact::Model>::new()])
            .into_connection();
        let sender = Arc::new(FakeSender::new());
        let service =
            BroadcastService::new(db, sender.clone(), SendCooldown::new(SEND_COOLDOWN));

        assert!(matches!(
            service.broadcast("hello", Some(7)).await,
            Err(BroadcastError::NoContacts)
        ));
        assert_eq!(sender.call_count(), 0);
    }

    #[tokio::test]
    async fn missing_credentials_fail_before_any_dispatch() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![contact(1, "+15550000001")]])
            .into_connection();
        let sender = Arc::new(FakeSender::unconfigured());
        let service = BroadcastService::new(
            db.clone(),
            sender.clone(),
            SendCooldown::new(SEND_COOLDOWN),
        );

        assert!(matches!(
            service.broadcast("hello", None).await,
            Err(BroadcastError::Gateway(SenderError::InvalidConfiguration(_)))
        ));
        assert_eq!(sender.call_count(), 0);

        // The recipient select ran; no log writes followed.
        assert_eq!(db.into_transaction_log().len(), 1);
    }
}
