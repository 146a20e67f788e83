#[cfg(feature = "kafka")]
pub mod kafka;

use std::sync::Arc;
use parking_lot::Mutex;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::atomic::{AtomicBool, Ordering};
use crate::{model::events::PasswordResetRequested, utils::{config::Configuration, errors::{ErrorCode, TurnstileError}}};

pub mod prelude {
    pub const TOPIC_RESET_REQUESTED: &str = "account.reset.requested";
}

///
/// Delivers an issued reset token to the account holder. How (e-mail, SMS, a message bus) is up to
/// the implementation.
///
#[async_trait]
pub trait NotificationChannel: Send + Sync {
    async fn send(&self, email: &str, token: &str, expires_at: DateTime<Utc>) -> Result<(), TurnstileError>;
}

///
/// Pick the channel for the running service. Kafka when built with the kafka feature, otherwise the
/// issue is only logged.
///
pub fn from_config(config: &Configuration) -> Result<Arc<dyn NotificationChannel>, TurnstileError> {
    #[cfg(feature = "kafka")]
    {
        if !config.kafka_servers.is_empty() {
            return Ok(Arc::new(kafka::KafkaNotifier::new(config)?))
        }
    }

    tracing::warn!("No notification channel configured for {} - reset tokens will only be logged as issued", config.address);
    Ok(Arc::new(LogNotifier::default()))
}

///
/// Records that a token was issued without delivering it anywhere. The token itself is never logged.
///
#[derive(Debug, Default)]
pub struct LogNotifier {}

#[async_trait]
impl NotificationChannel for LogNotifier {
    async fn send(&self, email: &str, _token: &str, expires_at: DateTime<Utc>) -> Result<(), TurnstileError> {
        tracing::info!("Reset token issued for {}, valid until {}", email, expires_at.to_rfc3339());
        Ok(())
    }
}

///
/// Keeps every delivery in memory so a caller (usually a test) can collect the tokens. Can be told to
/// fail deliveries.
///
#[derive(Debug, Default)]
pub struct MemoryNotifier {
    sent: Mutex<Vec<PasswordResetRequested>>,
    failing: AtomicBool,
}

impl MemoryNotifier {
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn sent(&self) -> Vec<PasswordResetRequested> {
        self.sent.lock().clone()
    }

    ///
    /// The most recent token sent to the email address.
    ///
    pub fn last_token_for(&self, email: &str) -> Option<String> {
        self.sent.lock()
            .iter()
            .rev()
            .find(|sent| sent.email == email)
            .map(|sent| sent.token.clone())
    }
}

#[async_trait]
impl NotificationChannel for MemoryNotifier {
    async fn send(&self, email: &str, token: &str, expires_at: DateTime<Utc>) -> Result<(), TurnstileError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(ErrorCode::DeliveryFailed.with_msg(&format!("Unable to reach {}", email)))
        }

        self.sent.lock().push(PasswordResetRequested {
            email: email.to_string(),
            token: token.to_string(),
            expires_at,
        });

        Ok(())
    }
}
