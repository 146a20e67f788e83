use std::time::Duration;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rdkafka::{ClientConfig, message::OwnedHeaders, producer::{FutureProducer, FutureRecord}};
use super::{NotificationChannel, prelude::*};
use crate::{APP_NAME, model::events::PasswordResetRequested, utils::{config::Configuration, errors::TurnstileError}};

const EVENT_VERSION: &str = "1";

///
/// Publishes issued tokens to Kafka. A downstream mailer consumes the topic and contacts the account holder.
///
pub struct KafkaNotifier {
    producer: FutureProducer,
    timeout: Duration,
}

impl KafkaNotifier {
    pub fn new(config: &Configuration) -> Result<Self, TurnstileError> {
        let producer = ClientConfig::new()
            .set("bootstrap.servers", &config.kafka_servers)
            .set("message.timeout.ms", format!("{}", config.kafka_timeout))
            .create()?;

        tracing::info!("Reset tokens will be published to {} on {}", TOPIC_RESET_REQUESTED, config.kafka_servers);

        Ok(KafkaNotifier { producer, timeout: Duration::from_millis(config.kafka_timeout) })
    }
}

#[async_trait]
impl NotificationChannel for KafkaNotifier {
    async fn send(&self, email: &str, token: &str, expires_at: DateTime<Utc>) -> Result<(), TurnstileError> {
        let payload = serde_json::to_string(&PasswordResetRequested {
            email: email.to_string(),
            token: token.to_string(),
            expires_at,
        })?;

        self.producer
            .send(
                FutureRecord::to(TOPIC_RESET_REQUESTED)
                    .payload(payload.as_str())
                    .key(email) // Partition key - keeps one holder's resets in order.
                    .headers(OwnedHeaders::new()
                        .add("version", EVENT_VERSION)
                        .add("sender", APP_NAME)),
                self.timeout,
            )
            .await?;

        Ok(())
    }
}
