use std::sync::Arc;
use std::future::Future;
use parking_lot::RwLock;
use chrono::{DateTime, Duration, Utc};
use crate::{db::AccountRepository, model::{password::ArgonPolicy, reset::ResetRegistry}, notify::NotificationChannel};
use super::{config::Configuration, errors::{ErrorCode, TurnstileError}, locks::AccountLocks, time_provider::TimeProvider};

///
/// The context is available to all gRPC service endpoints and gives them access to the account store,
/// the notification channel, outstanding reset requests, config, etc.
///
pub struct ServiceContext {
    config: Configuration,
    accounts: Arc<dyn AccountRepository>,
    notifier: Arc<dyn NotificationChannel>,
    resets: ResetRegistry,
    locks: AccountLocks,
    hashing: ArgonPolicy,
    time_provider: RwLock<TimeProvider>,
}

impl ServiceContext {
    pub fn new(config: Configuration, accounts: Arc<dyn AccountRepository>, notifier: Arc<dyn NotificationChannel>) -> Self {
        ServiceContext {
            hashing: ArgonPolicy::from(&config),
            config,
            accounts,
            notifier,
            resets: ResetRegistry::default(),
            locks: AccountLocks::default(),
            time_provider: RwLock::new(TimeProvider::default()),
        }
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.time_provider.read().now()
    }

    ///
    /// Set or clear the fixed time.
    ///
    pub fn set_now(&self, now: Option<DateTime<Utc>>) {
        self.time_provider.write().fix(now);
    }

    pub fn accounts(&self) -> &dyn AccountRepository {
        self.accounts.as_ref()
    }

    pub fn notifier(&self) -> &dyn NotificationChannel {
        self.notifier.as_ref()
    }

    pub fn resets(&self) -> &ResetRegistry {
        &self.resets
    }

    pub fn locks(&self) -> &AccountLocks {
        &self.locks
    }

    pub fn hashing(&self) -> &ArgonPolicy {
        &self.hashing
    }

    pub fn config(&self) -> &Configuration {
        &self.config
    }

    pub fn reset_window(&self) -> Duration {
        Duration::minutes(self.config.reset_window_minutes as i64)
    }

    ///
    /// Run a store or notification call with the configured time limit. Running out of time is
    /// reported as a StoreTimeout.
    ///
    pub async fn bounded<T, F>(&self, operation: F) -> Result<T, TurnstileError>
    where
        F: Future<Output = Result<T, TurnstileError>>
    {
        let limit = std::time::Duration::from_millis(self.config.store_timeout_ms);

        match tokio::time::timeout(limit, operation).await {
            Ok(result) => result,
            Err(_) => Err(ErrorCode::StoreTimeout
                .with_msg(&format!("The operation did not complete within {}ms", self.config.store_timeout_ms))),
        }
    }
}
