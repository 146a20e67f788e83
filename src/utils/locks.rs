use std::sync::Arc;
use parking_lot::Mutex;
use std::collections::HashMap;
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};
use crate::model::role::Role;

// Idle locks are swept once the table grows past this.
const SWEEP_THRESHOLD: usize = 1024;

///
/// Hands out one async mutex per account so every load-mutate-save of the same account is
/// serialised, whichever request (credit, debit, password change, reset) performs it.
///
#[derive(Debug, Default)]
pub struct AccountLocks {
    locks: Mutex<HashMap<(Role, i64), Arc<AsyncMutex<()>>>>,
}

impl AccountLocks {
    ///
    /// Wait for exclusive access to the account. Access is held until the guard is dropped.
    ///
    pub async fn acquire(&self, role: Role, account_id: i64) -> OwnedMutexGuard<()> {
        let lock = {
            let mut locks = self.locks.lock();

            if locks.len() > SWEEP_THRESHOLD {
                // Only the table holds a reference to an idle lock.
                locks.retain(|_, lock| Arc::strong_count(lock) > 1);
            }

            locks.entry((role, account_id))
                .or_insert_with(|| Arc::new(AsyncMutex::new(())))
                .clone()
        };

        lock.lock_owned().await
    }

    pub fn len(&self) -> usize {
        self.locks.lock().len()
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_same_account_is_exclusive() {
        let locks = Arc::new(AccountLocks::default());
        let guard = locks.acquire(Role::User, 1).await;

        let contender = {
            let locks = locks.clone();
            tokio::spawn(async move { locks.acquire(Role::User, 1).await; })
        };

        // The contender cannot progress while we hold the guard.
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(!contender.is_finished());

        drop(guard);
        contender.await.unwrap();
    }

    #[tokio::test]
    async fn test_namespaces_do_not_share_locks() {
        let locks = AccountLocks::default();
        let _user = locks.acquire(Role::User, 1).await;

        // Would deadlock if the admin account 1 shared the user account 1 lock.
        let _admin = tokio::time::timeout(Duration::from_millis(200), locks.acquire(Role::Admin, 1))
            .await
            .expect("admin lock should be independent");

        assert_eq!(locks.len(), 2);
    }
}
