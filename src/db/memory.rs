use parking_lot::RwLock;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use super::AccountRepository;
use crate::{model::{account::Account, role::Role}, utils::errors::{ErrorCode, TurnstileError}};

///
/// An account store held entirely in memory. Used when the service is configured with
/// store=memory and by the test-suite.
///
/// It can be switched to unavailable to exercise store failure paths.
///
#[derive(Debug, Default)]
pub struct InMemoryAccounts {
    accounts: RwLock<HashMap<Role, HashMap<i64, Account>>>,
    unavailable: AtomicBool,
}

impl InMemoryAccounts {
    ///
    /// While unavailable every call fails with a StoreError.
    ///
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    ///
    /// Seed an account directly, bypassing the uniqueness checks. Lets tests build ambiguous data.
    ///
    pub fn seed(&self, account: Account, role: Role) {
        self.accounts.write().entry(role).or_default().insert(account.id(), account);
    }

    fn available(&self) -> Result<(), TurnstileError> {
        match self.unavailable.load(Ordering::SeqCst) {
            true  => Err(ErrorCode::StoreError.with_msg("The in-memory account store is unavailable")),
            false => Ok(()),
        }
    }
}

#[async_trait]
impl AccountRepository for InMemoryAccounts {
    async fn find_by_email_and_phone(&self, email: &str, phone: &str, role: Role) -> Result<Vec<Account>, TurnstileError> {
        self.available()?;

        let accounts = self.accounts.read();
        Ok(accounts.get(&role)
            .map(|accounts| accounts.values()
                .filter(|account| account.email() == email && account.phone() == phone)
                .cloned()
                .collect())
            .unwrap_or_default())
    }

    async fn find_by_email(&self, email: &str, role: Role) -> Result<Option<Account>, TurnstileError> {
        self.available()?;

        let accounts = self.accounts.read();
        Ok(accounts.get(&role)
            .and_then(|accounts| accounts.values().find(|account| account.email() == email).cloned()))
    }

    async fn find_by_id(&self, account_id: i64, role: Role) -> Result<Option<Account>, TurnstileError> {
        self.available()?;

        let accounts = self.accounts.read();
        Ok(accounts.get(&role).and_then(|accounts| accounts.get(&account_id).cloned()))
    }

    async fn insert(&self, account: &Account, role: Role) -> Result<(), TurnstileError> {
        self.available()?;

        let mut accounts = self.accounts.write();
        let accounts = accounts.entry(role).or_default();

        if accounts.contains_key(&account.id()) || accounts.values().any(|existing| existing.email() == account.email()) {
            return Err(ErrorCode::DuplicateAccount
                .with_msg(&format!("The {} account id {} or its email is already in use", role, account.id())))
        }

        accounts.insert(account.id(), account.clone());
        Ok(())
    }

    async fn save(&self, account: &Account, role: Role) -> Result<(), TurnstileError> {
        self.available()?;

        let mut accounts = self.accounts.write();
        let accounts = accounts.entry(role).or_default();

        if accounts.values().any(|existing| existing.id() != account.id() && existing.email() == account.email()) {
            return Err(ErrorCode::DuplicateAccount
                .with_msg(&format!("Another {} account already uses that email", role)))
        }

        match accounts.get_mut(&account.id()) {
            Some(existing) => {
                *existing = account.clone();
                Ok(())
            },
            None => Err(ErrorCode::AccountNotFound
                .with_msg(&format!("The {} account {} does not exist", role, account.id()))),
        }
    }

    async fn ping(&self) -> Result<(), TurnstileError> {
        self.available()
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::password::fast_policy;

    fn account(id: i64, email: &str) -> Account {
        Account::create(id, "Ada", "1234567890", email, "Hello123!", None, &fast_policy()).unwrap()
    }

    #[tokio::test]
    async fn test_roles_are_disjoint() -> Result<(), TurnstileError> {
        let store = InMemoryAccounts::default();
        store.insert(&account(1, "a@b.com"), Role::Admin).await?;

        assert!(store.find_by_id(1, Role::User).await?.is_none());
        assert!(store.find_by_email_and_phone("a@b.com", "1234567890", Role::User).await?.is_empty());
        assert_eq!(store.find_by_email_and_phone("a@b.com", "1234567890", Role::Admin).await?.len(), 1);

        // The same id and email are free in the other namespace.
        store.insert(&account(1, "a@b.com"), Role::User).await?;
        Ok(())
    }

    #[tokio::test]
    async fn test_duplicates_are_rejected() -> Result<(), TurnstileError> {
        let store = InMemoryAccounts::default();
        store.insert(&account(1, "a@b.com"), Role::User).await?;

        let err = store.insert(&account(1, "c@d.com"), Role::User).await.unwrap_err();
        assert_eq!(err.error_code(), ErrorCode::DuplicateAccount);

        let err = store.insert(&account(2, "a@b.com"), Role::User).await.unwrap_err();
        assert_eq!(err.error_code(), ErrorCode::DuplicateAccount);
        Ok(())
    }

    #[tokio::test]
    async fn test_save_requires_an_existing_account() -> Result<(), TurnstileError> {
        let store = InMemoryAccounts::default();
        let err = store.save(&account(9, "a@b.com"), Role::User).await.unwrap_err();
        assert_eq!(err.error_code(), ErrorCode::AccountNotFound);
        Ok(())
    }

    #[tokio::test]
    async fn test_unavailable_store_fails_every_call() {
        let store = InMemoryAccounts::default();
        store.set_unavailable(true);

        assert_eq!(store.ping().await.unwrap_err().error_code(), ErrorCode::StoreError);
        assert_eq!(store.find_by_id(1, Role::User).await.unwrap_err().error_code(), ErrorCode::StoreError);

        store.set_unavailable(false);
        assert!(store.ping().await.is_ok());
    }
}
