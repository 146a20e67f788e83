pub mod account;
pub mod memory;
pub mod mongo;

use async_trait::async_trait;
use crate::{model::{account::Account, role::Role}, utils::errors::TurnstileError};

pub mod prelude {
    // Collection names - one per role so the namespaces can never be cross-matched.
    pub const USERS:  &str = "Users";
    pub const ADMINS: &str = "Admins";

    // Field names.
    pub const ACCOUNT_ID: &str = "account_id";
    pub const BALANCE:    &str = "balance";
    pub const EMAIL:      &str = "email";
    pub const NAME:       &str = "name";
    pub const PHC:        &str = "phc";
    pub const PHONE:      &str = "phone";
}

///
/// Durable storage for accounts. Every call is scoped to a single role's namespace.
///
#[async_trait]
pub trait AccountRepository: Send + Sync {
    ///
    /// All accounts whose email AND phone match. Callers decide what more than one match means.
    ///
    async fn find_by_email_and_phone(&self, email: &str, phone: &str, role: Role) -> Result<Vec<Account>, TurnstileError>;

    async fn find_by_email(&self, email: &str, role: Role) -> Result<Option<Account>, TurnstileError>;

    async fn find_by_id(&self, account_id: i64, role: Role) -> Result<Option<Account>, TurnstileError>;

    ///
    /// Store a new account. The id and email must not already be in use within the role.
    ///
    async fn insert(&self, account: &Account, role: Role) -> Result<(), TurnstileError>;

    ///
    /// Overwrite an existing account.
    ///
    async fn save(&self, account: &Account, role: Role) -> Result<(), TurnstileError>;

    async fn ping(&self) -> Result<(), TurnstileError> {
        Ok(())
    }
}

impl Role {
    pub fn collection(&self) -> &'static str {
        match self {
            Role::User  => prelude::USERS,
            Role::Admin => prelude::ADMINS,
        }
    }
}
