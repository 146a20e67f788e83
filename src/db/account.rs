use std::str::FromStr;
use std::convert::TryFrom;
use mongodb::Database;
use rust_decimal::Decimal;
use async_trait::async_trait;
use futures::TryStreamExt;
use serde::{Deserialize, Serialize};
use mongodb::{Collection, bson::doc, options::FindOptions};
use super::{AccountRepository, mongo, prelude::*};
use crate::{model::{account::Account, role::Role}, utils::errors::{ErrorCode, TurnstileError}};

///
/// An account as persisted in MongoDB. The balance is kept as a decimal string so no precision
/// is lost to binary floating point.
///
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct AccountDB {
    pub account_id: i64,
    pub name: String,
    pub phone: String,
    pub email: String,
    pub phc: String,
    pub balance: String,
}

impl From<&Account> for AccountDB {
    fn from(account: &Account) -> Self {
        AccountDB {
            account_id: account.id(),
            name: account.name().to_string(),
            phone: account.phone().to_string(),
            email: account.email().to_string(),
            phc: account.password_hash().to_string(),
            balance: account.balance().to_string(),
        }
    }
}

impl TryFrom<AccountDB> for Account {
    type Error = TurnstileError;

    fn try_from(stored: AccountDB) -> Result<Self, Self::Error> {
        let balance = Decimal::from_str(&stored.balance)
            .map_err(|err| ErrorCode::InvalidBalance
                .with_msg(&format!("Account {} has an unreadable balance '{}': {}", stored.account_id, stored.balance, err)))?;

        Account::from_parts(stored.account_id, &stored.name, &stored.phone, &stored.email, &stored.phc, balance)
    }
}

///
/// MongoDB backed accounts. Users and admins live in separate collections.
///
pub struct MongoAccounts {
    db: Database,
}

impl MongoAccounts {
    pub fn new(db: Database) -> Self {
        MongoAccounts { db }
    }

    fn collection(&self, role: Role) -> Collection<AccountDB> {
        self.db.collection::<AccountDB>(role.collection())
    }
}

#[async_trait]
impl AccountRepository for MongoAccounts {
    async fn find_by_email_and_phone(&self, email: &str, phone: &str, role: Role) -> Result<Vec<Account>, TurnstileError> {
        // Two is enough to tell a unique match from an ambiguous one.
        let options = FindOptions::builder().limit(2).build();

        let found: Vec<AccountDB> = self.collection(role)
            .find(doc!{ EMAIL: email, PHONE: phone }, options)
            .await?
            .try_collect()
            .await?;

        found.into_iter().map(Account::try_from).collect()
    }

    async fn find_by_email(&self, email: &str, role: Role) -> Result<Option<Account>, TurnstileError> {
        match self.collection(role).find_one(doc!{ EMAIL: email }, None).await? {
            Some(stored) => Ok(Some(Account::try_from(stored)?)),
            None => Ok(None),
        }
    }

    async fn find_by_id(&self, account_id: i64, role: Role) -> Result<Option<Account>, TurnstileError> {
        match self.collection(role).find_one(doc!{ ACCOUNT_ID: account_id }, None).await? {
            Some(stored) => Ok(Some(Account::try_from(stored)?)),
            None => Ok(None),
        }
    }

    async fn insert(&self, account: &Account, role: Role) -> Result<(), TurnstileError> {
        match self.collection(role).insert_one(AccountDB::from(account), None).await {
            Ok(_) => Ok(()),
            Err(err) if mongo::is_duplicate_err(&err) => Err(ErrorCode::DuplicateAccount
                .with_msg(&format!("The {} account id {} or its email is already in use", role, account.id()))),
            Err(err) => Err(TurnstileError::from(err)),
        }
    }

    async fn save(&self, account: &Account, role: Role) -> Result<(), TurnstileError> {
        let result = self.collection(role)
            .replace_one(doc!{ ACCOUNT_ID: account.id() }, AccountDB::from(account), None)
            .await;

        match result {
            Ok(result) if result.matched_count == 0 => Err(ErrorCode::AccountNotFound
                .with_msg(&format!("The {} account {} does not exist", role, account.id()))),
            Ok(_) => Ok(()),
            Err(err) if mongo::is_duplicate_err(&err) => Err(ErrorCode::DuplicateAccount
                .with_msg(&format!("Another {} account already uses that email", role))),
            Err(err) => Err(TurnstileError::from(err)),
        }
    }

    async fn ping(&self) -> Result<(), TurnstileError> {
        mongo::ping(&self.db).await.map(|_| ())
    }
}
