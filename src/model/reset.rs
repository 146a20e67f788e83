use rand::RngCore;
use parking_lot::Mutex;
use derive_more::Display;
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use chrono::{DateTime, Duration, Utc};
use super::role::Role;
use crate::utils::{self, errors::{ErrorCode, TurnstileError}};

const TOKEN_BYTES: usize = 32;

const INVALID_TOKEN: &str = "The reset token is unknown, has expired or has already been used";

#[derive(Clone, Copy, Debug, Display, PartialEq)]
pub enum ResetState {
    Initiated,
    TokenIssued,
    Redeeming,
    Consumed,
    Failed,
}

///
/// One attempt to reset a password. Created when a claimant presents an email and phone, it either
/// fails or is issued a single-use token bound to the matching account.
///
#[derive(Clone, Debug)]
pub struct ResetRequest {
    request_id: String,
    subject_email: String,
    subject_phone: String,
    role: Role,
    target_account_id: Option<i64>,
    token_digest: Option<String>,
    issued_at: Option<DateTime<Utc>>,
    expires_at: Option<DateTime<Utc>>,
    state: ResetState,
}

///
/// What the claimant gets back when a token is issued. The token is not retained anywhere else -
/// only its digest is kept.
///
#[derive(Clone, Debug, PartialEq)]
pub struct IssuedToken {
    pub request_id: String,
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

impl ResetRequest {
    pub fn new(subject_email: &str, subject_phone: &str, role: Role) -> Self {
        ResetRequest {
            request_id: utils::generate_id(),
            subject_email: subject_email.to_string(),
            subject_phone: subject_phone.to_string(),
            role,
            target_account_id: None,
            token_digest: None,
            issued_at: None,
            expires_at: None,
            state: ResetState::Initiated,
        }
    }

    pub fn request_id(&self) -> &str {
        &self.request_id
    }

    pub fn subject_email(&self) -> &str {
        &self.subject_email
    }

    pub fn subject_phone(&self) -> &str {
        &self.subject_phone
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn target_account_id(&self) -> Option<i64> {
        self.target_account_id
    }

    pub fn issued_at(&self) -> Option<DateTime<Utc>> {
        self.issued_at
    }

    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        self.expires_at
    }

    pub fn state(&self) -> ResetState {
        self.state
    }

    pub fn is_consumed(&self) -> bool {
        self.state == ResetState::Consumed
    }

    ///
    /// Terminal. The request can never be issued a token afterwards.
    ///
    pub fn fail(&mut self) {
        if self.state == ResetState::Initiated {
            self.state = ResetState::Failed;
        }
    }

    ///
    /// Bind a new token to the account, valid from now for the window given.
    ///
    pub fn issue(&mut self, account_id: i64, now: DateTime<Utc>, window: Duration) -> Result<IssuedToken, TurnstileError> {
        if self.state != ResetState::Initiated {
            return Err(ErrorCode::InvalidToken
                .with_msg(&format!("Reset request {} is {} and cannot be issued a token", self.request_id, self.state)))
        }

        let token = generate_token();
        let expires_at = now + window;

        self.target_account_id = Some(account_id);
        self.token_digest = Some(digest(&token));
        self.issued_at = Some(now);
        self.expires_at = Some(expires_at);
        self.state = ResetState::TokenIssued;

        Ok(IssuedToken { request_id: self.request_id.clone(), token, expires_at })
    }

    fn is_redeemable(&self, now: DateTime<Utc>) -> bool {
        self.state == ResetState::TokenIssued && self.expires_at.map_or(false, |expires_at| now < expires_at)
    }

    fn is_spent(&self, now: DateTime<Utc>) -> bool {
        match self.state {
            ResetState::Consumed | ResetState::Failed => true,
            _ => self.expires_at.map_or(true, |expires_at| now >= expires_at),
        }
    }
}

///
/// Exclusive, temporary ownership of an issued token while its password change is applied.
///
/// Call complete once the password has been changed. A claim dropped any other way (an error, a
/// cancelled request) hands the token back so it can be redeemed again.
///
#[derive(Debug)]
pub struct Claim<'a> {
    registry: &'a ResetRegistry,
    digest: String,
    settled: bool,
    pub request_id: String,
    pub account_id: i64,
    pub role: Role,
}

impl Claim<'_> {
    ///
    /// The password change went through - the token can never be used again.
    ///
    pub fn complete(mut self) {
        if let Some(request) = self.registry.requests.lock().get_mut(&self.digest) {
            request.state = ResetState::Consumed;
        }
        self.settled = true;
    }
}

impl Drop for Claim<'_> {
    fn drop(&mut self) {
        if self.settled {
            return
        }

        if let Some(request) = self.registry.requests.lock().get_mut(&self.digest) {
            if request.state == ResetState::Redeeming {
                request.state = ResetState::TokenIssued;
            }
        }
    }
}

///
/// Outstanding reset requests, keyed by a SHA-256 digest of their token.
///
/// Every state change happens under one lock, which is what makes redemption at-most-once.
///
#[derive(Debug, Default)]
pub struct ResetRegistry {
    requests: Mutex<HashMap<String, ResetRequest>>,
}

impl ResetRegistry {
    pub fn insert(&self, request: ResetRequest) -> Result<(), TurnstileError> {
        let digest = match (&request.token_digest, request.state) {
            (Some(digest), ResetState::TokenIssued) => digest.clone(),
            _ => return Err(ErrorCode::InvalidToken
                .with_msg(&format!("Reset request {} has not been issued a token", request.request_id))),
        };

        self.requests.lock().insert(digest, request);
        Ok(())
    }

    ///
    /// Take the token for redemption. Fails if the token is unknown, expired, consumed or
    /// being redeemed by someone else right now.
    ///
    pub fn claim(&self, token: &str, now: DateTime<Utc>) -> Result<Claim<'_>, TurnstileError> {
        let digest = digest(token);
        let mut requests = self.requests.lock();

        match requests.get_mut(&digest) {
            Some(request) if request.is_redeemable(now) => {
                let account_id = request.target_account_id
                    .ok_or_else(|| ErrorCode::InvalidToken.with_msg(INVALID_TOKEN))?;

                request.state = ResetState::Redeeming;

                Ok(Claim {
                    registry: self,
                    digest,
                    settled: false,
                    request_id: request.request_id.clone(),
                    account_id,
                    role: request.role,
                })
            },
            _ => Err(ErrorCode::InvalidToken.with_msg(INVALID_TOKEN)),
        }
    }

    ///
    /// Withdraw an issued token, e.g. when it could not be delivered.
    ///
    pub fn revoke(&self, token: &str) -> bool {
        self.requests.lock().remove(&digest(token)).is_some()
    }

    pub fn state_of(&self, token: &str) -> Option<ResetState> {
        self.requests.lock().get(&digest(token)).map(ResetRequest::state)
    }

    ///
    /// Drop expired, failed and consumed requests. Returns how many were removed. An expired
    /// request is dropped even while a redemption holds it.
    ///
    pub fn purge(&self, now: DateTime<Utc>) -> usize {
        let mut requests = self.requests.lock();
        let before = requests.len();
        requests.retain(|_, request| !request.is_spent(now));
        before - requests.len()
    }

    pub fn len(&self) -> usize {
        self.requests.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn generate_token() -> String {
    let mut bytes = [0u8; TOKEN_BYTES];
    rand::thread_rng().fill_bytes(&mut bytes);
    base64::encode_config(bytes, base64::URL_SAFE_NO_PAD)
}

fn digest(token: &str) -> String {
    base64::encode_config(Sha256::digest(token.as_bytes()), base64::URL_SAFE_NO_PAD)
}
