pub mod balance;
pub mod change_password;
pub mod complete_reset;
pub mod create_account;
pub mod get_account;
pub mod set_time;
pub mod start_reset;
pub mod verify_credentials;

use std::sync::Arc;
use std::str::FromStr;
use tracing::instrument;
use rust_decimal::Decimal;
use tonic::{Request, Response, Status};
use crate::grpc::{admin, api, common};
use crate::grpc::api::accounts_server::Accounts;
use crate::grpc::admin::admin_server::Admin;
use crate::model::{account::Account, role::Role};
use crate::utils::{context::ServiceContext, errors::{ErrorCode, TurnstileError}};

///
/// Implemention for all the gRPC service endpoints defined in the .proto file.
///
/// Request bodies are skipped from spans - they carry passwords and tokens.
///
#[tonic::async_trait]
impl Accounts for Arc<ServiceContext> {
    #[instrument(skip(self, request))]
    async fn create_account(&self, request: Request<api::CreateAccountRequest>) -> Result<Response<api::AccountResponse>, Status> {
        create_account::create_account(self, request).await
    }

    #[instrument(skip(self, request))]
    async fn get_account(&self, request: Request<api::GetAccountRequest>) -> Result<Response<api::AccountResponse>, Status> {
        get_account::get_account(self, request).await
    }

    #[instrument(skip(self, request))]
    async fn credit(&self, request: Request<api::BalanceRequest>) -> Result<Response<api::BalanceResponse>, Status> {
        balance::credit(self, request).await
    }

    #[instrument(skip(self, request))]
    async fn debit(&self, request: Request<api::BalanceRequest>) -> Result<Response<api::BalanceResponse>, Status> {
        balance::debit(self, request).await
    }

    #[instrument(skip(self, request))]
    async fn has_sufficient_funds(&self, request: Request<api::BalanceRequest>) -> Result<Response<api::FundsResponse>, Status> {
        balance::has_sufficient_funds(self, request).await
    }

    #[instrument(skip(self, request))]
    async fn change_password(&self, request: Request<api::ChangePasswordRequest>) -> Result<Response<common::Empty>, Status> {
        change_password::change_password(self, request).await
    }

    #[instrument(skip(self, request))]
    async fn verify_credentials(&self, request: Request<api::VerifyCredentialsRequest>) -> Result<Response<api::AccountResponse>, Status> {
        verify_credentials::verify_credentials(self, request).await
    }

    #[instrument(skip(self, request))]
    async fn start_reset(&self, request: Request<api::StartResetRequest>) -> Result<Response<api::StartResetResponse>, Status> {
        start_reset::start_reset(self, request).await
    }

    #[instrument(skip(self, request))]
    async fn complete_reset(&self, request: Request<api::CompleteResetRequest>) -> Result<Response<common::Empty>, Status> {
        complete_reset::complete_reset(self, request).await
    }
}

#[tonic::async_trait]
impl Admin for Arc<ServiceContext> {
    async fn ping(&self, _request: Request<common::Empty>) -> Result<Response<common::Empty>, Status> {
        Ok(Response::new(common::Empty::default()))
    }

    async fn set_time(&self, request: Request<admin::NewTime>) -> Result<Response<common::Empty>, Status> {
        set_time::set_time(self, request).await
    }

    async fn reset_time(&self, request: Request<common::Empty>) -> Result<Response<common::Empty>, Status> {
        set_time::reset_time(self, request).await
    }
}

///
/// Load the account or fail with AccountNotFound.
///
pub async fn load_account(ctx: &ServiceContext, account_id: i64, role: Role) -> Result<Account, TurnstileError> {
    match ctx.bounded(ctx.accounts().find_by_id(account_id, role)).await? {
        Some(account) => Ok(account),
        None => Err(ErrorCode::AccountNotFound.with_msg(&format!("The {} account {} does not exist", role, account_id))),
    }
}

///
/// Password hashing and verification are highly CPU-bound so are performed on the blocking thread
/// pool, not on the main event loop.
///
pub async fn off_thread<T, F>(work: F) -> Result<T, TurnstileError>
where
    F: FnOnce() -> Result<T, TurnstileError> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(work)
        .await
        .map_err(TurnstileError::from)?
}

fn parse_role(role: &str) -> Result<Role, TurnstileError> {
    Role::from_str(role)
}

fn parse_amount(amount: &str) -> Result<Decimal, TurnstileError> {
    Decimal::from_str(amount.trim())
        .map_err(|_| ErrorCode::InvalidAmountFormat.with_msg(&format!("'{}' is not a valid amount", amount)))
}

fn to_response(account: &Account, role: Role) -> api::AccountResponse {
    api::AccountResponse {
        account_id: account.id(),
        name:       account.name().to_string(),
        phone:      account.phone().to_string(),
        email:      account.email().to_string(),
        balance:    account.balance().to_string(),
        role:       role.to_string(),
    }
}
