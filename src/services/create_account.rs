use rust_decimal::Decimal;
use tonic::{Request, Response, Status};
use super::{off_thread, parse_amount, parse_role, to_response};
use crate::{grpc::api, model::{account::Account, role::Role}, utils::{context::ServiceContext, errors::TurnstileError}};

pub async fn create_account(ctx: &ServiceContext, request: Request<api::CreateAccountRequest>)
    -> Result<Response<api::AccountResponse>, Status> {

    let request = request.into_inner();
    let role = parse_role(&request.role)?;

    let balance = match request.balance.trim() {
        "" => None,
        balance => Some(parse_amount(balance)?),
    };

    let account = register(
        ctx,
        role,
        request.account_id,
        &request.name,
        &request.phone,
        &request.email,
        &request.plain_text_password,
        balance)
        .await?;

    Ok(Response::new(to_response(&account, role)))
}

///
/// Validate and hash a new account then store it.
///
#[allow(clippy::too_many_arguments)]
pub async fn register(ctx: &ServiceContext, role: Role, account_id: i64, name: &str, phone: &str, email: &str, plain_text_password: &str, balance: Option<Decimal>)
    -> Result<Account, TurnstileError> {

    let name = name.to_string();
    let phone = phone.to_string();
    let email = email.to_string();
    let plain_text_password = plain_text_password.to_string();
    let policy = ctx.hashing().clone();

    let account = off_thread(move || {
            Account::create(account_id, &name, &phone, &email, &plain_text_password, balance, &policy)
        })
        .await?;

    ctx.bounded(ctx.accounts().insert(&account, role)).await?;

    tracing::info!("Created {} account {}", role, account.id());
    Ok(account)
}
