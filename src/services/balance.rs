use rust_decimal::Decimal;
use tonic::{Request, Response, Status};
use super::{load_account, parse_amount, parse_role};
use crate::{grpc::api, model::{role::Role, validation}, utils::{context::ServiceContext, errors::TurnstileError}};


pub async fn credit(ctx: &ServiceContext, request: Request<api::BalanceRequest>)
    -> Result<Response<api::BalanceResponse>, Status> {

    let request = request.into_inner();
    let balance = credit_account(ctx, request.account_id, parse_role(&request.role)?, parse_amount(&request.amount)?).await?;

    Ok(Response::new(api::BalanceResponse { balance: balance.to_string() }))
}

pub async fn debit(ctx: &ServiceContext, request: Request<api::BalanceRequest>)
    -> Result<Response<api::BalanceResponse>, Status> {

    let request = request.into_inner();
    let balance = debit_account(ctx, request.account_id, parse_role(&request.role)?, parse_amount(&request.amount)?).await?;

    Ok(Response::new(api::BalanceResponse { balance: balance.to_string() }))
}

pub async fn has_sufficient_funds(ctx: &ServiceContext, request: Request<api::BalanceRequest>)
    -> Result<Response<api::FundsResponse>, Status> {

    let request = request.into_inner();
    let sufficient = account_has_funds(ctx, request.account_id, parse_role(&request.role)?, parse_amount(&request.amount)?).await?;

    Ok(Response::new(api::FundsResponse { sufficient }))
}

///
/// Add to the account's balance, returning the new balance.
///
/// The account is held exclusively from load to save so concurrent balance changes serialise.
///
pub async fn credit_account(ctx: &ServiceContext, account_id: i64, role: Role, amount: Decimal) -> Result<Decimal, TurnstileError> {
    validation::validate_amount(amount)?;

    let _guard = ctx.locks().acquire(role, account_id).await;
    let mut account = load_account(ctx, account_id, role).await?;
    let balance = account.credit(amount)?;
    ctx.bounded(ctx.accounts().save(&account, role)).await?;

    tracing::debug!("Credited {} account {} with {}", role, account_id, amount);
    Ok(balance)
}

///
/// Take from the account's balance, returning the new balance. Fails without any change if the
/// balance doesn't cover the amount.
///
pub async fn debit_account(ctx: &ServiceContext, account_id: i64, role: Role, amount: Decimal) -> Result<Decimal, TurnstileError> {
    validation::validate_amount(amount)?;

    let _guard = ctx.locks().acquire(role, account_id).await;
    let mut account = load_account(ctx, account_id, role).await?;
    let balance = account.debit(amount)?;
    ctx.bounded(ctx.accounts().save(&account, role)).await?;

    tracing::debug!("Debited {} account {} by {}", role, account_id, amount);
    Ok(balance)
}

///
/// Whether a debit of the amount would succeed. Negative amounts are refused as they are by credit
/// and debit.
///
pub async fn account_has_funds(ctx: &ServiceContext, account_id: i64, role: Role, amount: Decimal) -> Result<bool, TurnstileError> {
    validation::validate_amount(amount)?;

    let account = load_account(ctx, account_id, role).await?;
    Ok(account.has_sufficient_funds(amount))
}
