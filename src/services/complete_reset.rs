use tonic::{Request, Response, Status};
use super::{load_account, off_thread};
use crate::{grpc::{api, common}, model::{reset::Claim, validation}, utils::{context::ServiceContext, errors::TurnstileError}};


pub async fn complete_reset(ctx: &ServiceContext, request: Request<api::CompleteResetRequest>)
    -> Result<Response<common::Empty>, Status> {

    let request = request.into_inner();
    consume(ctx, &request.reset_token, &request.new_password).await?;

    Ok(Response::new(common::Empty {}))
}

///
/// Phase 2/2 of a password reset. Exchange the token for a new password.
///
/// The token is claimed before anything else so concurrent attempts with the same token get exactly
/// one winner. If the change can't be made, or the caller goes away part way through, the claim is
/// handed back and the token stays usable.
///
pub async fn consume(ctx: &ServiceContext, token: &str, new_password: &str) -> Result<(), TurnstileError> {
    let claim = ctx.resets().claim(token, ctx.now())?;

    match redeem(ctx, &claim, new_password).await {
        Ok(()) => {
            tracing::info!("Reset request {} completed for {} account {}", claim.request_id, claim.role, claim.account_id);
            claim.complete();
            Ok(())
        },
        Err(err) => {
            // Dropping the claim hands the token back.
            tracing::info!("Reset request {} not completed: {}", claim.request_id, err);
            Err(err)
        }
    }
}

async fn redeem(ctx: &ServiceContext, claim: &Claim<'_>, new_password: &str) -> Result<(), TurnstileError> {
    validation::validate_password(new_password)?;

    let _guard = ctx.locks().acquire(claim.role, claim.account_id).await;
    let mut account = load_account(ctx, claim.account_id, claim.role).await?;

    let new_password = new_password.to_string();
    let policy = ctx.hashing().clone();

    let account = off_thread(move || {
            account.set_password(&new_password, &policy)?;
            Ok(account)
        })
        .await?;

    ctx.bounded(ctx.accounts().save(&account, claim.role)).await
}
