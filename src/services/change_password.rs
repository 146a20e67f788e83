use tonic::{Request, Response, Status};
use super::{load_account, off_thread, parse_role};
use crate::{grpc::{api, common}, model::{role::Role, validation}, utils::{context::ServiceContext, errors::{ErrorCode, TurnstileError}}};

pub async fn change_password(ctx: &ServiceContext, request: Request<api::ChangePasswordRequest>)
    -> Result<Response<common::Empty>, Status> {

    let request = request.into_inner();
    let role = parse_role(&request.role)?;

    change(ctx, request.account_id, role, &request.current_password, &request.new_password).await?;

    Ok(Response::new(common::Empty {}))
}

///
/// Replace the password of an account holder who can prove they know the current one.
///
pub async fn change(ctx: &ServiceContext, account_id: i64, role: Role, current_password: &str, new_password: &str)
    -> Result<(), TurnstileError> {

    // A bad new password fails fast, before any hashing or locking.
    validation::validate_password(new_password)?;

    let _guard = ctx.locks().acquire(role, account_id).await;
    let account = load_account(ctx, account_id, role).await?;

    let current_password = current_password.to_string();
    let new_password = new_password.to_string();
    let policy = ctx.hashing().clone();

    let account = off_thread(move || {
            if !account.verify_password(&current_password)? {
                return Err(ErrorCode::CredentialsNotMatched.with_msg("The current password is not correct"))
            }

            let mut account = account;
            account.set_password(&new_password, &policy)?;
            Ok(account)
        })
        .await?;

    ctx.bounded(ctx.accounts().save(&account, role)).await?;

    tracing::info!("Password changed for {} account {}", role, account_id);
    Ok(())
}
