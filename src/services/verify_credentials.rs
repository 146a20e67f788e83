use tonic::{Request, Response, Status};
use super::{off_thread, parse_role, to_response};
use crate::{grpc::api, model::{account::Account, role::Role}, utils::{context::ServiceContext, errors::{ErrorCode, TurnstileError}}};

const NOT_MATCHED: &str = "The email or password is not correct";

pub async fn verify_credentials(ctx: &ServiceContext, request: Request<api::VerifyCredentialsRequest>)
    -> Result<Response<api::AccountResponse>, Status> {

    let request = request.into_inner();
    let role = parse_role(&request.role)?;
    let account = verify(ctx, &request.email, &request.plain_text_password, role).await?;

    Ok(Response::new(to_response(&account, role)))
}

///
/// Sign-in check. An unknown email and a wrong password are indistinguishable to the caller, in
/// both the error returned and the time taken.
///
pub async fn verify(ctx: &ServiceContext, email: &str, plain_text_password: &str, role: Role)
    -> Result<Account, TurnstileError> {

    let plain_text_password = plain_text_password.to_string();

    let account = match ctx.bounded(ctx.accounts().find_by_email(email, role)).await? {
        Some(account) => account,
        None => {
            // Burn the same argon2 work a real check would, so a miss isn't answered faster.
            let policy = ctx.hashing().clone();
            off_thread(move || policy.hash_into_phc(&plain_text_password)).await?;
            return Err(ErrorCode::CredentialsNotMatched.with_msg(NOT_MATCHED))
        },
    };

    let (account, valid) = off_thread(move || {
            let valid = account.verify_password(&plain_text_password)?;
            Ok((account, valid))
        })
        .await?;

    if !valid {
        tracing::info!("Failed sign-in for {} account {}", role, account.id());
        return Err(ErrorCode::CredentialsNotMatched.with_msg(NOT_MATCHED))
    }

    Ok(account)
}
