use tonic::{Request, Response, Status};
use super::parse_role;
use crate::{grpc::api, model::{reset::{IssuedToken, ResetRequest}, role::Role, validation}, utils::{context::ServiceContext, errors::{ErrorCode, TurnstileError}}};

pub async fn start_reset(ctx: &ServiceContext, request: Request<api::StartResetRequest>)
    -> Result<Response<api::StartResetResponse>, Status> {

    let request = request.into_inner();
    let role = parse_role(&request.role)?;
    let issued = initiate_and_notify(ctx, &request.email, &request.phone, role).await?;

    Ok(Response::new(api::StartResetResponse {
        request_id: issued.request_id,
        reset_token: issued.token,
        expires_at: issued.expires_at.to_rfc3339(),
    }))
}

///
/// Phase 1/2 of a password reset. Prove ownership of an account with its email and phone and get a
/// single-use token back.
///
/// Malformed input is rejected before the store is touched. Whether it was the email or the phone
/// that didn't match is deliberately not revealed.
///
pub async fn initiate(ctx: &ServiceContext, email: &str, phone: &str, role: Role) -> Result<IssuedToken, TurnstileError> {
    validation::validate_email(email)?;
    validation::validate_phone(phone)?;

    let mut request = ResetRequest::new(email, phone, role);
    let matches = ctx.bounded(ctx.accounts().find_by_email_and_phone(email, phone, role)).await?;

    let account_id = match matches.as_slice() {
        [account] => account.id(),
        _ => {
            request.fail();
            tracing::info!("Reset request {} failed, {} {} accounts matched", request.request_id(), matches.len(), role);
            return Err(ErrorCode::AccountNotMatched.with_msg("No account matches the details provided"))
        }
    };

    let now = ctx.now();
    ctx.resets().purge(now);

    let issued = request.issue(account_id, now, ctx.reset_window())?;
    ctx.resets().insert(request)?;

    tracing::info!("Reset request {} issued a token for {} account {}", issued.request_id, role, account_id);
    Ok(issued)
}

///
/// Initiate a reset and deliver the token through the notification channel. If delivery fails the
/// token is withdrawn and a DeliveryFailed error (not a lookup error) is returned.
///
pub async fn initiate_and_notify(ctx: &ServiceContext, email: &str, phone: &str, role: Role) -> Result<IssuedToken, TurnstileError> {
    let issued = initiate(ctx, email, phone, role).await?;

    if let Err(err) = ctx.bounded(ctx.notifier().send(email, &issued.token, issued.expires_at)).await {
        ctx.resets().revoke(&issued.token);
        tracing::warn!("Reset request {} could not be delivered: {}", issued.request_id, err);

        return Err(ErrorCode::DeliveryFailed
            .with_msg(&format!("The reset token could not be delivered: {}", err.message())))
    }

    Ok(issued)
}
