use chrono::{DateTime, Utc};
use crate::grpc::{admin, common};
use tonic::{Request, Response, Status};
use crate::utils::{context::ServiceContext, errors::{ErrorCode, TurnstileError}};

///
/// Pin the service clock. Reset tokens issued or redeemed afterwards are timed against it, which
/// lets a test walk a token past its expiry without waiting.
///
pub async fn set_time(ctx: &ServiceContext, request: Request<admin::NewTime>)
    -> Result<Response<common::Empty>, Status> {

    let now = parse_new_time(&request.into_inner().new_time)?;
    ctx.set_now(Some(now));

    tracing::warn!("Service clock pinned to {} - reset token expiry now follows it", now.to_rfc3339());
    Ok(Response::new(common::Empty {}))
}

///
/// Hand the clock back to the system time.
///
pub async fn reset_time(ctx: &ServiceContext, _request: Request<common::Empty>)
    -> Result<Response<common::Empty>, Status> {

    ctx.set_now(None);

    tracing::info!("Service clock follows the system time again");
    Ok(Response::new(common::Empty {}))
}

fn parse_new_time(new_time: &str) -> Result<DateTime<Utc>, TurnstileError> {
    DateTime::parse_from_rfc3339(new_time.trim())
        .map(|parsed| parsed.with_timezone(&Utc))
        .map_err(|err| ErrorCode::InvalidTime.with_msg(&format!("'{}' is not an RFC3339 time: {}", new_time, err)))
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_offsets_are_normalised_to_utc() -> Result<(), TurnstileError> {
        let parsed = parse_new_time("2024-01-01T14:00:00+02:00")?;
        assert_eq!(parsed.to_rfc3339(), "2024-01-01T12:00:00+00:00");
        Ok(())
    }

    #[test]
    fn test_unparseable_times_are_rejected() {
        let err = parse_new_time("yesterday").unwrap_err();
        assert_eq!(err.error_code(), ErrorCode::InvalidTime);
        assert_eq!(err.field(), Some("new_time"));
    }
}
