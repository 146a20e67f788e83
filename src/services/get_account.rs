use tonic::{Request, Response, Status};
use super::{load_account, parse_role, to_response};
use crate::{grpc::api, utils::context::ServiceContext};

pub async fn get_account(ctx: &ServiceContext, request: Request<api::GetAccountRequest>)
    -> Result<Response<api::AccountResponse>, Status> {

    let request = request.into_inner();
    let role = parse_role(&request.role)?;
    let account = load_account(ctx, request.account_id, role).await?;

    Ok(Response::new(to_response(&account, role)))
}
