use std::{sync::Arc, time::Duration};
use tonic_health::server::HealthReporter;
use super::context::ServiceContext;
use crate::grpc::api::accounts_server::AccountsServer;

const PULSE: u64 = 4000;

///
/// Ping the account store on every pulse and flip our readiness if it becomes un-contactable.
///
pub async fn monitor(ctx: Arc<ServiceContext>, mut reporter: HealthReporter) {
    let mut healthy = true;

    loop {
        tokio::time::sleep(Duration::from_millis(PULSE)).await;

        let now_healthy = match ctx.bounded(ctx.accounts().ping()).await {
            Ok(()) => true,
            Err(err) => {
                tracing::trace!("Store ping failed: {}", err);
                false
            },
        };

        if now_healthy != healthy {
            if now_healthy {
                tracing::info!("Service healthy (account store reachable)");
                reporter.set_serving::<AccountsServer<Arc<ServiceContext>>>().await;
            } else {
                tracing::error!("Service NOT healthy (account store unreachable)");
                reporter.set_not_serving::<AccountsServer<Arc<ServiceContext>>>().await;
            }
        }

        healthy = now_healthy;
    }
}
