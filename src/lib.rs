pub mod db;
pub mod model;
pub mod notify;
pub mod services;
pub mod utils;

use tokio::signal;
use dotenv::dotenv;
use std::sync::Arc;
use std::net::SocketAddr;
use utils::health;
use tokio::sync::oneshot;
use db::{AccountRepository, account::MongoAccounts, memory::InMemoryAccounts, mongo};
use utils::errors::{ErrorCode, TurnstileError};
use utils::context::ServiceContext;
use utils::config::{self, Configuration, STORE_MEMORY};
use grpc::api::accounts_server::AccountsServer;
use grpc::admin::admin_server::AdminServer;
use tonic::transport::{Identity, Server, ServerTlsConfig};
use opentelemetry::{global, sdk::{propagation::TraceContextPropagator, trace, trace::Sampler}};
use tracing_subscriber::{layer::SubscriberExt, Registry, util::SubscriberInitExt};

///
/// These are the generated gRPC/protobuf modules which give us access to the message structures, services,
/// servers and clients to talk to our APIs. The services are implemented in services/mod.rs
///
pub mod grpc {
    pub mod common {
        tonic::include_proto!("grpc.common");
    }

    pub mod api {
        tonic::include_proto!("grpc.turnstile");
    }

    pub mod admin {
        tonic::include_proto!("grpc.admin");
    }
}

pub const APP_NAME: &str = "Turnstile";

///
/// Entry point to start the app.
///
pub async fn lib_main() -> Result<(), TurnstileError> {

    // Load any local dev settings as environment variables from a .env file.
    dotenv().ok();

    // Default log level to INFO if it's not specified.
    config::default_env("RUST_LOG", "INFO");

    // SIGINT/ctrl+c handling for graceful shutdown.
    let (signal_tx, signal_rx) = oneshot::channel();
    let _signal = tokio::spawn(wait_for_signal(signal_tx));

    // Load the service configuration into struct.
    let config = Configuration::from_env()
        .map_err(|err| ErrorCode::InvalidConfig.with_msg(&format!("The service configuration is not correct: {}", err)))?;

    // Initialise open-telemetry distributed tracing.
    let exporting = init_tracing(&config)?;

    tracing::info!("{}\n{}", BANNER, config.fmt_console()?);

    // Connect to wherever accounts are kept and whoever delivers reset tokens.
    let accounts = init_store(&config).await?;
    let notifier = notify::from_config(&config)?;

    // The service context allows any gRPC service access to shared stuff (account store, notifier, etc.).
    let ctx = Arc::new(ServiceContext::new(config.clone(), accounts, notifier));

    let (mut health_reporter, health_service) = tonic_health::server::health_reporter();
    health_reporter
        .set_serving::<AccountsServer<Arc<ServiceContext>>>()
        .await;

    tokio::spawn(health::monitor(ctx.clone(), health_reporter.clone()));

    let addr: SocketAddr = config.address.parse()?;

    tracing::info!("Health checks enabled for service grpc.turnstile.Accounts");
    tracing::info!("{} listening on {}{}", APP_NAME, addr, if config.tls { " and using tls" } else { "" });

    let mut builder = Server::builder();
    if config.tls {
        builder = builder.tls_config(ServerTlsConfig::new().identity(init_tls().await?))?;
    }

    let server = builder
        .add_service(AccountsServer::new(ctx.clone()))
        .add_service(AdminServer::new(ctx.clone()))
        .add_service(health_service)
        .serve_with_shutdown(addr, async {
            signal_rx.await.ok();
            tracing::info!("Graceful shutdown");
        });

    server.await?;

    if exporting {
        opentelemetry::global::shutdown_tracer_provider(); // sending remaining spans
    }

    Ok(())
}

///
/// Sends a oneshot signal when a SIGINT is received (Ctrl+C)
///
async fn wait_for_signal(tx: oneshot::Sender<()>) {
    let _ = signal::ctrl_c().await;
    tracing::info!("SIGINT received: shutting down");
    let _ = tx.send(());
}

///
/// Create the account store named in the configuration. For MongoDB, connect and ensure the
/// schema is in sync with the code before proceeding.
///
async fn init_store(config: &Configuration) -> Result<Arc<dyn AccountRepository>, TurnstileError> {
    if config.store == STORE_MEMORY {
        tracing::warn!("Accounts are held in memory and will not survive a restart");
        return Ok(Arc::new(InMemoryAccounts::default()))
    }

    let db = mongo::get_mongo_db(APP_NAME, config).await?;
    mongo::update_mongo(&db).await?;
    Ok(Arc::new(MongoAccounts::new(db)))
}

///
/// Bind to the server-side key and certificate.
///
async fn init_tls() -> Result<Identity, TurnstileError> {

    tracing::info!("Initialising TLS config");

    let cert = tokio::fs::read("certs/cert.pem")
        .await
        .map_err(|e| ErrorCode::IOError.with_msg(&format!("Failed to open pem: {}", e)))?;

    let key = tokio::fs::read("certs/key.pem")
        .await
        .map_err(|e| ErrorCode::IOError.with_msg(&format!("Failed to open key: {}", e)))?;

    Ok(Identity::from_pem(cert, key))
}

///
/// Initialise tracing and plug-in the Jaeger feature if enabled.
///
fn init_tracing(config: &Configuration) -> Result<bool, TurnstileError> {
    global::set_text_map_propagator(TraceContextPropagator::new());

    match config.distributed_tracing {
        true => { // Install the Jaeger pipeline.
            let tracer = opentelemetry_jaeger::new_pipeline()
                .with_service_name(APP_NAME)
                .with_trace_config(trace::config().with_sampler(Sampler::AlwaysOn))
                .with_agent_endpoint(config.jaeger_endpoint.clone().unwrap_or_default())
                .install_batch(opentelemetry::runtime::Tokio)
                .map_err(|err| ErrorCode::InvalidConfig.with_msg(&format!("Unable to build Jaeger pipeline: {}", err)))?;

            if let Err(err) = Registry::default()
                .with(tracing_subscriber::EnvFilter::from_default_env()) // Set the tracing level to match RUST_LOG env variable.
                .with(tracing_subscriber::fmt::layer().with_test_writer().with_ansi(true))
                .with(tracing_opentelemetry::layer().with_tracer(tracer))
                .try_init() {
                    tracing::info!("Tracing already initialised: {}", err); // Allowed error here - tests call this fn repeatedly.
            }

            Ok(true)
        },
        false => {
            if let Err(err) = Registry::default()
                .with(tracing_subscriber::EnvFilter::from_default_env()) // Set the tracing level to match RUST_LOG env variable.
                .with(tracing_subscriber::fmt::layer().with_test_writer().with_ansi(true))
                .try_init() {
                    tracing::info!("Tracing already initialised: {}", err); // Allowed error here - tests call this fn repeatedly.
            }

            Ok(false)
        }
    }
}

const BANNER: &str = r#"
 _____                      _   _ _
|_   _|   _ _ __ _ __  ___| |_(_) | ___
  | || | | | '__| '_ \/ __| __| | |/ _ \
  | || |_| | |  | | | \__ \ |_| | |  __/
  |_| \__,_|_|  |_| |_|___/\__|_|_|\___|
"#;
