#![allow(dead_code)]
use std::sync::Arc;
use lazy_static::lazy_static;
use tonic::transport::Channel;
use tokio_retry::{Retry, strategy::FixedInterval};
use std::{collections::HashMap, thread::JoinHandle};
use std::sync::atomic::{AtomicI64, Ordering};
use parking_lot::{Mutex, RawMutex, lock_api::MutexGuard};
use turnstile::db::{AccountRepository, memory::InMemoryAccounts};
use turnstile::notify::{MemoryNotifier, NotificationChannel};
use turnstile::utils::{config::{Configuration, STORE_MEMORY}, context::ServiceContext};
use turnstile::grpc::{admin::admin_client::AdminClient, api::accounts_client::AccountsClient};

lazy_static! {
    // A mutex around the TestContext to ensure only one test can be using the server at a time.
    // This ensures tests do not corrupt the configuration, data or clock used by any other test.
    static ref TEST_MUTEX: Mutex<TestContext> = {
        let ctx = TestContext::default();
        ctx.config.apply();
        Mutex::new(ctx)
    };

    // A async runtime needed to run the server being tested in. This ensures when a test terminates,
    // the server is still running and available for another test.
    static ref RT: tokio::runtime::Runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_time()
        .enable_io()
        .build()
        .unwrap();
}

static NEXT_ID: AtomicI64 = AtomicI64::new(1000);

///
/// Account ids unique across the whole test binary.
///
pub fn next_id() -> i64 {
    NEXT_ID.fetch_add(1, Ordering::SeqCst)
}

///
/// An email address nothing else in the test binary uses.
///
pub fn unique_email(id: i64) -> String {
    format!("user{}@example.com", id)
}

///
/// A configuration suitable for tests - fast but weak hashing and the in-memory store.
///
pub fn test_config() -> Configuration {
    let mut config = Configuration::from_env().expect("Unable to load a test configuration");
    config.store = STORE_MEMORY.to_string();
    config.argon_iterations = 1;
    config.argon_memory_kb = 1024;
    config.argon_parallelism = 1;
    config.store_timeout_ms = 2000;
    config
}

///
/// An in-process service with its collaborators exposed, for tests that drive the services directly
/// rather than over gRPC.
///
pub struct Harness {
    pub ctx: Arc<ServiceContext>,
    pub accounts: Arc<InMemoryAccounts>,
    pub notifier: Arc<MemoryNotifier>,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_config(test_config())
    }

    pub fn with_config(config: Configuration) -> Self {
        let accounts = Arc::new(InMemoryAccounts::default());
        let notifier = Arc::new(MemoryNotifier::default());

        let ctx = Arc::new(ServiceContext::new(
            config,
            accounts.clone() as Arc<dyn AccountRepository>,
            notifier.clone() as Arc<dyn NotificationChannel>));

        Harness { ctx, accounts, notifier }
    }
}

///
/// Test's should start by calling start_turnstile to obtain a lock on the TestContext.
///
/// This will give them a gRPC client to talk to a running Turnstile server.
///
#[derive(Default)]
pub struct TestContext {
    config: TestConfig,
    handle: Option<JoinHandle<()>>,
    client: Option<AccountsClient<Channel>>,
    admin: Option<AdminClient<Channel>>,
}

impl TestContext {
    pub fn client(&mut self) -> &mut AccountsClient<Channel> {
        self.client.as_mut().expect("Someone asked for a test client when there wasn't one")
    }

    pub fn admin(&mut self) -> &mut AdminClient<Channel> {
        self.admin.as_mut().expect("Someone asked for a test admin client when there wasn't one")
    }
}

#[derive(PartialEq)]
pub struct TestConfig {
    map: HashMap<&'static str, &'static str>
}

impl Default for TestConfig {
    fn default() -> Self {
        let mut map = HashMap::new();
        map.insert("ADDRESS", "127.0.0.1:50091");
        map.insert("STORE", "memory");
        map.insert("ARGON_ITERATIONS", "1");
        map.insert("ARGON_MEMORY_KB", "1024");
        map.insert("RESET_WINDOW_MINUTES", "30");
        map.insert("TLS", "false");
        map.insert("DISTRIBUTED_TRACING", "false");
        map.insert("JAEGER_ENDPOINT", "");

        Self {
            map
        }
    }
}

impl TestConfig {
    ///
    /// Apply the configuration values to the local environment variables.
    ///
    fn apply(&self) {
        for entry in &self.map {
            if *entry.1 == String::default() {
                std::env::remove_var(entry.0);
            } else {
                std::env::set_var(entry.0, entry.1);
            }
        }
    }

    fn get(&self, key: &str) -> &str {
        self.map.get(key).unwrap_or_else(|| panic!("No test config {}", key))
    }
}

///
/// Acquires a lock so only one test may run at a time and returns a TestContext.
///
/// Ensures the turnstile server is started with the specified configuration. Any fixed clock left
/// behind by a previous test is cleared.
///
pub async fn start_turnstile(config: TestConfig) -> MutexGuard<'static, RawMutex, TestContext> {
    let mut lock = TEST_MUTEX.lock();

    if lock.config != config {
        lock.config = config;
        lock.config.apply();
    }

    // If the server is not running, start it.
    if lock.handle.is_none() {
        // Launch the application in a separate runtime instance. This ensures it will survive test thread
        // teardowns.
        let handle = RT.handle();
        lock.handle = Some(std::thread::spawn(move || {
            let _ignore = handle.block_on(async {
                turnstile::lib_main().await
            });
        }));
    }

    let address = format!("http://{}", lock.config.get("ADDRESS"));

    // Try to connect for up-to 1 minute.
    let target = address.clone();
    let client = Retry::spawn(FixedInterval::from_millis(100).take(600), move || AccountsClient::connect(target.clone()))
        .await
        .expect("Unable to connect test client to server under test");

    let target = address.clone();
    let mut admin = Retry::spawn(FixedInterval::from_millis(100).take(600), move || AdminClient::connect(target.clone()))
        .await
        .expect("Unable to connect admin test client to server under test");

    admin.reset_time(tonic::Request::new(turnstile::grpc::common::Empty::default()))
        .await
        .expect("Unable to reset the server clock");

    lock.client = Some(client);
    lock.admin = Some(admin);

    lock
}

pub mod helper {
    use tonic::Status;

    ///
    /// The numeric error code carried in the details of a failed response.
    ///
    pub fn error_code(status: Status) -> u32 {
        std::str::from_utf8(status.details())
            .ok()
            .and_then(|details| details.parse().ok())
            .unwrap_or_else(|| panic!("No error code in status {:?}", status))
    }
}
