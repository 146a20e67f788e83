use turnstile::utils::errors::TurnstileError;

fn main() -> Result<(), TurnstileError> {
    tokio::runtime::Builder::new_multi_thread()
        // Cap the number of blocking threads - argon hashing runs there and under heavy load we can
        // see explosions of threads, so constraining here prohibits too much resource use.
        .max_blocking_threads(num_cpus::get())
        .enable_all()
        .build()?
        .block_on(async {
            turnstile::lib_main().await
        })
}
