#![cfg(not(tarpaulin_include))]

use ledger::app;
use ledger::config::Config;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Config first so RUST_LOG from .env is visible to the logger.
    let config = Config::from_env()?;
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    // Start the web application
    app::run(config).await?;

    Ok(())
}
