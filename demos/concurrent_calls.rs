// Many tasks sharing one client
//
// All clones share the token, the session and the circuit breaker, so a
// token that expires mid-run is refreshed once for every task.
//
// Run with: RUST_LOG=info cargo run --example concurrent_calls

use nsgifts::prelude::*;
use std::time::Duration;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

const TASKS: usize = 8;

#[tokio::main]
async fn main() -> std::result::Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let email = std::env::var("NSGIFTS_EMAIL")?;
    let password = std::env::var("NSGIFTS_PASSWORD")?;

    let config = ClientConfig::builder()
        .retry(RetryConfig::exponential(4, Duration::from_millis(500)))
        .request_timeout(Duration::from_secs(15))
        .build();
    let client = NsGiftsClient::new(config)?;
    let _session = client.open()?;

    client.login(email, password).await?;

    let operations = [
        Operation::GetCategories,
        Operation::GetAllServices,
        Operation::CheckBalance,
        Operation::GetSteamCurrencyRate,
    ];

    let mut handles = Vec::with_capacity(TASKS);
    for i in 0..TASKS {
        let client = client.clone();
        let operation = operations[i % operations.len()];
        handles.push(tokio::spawn(async move {
            match client.call(operation).await {
                Ok(_) => info!(task = i, %operation, "Call succeeded"),
                Err(e) if e.is_server_busy() => warn!(task = i, %operation, "Skipped: {}", e),
                Err(e) => warn!(task = i, %operation, error = %e, "Call failed"),
            }
        }));
    }

    for handle in handles {
        handle.await?;
    }

    println!(
        "Done. Token refreshes: {}, sessions opened: {}, server error detected: {}",
        client.refresh_count(),
        client.session_generation(),
        client.is_server_error_detected()
    );

    Ok(())
}
