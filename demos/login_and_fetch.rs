// Log in and fetch account data
//
// Reads configuration from NSGIFTS_* variables (or a .env file) and
// credentials from NSGIFTS_EMAIL / NSGIFTS_PASSWORD.
//
// Run with: RUST_LOG=nsgifts_client=debug cargo run --example login_and_fetch

use nsgifts::prelude::*;
use serde_json::json;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> std::result::Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let email = std::env::var("NSGIFTS_EMAIL")?;
    let password = std::env::var("NSGIFTS_PASSWORD")?;

    let client = NsGiftsClient::from_env()?;
    println!("Using API at {}", client.config().base_url);

    let result = client
        .with_session(|client| async move {
            client.login(email, password).await?;

            let user = client.call(Operation::GetUserInfo).await?;
            println!("User: {}", user);

            let balance = client.call(Operation::CheckBalance).await?;
            println!("Balance: {}", balance);

            let services = client
                .call_with(Operation::GetServicesByCategory, &json!({"category_id": 1}))
                .await?;
            println!("Services in category 1: {}", services);

            Ok(())
        })
        .await;

    match result {
        Err(ApiError::ServerBusy { remaining_secs }) => {
            println!("Server is unhealthy, try again in {}s", remaining_secs);
        }
        Err(e) => return Err(e.into()),
        Ok(()) => {}
    }

    Ok(())
}
