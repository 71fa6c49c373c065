//! Server binary. Binds the address from `INCOGNITO_ADDR` (default
//! `127.0.0.1:8080`) and runs until terminated.

use incognito::{IncognitoError, IncognitoServer};

#[tokio::main]
async fn main() -> Result<(), IncognitoError> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let addr = std::env::var("INCOGNITO_ADDR")
        .unwrap_or_else(|_| "127.0.0.1:8080".to_string());

    let server = IncognitoServer::builder().bind(&addr).build().await?;
    server.run().await
}
