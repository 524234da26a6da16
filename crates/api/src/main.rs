use std::env;

use anyhow::Result;
use parley_api::build_app;
use parley_observability::init_tracing;

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing("parley_api");

    let bind = env::var("PARLEY_BIND").unwrap_or_else(|_| "0.0.0.0:8080".to_string());

    let app = build_app(None).await?;

    let listener = tokio::net::TcpListener::bind(&bind).await?;
    tracing::info!(bind = %bind, "parley api started");

    axum::serve(listener, app).await?;
    Ok(())
}
