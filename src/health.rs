use axum::{routing::get, Router};
use std::net::{Ipv4Addr, SocketAddr};
use tokio::net::TcpListener;
use tracing::info;

use crate::error::AppError;

async fn home() -> &'static str {
    info!("Health check hit");
    "Bot is online!"
}

pub fn router() -> Router {
    Router::new().route("/", get(home))
}

/// Serves the health endpoint on all interfaces.
pub async fn serve(port: u16) -> Result<(), AppError> {
    let listener = TcpListener::bind(SocketAddr::from((Ipv4Addr::UNSPECIFIED, port))).await?;
    info!("Health endpoint listening on {}", listener.local_addr()?);
    serve_on(listener).await
}

pub async fn serve_on(listener: TcpListener) -> Result<(), AppError> {
    axum::serve(listener, router()).await?;
    Ok(())
}
