//! Binary entry point: wire config, logging, the broadcaster and the HTTP
//! server together. The broadcaster is constructed exactly once here and
//! injected into the router state.

use std::sync::Arc;

use eventstream::api::{build_router, AppState};
use eventstream::config::Config;
use eventstream::hub::Broadcaster;

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "eventstream=debug,info".parse().expect("valid env filter")),
        )
        .init();

    let config = Config::from_env();
    let broadcaster = Arc::new(Broadcaster::new(
        config.history_capacity,
        config.queue_capacity,
    ));
    let state = AppState {
        broadcaster,
        keepalive: config.keepalive,
    };

    let listener = tokio::net::TcpListener::bind(config.bind_addr)
        .await
        .expect("failed to bind listener");
    tracing::info!(addr = %config.bind_addr, "event streaming hub listening");
    axum::serve(listener, build_router(state))
        .await
        .expect("server failed");
}
