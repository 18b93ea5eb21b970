//! Warehouse Monitor server binary.
//!
//! Loads configuration, opens the single warehouse session and serves the
//! dashboard. Credential and connection failures end the process with a
//! one-line message.

use std::process::ExitCode;
use std::sync::Arc;

use tracing_subscriber::EnvFilter;

use warehouse_monitor::adapters::http::{app_router, HtmlPageRenderer, MonitoringAppState};
use warehouse_monitor::adapters::obtain_connection;
use warehouse_monitor::config::AppConfig;

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let config = match AppConfig::load() {
        Ok(config) => config,
        Err(err) => {
            eprintln!("warehouse-monitor: {}", err);
            return ExitCode::FAILURE;
        }
    };
    if let Err(err) = config.validate() {
        eprintln!("warehouse-monitor: invalid configuration: {}", err);
        return ExitCode::FAILURE;
    }

    init_tracing(&config);

    let connection = match obtain_connection(&config).await {
        Ok(connection) => connection,
        Err(err) => {
            tracing::error!(error = %err, "Cannot open warehouse session");
            eprintln!("warehouse-monitor: {}", err);
            return ExitCode::FAILURE;
        }
    };

    let state = MonitoringAppState::new(Arc::new(connection), Arc::new(HtmlPageRenderer::new()));
    let app = app_router(state, config.server.request_timeout());

    // Validated above.
    let addr = match config.server.socket_addr() {
        Ok(addr) => addr,
        Err(err) => {
            eprintln!("warehouse-monitor: {}", err);
            return ExitCode::FAILURE;
        }
    };
    let listener = match tokio::net::TcpListener::bind(addr).await {
        Ok(listener) => listener,
        Err(err) => {
            eprintln!("warehouse-monitor: cannot bind {}: {}", addr, err);
            return ExitCode::FAILURE;
        }
    };
    tracing::info!(%addr, environment = ?config.server.environment, "Dashboard listening");

    if let Err(err) = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
    {
        tracing::error!(error = %err, "Server error");
        return ExitCode::FAILURE;
    }
    ExitCode::SUCCESS
}

fn init_tracing(config: &AppConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.server.log_level));

    if config.is_production() {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_ok() {
        tracing::info!("Shutting down");
    }
}
