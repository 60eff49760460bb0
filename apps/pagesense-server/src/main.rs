//! PageSense server binary

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tower_governor::{governor::GovernorConfigBuilder, GovernorLayer};
use tracing::{info, Level};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use pagesense_server::{router, AppState, Args};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env before clap reads the environment
    dotenvy::dotenv().ok();

    let args = Args::parse();
    init_tracing(&args);

    info!("Starting PageSense server on {}:{}", args.host, args.port);

    let governor_conf = Arc::new(
        GovernorConfigBuilder::default()
            .per_second(args.ip_rate_limit.into())
            .burst_size(args.ip_rate_limit * 2)
            .finish()
            .context("Invalid per-IP rate limit configuration")?,
    );

    let state = Arc::new(AppState::from_args(&args).await?);

    let app = router(state).layer(GovernorLayer {
        config: governor_conf,
    });

    let addr = args.bind_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;

    info!("Server listening on http://{}", addr);
    info!(
        "Audit quota: {} per {}h per email (fail-open: {})",
        args.audit_limit, args.audit_window_hours, args.fail_open
    );
    info!("Per-IP rate limit: {} requests/second", args.ip_rate_limit);

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}

fn init_tracing(args: &Args) {
    let log_level = if args.verbose { Level::DEBUG } else { Level::INFO };
    let registry = tracing_subscriber::registry()
        .with(EnvFilter::from_default_env().add_directive(log_level.into()));

    if args.log_json {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}
