use clap::Parser; // for cli
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::signal;
use tracing::{Level, error, info, warn};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use contact_gateway::{
    AdmissionGuard, build_router,
    config::Args,
    email::{EmailSender, ResendClient},
    middleware::RateLimitEnforcer,
    state::AppState,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // .env is optional
    dotenvy::dotenv().ok();
    let args = Args::parse();
    init_tracing(args.log_json);

    // one registry for the whole process, shared by every protected route
    let registry = Arc::new(args.client_registry());
    let policy = args.contact_policy();
    let guard = AdmissionGuard::new(registry, policy.clone(), Arc::new(args.exempt_list()));
    let contact_limiter = Arc::new(RateLimitEnforcer::new(guard, args.trust_proxy));

    let mailer: Option<Arc<dyn EmailSender>> = match args.resend_api_key.as_deref() {
        Some(key) if !key.is_empty() => Some(Arc::new(ResendClient::new(
            reqwest::Client::new(),
            key,
            &args.resend_api_url,
        ))),
        _ => {
            warn!("RESEND_API_KEY is not set; contact submissions will fail");
            None
        }
    };
    if args.sender_email.is_none() {
        warn!("SENDER_EMAIL is not set");
    }

    let state = Arc::new(AppState {
        mailer,
        sender: args.sender_address(),
    });

    let app = build_router(state, contact_limiter, &args.cors_origins);

    let addr = args.bind_addr();
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    info!(
        addr = %addr,
        max_requests = policy.max_requests,
        window_secs = policy.window_secs(),
        trust_proxy = args.trust_proxy,
        "Contact gateway listening"
    );

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    info!("Contact gateway stopped");
    Ok(())
}

fn init_tracing(json: bool) {
    let filter = EnvFilter::builder()
        .with_default_directive(Level::INFO.into())
        .from_env_lossy();
    let registry = tracing_subscriber::registry().with(filter);

    if json {
        registry.with(fmt::layer().json()).init();
    } else {
        registry.with(fmt::layer().with_target(false)).init();
    }
}

// Wait for Ctrl+C or SIGTERM
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C, shutting down"),
        _ = terminate => info!("Received SIGTERM, shutting down"),
    }
}
