use crate::{
    auth::{JwtTokenAuthority, SharedTokenAuthority},
    axum_http::{default_routers, routers},
    config::config_model::DotEnvyConfig,
};
use anyhow::Result;
use axum::{
    Extension, Router,
    http::{
        Method,
        header::{AUTHORIZATION, CONTENT_TYPE},
    },
    routing::get,
};
use std::{net::SocketAddr, sync::Arc, time::Duration};
use storefront::{
    infra::{
        db::postgres::postgres_connection::PgPoolSquad,
        storages::cloudinary::{CloudinaryConfig, CloudinaryStorageClient},
    },
    payments::stripe_client::StripeClient,
};
use tokio::net::TcpListener;
use tower_http::{
    cors::{Any, CorsLayer},
    limit::RequestBodyLimitLayer,
    timeout::TimeoutLayer,
    trace::TraceLayer,
};
use tracing::{error, info};

pub async fn start(config: Arc<DotEnvyConfig>, db_pool: Arc<PgPoolSquad>) -> Result<()> {
    let stripe_client = Arc::new(StripeClient::new(
        config.stripe.secret_key.clone(),
        config.stripe.webhook_secret.clone(),
        Duration::from_secs(config.stripe.timeout_secs),
        config.stripe.webhook_tolerance_secs,
    )?);

    let image_storage = Arc::new(CloudinaryStorageClient::new(CloudinaryConfig {
        cloud_name: config.cloudinary.cloud_name.clone(),
        api_key: config.cloudinary.api_key.clone(),
        api_secret: config.cloudinary.api_secret.clone(),
        folder: config.cloudinary.folder.clone(),
        timeout_secs: config.cloudinary.timeout_secs,
    })?);

    let token_authority: SharedTokenAuthority = Arc::new(JwtTokenAuthority::new(&config.jwt));

    let app = Router::new()
        .fallback(default_routers::not_found)
        .nest(
            "/api/auth",
            routers::auth::routes(Arc::clone(&db_pool), Arc::clone(&token_authority)),
        )
        .nest(
            "/api/products",
            routers::products::routes(Arc::clone(&db_pool), image_storage),
        )
        .nest("/api/cart", routers::cart::routes(Arc::clone(&db_pool)))
        .nest("/api/orders", routers::orders::routes(Arc::clone(&db_pool)))
        .nest(
            "/api/payment",
            routers::payments::routes(Arc::clone(&config), Arc::clone(&stripe_client)),
        )
        .nest(
            "/api/webhook",
            routers::webhooks::routes(Arc::clone(&db_pool), stripe_client),
        )
        .route("/api/v1/health-check", get(default_routers::health_check))
        .layer(Extension(token_authority))
        .layer(TimeoutLayer::new(Duration::from_secs(
            config.backend_server.timeout,
        )))
        .layer(RequestBodyLimitLayer::new(
            (config.backend_server.body_limit * 1024 * 1024).try_into()?,
        ))
        .layer(
            CorsLayer::new()
                .allow_methods([
                    Method::GET,
                    Method::POST,
                    Method::PATCH,
                    Method::PUT,
                    Method::DELETE,
                ])
                .allow_headers([AUTHORIZATION, CONTENT_TYPE])
                .allow_origin(Any),
        )
        .layer(TraceLayer::new_for_http());

    let addr = SocketAddr::from(([0, 0, 0, 0], config.backend_server.port));
    let listener = TcpListener::bind(addr).await?;

    info!("Server is running on port {}", config.backend_server.port);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            error!(error = %err, "Failed to install CTRL+C signal handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(err) => {
                error!(error = %err, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received ctrl+C signal"),
        _ = terminate => info!("Received terminate signal"),
    }
}
