//! Pyramid Tiles - A tile server for very large multi-resolution images.
//!
//! This binary starts the HTTP server and configures all components.

use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use pyramid_tiles::{
    config::Config,
    decoder::DecoderRegistry,
    server::{create_router, RouterConfig},
    source::{DecoderHandleCache, ResourceResolver},
    tile::{TileAssembler, TileService},
};

#[tokio::main]
async fn main() -> ExitCode {
    let config = Config::parse();

    // Initialize logging
    init_logging(config.verbose);

    // Validate configuration
    if let Err(e) = config.validate() {
        error!("Configuration error: {}", e);
        return ExitCode::FAILURE;
    }

    let registry = DecoderRegistry::with_defaults();
    let resolver = ResourceResolver::new(&config.image_dir, &config.allowed_extensions);

    info!("Pyramid Tiles v{}", env!("CARGO_PKG_VERSION"));
    info!("Configuration:");
    info!("  Image directory: {}", resolver.root().display());
    info!("  Extensions: {}", resolver.allowed_extensions().join(" "));
    info!("  Decoder backends: {}", registry.len());
    info!(
        "  Handle cache: {} sources, max {} skipped levels",
        config.cache_sources, config.max_skipped_levels
    );
    info!(
        "  Tiles: {} by default, JPEG quality {}",
        config.default_format, config.jpeg_quality
    );

    let cache = Arc::new(
        DecoderHandleCache::new(Arc::new(registry), config.cache_sources)
            .with_assembler(TileAssembler::new(config.max_skipped_levels)),
    );
    let tile_service = TileService::new(resolver, Arc::clone(&cache))
        .with_default_format(config.default_format)
        .with_default_quality(config.jpeg_quality);

    let router = create_router(tile_service, build_router_config(&config));

    // Bind and serve
    let addr = config.bind_address();

    info!("");
    info!("────────────────────────────────────────────────────────────────");
    info!("  Server listening on: http://{}", addr);
    info!("");
    info!("  Try these endpoints:");
    info!("    curl http://{}/health", addr);
    info!("    curl http://{}/images", addr);
    info!("    curl http://{}/images/<image_id>/metadata", addr);
    info!("    curl http://{}/deepzoom/<image_id>.dzi", addr);
    info!("────────────────────────────────────────────────────────────────");
    info!("");

    let listener = match tokio::net::TcpListener::bind(&addr).await {
        Ok(listener) => listener,
        Err(e) => {
            error!("Failed to bind to {}: {}", addr, e);
            return ExitCode::FAILURE;
        }
    };

    let served = axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await;

    let closed = cache.clear().await;
    info!("Closed {} decoder handle(s)", closed);

    if let Err(e) = served {
        error!("Server error: {}", e);
        return ExitCode::FAILURE;
    }

    ExitCode::SUCCESS
}

/// Initialize the tracing/logging subsystem.
fn init_logging(verbose: bool) {
    let env_filter = if verbose {
        "pyramid_tiles=debug,tower_http=debug"
    } else {
        "pyramid_tiles=info,tower_http=info"
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| env_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

/// Build RouterConfig from the application Config.
fn build_router_config(config: &Config) -> RouterConfig {
    let mut router_config = RouterConfig::new()
        .with_cache_max_age(config.cache_max_age)
        .with_tracing(!config.no_tracing);

    if let Some(ref origins) = config.cors_origins {
        router_config = router_config.with_cors_origins(origins.clone());
    }

    router_config
}

/// Resolve on Ctrl-C, or SIGTERM on Unix.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Cannot listen for Ctrl-C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!("Cannot listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutting down");
}
