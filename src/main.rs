//! Resort Check-in - bridge binary
//!
//! Owns the camera, runs the scanner and serves the local check-in API.

use anyhow::Result;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tower::ServiceBuilder;
use tower_http::{compression::CompressionLayer, cors::CorsLayer, trace::TraceLayer};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use resort_checkin::{
    api,
    backend::{BookingService, ResortClient},
    bus::create_bus,
    camera::{CameraBackend, CameraManager, FrameDirCamera, MemoryCamera},
    config::{self, CameraBackendKind},
    desk::CheckInDesk,
    scanner::{CameraWatchdog, RqrrDecoder, Scanner, ScannerSettings},
};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            "resort_checkin=debug,tower_http=debug,axum::rejection=trace".into()
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting Resort Check-in bridge");

    // Load configuration
    let config = config::load_config()?;
    tracing::info!(?config, "Configuration loaded");

    let bus = create_bus();

    let client = ResortClient::new(
        &config.backend.base_url,
        config.backend.token.clone(),
        config.backend.timeout(),
    )?;
    tracing::info!(base_url = client.base_url(), "Backend client ready");
    let service: Arc<dyn BookingService> = Arc::new(client);

    let backend: Arc<dyn CameraBackend> = match config.camera.backend {
        CameraBackendKind::FramesDir => {
            tokio::fs::create_dir_all(&config.camera.frames_dir).await?;
            tracing::info!(dir = %config.camera.frames_dir.display(), "Using frame directory camera");
            Arc::new(FrameDirCamera::new(&config.camera.frames_dir))
        }
        CameraBackendKind::Memory => {
            tracing::warn!("Using in-memory camera; scans will never decode");
            Arc::new(MemoryCamera::new())
        }
    };
    let camera = Arc::new(CameraManager::new(backend, bus.clone()));

    // A lock left over from a previous run is not ours to keep
    camera.stop_all_streams().await;

    let scanner = Arc::new(Scanner::new(
        camera.clone(),
        Arc::new(RqrrDecoder),
        bus.clone(),
        ScannerSettings::from_fps(config.scanner.fps, config.scanner.grace()),
    ));
    let desk = Arc::new(CheckInDesk::new(scanner.clone(), service, bus.clone()));

    let shutdown = CancellationToken::new();
    let watchdog = CameraWatchdog::new(
        scanner.clone(),
        bus.clone(),
        config.scanner.watchdog_interval(),
    );
    let watchdog_task = tokio::spawn(watchdog.run(shutdown.clone()));

    // Build API routes
    let app = api::router(api::AppState::new(desk, bus)).layer(
        ServiceBuilder::new()
            .layer(TraceLayer::new_for_http())
            .layer(CompressionLayer::new())
            .layer(CorsLayer::permissive()),
    );

    // Start server
    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    let signal = shutdown.clone();
    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!("Failed to listen for shutdown signal: {}", e);
            }
            tracing::info!("Shutdown requested");
            signal.cancel();
        })
        .await?;

    shutdown.cancel();
    scanner.cancel().await;
    camera.stop_all_streams().await;
    if let Err(e) = watchdog_task.await {
        tracing::warn!("Watchdog task ended abnormally: {}", e);
    }

    tracing::info!("Resort Check-in bridge stopped");
    Ok(())
}
