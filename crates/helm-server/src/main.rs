//! `helm-server` — WebSocket gateway binary.

#![deny(unsafe_code)]

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use anyhow::{Context, Result};
use clap::Parser;
use helm_providers::model_cache::ModelCache;
use helm_runtime::config::SessionConfig;
use helm_runtime::emitter::EventEmitter;
use helm_server::bridge::EventBridge;
use helm_server::server::{AppState, router};
use helm_server::shutdown::ShutdownCoordinator;
use helm_server::sync::SyncService;
use helm_server::websocket::broadcast::BroadcastManager;
use helm_store::SessionStore;
use tracing::info;

#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

#[derive(Debug, Parser)]
#[command(name = "helm-server", about = "Gateway for monitoring agent sessions")]
struct Args {
    /// Port to listen on.
    #[arg(long, default_value_t = 7700)]
    port: u16,

    /// Root directory for durable session logs.
    #[arg(long, default_value = ".helm")]
    data_dir: PathBuf,

    /// Model to configure sessions with (overrides the environment default).
    #[arg(long)]
    model: Option<String>,

    /// Emit logs as JSON.
    #[arg(long, default_value_t = false)]
    json_logs: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    helm_core::logging::init(args.json_logs);

    let config = SessionConfig::new(args.model);
    let model_cache = Arc::new(ModelCache::new());
    let model = config.reported_model(&model_cache);

    let store = Arc::new(SessionStore::new(args.data_dir.clone()));
    let sync = Arc::new(SyncService::new());
    let broadcast = Arc::new(BroadcastManager::new());
    let shutdown = Arc::new(ShutdownCoordinator::new());

    // The emitter is the ingress point for session controllers hosted in
    // this process; the bridge routes everything they emit.
    let emitter = Arc::new(EventEmitter::new());
    let bridge = EventBridge::new(
        emitter.subscribe(),
        Arc::clone(&store),
        Arc::clone(&sync),
        Arc::clone(&broadcast),
        None,
        None,
    );
    shutdown.register(tokio::spawn(bridge.run()));

    let state = AppState {
        broadcast,
        sync,
        shutdown: Arc::clone(&shutdown),
        start_time: Instant::now(),
        model: model.clone(),
    };
    let app = router(state);

    let addr = format!("127.0.0.1:{}", args.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    info!(%addr, %model, data_dir = %args.data_dir.display(), "gateway listening");

    let serve_shutdown = Arc::clone(&shutdown);
    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            let ctrl_c = tokio::signal::ctrl_c();
            let token = serve_shutdown.token();
            tokio::select! {
                _ = ctrl_c => info!("ctrl-c received, shutting down"),
                () = token.cancelled() => {}
            }
            serve_shutdown.shutdown();
        })
        .await
        .context("server error")?;

    drop(emitter);
    shutdown.drain(None).await;
    Ok(())
}
