use axum::routing::get;
use axum::Router;

/// Minimal liveness endpoint so the hosting platform can probe the process.
pub async fn serve(port: u16) -> std::io::Result<()> {
    let app = Router::new()
        .route("/", get(running))
        .route("/healthz", get(running));

    let listener = tokio::net::TcpListener::bind(("0.0.0.0", port)).await?;
    log::info!("🌐 Health endpoint listening on port {}", port);
    axum::serve(listener, app).await
}

async fn running() -> &'static str {
    "running"
}
