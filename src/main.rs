use axum::{routing::get, Router};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use quizarena::questions::OpenRouterQuestionProvider;
use quizarena::room::{InMemoryRoomRepository, RoomService};
use quizarena::shared::AppState;
use quizarena::websockets::{websocket_handler, ConnectionManager, InMemoryConnectionManager};

#[tokio::main(flavor = "current_thread")]
async fn main() {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "quizarena=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting quiz game server");

    // Wire up shared application state with dependency injection
    let repository = Arc::new(InMemoryRoomRepository::new());
    let provider = Arc::new(OpenRouterQuestionProvider::from_env());
    let connection_manager: Arc<dyn ConnectionManager> =
        Arc::new(InMemoryConnectionManager::new());
    let room_service = Arc::new(RoomService::new(
        repository,
        provider,
        connection_manager.clone(),
    ));
    let app_state = AppState::new(room_service, connection_manager);

    // Browser clients connect from a separate origin, so CORS stays open.
    let app = Router::new()
        .route("/", get(|| async { "OK" }))
        .route("/ws", get(websocket_handler))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(app_state);

    let port: u16 = std::env::var("PORT")
        .ok()
        .and_then(|p| p.parse().ok())
        .unwrap_or(5000);
    let listener = tokio::net::TcpListener::bind(("0.0.0.0", port)).await.unwrap();
    info!("Server running on http://localhost:{port}");
    axum::serve(listener, app).await.unwrap();
}
