//! HTTP server: shared state, router and the serve loop.

pub mod handlers;
pub mod schemas;

use std::sync::Arc;

use anyhow::Result;
use axum::routing::{get, post};
use axum::Router;
use colored::Colorize;
use tokio_util::sync::CancellationToken;
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::config::ServerConfig;
use crate::embed::{provider_from_config, EmbeddingProvider};
use crate::service::{
    ChunkService, DocumentService, IndexService, LibraryService, SearchService,
};
use crate::store::LibraryStore;

/// Shared server state: one service instance per resource, all backed by
/// the same store and embedding provider.
pub struct AppState {
    pub libraries: LibraryService,
    pub documents: DocumentService,
    pub chunks: ChunkService,
    pub indexes: IndexService,
    pub search: SearchService,
}

/// Wire up services over a store and provider.
pub fn build_state(
    store: Arc<LibraryStore>,
    embedder: Arc<dyn EmbeddingProvider>,
) -> Arc<AppState> {
    Arc::new(AppState {
        libraries: LibraryService::new(store.clone()),
        documents: DocumentService::new(store.clone(), embedder.clone()),
        chunks: ChunkService::new(store.clone(), embedder.clone()),
        indexes: IndexService::new(store.clone()),
        search: SearchService::new(store, embedder),
    })
}

/// Build the full application router.
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(handlers::health))
        .route(
            "/libraries",
            post(handlers::create_library).get(handlers::list_libraries),
        )
        .route(
            "/libraries/:library_id",
            get(handlers::get_library)
                .put(handlers::update_library)
                .delete(handlers::delete_library),
        )
        .route(
            "/libraries/:library_id/documents",
            post(handlers::create_document).get(handlers::list_documents),
        )
        .route(
            "/libraries/:library_id/documents/:document_id",
            get(handlers::get_document)
                .put(handlers::update_document)
                .delete(handlers::delete_document),
        )
        .route(
            "/libraries/:library_id/documents/:document_id/chunks",
            post(handlers::create_chunk).get(handlers::list_chunks),
        )
        .route(
            "/libraries/:library_id/documents/:document_id/chunks/:chunk_id",
            get(handlers::get_chunk)
                .put(handlers::update_chunk)
                .delete(handlers::delete_chunk),
        )
        .route("/libraries/:library_id/index", get(handlers::list_indexes))
        .route(
            "/libraries/:library_id/index/:name",
            post(handlers::create_index)
                .get(handlers::get_index)
                .delete(handlers::delete_index),
        )
        .route(
            "/libraries/:library_id/search/:name",
            post(handlers::search),
        )
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::permissive()),
        )
        .with_state(state)
}

/// Run the HTTP server until the cancellation token fires.
pub async fn serve(config: ServerConfig, cancel_token: CancellationToken) -> Result<()> {
    let store = Arc::new(LibraryStore::new());
    let embedder = provider_from_config(&config);
    let state = build_state(store, embedder);
    let app = router(state);

    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    println!("{}", "🚀 shelfdb".bright_cyan().bold());
    println!("{}", "=".repeat(40));
    println!("🌐 Listening on http://{}", addr);
    println!("📚 Libraries:  POST http://{}/libraries", addr);
    println!("🔍 Search:     POST http://{}/libraries/{{id}}/search/{{name}}", addr);
    info!(addr = %addr, "server started");

    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            cancel_token.cancelled().await;
            info!("shutdown signal received, draining connections");
        })
        .await?;

    info!("server stopped");
    Ok(())
}
