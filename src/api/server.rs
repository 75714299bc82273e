//! Router assembly and server startup.

use axum::{
    Router,
    routing::{delete, get},
};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::sync::oneshot;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;

use super::handlers;
use crate::db::Database;

/// State shared across handlers.
#[derive(Clone)]
pub struct AppState {
    db: Arc<Database>,
}

impl AppState {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    pub fn db(&self) -> &Database {
        &self.db
    }
}

/// Build the API router.
pub fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/api/health", get(handlers::health))
        // Lists
        .route(
            "/api/lists",
            get(handlers::list_lists).post(handlers::create_list),
        )
        .route(
            "/api/lists/{id}",
            get(handlers::get_list)
                .patch(handlers::update_list)
                .delete(handlers::delete_list),
        )
        // Tasks
        .route(
            "/api/tasks",
            get(handlers::list_tasks).post(handlers::create_task),
        )
        .route(
            "/api/tasks/{id}",
            get(handlers::get_task)
                .patch(handlers::update_task)
                .delete(handlers::delete_task),
        )
        .route("/api/tasks/{id}/logs", get(handlers::list_task_logs))
        // Subtasks
        .route(
            "/api/subtasks",
            get(handlers::list_subtasks).post(handlers::create_subtask),
        )
        .route(
            "/api/subtasks/{id}",
            get(handlers::get_subtask)
                .patch(handlers::update_subtask)
                .delete(handlers::delete_subtask),
        )
        // Labels
        .route(
            "/api/labels",
            get(handlers::list_labels).post(handlers::create_label),
        )
        .route(
            "/api/labels/{id}",
            get(handlers::get_label)
                .patch(handlers::update_label)
                .delete(handlers::delete_label),
        )
        // Task/label associations
        .route(
            "/api/task-labels",
            get(handlers::list_task_labels).post(handlers::create_task_label),
        )
        .route(
            "/api/task-labels/{task_id}/{label_id}",
            delete(handlers::delete_task_label),
        )
        // Reminders and attachments
        .route(
            "/api/reminders",
            get(handlers::list_reminders).post(handlers::create_reminder),
        )
        .route("/api/reminders/{id}", delete(handlers::delete_reminder))
        .route(
            "/api/attachments",
            get(handlers::list_attachments).post(handlers::create_attachment),
        )
        .route("/api/attachments/{id}", delete(handlers::delete_attachment))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Bind and serve the API in the background.
///
/// Returns a sender that triggers graceful shutdown and the bound address
/// (useful when `port` is 0).
pub async fn start_server(
    db: Arc<Database>,
    host: &str,
    port: u16,
) -> anyhow::Result<(oneshot::Sender<()>, SocketAddr)> {
    let app = build_router(AppState::new(db));

    let listener = tokio::net::TcpListener::bind((host, port)).await?;
    let bound_addr = listener.local_addr()?;

    info!("API server listening on http://{}", bound_addr);

    let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();

    tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app)
            .with_graceful_shutdown(async {
                let _ = shutdown_rx.await;
                info!("API server shutting down");
            })
            .await
        {
            tracing::error!("API server error: {}", e);
        }
    });

    Ok((shutdown_tx, bound_addr))
}
