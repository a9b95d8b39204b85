//! Web API module for todo-rs

pub mod auth;
pub mod error;
pub mod handlers;
pub mod state;

use axum::{
    middleware,
    routing::{get, post, MethodRouter},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use self::state::AppState;

/// Register `path` both with and without a trailing slash.
fn route_both(
    router: Router<AppState>,
    path: &str,
    method: MethodRouter<AppState>,
) -> Router<AppState> {
    router
        .route(path, method.clone())
        .route(&format!("{}/", path), method)
}

/// Routes that need `Authorization: Token <key>`
fn protected_routes(state: &AppState) -> Router<AppState> {
    let mut router = Router::new();
    let routes: [(&str, MethodRouter<AppState>); 7] = [
        // Auth
        ("/api/auth/logout", post(handlers::accounts::logout)),
        (
            "/api/auth/profile",
            get(handlers::accounts::get_profile)
                .patch(handlers::accounts::update_profile)
                .put(handlers::accounts::update_profile),
        ),
        // Tasks
        (
            "/api/tasks",
            get(handlers::tasks::list_tasks).post(handlers::tasks::create_task),
        ),
        ("/api/tasks/overdue", get(handlers::tasks::overdue_tasks)),
        ("/api/tasks/today", get(handlers::tasks::today_tasks)),
        (
            "/api/tasks/{id}",
            get(handlers::tasks::get_task)
                .patch(handlers::tasks::update_task)
                .put(handlers::tasks::update_task)
                .delete(handlers::tasks::delete_task),
        ),
        (
            "/api/tasks/{id}/complete",
            post(handlers::tasks::toggle_complete),
        ),
    ];
    for (path, method) in routes {
        router = route_both(router, path, method);
    }
    router.route_layer(middleware::from_fn_with_state(
        state.clone(),
        auth::require_token,
    ))
}

/// Create the full router
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let mut public = Router::new().route("/api/version", get(handlers::version::get_version));
    public = route_both(public, "/api/auth/register", post(handlers::accounts::register));
    public = route_both(public, "/api/auth/login", post(handlers::accounts::login));

    public
        .merge(protected_routes(&state))
        .fallback(handlers::not_found)
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
}

/// Start the API server and run until Ctrl+C
pub async fn start_server(state: AppState, host: &str, port: u16) -> std::io::Result<()> {
    let app = create_router(state);
    let addr = format!("{}:{}", host, port);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("todo-rs API: http://{}/api/", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(std::io::Error::other)?;

    tracing::info!("server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for Ctrl+C");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutdown signal received");
}
