//src/main.rs

use axum::{
    middleware as axum_middleware,
    routing::{get, post, put},
    Router,
};
use tokio::net::TcpListener;

mod common;
mod config;
mod db;
mod handlers;
mod middleware;
mod models;
mod services;

use crate::config::AppState;
use crate::middleware::auth::auth_middleware;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt().with_target(false).compact().init();

    let app_state = AppState::new()
        .await
        .expect("failed to initialize application state");

    sqlx::migrate!()
        .run(&app_state.db_pool)
        .await
        .expect("failed to run database migrations");

    tracing::info!("database migrations applied");

    // Public routes
    let auth_routes = Router::new().route("/login", post(handlers::auth::login));

    // Everything below requires a valid token
    let user_routes = Router::new().route("/me", get(handlers::auth::get_me));

    let reference_routes = Router::new()
        .route("/salespersons", get(handlers::reference::list_salespersons))
        .route("/countries", get(handlers::reference::list_countries))
        .route("/visit-reasons", get(handlers::reference::list_visit_reasons))
        .route(
            "/next-visit-reasons",
            get(handlers::reference::list_next_visit_reasons),
        )
        .route("/product-lines", get(handlers::reference::list_product_lines))
        .route("/competitors", get(handlers::reference::list_competitors));

    let contact_routes = Router::new()
        .route("/clients", get(handlers::contacts::list_clients))
        .route("/clients/{id}", get(handlers::contacts::get_client))
        .route(
            "/prospects",
            get(handlers::contacts::list_prospects).post(handlers::contacts::create_prospect),
        )
        .route("/prospects/{id}", get(handlers::contacts::get_prospect));

    let visit_routes = Router::new()
        .route("/", get(handlers::visits::list_visits))
        .route("/drafts", post(handlers::drafts::open_draft))
        .route(
            "/drafts/{id}",
            get(handlers::drafts::get_draft)
                .put(handlers::drafts::update_draft)
                .delete(handlers::drafts::close_draft),
        )
        .route("/drafts/{id}/next", post(handlers::drafts::next_section))
        .route(
            "/drafts/{id}/previous",
            post(handlers::drafts::previous_section),
        )
        .route("/drafts/{id}/layout", put(handlers::drafts::set_layout))
        .route("/drafts/{id}/changes", get(handlers::drafts::pending_changes))
        .route("/drafts/{id}/check", get(handlers::drafts::check_draft))
        .route("/drafts/{id}/save", post(handlers::drafts::save_draft))
        .route("/drafts/{id}/discard", post(handlers::drafts::discard_draft))
        .route("/{id}", get(handlers::visits::get_visit))
        .route("/{id}/validate", post(handlers::visits::validate_visit));

    let session_routes = Router::new().route(
        "/preferences",
        get(handlers::session::get_preferences).put(handlers::session::set_preferences),
    );

    let phone_routes = Router::new().route("/parse", post(handlers::phone::parse_phone));

    let protected = Router::new()
        .nest("/users", user_routes)
        .nest("/reference", reference_routes)
        .nest("/contacts", contact_routes)
        .nest("/visits", visit_routes)
        .nest("/session", session_routes)
        .nest("/phone", phone_routes)
        .layer(axum_middleware::from_fn_with_state(
            app_state.clone(),
            auth_middleware,
        ));

    let app = Router::new()
        .route("/api/health", get(|| async { "OK" }))
        .nest("/api/auth", auth_routes)
        .nest("/api", protected)
        .with_state(app_state);

    let addr = "0.0.0.0:3000";
    let listener = TcpListener::bind(addr)
        .await
        .expect("failed to bind TCP listener");
    tracing::info!("server listening on {}", addr);
    axum::serve(listener, app).await.expect("server error");
}
