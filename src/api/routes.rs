use axum::{
    routing::{get, put},
    Router,
};

use crate::api::handlers::{self, AppState};
use crate::store::traits::Store;

pub fn create_router<S: Store + 'static>() -> Router<AppState<S>> {
    Router::new()
        // Health check
        .route("/health", get(handlers::health_check))
        // Admin API
        .nest("/api", admin_routes::<S>())
        // Public page lookup for rendering
        .route("/site/*uri", get(handlers::render_page::<S>))
}

fn admin_routes<S: Store + 'static>() -> Router<AppState<S>> {
    Router::new()
        .route(
            "/pages",
            get(handlers::list_pages::<S>).post(handlers::create_page::<S>),
        )
        // Registered alongside /pages/:id; the static segment wins
        .route("/pages/reorder", put(handlers::reorder_pages::<S>))
        .route(
            "/pages/:id",
            get(handlers::get_page::<S>)
                .put(handlers::update_page::<S>)
                .patch(handlers::update_page::<S>)
                .delete(handlers::delete_page::<S>),
        )
        .route("/page-templates", get(handlers::list_templates::<S>))
}
