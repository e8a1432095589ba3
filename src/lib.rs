pub mod api;
pub mod config;
pub mod logic;
pub mod model;
pub mod seed;
pub mod store;

// Export API types
pub use api::handlers;
pub use api::routes;

// Export logic types
pub use logic::{
    PageError, PageResult, PageService, PendingUriJobs, RetryPolicy, SlugGenerator,
    TemplateHandler, TemplateRegistry, UriJobQueue, UriJobWorker, UriUpdater,
};

// Export all model types
pub use model::*;

// Export seed module
pub use seed::*;

// Export store types
pub use store::{MemoryStore, PostgresStore, Store};

use std::sync::Arc;

use api::handlers::AppContext;

/// Build the application router over any store. Uri jobs go to `jobs`.
pub fn build_app<S: Store + 'static>(
    store: Arc<S>,
    templates: TemplateRegistry,
    jobs: Arc<dyn UriJobQueue>,
) -> axum::Router {
    let context = Arc::new(AppContext::new(store, templates, jobs));
    api::routes::create_router().with_state(context)
}

