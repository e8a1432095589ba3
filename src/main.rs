use axum::serve;
use page_db_rust::config::AppConfig;
use page_db_rust::logic::UriJobWorker;
use page_db_rust::seed;
use page_db_rust::store::PostgresStore;
use std::sync::Arc;
use tokio::net::TcpListener;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file if it exists
    dotenvy::dotenv().ok();

    // Initialize logging with explicit filter to suppress sqlx debug logs
    use env_logger::Builder;
    use log::LevelFilter;

    Builder::new()
        .filter_level(LevelFilter::Info)
        .filter_module("sqlx", LevelFilter::Warn)
        .parse_default_env()
        .init();

    log::info!("Page service starting");

    let config = AppConfig::load()?;
    log::info!(
        "Configuration loaded: server={}:{}",
        config.server.host,
        config.server.port
    );

    log::info!("Connecting to PostgreSQL...");
    let database_url = config.database_url()?;
    let postgres_store = PostgresStore::new(&database_url, config.max_connections()).await?;

    log::info!("Running database migrations...");
    postgres_store.migrate().await?;

    let store = Arc::new(postgres_store);

    // Load seed data for demonstration (optional)
    if std::env::var("LOAD_SEED_DATA").unwrap_or_default() == "true" {
        log::info!("Loading seed data...");
        seed::load_seed_data(&*store).await?;
    }

    let (worker, worker_handle) = UriJobWorker::spawn(store.clone(), config.retry_policy());
    let app = page_db_rust::build_app(store, config.template_registry(), Arc::new(worker));

    run_server(app, &config).await?;

    // the router owned the last sender; let queued uri jobs finish
    worker_handle.await?;

    Ok(())
}

async fn run_server(app: axum::Router, config: &AppConfig) -> anyhow::Result<()> {
    let bind_address = config.server_address();
    let listener = TcpListener::bind(&bind_address).await?;
    log::info!("Page service running on http://{}", bind_address);

    serve(listener, app).await?;

    Ok(())
}
