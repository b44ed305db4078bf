use lending_library::{
    adapters::http::{HttpAuthorService, HttpCategoryService, HttpTokenVerifier, ServiceEndpoint},
    adapters::postgres::{PostgresInventoryStore, PostgresLendingLedger},
    api::{AppState, create_book_router},
    application::book::ServiceDependencies,
    config::AppConfig,
};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    let config = AppConfig::load().expect("Failed to load configuration");

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                format!("lending_library={},tower_http=debug", config.logging.level).into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Initialize database
    let database_url = config
        .database
        .url
        .as_deref()
        .expect("DATABASE_URL must be set");
    let pool = sqlx::postgres::PgPoolOptions::new()
        .max_connections(config.database.max_connections)
        .connect(database_url)
        .await
        .expect("Failed to connect to database");

    sqlx::migrate!("./migrations/book")
        .run(&pool)
        .await
        .expect("Failed to run migrations");

    // Initialize stores
    let inventory_store = Arc::new(PostgresInventoryStore::new(pool.clone()));
    let lending_ledger = Arc::new(PostgresLendingLedger::new(pool));

    // Initialize remote clients (one pooled client shared by all endpoints)
    let client = reqwest::Client::new();
    let server_key = Some(config.services.server_key.clone());
    let author_service = Arc::new(HttpAuthorService::new(ServiceEndpoint::new(
        "author-service",
        client.clone(),
        &config.services.author_url,
        server_key.clone(),
    )));
    let category_service = Arc::new(HttpCategoryService::new(ServiceEndpoint::new(
        "category-service",
        client.clone(),
        &config.services.category_url,
        server_key.clone(),
    )));
    let token_verifier = Arc::new(HttpTokenVerifier::new(ServiceEndpoint::new(
        "auth-service",
        client,
        &config.services.auth_url,
        server_key,
    )));

    // Create service dependencies
    let service_deps = ServiceDependencies {
        inventory_store,
        lending_ledger,
        author_service,
        category_service,
        return_policy: config.lending.return_policy,
    };

    // Create application state
    let app_state = Arc::new(AppState {
        service_deps,
        token_verifier,
    });

    // Create router
    let app = create_book_router(app_state);

    let addr = config.bind_address();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .expect("Failed to bind to address");

    tracing::info!(
        return_policy = ?config.lending.return_policy,
        "Book service listening on {}",
        addr
    );

    // Start server
    axum::serve(listener, app)
        .await
        .expect("Failed to start server");
}
