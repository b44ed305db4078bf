use lending_library::{
    adapters::postgres::PostgresCategoryStore,
    api::{CategoryAppState, ServerKey, create_category_router},
    application::category::ServiceDependencies,
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

    sqlx::migrate!("./migrations/category")
        .run(&pool)
        .await
        .expect("Failed to run migrations");

    // Initialize stores
    let store = Arc::new(PostgresCategoryStore::new(pool));

    let app_state = Arc::new(CategoryAppState {
        service_deps: ServiceDependencies {
            category_store: store.clone(),
            association_store: store,
        },
    });
    let server_key = ServerKey(config.services.server_key.as_str().into());

    let app = create_category_router(app_state, server_key);

    let addr = config.bind_address();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .expect("Failed to bind to address");

    tracing::info!("Category service listening on {}", addr);

    axum::serve(listener, app)
        .await
        .expect("Failed to start server");
}
