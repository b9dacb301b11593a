use coach_portal::{
    AccessPolicy, AppState,
    config::{AppConfig, Env},
    create_router,
    repository::{InMemoryProfileStore, PostgresProfileStore, ProfileStoreState},
};
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// main
///
/// Entry point: configuration, logging, profile store, access policy, HTTP server.
#[tokio::main]
async fn main() {
    // 1. Configuration (fail-fast on missing production secrets).
    dotenv::dotenv().ok();
    let config = AppConfig::load();

    // 2. Logging: RUST_LOG wins, otherwise sensible local defaults.
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "coach_portal=debug,tower_http=info,axum=info".into());

    // Pretty output locally, JSON for log aggregation in production.
    match config.env {
        Env::Local => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().pretty())
                .init();
        }
        Env::Production => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().json())
                .init();
        }
    }

    tracing::info!("Application starting in {:?} mode", config.env);

    // 3. Access policy. A route override that could produce a redirect loop stops startup here.
    let routes = config
        .route_table()
        .expect("FATAL: invalid route list in ADMIN_ROUTES/TRAINER_ROUTES/AUTH_ROUTES");
    let policy = AccessPolicy::new(routes).expect("FATAL: route lists produce a redirect loop");

    // 4. Profile store.
    let store: ProfileStoreState = match &config.db_url {
        Some(db_url) => {
            let pool = PgPoolOptions::new()
                .max_connections(5)
                .connect(db_url)
                .await
                .expect("FATAL: Failed to connect to Postgres. Check DATABASE_URL.");
            let store = PostgresProfileStore::new(pool);

            // LOCAL-ONLY: create the profiles table for the Dockerized setup.
            if config.env == Env::Local {
                store.ensure_schema().await;
            }
            Arc::new(store) as ProfileStoreState
        }
        None => {
            tracing::warn!("DATABASE_URL not set; using an empty in-memory profile store");
            Arc::new(InMemoryProfileStore::new()) as ProfileStoreState
        }
    };

    let bind_addr = config.bind_addr.clone();
    let app = create_router(AppState::new(config, store, policy));

    let listener = TcpListener::bind(&bind_addr)
        .await
        .expect("FATAL: Failed to bind BIND_ADDR");

    tracing::info!("Listening on {}", bind_addr);
    tracing::info!("API Documentation (Swagger UI) available at /swagger-ui");

    if let Err(e) = axum::serve(listener, app).await {
        tracing::error!("server error: {}", e);
    }
}
