use axum::Router;
use parlor::{AppState, auth, chat, config::Config, db, rooms};
use sqlx::sqlite::SqlitePoolOptions;
use tower_http::cors::CorsLayer;
use tower_sessions::{Expiry, MemoryStore, SessionManagerLayer, cookie::SameSite};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    dotenv::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("parlor=info".parse().unwrap()))
        .init();

    let config = Config::from_env();

    let db_pool = SqlitePoolOptions::new()
        .max_connections(config.db_max_connections)
        .connect(&config.database_url)
        .await
        .expect("database connection failed");
    db::init_schema(&db_pool).await.expect("schema init failed");

    let session_store = MemoryStore::default();
    let session_layer = SessionManagerLayer::new(session_store)
        .with_secure(false)
        .with_same_site(SameSite::Lax)
        .with_expiry(Expiry::OnInactivity(time::Duration::minutes(
            config.session_ttl_minutes,
        )));

    let app_state = AppState {
        db_pool,
        chat: chat::ChatState::new(),
    };

    let app = Router::new()
        .merge(auth::router())
        .merge(chat::ws::router())
        .nest("/rooms", rooms::router())
        .with_state(app_state)
        .layer(session_layer)
        .layer(CorsLayer::permissive());

    let listener = tokio::net::TcpListener::bind(config.listen_addr)
        .await
        .expect("bind failed");
    info!("listening on {}", config.listen_addr);
    axum::serve(listener, app).await.expect("server error");
}
