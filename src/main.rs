use std::sync::Arc;

use dotenvy::dotenv;
use log::info;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use invoiceserver::api::configure_api_routes;
use invoiceserver::config::AppConfig;
use invoiceserver::shared::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .write_style(env_logger::WriteStyle::Always)
        .init();

    let config = AppConfig::from_env();
    let addr = config.bind_addr();
    let app_state = Arc::new(AppState::new(config));

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);
    let app = configure_api_routes()
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(app_state);

    info!("Starting HTTP server on {addr}");
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}
