// src/main.rs
mod api;
mod assignment;
mod config;
mod controller;
mod geometry;
mod model;
mod optimizer;
mod types;

use config::AppConfig;

#[tokio::main]
async fn main() {
    if let Err(err) = dotenvy::dotenv() {
        if !matches!(err, dotenvy::Error::Io(ref io_err) if io_err.kind() == std::io::ErrorKind::NotFound)
        {
            eprintln!("⚠️ Could not load .env: {}", err);
        }
    }

    let app_config = AppConfig::from_env();
    let api_config = app_config.api.clone();
    let engine_settings = app_config.engine.clone();

    println!("🚀 Carton suggestion service starting...");
    api::start_api_server(api_config, engine_settings).await;
}
