// src/main.rs
use log::{error, info, warn};
use packman::config::AppConfig;
use packman::{api, catalog};

#[tokio::main]
async fn main() {
    let dotenv_result = dotenvy::dotenv();

    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .parse_default_env()
        .init();

    if let Err(err) = dotenv_result {
        if !matches!(err, dotenvy::Error::Io(ref io_err) if io_err.kind() == std::io::ErrorKind::NotFound)
        {
            warn!("⚠️ Could not load .env: {}", err);
        }
    }

    let app_config = AppConfig::from_env();
    let catalog = match app_config.catalog.path() {
        Some(path) => match catalog::read_catalog(path) {
            Ok(items) => {
                info!("📚 Loaded {} catalog items from {}", items.len(), path.display());
                items
            }
            Err(err) => {
                warn!("⚠️ {}. Serving an empty catalog.", err);
                Vec::new()
            }
        },
        None => Vec::new(),
    };

    info!("🚀 Packing service starting...");
    if let Err(err) =
        api::start_api_server(app_config.api.clone(), app_config.optimizer.clone(), catalog).await
    {
        error!("❌ API server terminated with an error: {}", err);
        std::process::exit(1);
    }
}
