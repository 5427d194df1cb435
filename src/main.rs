mod chat;
mod config;
mod error;
mod model;
#[cfg(test)]
mod testing;
mod web;

use actix_files as fs;
use actix_web::{App, HttpServer, web::Data};
use dotenv::dotenv;
use log::{error, info};

use config::AppConfig;
use model::ModelManager;
use web::routes;

// App state structure. Immutable once the server starts.
pub struct AppState {
    pub config: AppConfig,
    pub models: ModelManager,
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    // Initialize environment
    dotenv().ok();
    env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));

    let config = match AppConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            error!("Startup configuration error: {}", e);
            std::process::exit(1);
        }
    };

    info!("Starting {} backend", config.variant.assistant_name());

    let models = match ModelManager::new(&config) {
        Ok(models) => models,
        Err(e) => {
            error!("Failed to initialize upstream clients: {:#}", e);
            std::process::exit(1);
        }
    };

    let bind = (config.host.clone(), config.port);
    let public_dir = config.public_dir.clone();
    let serve_public = public_dir.is_dir();
    if !serve_public {
        info!("Static directory {} not found, /public disabled", public_dir.display());
    }

    info!("Listening on http://{}:{}", bind.0, bind.1);
    info!("Model {} (scope filter: {}, tts: {})", config.model, config.scope_filter, config.tts_enabled);
    info!("CORS origins: {}", config.cors_origins.join(", "));

    let app_state = Data::new(AppState { config, models });

    // Start web server
    HttpServer::new(move || {
        let app = App::new()
            .wrap(routes::cors(&app_state.config.cors_origins))
            .app_data(app_state.clone())
            .configure(routes::configure);
        if serve_public {
            app.service(fs::Files::new("/public", public_dir.clone()))
        } else {
            app
        }
    })
    .bind(bind)?
    .run()
    .await
}
