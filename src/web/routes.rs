use actix_cors::Cors;
use actix_web::web;
use crate::web::handlers;

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/text")
            .route("/chat", web::post().to(handlers::chat))
            .route("/token", web::get().to(handlers::token))
            .route("/config", web::get().to(handlers::config))
            .route("/diag", web::get().to(handlers::diag))
            .route("/tts", web::post().to(handlers::tts))
    )
    .route("/", web::get().to(handlers::index))
    .route("/health", web::get().to(handlers::health_check));
}

// The frontend is served from a different port, so every route is cross-origin.
pub fn cors(origins: &[String]) -> Cors {
    let cors = Cors::default()
        .allow_any_method()
        .allow_any_header()
        .max_age(3600);

    if origins.iter().any(|origin| origin == "*") {
        cors.allow_any_origin()
    } else {
        origins
            .iter()
            .fold(cors, |cors, origin| cors.allowed_origin(origin))
    }
}
