// web-server/src/main.rs
mod api;
mod middleware;
mod state;

use std::io;

use actix_web::{get, web, App, HttpResponse, HttpServer, Responder};
use questline_common::{setup_tracing, Config};

use crate::middleware::RateLimiter;
use crate::state::AppState;

#[get("/")]
async fn index() -> impl Responder {
    HttpResponse::Ok().body("Questline Web Server")
}

#[actix_web::main]
async fn main() -> io::Result<()> {
    // The log level comes from the loaded configuration
    let config = Config::from_env()
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, format!("Invalid configuration: {}", e)))?;
    setup_tracing(&config.log_level).map_err(|e| io::Error::new(io::ErrorKind::Other, e))?;
    tracing::info!("Configuration loaded, log level {}", config.log_level);

    let server_addr = config.server_addr.clone();
    let rate_limiter = RateLimiter::from_config(&config.rate_limit);
    let state = web::Data::new(AppState::from_config(&config));

    tracing::info!(
        "Starting Web Server on {} (init data max age {}s)",
        server_addr,
        config.auth.max_age_secs
    );

    HttpServer::new(move || {
        App::new()
            .wrap(rate_limiter.clone())
            .app_data(state.clone())
            .service(index)
            .configure(api::configure)
    })
    .bind(&server_addr)?
    .run()
    .await
}
