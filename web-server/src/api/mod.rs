// web-server/src/api/mod.rs
pub mod error;
pub mod quests;
pub mod users;

use actix_web::{get, HttpResponse, Responder};
use serde_json::json;

#[get("/")]
pub async fn api_index() -> impl Responder {
    HttpResponse::Ok().json(json!({
        "name": "Questline API",
        "version": env!("CARGO_PKG_VERSION")
    }))
}

pub fn configure(cfg: &mut actix_web::web::ServiceConfig) {
    cfg.service(
        actix_web::web::scope("/api")
            .service(api_index)
            .service(users::verify_init_data)
            .service(users::get_user_progress)
            .service(users::get_user)
            .service(users::delete_user)
            .service(quests::list_quests)
    );
}
