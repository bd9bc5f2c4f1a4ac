// web-server/src/api/users.rs
use actix_web::{delete, get, post, web, HttpResponse};
use chrono::Utc;
use questline_common::models::UserRole;
use questline_common::OnboardingOutcome;
use serde::Deserialize;
use serde_json::json;

use super::error::ApiError;
use crate::state::AppState;

/// Body of the onboarding request sent by the mini app
#[derive(Debug, Deserialize)]
pub struct InitDataRequest {
    #[serde(rename = "initDataRaw")]
    pub init_data_raw: String,
    #[serde(default)]
    pub role: Option<UserRole>,
}

fn parse_platform_id(raw: &str) -> Result<i64, ApiError> {
    raw.parse::<i64>()
        .map_err(|_| ApiError::BadRequest("Invalid user ID format".to_string()))
}

// Verify init data, then return the existing user or onboard a new one
#[post("/users")]
pub async fn verify_init_data(
    body: web::Json<InitDataRequest>,
    state: web::Data<AppState>,
) -> Result<HttpResponse, ApiError> {
    let body = body.into_inner();

    let identity = state
        .authenticator
        .authenticate(&body.init_data_raw, Utc::now())
        .map_err(|e| {
            tracing::warn!("Rejected init data: {}", e);
            e
        })?;

    let outcome = state
        .coordinator
        .onboard(identity, body.role)
        .await
        .map_err(|e| {
            tracing::error!("Onboarding failed: {}", e);
            e
        })?;

    let response = match outcome {
        OnboardingOutcome::Existing { user } => json!({
            "status": "existing",
            "user": user,
            "redirect": "/profile",
            "message": "User already exists, user data from db",
        }),
        OnboardingOutcome::PendingRoleSelection { identity } => json!({
            "status": "pending_role_selection",
            "identity": identity,
            "redirect": "/choose-role",
            "message": "Choose a role to finish creating your account",
        }),
        OnboardingOutcome::NewlyCreated { user, quests, achievements } => json!({
            "status": "created",
            "user": user,
            "quests": quests,
            "achievements": achievements,
            "redirect": "/profile",
            "message": "A new user has just been created",
        }),
    };

    Ok(HttpResponse::Ok().json(response))
}

#[get("/users/{platform_id}")]
pub async fn get_user(
    path: web::Path<(String,)>,
    state: web::Data<AppState>,
) -> Result<HttpResponse, ApiError> {
    let platform_id = parse_platform_id(&path.0)?;

    match state.coordinator.find_user(platform_id).await? {
        Some(user) => Ok(HttpResponse::Ok().json(user)),
        None => Err(ApiError::NotFound("User not found")),
    }
}

#[get("/users/{platform_id}/progress")]
pub async fn get_user_progress(
    path: web::Path<(String,)>,
    state: web::Data<AppState>,
) -> Result<HttpResponse, ApiError> {
    let platform_id = parse_platform_id(&path.0)?;

    match state.coordinator.progress_for(platform_id).await? {
        Some(progress) => Ok(HttpResponse::Ok().json(json!({ "progress": progress }))),
        None => Err(ApiError::NotFound("User not found")),
    }
}

#[delete("/users/{platform_id}")]
pub async fn delete_user(
    path: web::Path<(String,)>,
    state: web::Data<AppState>,
) -> Result<HttpResponse, ApiError> {
    let platform_id = parse_platform_id(&path.0)?;

    if state.coordinator.remove_user(platform_id).await? {
        Ok(HttpResponse::Ok().json(json!({ "message": "User deleted successfully" })))
    } else {
        Err(ApiError::NotFound("User not found"))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use actix_web::{test, App};
    use questline_common::models::{AchievementContent, QuestContent};
    use questline_common::store::MemoryStore;
    use questline_common::{BotToken, Config, FieldSet};
    use serde_json::Value;

    use super::*;

    const BOT_TOKEN: &str = "123456:test_bot_token";

    fn app_state(quests: usize) -> web::Data<AppState> {
        let config = Config {
            bot_token: BotToken::new(BOT_TOKEN),
            ..Config::default()
        };
        let store = MemoryStore::with_catalog(
            (0..quests)
                .map(|i| QuestContent::new(format!("Quest {}", i), "quest"))
                .collect(),
            config
                .onboarding
                .achievement_names
                .iter()
                .map(|name| AchievementContent::new(name.clone(), "achievement"))
                .collect(),
        );
        web::Data::new(AppState::new(&config, Arc::new(store)))
    }

    fn signed(state: &AppState, user_id: i64) -> String {
        let mut fields = FieldSet::new();
        fields.insert("auth_date", Utc::now().timestamp().to_string());
        fields.insert("user", json!({ "id": user_id, "first_name": "Ann" }).to_string());
        state.authenticator.verifier().sign(&mut fields);
        fields.to_raw()
    }

    macro_rules! service {
        ($state:expr) => {
            test::init_service(
                App::new()
                    .app_data($state.clone())
                    .configure(crate::api::configure),
            )
            .await
        };
    }

    #[actix_web::test]
    async fn test_onboarding_flow_over_http() {
        let state = app_state(4);
        let app = service!(state);
        let raw = signed(&state, 42);

        let req = test::TestRequest::post()
            .uri("/api/users")
            .set_json(json!({ "initDataRaw": raw }))
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["status"], "pending_role_selection");
        assert_eq!(body["redirect"], "/choose-role");
        assert_eq!(body["identity"]["platform_id"], 42);

        let req = test::TestRequest::post()
            .uri("/api/users")
            .set_json(json!({ "initDataRaw": raw, "role": "adventurer" }))
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["status"], "created");
        assert_eq!(body["user"]["role"], "adventurer");
        assert_eq!(body["quests"].as_array().unwrap().len(), 4);
        assert_eq!(body["achievements"].as_array().unwrap().len(), 4);
        assert_eq!(body["quests"][0]["status"], "locked");
        assert_eq!(body["quests"][3]["status"], "active");

        let req = test::TestRequest::post()
            .uri("/api/users")
            .set_json(json!({ "initDataRaw": raw }))
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["status"], "existing");
        assert_eq!(body["redirect"], "/profile");

        let req = test::TestRequest::get().uri("/api/users/42/progress").to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["progress"].as_array().unwrap().len(), 8);
    }

    #[actix_web::test]
    async fn test_tampered_payload_is_unauthorized() {
        let state = app_state(4);
        let app = service!(state);
        let raw = signed(&state, 42).replace("Ann", "Eve");

        let req = test::TestRequest::post()
            .uri("/api/users")
            .set_json(json!({ "initDataRaw": raw, "role": "avatar" }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status().as_u16(), 401);
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["error"], "verification_failed");
    }

    #[actix_web::test]
    async fn test_malformed_payload_is_bad_request() {
        let state = app_state(4);
        let app = service!(state);

        let req = test::TestRequest::post()
            .uri("/api/users")
            .set_json(json!({ "initDataRaw": "user=%ZZ&hash=00" }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status().as_u16(), 400);
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["error"], "invalid_init_data");
    }

    #[actix_web::test]
    async fn test_insufficient_content_is_server_error() {
        let state = app_state(3);
        let app = service!(state);
        let raw = signed(&state, 7);

        let req = test::TestRequest::post()
            .uri("/api/users")
            .set_json(json!({ "initDataRaw": raw, "role": "kingdom" }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status().as_u16(), 500);

        let req = test::TestRequest::get().uri("/api/users/7").to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status().as_u16(), 404);
    }

    #[actix_web::test]
    async fn test_get_and_delete_user() {
        let state = app_state(4);
        let app = service!(state);

        let req = test::TestRequest::get().uri("/api/users/not-a-number").to_request();
        assert_eq!(test::call_service(&app, req).await.status().as_u16(), 400);

        let req = test::TestRequest::post()
            .uri("/api/users")
            .set_json(json!({ "initDataRaw": signed(&state, 5), "role": "avatar" }))
            .to_request();
        assert!(test::call_service(&app, req).await.status().is_success());

        let req = test::TestRequest::get().uri("/api/users/5").to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["platform_id"], 5);
        assert_eq!(body["coins"], 1000);

        let req = test::TestRequest::delete().uri("/api/users/5").to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["message"], "User deleted successfully");

        let req = test::TestRequest::delete().uri("/api/users/5").to_request();
        assert_eq!(test::call_service(&app, req).await.status().as_u16(), 404);
    }
}
