// web-server/src/api/quests.rs
use actix_web::{get, web, HttpResponse};
use questline_common::store::ProgressStore;
use questline_common::OnboardingError;
use serde::Deserialize;
use serde_json::json;

use super::error::ApiError;
use crate::state::AppState;

const DEFAULT_PAGE_SIZE: usize = 10;
const MAX_PAGE_SIZE: usize = 100;

#[derive(Debug, Deserialize)]
pub struct QuestQuery {
    pub skip: Option<usize>,
    pub limit: Option<usize>,
}

// List the quest catalog with offset pagination
#[get("/quests")]
pub async fn list_quests(
    query: web::Query<QuestQuery>,
    state: web::Data<AppState>,
) -> Result<HttpResponse, ApiError> {
    let skip = query.skip.unwrap_or(0);
    let limit = query.limit.unwrap_or(DEFAULT_PAGE_SIZE).min(MAX_PAGE_SIZE);

    let quests = state
        .catalog
        .list_quests(skip, limit)
        .await
        .map_err(OnboardingError::from)?;

    Ok(HttpResponse::Ok().json(json!({
        "quests": quests,
        "skip": skip,
        "limit": limit,
    })))
}
