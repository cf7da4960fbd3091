use crate::models::{parse_id, HistoryAction, HistoryCreateRequest, ServiceError};
use crate::services::history_service::DEFAULT_LIMIT;
use crate::services::Services;
use crate::utils::get_user_id_from_request;
use actix_web::{get, post, web, HttpRequest, HttpResponse};
use serde::Deserialize;
use serde_json::Value;

#[derive(Deserialize)]
struct HistoryQuery {
    limit: Option<usize>,
}

// The caller's most recent history, newest first
#[get("/history")]
async fn get_history(
    req: HttpRequest,
    services: web::Data<Services>,
    query: web::Query<HistoryQuery>,
) -> Result<HttpResponse, ServiceError> {
    let user_id = get_user_id_from_request(&req)?;
    let limit = query.limit.filter(|l| *l > 0).unwrap_or(DEFAULT_LIMIT).min(DEFAULT_LIMIT);

    let entries = services.history.list(user_id, limit).await?;
    Ok(HttpResponse::Ok().json(entries))
}

#[post("/history")]
async fn create_history(
    req: HttpRequest,
    services: web::Data<Services>,
    body: web::Json<HistoryCreateRequest>,
) -> Result<HttpResponse, ServiceError> {
    let user_id = get_user_id_from_request(&req)?;
    let body = body.into_inner();
    let project_id = parse_id(&body.project_id)?;
    let action: HistoryAction = serde_json::from_value(Value::String(body.action.clone()))
        .map_err(|_| ServiceError::BadRequest(format!("Unknown history action: {}", body.action)))?;

    let entry = services
        .history
        .append(user_id, project_id, action, body.description)
        .await?;
    Ok(HttpResponse::Created().json(entry))
}

pub fn init_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(get_history).service(create_history);
}
