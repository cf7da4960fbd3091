use crate::models::{parse_id, Id, ServiceError, UserResponse, UserSearchQuery, UserUpdateRequest};
use crate::services::access::Intent;
use crate::services::Services;
use crate::utils::get_user_id_from_request;
use actix_web::{get, put, web, HttpRequest, HttpResponse};
use log::info;

// Search users by username, name or email, optionally within one team
#[get("/users")]
async fn search_users(
    req: HttpRequest,
    services: web::Data<Services>,
    query: web::Query<UserSearchQuery>,
) -> Result<HttpResponse, ServiceError> {
    let user_id = get_user_id_from_request(&req)?;
    let query = query.into_inner();

    let team = match query.team_id.as_deref().map(Id::parse_optional) {
        Some(Ok(Some(team_id))) => Some(services.access.team(user_id, team_id, Intent::Read).await?),
        Some(Ok(None)) | None => None,
        Some(Err(e)) => return Err(ServiceError::BadRequest(e.to_string())),
    };

    let users = services
        .identity
        .search(query.search.as_deref().unwrap_or(""))
        .await
        .map_err(|e| ServiceError::storage("USERS", e))?;

    let users: Vec<UserResponse> = users
        .iter()
        .filter(|u| team.as_ref().map_or(true, |t| t.includes(u.id)))
        .map(|u| u.to_response())
        .collect();

    info!("🔍 User search by {} returned {} results", user_id, users.len());
    Ok(HttpResponse::Ok().json(users))
}

#[get("/users/me")]
async fn get_me(req: HttpRequest, services: web::Data<Services>) -> Result<HttpResponse, ServiceError> {
    let user_id = get_user_id_from_request(&req)?;

    let user = services
        .identity
        .find_by_id(user_id)
        .await
        .map_err(|e| ServiceError::storage("USERS", e))?;
    Ok(HttpResponse::Ok().json(user.to_response()))
}

// Update the caller's own name, email or password
#[put("/users/me")]
async fn update_me(
    req: HttpRequest,
    services: web::Data<Services>,
    body: web::Json<UserUpdateRequest>,
) -> Result<HttpResponse, ServiceError> {
    let user_id = get_user_id_from_request(&req)?;

    let user = services.auth.update_profile(user_id, body.into_inner()).await?;
    Ok(HttpResponse::Ok().json(user))
}

#[get("/users/{id}")]
async fn get_user(
    req: HttpRequest,
    services: web::Data<Services>,
    path: web::Path<String>,
) -> Result<HttpResponse, ServiceError> {
    get_user_id_from_request(&req)?;
    let user_id = parse_id(&path)?;

    let user = services
        .identity
        .find_by_id(user_id)
        .await
        .map_err(|e| ServiceError::storage("USERS", e))?;
    Ok(HttpResponse::Ok().json(user.to_response()))
}

// "/users/me" must be registered ahead of "/users/{id}"
pub fn init_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(search_users)
        .service(get_me)
        .service(update_me)
        .service(get_user);
}
