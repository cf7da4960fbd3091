use crate::models::{
    parse_id, AddMemberRequest, HistoryAction, LinkProjectRequest, ServiceError, TeamCreateRequest,
    TeamUpdateRequest,
};
use crate::services::Services;
use crate::utils::get_user_id_from_request;
use actix_web::{delete, get, post, put, web, HttpRequest, HttpResponse};
use log::info;
use serde_json::json;

// Create a new team owned by the caller
#[post("/teams")]
async fn create_team(
    req: HttpRequest,
    services: web::Data<Services>,
    body: web::Json<TeamCreateRequest>,
) -> Result<HttpResponse, ServiceError> {
    let user_id = get_user_id_from_request(&req)?;

    info!("📝 Creating new team: {} for user: {}", body.name, user_id);
    let team = services.teams.create(user_id, body.into_inner()).await?;

    Ok(HttpResponse::Created().json(team))
}

// Get all teams the caller owns or belongs to
#[get("/teams")]
async fn get_user_teams(req: HttpRequest, services: web::Data<Services>) -> Result<HttpResponse, ServiceError> {
    let user_id = get_user_id_from_request(&req)?;

    let teams = services.teams.list_for_user(user_id).await?;

    info!("✅ Found {} teams for user: {}", teams.len(), user_id);
    Ok(HttpResponse::Ok().json(teams))
}

#[get("/teams/{team_id}")]
async fn get_team(
    req: HttpRequest,
    services: web::Data<Services>,
    path: web::Path<String>,
) -> Result<HttpResponse, ServiceError> {
    let user_id = get_user_id_from_request(&req)?;
    let team_id = parse_id(&path)?;

    let detail = services.teams.get(user_id, team_id).await?;
    Ok(HttpResponse::Ok().json(detail))
}

#[put("/teams/{team_id}")]
async fn update_team(
    req: HttpRequest,
    services: web::Data<Services>,
    path: web::Path<String>,
    body: web::Json<TeamUpdateRequest>,
) -> Result<HttpResponse, ServiceError> {
    let user_id = get_user_id_from_request(&req)?;
    let team_id = parse_id(&path)?;

    let team = services.teams.update(user_id, team_id, body.into_inner()).await?;
    Ok(HttpResponse::Ok().json(team))
}

#[delete("/teams/{team_id}")]
async fn delete_team(
    req: HttpRequest,
    services: web::Data<Services>,
    path: web::Path<String>,
) -> Result<HttpResponse, ServiceError> {
    let user_id = get_user_id_from_request(&req)?;
    let team_id = parse_id(&path)?;

    services.teams.delete(user_id, team_id).await?;
    Ok(HttpResponse::Ok().json(json!({ "message": "Team deleted successfully" })))
}

#[get("/teams/{team_id}/members")]
async fn get_team_members(
    req: HttpRequest,
    services: web::Data<Services>,
    path: web::Path<String>,
) -> Result<HttpResponse, ServiceError> {
    let user_id = get_user_id_from_request(&req)?;
    let team_id = parse_id(&path)?;

    let members = services.teams.members(user_id, team_id).await?;
    Ok(HttpResponse::Ok().json(members))
}

// Add a user to a team as editor or viewer
#[post("/teams/{team_id}/members")]
async fn add_team_member(
    req: HttpRequest,
    services: web::Data<Services>,
    path: web::Path<String>,
    body: web::Json<AddMemberRequest>,
) -> Result<HttpResponse, ServiceError> {
    let current_user_id = get_user_id_from_request(&req)?;
    let team_id = parse_id(&path)?;
    let member_id = parse_id(&body.user_id)?;

    info!("👥 Adding user: {} to team: {} as {}", member_id, team_id, body.role);
    let team = services
        .teams
        .add_member(current_user_id, team_id, member_id, &body.role)
        .await?;

    Ok(HttpResponse::Ok().json(team))
}

#[delete("/teams/{team_id}/members/{user_id}")]
async fn remove_team_member(
    req: HttpRequest,
    services: web::Data<Services>,
    path: web::Path<(String, String)>,
) -> Result<HttpResponse, ServiceError> {
    let current_user_id = get_user_id_from_request(&req)?;
    let (raw_team, raw_user) = path.into_inner();
    let team_id = parse_id(&raw_team)?;
    let member_id = parse_id(&raw_user)?;

    let team = services
        .teams
        .remove_member(current_user_id, team_id, member_id)
        .await?;

    Ok(HttpResponse::Ok().json(team))
}

#[get("/teams/{team_id}/projects")]
async fn get_team_projects(
    req: HttpRequest,
    services: web::Data<Services>,
    path: web::Path<String>,
) -> Result<HttpResponse, ServiceError> {
    let user_id = get_user_id_from_request(&req)?;
    let team_id = parse_id(&path)?;

    let projects = services.teams.projects(user_id, team_id).await?;
    Ok(HttpResponse::Ok().json(projects))
}

// Link one of the caller's projects to the team
#[post("/teams/{team_id}/projects")]
async fn add_team_project(
    req: HttpRequest,
    services: web::Data<Services>,
    path: web::Path<String>,
    body: web::Json<LinkProjectRequest>,
) -> Result<HttpResponse, ServiceError> {
    let user_id = get_user_id_from_request(&req)?;
    let team_id = parse_id(&path)?;
    let project_id = parse_id(&body.project_id)?;

    let team = services.teams.link_project(user_id, team_id, project_id).await?;
    services
        .history
        .record(
            user_id,
            project_id,
            HistoryAction::TeamProjectUpdated,
            format!("Added project to team \"{}\"", team.name),
        )
        .await;

    Ok(HttpResponse::Ok().json(team))
}

#[delete("/teams/{team_id}/projects/{project_id}")]
async fn remove_team_project(
    req: HttpRequest,
    services: web::Data<Services>,
    path: web::Path<(String, String)>,
) -> Result<HttpResponse, ServiceError> {
    let user_id = get_user_id_from_request(&req)?;
    let (raw_team, raw_project) = path.into_inner();
    let team_id = parse_id(&raw_team)?;
    let project_id = parse_id(&raw_project)?;

    let team = services.teams.unlink_project(user_id, team_id, project_id).await?;
    services
        .history
        .record(
            user_id,
            project_id,
            HistoryAction::TeamProjectUpdated,
            format!("Removed project from team \"{}\"", team.name),
        )
        .await;

    Ok(HttpResponse::Ok().json(team))
}

// Read-only view of a team project for any team member
#[get("/teams/{team_id}/projects/{project_id}/viewer")]
async fn view_team_project(
    req: HttpRequest,
    services: web::Data<Services>,
    path: web::Path<(String, String)>,
) -> Result<HttpResponse, ServiceError> {
    let user_id = get_user_id_from_request(&req)?;
    let (raw_team, raw_project) = path.into_inner();
    let team_id = parse_id(&raw_team)?;
    let project_id = parse_id(&raw_project)?;

    let project = services.teams.project_view(user_id, team_id, project_id).await?;
    Ok(HttpResponse::Ok().json(project))
}

pub fn init_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(create_team)
        .service(get_user_teams)
        .service(get_team)
        .service(update_team)
        .service(delete_team)
        .service(get_team_members)
        .service(add_team_member)
        .service(remove_team_member)
        .service(get_team_projects)
        .service(add_team_project)
        .service(remove_team_project)
        .service(view_team_project);
}
