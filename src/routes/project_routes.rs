use crate::models::{
    parse_id, HistoryAction, Id, ProjectCreateRequest, ProjectUpdateRequest, ServiceError,
};
use crate::services::access::Intent;
use crate::services::Services;
use crate::utils::get_user_id_from_request;
use actix_web::{delete, get, post, put, web, HttpRequest, HttpResponse};
use log::info;
use serde_json::json;

fn parse_team_ref(raw: &str) -> Result<Option<Id>, ServiceError> {
    Id::parse_optional(raw).map_err(|_| ServiceError::bad_id(raw))
}

// List projects the caller owns or reaches through a team
#[get("/projects")]
async fn list_projects(req: HttpRequest, services: web::Data<Services>) -> Result<HttpResponse, ServiceError> {
    let user_id = get_user_id_from_request(&req)?;

    let projects = services.projects.list_for_user(user_id).await?;

    info!("✅ Found {} projects for user: {}", projects.len(), user_id);
    Ok(HttpResponse::Ok().json(projects))
}

// Create a project, optionally inside a team
#[post("/projects")]
async fn create_project(
    req: HttpRequest,
    services: web::Data<Services>,
    body: web::Json<ProjectCreateRequest>,
) -> Result<HttpResponse, ServiceError> {
    let user_id = get_user_id_from_request(&req)?;
    let mut body = body.into_inner();

    let team_id = match body.team_id.take() {
        Some(raw) => parse_team_ref(&raw)?,
        None => None,
    };
    // Refuse before anything is written
    if let Some(team_id) = team_id {
        services.access.team(user_id, team_id, Intent::Write).await?;
    }

    info!("📝 Creating project '{}' for user: {}", body.name, user_id);
    let mut project = services.projects.create(user_id, body).await?;

    if let Some(team_id) = team_id {
        services.teams.link_project(user_id, team_id, project.id).await?;
        project = services.projects.get(user_id, project.id).await?;
    }

    services
        .history
        .record(
            user_id,
            project.id,
            HistoryAction::ProjectCreated,
            format!("Created project \"{}\"", project.display_title()),
        )
        .await;

    Ok(HttpResponse::Created().json(project))
}

#[get("/projects/{id}")]
async fn get_project(
    req: HttpRequest,
    services: web::Data<Services>,
    path: web::Path<String>,
) -> Result<HttpResponse, ServiceError> {
    let user_id = get_user_id_from_request(&req)?;
    let project_id = parse_id(&path)?;

    let project = services.projects.get(user_id, project_id).await?;
    Ok(HttpResponse::Ok().json(project))
}

// Partial update; changing the team link requires ownership
#[put("/projects/{id}")]
async fn update_project(
    req: HttpRequest,
    services: web::Data<Services>,
    path: web::Path<String>,
    body: web::Json<ProjectUpdateRequest>,
) -> Result<HttpResponse, ServiceError> {
    let user_id = get_user_id_from_request(&req)?;
    let project_id = parse_id(&path)?;
    let mut body = body.into_inner();

    let team_target = match body.team_id.take() {
        Some(Some(raw)) => Some(parse_team_ref(&raw)?),
        // An explicit null unlinks
        Some(None) => Some(None),
        None => None,
    };
    body.validate()?;

    // Every check runs before anything is written
    let current = services.access.project(user_id, project_id, Intent::Write).await?;
    // Echoing the current team back is not a linkage change
    let relink = team_target.filter(|target| *target != current.team_id);
    if relink.is_some() {
        services.access.project(user_id, project_id, Intent::Admin).await?;
    }
    if let Some(Some(team_id)) = relink {
        services.access.team(user_id, team_id, Intent::Write).await?;
    }

    if let Some(target) = relink {
        match target {
            Some(team_id) => {
                services.teams.link_project(user_id, team_id, project_id).await?;
            }
            None => services.teams.release_project(&current).await?,
        }
        if let Some(team_id) = target.or(current.team_id) {
            services
                .history
                .record(
                    user_id,
                    project_id,
                    HistoryAction::TeamProjectUpdated,
                    format!("Moved project \"{}\" (team {})", current.display_title(), team_id),
                )
                .await;
        }
    }

    let project = if body.touches_content() {
        services.projects.update(user_id, project_id, body).await?
    } else {
        services.projects.get(user_id, project_id).await?
    };

    services
        .history
        .record(
            user_id,
            project_id,
            HistoryAction::ProjectUpdated,
            format!("Updated project \"{}\"", project.display_title()),
        )
        .await;

    Ok(HttpResponse::Ok().json(project))
}

#[delete("/projects/{id}")]
async fn delete_project(
    req: HttpRequest,
    services: web::Data<Services>,
    path: web::Path<String>,
) -> Result<HttpResponse, ServiceError> {
    let user_id = get_user_id_from_request(&req)?;
    let project_id = parse_id(&path)?;

    services.projects.delete(user_id, project_id).await?;

    Ok(HttpResponse::Ok().json(json!({ "message": "Project deleted successfully" })))
}

pub fn init_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(list_projects)
        .service(create_project)
        .service(get_project)
        .service(update_project)
        .service(delete_project);
}
