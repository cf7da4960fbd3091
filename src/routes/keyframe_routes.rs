use crate::models::{
    parse_id, ElementKeyframesRequest, KeyframeCreateRequest, KeyframeUpdateRequest, ServiceError,
};
use crate::services::Services;
use crate::utils::get_user_id_from_request;
use actix_web::{delete, get, post, put, web, HttpRequest, HttpResponse};
use log::info;
use serde_json::json;

// Create a keyframe document and reference it from its project
#[post("")]
async fn create_keyframe(
    req: HttpRequest,
    services: web::Data<Services>,
    body: web::Json<KeyframeCreateRequest>,
) -> Result<HttpResponse, ServiceError> {
    let user_id = get_user_id_from_request(&req)?;

    let keyframe = services.projects.create_keyframe(user_id, body.into_inner()).await?;

    Ok(HttpResponse::Created().json(keyframe))
}

// Replace one element's keyframes inside the project's keyframesJson
#[post("/{project_id}")]
async fn update_element_keyframes(
    req: HttpRequest,
    services: web::Data<Services>,
    path: web::Path<String>,
    body: web::Json<ElementKeyframesRequest>,
) -> Result<HttpResponse, ServiceError> {
    let user_id = get_user_id_from_request(&req)?;
    let project_id = parse_id(&path)?;
    let ElementKeyframesRequest { element_id, keyframes } = body.into_inner();
    let keyframe_count = keyframes.len();

    info!(
        "🎞️ Updating {} keyframes for element {} on project {}",
        keyframe_count, element_id, project_id
    );

    let verification = services
        .projects
        .update_element_keyframes(user_id, project_id, &element_id, keyframes)
        .await?;

    info!(
        "✅ Keyframes stored for project {}, {} in total",
        project_id, verification.total_keyframes
    );

    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "message": "Keyframes updated",
        "updated": {
            "elementId": element_id,
            "keyframeCount": keyframe_count
        },
        "verification": verification
    })))
}

#[get("/project/{project_id}")]
async fn list_keyframes(
    req: HttpRequest,
    services: web::Data<Services>,
    path: web::Path<String>,
) -> Result<HttpResponse, ServiceError> {
    let user_id = get_user_id_from_request(&req)?;
    let project_id = parse_id(&path)?;

    let keyframes = services.projects.list_keyframes(user_id, project_id).await?;
    Ok(HttpResponse::Ok().json(keyframes))
}

#[put("/{keyframe_id}")]
async fn update_keyframe(
    req: HttpRequest,
    services: web::Data<Services>,
    path: web::Path<String>,
    body: web::Json<KeyframeUpdateRequest>,
) -> Result<HttpResponse, ServiceError> {
    let user_id = get_user_id_from_request(&req)?;
    let keyframe_id = parse_id(&path)?;

    let keyframe = services
        .projects
        .update_keyframe(user_id, keyframe_id, body.into_inner())
        .await?;
    Ok(HttpResponse::Ok().json(keyframe))
}

#[delete("/{keyframe_id}")]
async fn delete_keyframe(
    req: HttpRequest,
    services: web::Data<Services>,
    path: web::Path<String>,
) -> Result<HttpResponse, ServiceError> {
    let user_id = get_user_id_from_request(&req)?;
    let keyframe_id = parse_id(&path)?;

    services.projects.delete_keyframe(user_id, keyframe_id).await?;
    Ok(HttpResponse::Ok().json(json!({ "message": "Keyframe deleted successfully" })))
}

pub fn init_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/direct-keyframes")
            .service(create_keyframe)
            .service(list_keyframes)
            .service(update_element_keyframes)
            .service(update_keyframe)
            .service(delete_keyframe),
    );
}
