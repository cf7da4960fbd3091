use crate::models::{parse_id, ModelView, ServiceError};
use crate::services::Services;
use crate::utils::get_user_id_from_request;
use crate::utils::uploads;
use actix_multipart::Multipart;
use actix_web::http::header;
use actix_web::{delete, get, post, web, HttpRequest, HttpResponse};
use log::{error, info};
use serde_json::json;
use std::fs;
use std::io;

// List the caller's models
#[get("/models")]
async fn list_models(req: HttpRequest, services: web::Data<Services>) -> Result<HttpResponse, ServiceError> {
    let user_id = get_user_id_from_request(&req)?;

    let models: Vec<ModelView> = services
        .models
        .list_for_user(user_id)
        .await?
        .iter()
        .map(|m| m.to_view())
        .collect();
    Ok(HttpResponse::Ok().json(models))
}

// Upload a .glb model (multipart "model", optional "name")
#[post("/models/upload")]
async fn upload_model(
    req: HttpRequest,
    services: web::Data<Services>,
    payload: Multipart,
) -> Result<HttpResponse, ServiceError> {
    let user_id = get_user_id_from_request(&req)?;
    let mut form = uploads::read_form(payload).await?;

    let file = form
        .files
        .remove("model")
        .ok_or_else(|| ServiceError::BadRequest("No file uploaded".to_string()))?;
    let name = form.fields.remove("name");

    let model = services.models.create(user_id, file, name).await?;
    Ok(HttpResponse::Created().json(model.to_view()))
}

#[get("/models/{id}")]
async fn get_model(
    req: HttpRequest,
    services: web::Data<Services>,
    path: web::Path<String>,
) -> Result<HttpResponse, ServiceError> {
    let user_id = get_user_id_from_request(&req)?;
    let model_id = parse_id(&path)?;

    let model = services.models.get(user_id, model_id).await?;
    Ok(HttpResponse::Ok().json(model.to_view()))
}

#[delete("/models/{id}")]
async fn delete_model(
    req: HttpRequest,
    services: web::Data<Services>,
    path: web::Path<String>,
) -> Result<HttpResponse, ServiceError> {
    let user_id = get_user_id_from_request(&req)?;
    let model_id = parse_id(&path)?;

    services.models.delete(user_id, model_id).await?;
    Ok(HttpResponse::Ok().json(json!({ "message": "Model deleted successfully" })))
}

// Public: serves the model file itself, no token required
#[get("/api/models/file/{filename}")]
pub async fn model_file(
    services: web::Data<Services>,
    path: web::Path<String>,
) -> Result<HttpResponse, ServiceError> {
    let filename = path.into_inner();
    let file_path = services.models.file_path(&filename)?;

    info!("📦 Serving model file: {}", filename);
    let bytes = web::block(move || fs::read(file_path))
        .await
        .map_err(|e| {
            error!("❌ [MODELS] Blocking read failed: {}", e);
            ServiceError::InternalServerError
        })?
        .map_err(|e| match e.kind() {
            io::ErrorKind::NotFound => ServiceError::NotFound,
            _ => {
                error!("❌ [MODELS] Failed to read {}: {}", filename, e);
                ServiceError::InternalServerError
            }
        })?;

    Ok(HttpResponse::Ok()
        .insert_header((header::CONTENT_TYPE, "model/gltf-binary"))
        .insert_header((header::CACHE_CONTROL, "public, max-age=3600"))
        .body(bytes))
}

pub fn init_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(list_models)
        .service(upload_model)
        .service(get_model)
        .service(delete_model);
}
