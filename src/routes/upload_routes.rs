use crate::models::ServiceError;
use crate::services::Services;
use crate::utils::get_user_id_from_request;
use crate::utils::uploads::{self, Category, VIDEO_EXTENSIONS};
use actix_multipart::Multipart;
use actix_web::{post, web, HttpRequest, HttpResponse};
use log::{info, warn};
use serde_json::json;

fn uploaded(category: Category, filename: &str) -> HttpResponse {
    HttpResponse::Ok().json(json!({
        "url": uploads::public_url(category, filename),
        "filename": filename,
        "success": true
    }))
}

// Upload a practice video (multipart field "video")
#[post("/upload/video")]
async fn upload_video(
    req: HttpRequest,
    services: web::Data<Services>,
    payload: Multipart,
) -> Result<HttpResponse, ServiceError> {
    let user_id = get_user_id_from_request(&req)?;
    let mut form = uploads::read_form(payload).await?;

    let file = form
        .files
        .remove("video")
        .ok_or_else(|| ServiceError::BadRequest("No file provided".to_string()))?;
    let ext = uploads::extension_of(&file.original_name).unwrap_or_default();
    if !VIDEO_EXTENSIONS.contains(&ext.as_str()) {
        warn!("⚠️ [UPLOAD] Rejected video {} from {}", file.original_name, user_id);
        return Err(ServiceError::BadRequest(format!(
            "Invalid file type. Allowed types: {}",
            VIDEO_EXTENSIONS.join(", ")
        )));
    }

    let filename = uploads::store(&services.upload_root, Category::Videos, &ext, file.bytes).await?;
    info!("🎬 [UPLOAD] Video {} uploaded by {}", filename, user_id);
    Ok(uploaded(Category::Videos, &filename))
}

// Upload audio or another whitelisted file (multipart field "file")
#[post("/upload")]
async fn upload_file(
    req: HttpRequest,
    services: web::Data<Services>,
    payload: Multipart,
) -> Result<HttpResponse, ServiceError> {
    let user_id = get_user_id_from_request(&req)?;
    let mut form = uploads::read_form(payload).await?;

    let file = form
        .files
        .remove("file")
        .ok_or_else(|| ServiceError::BadRequest("No file provided".to_string()))?;
    let ext = uploads::extension_of(&file.original_name).unwrap_or_default();
    let category = Category::for_general(&ext).ok_or_else(|| {
        warn!("⚠️ [UPLOAD] Rejected {} from {}", file.original_name, user_id);
        ServiceError::BadRequest("Invalid file type".to_string())
    })?;

    let filename = uploads::store(&services.upload_root, category, &ext, file.bytes).await?;
    info!("📎 [UPLOAD] {} stored in {} for {}", filename, category.dir_name(), user_id);
    Ok(uploaded(category, &filename))
}

pub fn init_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(upload_video).service(upload_file);
}
