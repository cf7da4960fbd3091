use crate::models::ServiceError;
use crate::services::Services;
use crate::utils::get_user_id_from_request;
use actix_web::http::StatusCode;
use actix_web::{post, web, HttpRequest, HttpResponse};
use log::{error, info};
use serde_json::json;

// Headers the client computes itself
const SKIPPED_HEADERS: &[&str] = &["content-length", "host"];

fn upstream_url(base: &str, query: &str) -> String {
    if query.is_empty() {
        base.to_string()
    } else {
        format!("{}?{}", base, query)
    }
}

fn upstream_failure(message: String) -> HttpResponse {
    HttpResponse::InternalServerError().json(json!({ "error": message }))
}

// Forward a frame to the pose-processing service
#[post("/process-frame")]
async fn process_frame(
    req: HttpRequest,
    services: web::Data<Services>,
    body: web::Bytes,
) -> Result<HttpResponse, ServiceError> {
    let user_id = get_user_id_from_request(&req)?;
    let url = upstream_url(&services.pose_service_url, req.query_string());

    // actix and reqwest sit on different `http` versions, so cross over via strings
    let method = reqwest::Method::from_bytes(req.method().as_str().as_bytes())
        .map_err(|_| ServiceError::BadRequest("Unsupported method".to_string()))?;

    let mut upstream = services.http.request(method, &url);
    for (name, value) in req.headers() {
        if SKIPPED_HEADERS.contains(&name.as_str()) {
            continue;
        }
        upstream = upstream.header(name.as_str(), value.as_bytes());
    }

    info!("🔀 [PROXY] Forwarding {} bytes from {} to {}", body.len(), user_id, url);
    let response = match upstream.body(body.to_vec()).send().await {
        Ok(response) => response,
        Err(e) => {
            error!("❌ [PROXY] Upstream request failed: {}", e);
            return Ok(upstream_failure(format!("Pose service unavailable: {}", e)));
        }
    };

    let status = StatusCode::from_u16(response.status().as_u16()).unwrap_or(StatusCode::BAD_GATEWAY);
    let content_type = response
        .headers()
        .get(reqwest::header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);

    let bytes = match response.bytes().await {
        Ok(bytes) => bytes,
        Err(e) => {
            error!("❌ [PROXY] Failed to read upstream body: {}", e);
            return Ok(upstream_failure(format!("Pose service response unreadable: {}", e)));
        }
    };

    let mut reply = HttpResponse::build(status);
    if let Some(content_type) = content_type {
        reply.content_type(content_type);
    }
    Ok(reply.body(bytes.to_vec()))
}

pub fn init_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(process_frame);
}
