use crate::models::{LoginRequest, LoginResponse, RegisterRequest, ServiceError};
use crate::services::Services;
use actix_web::{post, web, HttpResponse};
use log::info;
use serde_json::json;

// Register a new user
#[post("/api/register")]
async fn register(
    services: web::Data<Services>,
    body: web::Json<RegisterRequest>,
) -> Result<HttpResponse, ServiceError> {
    info!("📝 Register request for username: {}", body.username);

    let user = services
        .auth
        .register(&body.username, &body.email, &body.password)
        .await?;

    Ok(HttpResponse::Created().json(json!({
        "message": "User registered successfully",
        "user": user
    })))
}

// Login with email or username and get a JWT token
#[post("/api/login")]
async fn login(
    services: web::Data<Services>,
    body: web::Json<LoginRequest>,
) -> Result<HttpResponse, ServiceError> {
    info!("🔑 Login request for: {}", body.login_field);

    let (token, user) = services.auth.login(&body.login_field, &body.password).await?;

    Ok(HttpResponse::Ok().json(LoginResponse { token, user }))
}

// Register all auth routes
pub fn init_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(register).service(login);
}
