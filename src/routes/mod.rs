use crate::models::ServiceError;
use crate::utils::auth_middleware::Authentication;
use crate::utils::jwt::TokenService;
use actix_web::web;

pub mod auth_routes;
pub mod health_routes;
pub mod history_routes;
pub mod keyframe_routes;
pub mod model_routes;
pub mod project_routes;
pub mod proxy_routes;
pub mod team_routes;
pub mod upload_routes;
pub mod user_routes;

/// Registers every route. Public resources come first because the
/// authenticated `/api` scope claims every remaining `/api/*` path.
pub fn init_routes(cfg: &mut web::ServiceConfig, tokens: TokenService) {
    cfg.app_data(
        web::JsonConfig::default()
            .error_handler(|err, _req| ServiceError::BadRequest(err.to_string()).into()),
    )
    .app_data(
        web::PathConfig::default()
            .error_handler(|err, _req| ServiceError::BadRequest(err.to_string()).into()),
    )
    .app_data(
        web::QueryConfig::default()
            .error_handler(|err, _req| ServiceError::BadRequest(err.to_string()).into()),
    );

    cfg.service(health_routes::health)
        .service(model_routes::model_file)
        .configure(auth_routes::init_routes);

    cfg.service(
        web::scope("/api")
            .wrap(Authentication::new(tokens))
            .configure(project_routes::init_routes)
            .configure(keyframe_routes::init_routes)
            .configure(team_routes::init_routes)
            .configure(user_routes::init_routes)
            .configure(history_routes::init_routes)
            .configure(upload_routes::init_routes)
            .configure(model_routes::init_routes)
            .configure(proxy_routes::init_routes),
    );
}
