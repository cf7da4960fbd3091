//Third-party-dependencies
use actix_cors::Cors;
use actix_web::middleware::Logger;
use actix_web::{http::header, web, App, HttpServer};
use log::{error, info};

use dance_flow_service::config::{self, Config};
use dance_flow_service::routes;
use dance_flow_service::services::Services;

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    let dotenv_path = config::load_dotenv();

    let log_path = match config::init_logger(&config::log_dir_from_env()) {
        Ok(path) => path,
        Err(e) => {
            eprintln!("❌ {}", e);
            std::process::exit(1);
        }
    };
    info!("📝 Logging to {}", log_path.display());
    if let Some(path) = dotenv_path {
        info!("⚙️ Loaded environment from {}", path.display());
    }

    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            error!("❌ Invalid configuration: {}", e);
            std::process::exit(1);
        }
    };

    let services = match Services::open(&config) {
        Ok(services) => services,
        Err(e) => {
            error!("❌ Failed to initialise services: {}", e);
            std::process::exit(1);
        }
    };

    let (host, port) = config.bind_address();
    info!("🚀 Server starting at {}:{}", host, port);

    let origins = config.allowed_origins.clone();
    let tokens = services.tokens.clone();
    let data = web::Data::new(services);

    HttpServer::new(move || {
        let cors = origins
            .iter()
            .fold(Cors::default(), |cors, origin| cors.allowed_origin(origin))
            .allowed_methods(vec!["GET", "POST", "PUT", "DELETE", "OPTIONS"])
            .allowed_headers(vec![header::AUTHORIZATION, header::CONTENT_TYPE, header::ACCEPT])
            .supports_credentials()
            .max_age(3600);

        App::new()
            .wrap(cors)
            .wrap(Logger::default())
            .app_data(data.clone())
            .configure(|cfg| routes::init_routes(cfg, tokens.clone()))
    })
    .bind((host, port))?
    .shutdown_timeout(0)
    .run()
    .await?;

    info!("👋 Server stopped");
    Ok(())
}
