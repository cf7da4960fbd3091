// End-to-end tests that drive the full route table against a throwaway store.
use crate::config::Config;
use crate::models::Id;
use crate::services::Services;
use actix_web::http::header;
use chrono::Duration;
use tempfile::TempDir;

pub const PASSWORD: &str = "pw12345";

// Builds the whole app around a context's services
macro_rules! test_app {
    ($ctx:expr) => {
        actix_web::test::init_service(
            actix_web::App::new()
                .app_data(actix_web::web::Data::new($ctx.services.clone()))
                .configure(|cfg| crate::routes::init_routes(cfg, $ctx.services.tokens.clone())),
        )
        .await
    };
}

mod keyframe_tests;
mod team_tests;
mod upload_tests;

pub struct TestContext {
    pub services: Services,
    _root: TempDir,
}

impl TestContext {
    pub fn new() -> TestContext {
        let root = tempfile::tempdir().unwrap();
        let storage = root.path().join("storage").to_string_lossy().to_string();
        let uploads = root.path().join("uploads").to_string_lossy().to_string();

        let config = Config::from_lookup(move |key| match key {
            "STORAGE_DIR" => Some(storage.clone()),
            "UPLOAD_DIR" => Some(uploads.clone()),
            "BCRYPT_COST" => Some("4".to_string()),
            "JWT_SECRET" => Some("integration-secret".to_string()),
            _ => None,
        })
        .unwrap();

        TestContext {
            services: Services::open(&config).unwrap(),
            _root: root,
        }
    }

    /// Registers `username` directly through the auth service and returns a
    /// token for it.
    pub async fn user(&self, username: &str) -> (Id, String) {
        let user = self
            .services
            .auth
            .register(username, &format!("{}@example.com", username), PASSWORD)
            .await
            .unwrap();
        let token = self.services.tokens.mint(user.id, Duration::hours(1)).unwrap();
        (user.id, token)
    }
}

pub fn bearer(token: &str) -> (header::HeaderName, String) {
    (header::AUTHORIZATION, format!("Bearer {}", token))
}
