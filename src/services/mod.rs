// src/services/mod.rs
use derive_more::Display;
use log::info;
use std::path::PathBuf;

use crate::config::Config;
use crate::models::{HistoryEntry, Keyframe, Model, Project, Team, User};
use crate::store::{Database, StoreError};
use crate::utils::jwt::TokenService;
use crate::utils::locks::ProjectLocks;
use crate::utils::password::PasswordHasher;

pub mod access;
pub mod auth_service;
pub mod history_service;
pub mod identity;
pub mod model_service;
pub mod project_service;
pub mod team_service;

use access::AccessResolver;
use auth_service::AuthService;
use history_service::HistoryRecorder;
use identity::IdentityStore;
use model_service::ModelStore;
use project_service::ProjectStore;
use team_service::TeamStore;

#[derive(Debug, Display)]
pub enum InitError {
    #[display(fmt = "document store: {}", _0)]
    Store(StoreError),
    #[display(fmt = "password hasher: {}", _0)]
    Hasher(bcrypt::BcryptError),
    #[display(fmt = "http client: {}", _0)]
    Http(reqwest::Error),
    #[display(fmt = "upload directory: {}", _0)]
    Uploads(std::io::Error),
}

impl std::error::Error for InitError {}

/// Everything a handler needs, shared through `web::Data`.
#[derive(Clone)]
pub struct Services {
    pub identity: IdentityStore,
    pub auth: AuthService,
    pub access: AccessResolver,
    pub projects: ProjectStore,
    pub teams: TeamStore,
    pub history: HistoryRecorder,
    pub models: ModelStore,
    pub tokens: TokenService,
    pub http: reqwest::Client,
    pub pose_service_url: String,
    pub upload_root: PathBuf,
}

impl Services {
    pub fn open(config: &Config) -> Result<Services, InitError> {
        let db = Database::open(&config.storage_dir, &config.database_name).map_err(InitError::Store)?;

        let users = db.collection::<User>().map_err(InitError::Store)?;
        let projects = db.collection::<Project>().map_err(InitError::Store)?;
        let teams = db.collection::<Team>().map_err(InitError::Store)?;
        let keyframes = db.collection::<Keyframe>().map_err(InitError::Store)?;
        let histories = db.collection::<HistoryEntry>().map_err(InitError::Store)?;
        let models = db.collection::<Model>().map_err(InitError::Store)?;

        for dir in ["videos", "audio", "files", "models"] {
            std::fs::create_dir_all(config.upload_dir.join(dir)).map_err(InitError::Uploads)?;
        }

        let tokens = TokenService::new(&config.jwt_secret, config.jwt_expiration);
        let hasher = PasswordHasher::new(config.bcrypt_cost).map_err(InitError::Hasher)?;
        let access = AccessResolver::new(projects.clone(), teams.clone());
        let identity = IdentityStore::new(users);

        let project_store = ProjectStore::new(
            projects.clone(),
            keyframes,
            teams.clone(),
            access.clone(),
            ProjectLocks::new(),
        );
        let team_store = TeamStore::new(teams, projects.clone(), identity.clone(), access.clone());
        let auth = AuthService::new(identity.clone(), hasher, tokens.clone(), project_store.clone());

        let http = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()
            .map_err(InitError::Http)?;

        info!("✅ Services ready (store at {})", db.root().display());

        Ok(Services {
            identity,
            auth,
            access,
            projects: project_store,
            teams: team_store,
            history: HistoryRecorder::new(histories, projects),
            models: ModelStore::new(models, config.upload_dir.clone()),
            tokens,
            http,
            pose_service_url: config.pose_service_url.clone(),
            upload_root: config.upload_dir.clone(),
        })
    }
}
