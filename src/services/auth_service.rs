// Registration, login and password changes
use actix_web::web;
use chrono::{Duration, Utc};
use derive_more::Display;
use log::{error, info, warn};

use crate::models::{Id, ServiceError, User, UserResponse, UserUpdateRequest};
use crate::services::identity::{IdentityStore, UserChanges, EMAIL_TAKEN, USERNAME_TAKEN};
use crate::services::project_service::ProjectStore;
use crate::store::StoreError;
use crate::utils::jwt::{TokenError, TokenService};
use crate::utils::password::PasswordHasher;

pub const MIN_PASSWORD_LEN: usize = 6;

#[derive(Debug, Display)]
pub enum AuthError {
    #[display(fmt = "Password must be at least {} characters", MIN_PASSWORD_LEN)]
    WeakPassword,
    #[display(fmt = "{}", EMAIL_TAKEN)]
    EmailConflict,
    #[display(fmt = "{}", USERNAME_TAKEN)]
    UsernameConflict,
    #[display(fmt = "Invalid credentials")]
    InvalidCredentials,
    #[display(fmt = "User not found")]
    NotFound,
    #[display(fmt = "{} is required", _0)]
    MissingField(&'static str),
    #[display(fmt = "storage: {}", _0)]
    Storage(StoreError),
    #[display(fmt = "hashing: {}", _0)]
    Hashing(String),
    #[display(fmt = "token: {}", _0)]
    Token(TokenError),
}

impl std::error::Error for AuthError {}

impl From<StoreError> for AuthError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound => AuthError::NotFound,
            StoreError::Conflict(msg) if msg == USERNAME_TAKEN => AuthError::UsernameConflict,
            StoreError::Conflict(_) => AuthError::EmailConflict,
            other => AuthError::Storage(other),
        }
    }
}

impl From<AuthError> for ServiceError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::WeakPassword | AuthError::MissingField(_) => ServiceError::BadRequest(err.to_string()),
            AuthError::EmailConflict | AuthError::UsernameConflict => ServiceError::Conflict(err.to_string()),
            AuthError::InvalidCredentials => ServiceError::Unauthorized,
            AuthError::NotFound => ServiceError::NotFound,
            AuthError::Storage(e) => ServiceError::storage("AUTH", e),
            AuthError::Hashing(_) | AuthError::Token(_) => {
                error!("❌ [AUTH] {}", err);
                ServiceError::InternalServerError
            }
        }
    }
}

fn check_password(password: &str) -> Result<(), AuthError> {
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(AuthError::WeakPassword);
    }
    Ok(())
}

fn is_missing(value: &StoreError) -> bool {
    matches!(value, StoreError::NotFound)
}

#[derive(Clone)]
pub struct AuthService {
    identity: IdentityStore,
    hasher: PasswordHasher,
    tokens: TokenService,
    projects: ProjectStore,
}

impl AuthService {
    pub fn new(identity: IdentityStore, hasher: PasswordHasher, tokens: TokenService, projects: ProjectStore) -> Self {
        AuthService { identity, hasher, tokens, projects }
    }

    // bcrypt is deliberately slow; keep it off the async workers
    async fn hash(&self, password: String) -> Result<String, AuthError> {
        let hasher = self.hasher.clone();
        web::block(move || hasher.hash(&password))
            .await
            .map_err(|e| AuthError::Hashing(e.to_string()))?
            .map_err(|e| AuthError::Hashing(e.to_string()))
    }

    async fn verify(&self, password: String, stored: Option<String>) -> Result<bool, AuthError> {
        let hasher = self.hasher.clone();
        web::block(move || match stored {
            Some(stored) => hasher.verify(&password, &stored),
            None => {
                hasher.burn_verify(&password);
                false
            }
        })
        .await
        .map_err(|e| AuthError::Hashing(e.to_string()))
    }

    pub async fn register(&self, username: &str, email: &str, password: &str) -> Result<UserResponse, AuthError> {
        let username = username.trim();
        let email = email.trim();
        if username.is_empty() {
            return Err(AuthError::MissingField("username"));
        }
        if email.is_empty() {
            return Err(AuthError::MissingField("email"));
        }
        check_password(password)?;

        match self.identity.find_by_email(email).await {
            Ok(_) => return Err(AuthError::EmailConflict),
            Err(e) if is_missing(&e) => {}
            Err(e) => return Err(e.into()),
        }
        match self.identity.find_by_username(username).await {
            Ok(_) => return Err(AuthError::UsernameConflict),
            Err(e) if is_missing(&e) => {}
            Err(e) => return Err(e.into()),
        }

        let password_hash = self.hash(password.to_string()).await?;
        let now = Utc::now();
        let user = User {
            id: Id::new(),
            username: username.to_string(),
            name: None,
            email: email.to_string(),
            password_hash,
            role: None,
            teams: Vec::new(),
            created_at: now,
            updated_at: now,
        };
        // Unique check is repeated under the store lock for concurrent registrations
        let user = self.identity.create(user).await?;

        match self.projects.seed_defaults(user.id).await {
            Ok(count) => info!("🌱 [AUTH] Seeded {} starter projects for {}", count, user.id),
            Err(e) => warn!("⚠️ [AUTH] Could not seed starter projects for {}: {}", user.id, e),
        }

        info!("✅ [AUTH] Registered {} ({})", user.username, user.id);
        Ok(user.to_response())
    }

    /// Email is tried first, then username. Unknown users and wrong
    /// passwords fail identically and take the same time.
    pub async fn login(&self, login_field: &str, password: &str) -> Result<(String, UserResponse), AuthError> {
        let login_field = login_field.trim();

        let user = match self.identity.find_by_email(login_field).await {
            Ok(user) => Some(user),
            Err(e) if is_missing(&e) => match self.identity.find_by_username(login_field).await {
                Ok(user) => Some(user),
                Err(e) if is_missing(&e) => None,
                Err(e) => return Err(AuthError::Storage(e)),
            },
            Err(e) => return Err(AuthError::Storage(e)),
        };

        let stored = user.as_ref().map(|u| u.password_hash.clone());
        let verified = self.verify(password.to_string(), stored).await?;

        let user = match user {
            Some(user) if verified => user,
            _ => {
                info!("🔒 [AUTH] Failed login for '{}'", login_field);
                return Err(AuthError::InvalidCredentials);
            }
        };

        let token = self.mint(user.id, self.tokens.default_ttl())?;
        info!("✅ [AUTH] {} logged in", user.id);
        Ok((token, user.to_response()))
    }

    pub fn mint(&self, user_id: Id, ttl: Duration) -> Result<String, AuthError> {
        self.tokens.mint(user_id, ttl).map_err(AuthError::Token)
    }

    /// Sets a new password for the account behind `email`. Not exposed over
    /// HTTP until there is a way to prove ownership of the address.
    pub async fn reset_password(&self, email: &str, new_password: &str) -> Result<(), AuthError> {
        check_password(new_password)?;
        let user = self.identity.find_by_email(email.trim()).await?;
        let password_hash = self.hash(new_password.to_string()).await?;
        self.identity
            .update(
                user.id,
                UserChanges {
                    password_hash: Some(password_hash),
                    ..UserChanges::default()
                },
            )
            .await?;
        info!("🔑 [AUTH] Password reset for {}", user.id);
        Ok(())
    }

    pub async fn update_profile(&self, user_id: Id, req: UserUpdateRequest) -> Result<UserResponse, AuthError> {
        let mut changes = UserChanges {
            name: req.name.map(|n| n.trim().to_string()),
            ..UserChanges::default()
        };

        // Uniqueness is enforced by the store alongside the write
        changes.email = req.email.map(|e| e.trim().to_string()).filter(|e| !e.is_empty());

        if let Some(password) = req.password.filter(|p| !p.is_empty()) {
            check_password(&password)?;
            changes.password_hash = Some(self.hash(password).await?);
        }

        let user = self.identity.update(user_id, changes).await?;
        info!("✅ [USERS] Updated profile of {}", user_id);
        Ok(user.to_response())
    }
}
