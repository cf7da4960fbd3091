// User persistence with unique email and username
use chrono::Utc;
use log::info;

use crate::models::{Id, User};
use crate::store::{Collection, StoreError};

pub const EMAIL_TAKEN: &str = "Email already registered";
pub const USERNAME_TAKEN: &str = "Username already taken";
pub const SEARCH_LIMIT: usize = 50;

/// Field changes for [`IdentityStore::update`]; `None` leaves a field alone.
#[derive(Debug, Default, Clone)]
pub struct UserChanges {
    pub name: Option<String>,
    pub email: Option<String>,
    pub password_hash: Option<String>,
}

#[derive(Clone)]
pub struct IdentityStore {
    users: Collection<User>,
}

impl IdentityStore {
    pub fn new(users: Collection<User>) -> Self {
        IdentityStore { users }
    }

    pub async fn find_by_id(&self, id: Id) -> Result<User, StoreError> {
        self.users.find_one(id).await
    }

    pub async fn find_by_email(&self, email: &str) -> Result<User, StoreError> {
        let email = email.to_string();
        self.users
            .find_first(move |u| u.email == email)
            .await?
            .ok_or(StoreError::NotFound)
    }

    pub async fn find_by_username(&self, username: &str) -> Result<User, StoreError> {
        let username = username.to_string();
        self.users
            .find_first(move |u| u.username == username)
            .await?
            .ok_or(StoreError::NotFound)
    }

    /// Inserts a new user; email is checked before username.
    pub async fn create(&self, user: User) -> Result<User, StoreError> {
        let (email, username) = (user.email.clone(), user.username.clone());
        let created = self
            .users
            .insert_unique(user, move |existing| {
                if existing.email == email {
                    Some(EMAIL_TAKEN.to_string())
                } else if existing.username == username {
                    Some(USERNAME_TAKEN.to_string())
                } else {
                    None
                }
            })
            .await?;
        info!("✅ [USERS] Created user {} ({})", created.username, created.id);
        Ok(created)
    }

    /// Applies `changes`. A new email is checked against every other user
    /// under the same store lock as the write.
    pub async fn update(&self, id: Id, changes: UserChanges) -> Result<User, StoreError> {
        let email_changes = changes.email.is_some();
        let apply = move |user: &mut User| {
            if let Some(name) = changes.name {
                user.name = Some(name);
            }
            if let Some(email) = changes.email {
                user.email = email;
            }
            if let Some(hash) = changes.password_hash {
                user.password_hash = hash;
            }
            user.updated_at = Utc::now();
        };

        if !email_changes {
            return self.users.update(id, apply).await;
        }
        self.users
            .update_unique(id, apply, |updated, existing| {
                if existing.email == updated.email {
                    Some(EMAIL_TAKEN.to_string())
                } else {
                    None
                }
            })
            .await
    }

    /// Case-insensitive substring match over username, name and email,
    /// ordered by username and capped at [`SEARCH_LIMIT`].
    pub async fn search(&self, query: &str) -> Result<Vec<User>, StoreError> {
        let needle = query.trim().to_lowercase();
        let mut users = self
            .users
            .find(move |u| {
                needle.is_empty()
                    || u.username.to_lowercase().contains(&needle)
                    || u.email.to_lowercase().contains(&needle)
                    || u.name.as_deref().map_or(false, |n| n.to_lowercase().contains(&needle))
            })
            .await?;
        users.sort_by(|a, b| a.username.cmp(&b.username));
        users.truncate(SEARCH_LIMIT);
        Ok(users)
    }

    // The user.teams mirror is a hint; callers log and carry on when these fail

    pub async fn add_team(&self, user_id: Id, team_id: Id) -> Result<(), StoreError> {
        self.users
            .update(user_id, move |user| {
                if !user.teams.contains(&team_id) {
                    user.teams.push(team_id);
                }
            })
            .await
            .map(|_| ())
    }

    pub async fn remove_team(&self, user_id: Id, team_id: Id) -> Result<(), StoreError> {
        self.users
            .update(user_id, move |user| user.teams.retain(|t| *t != team_id))
            .await
            .map(|_| ())
    }

    pub async fn remove_team_everywhere(&self, team_id: Id) -> Result<usize, StoreError> {
        let touched = self
            .users
            .update_many(
                move |u| u.teams.contains(&team_id),
                move |u| u.teams.retain(|t| *t != team_id),
            )
            .await?;
        if touched > 0 {
            info!("🧹 [USERS] Pulled team {} from {} users", team_id, touched);
        }
        Ok(touched)
    }
}
