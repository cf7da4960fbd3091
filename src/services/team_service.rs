// Teams, membership, and team <-> project links
use chrono::Utc;
use derive_more::Display;
use log::{error, info, warn};

use crate::models::{
    Id, Member, Project, ServiceError, Team, TeamCreateRequest, TeamDetail, TeamRole,
    TeamUpdateRequest,
};
use crate::services::access::{team_decision, AccessResolver, Intent};
use crate::services::identity::IdentityStore;
use crate::store::{Collection, StoreError};

const TAG: &str = "TEAMS";

#[derive(Debug, Display, PartialEq)]
pub enum TeamError {
    #[display(fmt = "The team owner cannot be removed")]
    CannotRemoveOwner,
    #[display(fmt = "User already owns this team")]
    AlreadyOwner,
    #[display(fmt = "User is already a member of this team")]
    AlreadyMember,
    #[display(fmt = "Invalid role: {}", _0)]
    InvalidRole(String),
}

impl std::error::Error for TeamError {}

impl From<TeamError> for ServiceError {
    fn from(err: TeamError) -> Self {
        match err {
            TeamError::CannotRemoveOwner => ServiceError::Forbidden,
            other => ServiceError::BadRequest(other.to_string()),
        }
    }
}

#[derive(Clone)]
pub struct TeamStore {
    teams: Collection<Team>,
    projects: Collection<Project>,
    identity: IdentityStore,
    access: AccessResolver,
}

impl TeamStore {
    pub fn new(
        teams: Collection<Team>,
        projects: Collection<Project>,
        identity: IdentityStore,
        access: AccessResolver,
    ) -> Self {
        TeamStore { teams, projects, identity, access }
    }

    // user.teams is a hint; a failed mirror update is logged and ignored
    async fn mirror_add(&self, user_id: Id, team_id: Id) {
        if let Err(e) = self.identity.add_team(user_id, team_id).await {
            warn!("⚠️ [USERS] Could not add team {} to user {}: {}", team_id, user_id, e);
        }
    }

    async fn mirror_remove(&self, user_id: Id, team_id: Id) {
        if let Err(e) = self.identity.remove_team(user_id, team_id).await {
            warn!("⚠️ [USERS] Could not remove team {} from user {}: {}", team_id, user_id, e);
        }
    }

    pub async fn create(&self, owner: Id, req: TeamCreateRequest) -> Result<Team, ServiceError> {
        let name = req.name.trim().to_string();
        if name.is_empty() {
            return Err(ServiceError::BadRequest("Team name is required".to_string()));
        }

        let now = Utc::now();
        let team = Team {
            id: Id::new(),
            name,
            description: req.description,
            owner,
            members: Vec::new(),
            projects: Vec::new(),
            created_at: now,
            updated_at: now,
        };
        let team = self
            .teams
            .insert(team)
            .await
            .map_err(|e| ServiceError::storage(TAG, e))?;
        self.mirror_add(owner, team.id).await;

        info!("✅ [{}] Created team {} owned by {}", TAG, team.id, owner);
        Ok(team)
    }

    /// Teams the user owns or belongs to, by name. Decided from team
    /// documents, not from the user's mirror.
    pub async fn list_for_user(&self, user: Id) -> Result<Vec<Team>, ServiceError> {
        let mut teams = self
            .teams
            .find(move |t| t.includes(user))
            .await
            .map_err(|e| ServiceError::storage(TAG, e))?;
        teams.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(teams)
    }

    pub async fn get(&self, user: Id, team_id: Id) -> Result<TeamDetail, ServiceError> {
        let team = self.access.team(user, team_id, Intent::Read).await?;
        let linked = team.projects.clone();
        let project_objects = self
            .projects
            .find(move |p| linked.contains(&p.id))
            .await
            .map_err(|e| ServiceError::storage("PROJECT", e))?;
        Ok(TeamDetail { team, project_objects })
    }

    pub async fn members(&self, user: Id, team_id: Id) -> Result<Vec<Member>, ServiceError> {
        Ok(self.access.team(user, team_id, Intent::Read).await?.members)
    }

    pub async fn projects(&self, user: Id, team_id: Id) -> Result<Vec<Project>, ServiceError> {
        self.access.team(user, team_id, Intent::Read).await?;
        let mut projects = self
            .projects
            .find(move |p| p.team_id == Some(team_id))
            .await
            .map_err(|e| ServiceError::storage("PROJECT", e))?;
        projects.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        Ok(projects)
    }

    /// A project as seen through a team: the team must list it.
    pub async fn project_view(&self, user: Id, team_id: Id, project_id: Id) -> Result<Project, ServiceError> {
        let team = self.access.team(user, team_id, Intent::Read).await?;
        if !team.projects.contains(&project_id) {
            return Err(ServiceError::NotFound);
        }
        match self.projects.find_one(project_id).await {
            Ok(project) => Ok(project),
            Err(e) => Err(ServiceError::storage("PROJECT", e)),
        }
    }

    pub async fn update(&self, user: Id, team_id: Id, req: TeamUpdateRequest) -> Result<Team, ServiceError> {
        self.access.team(user, team_id, Intent::Admin).await?;
        if req.name.as_deref().map_or(false, |n| n.trim().is_empty()) {
            return Err(ServiceError::BadRequest("Team name cannot be empty".to_string()));
        }

        self.teams
            .update(team_id, move |t| {
                if let Some(name) = req.name {
                    t.name = name.trim().to_string();
                }
                if let Some(description) = req.description {
                    t.description = description;
                }
                t.updated_at = Utc::now();
            })
            .await
            .map_err(|e| ServiceError::storage(TAG, e))
    }

    pub async fn add_member(&self, actor: Id, team_id: Id, user_id: Id, role: &str) -> Result<Team, ServiceError> {
        let team = self.access.team(actor, team_id, Intent::Write).await?;
        let role: TeamRole = role
            .parse()
            .map_err(|raw: String| TeamError::InvalidRole(raw))?;

        if team.owner == user_id {
            return Err(TeamError::AlreadyOwner.into());
        }
        if team.member(user_id).is_some() {
            return Err(TeamError::AlreadyMember.into());
        }

        let user = self
            .identity
            .find_by_id(user_id)
            .await
            .map_err(|e| ServiceError::storage("USERS", e))?;

        let member = Member {
            user_id,
            role,
            name: user.name.clone().unwrap_or_else(|| user.username.clone()),
            email: user.email.clone(),
        };
        let team = self
            .teams
            .update(team_id, move |t| {
                if t.owner != member.user_id && t.member(member.user_id).is_none() {
                    t.members.push(member);
                    t.updated_at = Utc::now();
                }
            })
            .await
            .map_err(|e| ServiceError::storage(TAG, e))?;
        self.mirror_add(user_id, team_id).await;

        info!("👥 [{}] Added {} to team {} as {}", TAG, user_id, team_id, role);
        Ok(team)
    }

    /// Members may always remove themselves; removing anyone else takes
    /// team write. The owner can never be removed.
    pub async fn remove_member(&self, actor: Id, team_id: Id, user_id: Id) -> Result<Team, ServiceError> {
        let team = self.access.team(actor, team_id, Intent::Read).await?;
        if team.owner == user_id {
            return Err(TeamError::CannotRemoveOwner.into());
        }
        if actor != user_id && !team_decision(actor, &team, Intent::Write).is_allowed() {
            info!("🚫 User {} may not remove members from team {}", actor, team_id);
            return Err(ServiceError::Forbidden);
        }

        let team = self
            .teams
            .update(team_id, move |t| {
                let before = t.members.len();
                t.members.retain(|m| m.user_id != user_id);
                if t.members.len() != before {
                    t.updated_at = Utc::now();
                }
            })
            .await
            .map_err(|e| ServiceError::storage(TAG, e))?;
        self.mirror_remove(user_id, team_id).await;

        info!("👋 [{}] Removed {} from team {}", TAG, user_id, team_id);
        Ok(team)
    }

    /// Links a project the actor owns to a team the actor may write,
    /// moving it out of any previous team.
    pub async fn link_project(&self, actor: Id, team_id: Id, project_id: Id) -> Result<Team, ServiceError> {
        self.access.team(actor, team_id, Intent::Write).await?;
        let project = self.access.project(actor, project_id, Intent::Admin).await?;

        if let Some(previous) = project.team_id.filter(|t| *t != team_id) {
            self.pull_project(previous, project_id).await?;
        }

        let team = self
            .teams
            .update(team_id, move |t| {
                if !t.projects.contains(&project_id) {
                    t.projects.push(project_id);
                    t.updated_at = Utc::now();
                }
            })
            .await
            .map_err(|e| ServiceError::storage(TAG, e))?;

        self.projects
            .update(project_id, move |p| {
                p.team_id = Some(team_id);
                p.updated_at = Utc::now();
            })
            .await
            .map_err(|e| ServiceError::storage("PROJECT", e))?;

        info!("🔗 [{}] Linked project {} to team {}", TAG, project_id, team_id);
        Ok(team)
    }

    pub async fn unlink_project(&self, actor: Id, team_id: Id, project_id: Id) -> Result<Team, ServiceError> {
        self.access.team(actor, team_id, Intent::Write).await?;

        let team = self
            .teams
            .update(team_id, move |t| {
                let before = t.projects.len();
                t.projects.retain(|p| *p != project_id);
                if t.projects.len() != before {
                    t.updated_at = Utc::now();
                }
            })
            .await
            .map_err(|e| ServiceError::storage(TAG, e))?;
        self.clear_project_team(project_id, team_id).await?;

        info!("✂️ [{}] Unlinked project {} from team {}", TAG, project_id, team_id);
        Ok(team)
    }

    /// Detaches a project from whatever team it is in. Authorization is the
    /// caller's job (project admin).
    pub async fn release_project(&self, project: &Project) -> Result<(), ServiceError> {
        if let Some(team_id) = project.team_id {
            self.pull_project(team_id, project.id).await?;
            self.clear_project_team(project.id, team_id).await?;
            info!("✂️ [{}] Released project {} from team {}", TAG, project.id, team_id);
        }
        Ok(())
    }

    async fn pull_project(&self, team_id: Id, project_id: Id) -> Result<(), ServiceError> {
        match self
            .teams
            .update(team_id, move |t| t.projects.retain(|p| *p != project_id))
            .await
        {
            Ok(_) | Err(StoreError::NotFound) => Ok(()),
            Err(e) => Err(ServiceError::storage(TAG, e)),
        }
    }

    // Only clears the link if it still points at this team
    async fn clear_project_team(&self, project_id: Id, team_id: Id) -> Result<(), ServiceError> {
        match self
            .projects
            .update(project_id, move |p| {
                if p.team_id == Some(team_id) {
                    p.team_id = None;
                    p.updated_at = Utc::now();
                }
            })
            .await
        {
            Ok(_) | Err(StoreError::NotFound) => Ok(()),
            Err(e) => Err(ServiceError::storage("PROJECT", e)),
        }
    }

    /// Owner-only. Clears the team from its projects and from every user's
    /// mirror, then deletes it.
    pub async fn delete(&self, actor: Id, team_id: Id) -> Result<(), ServiceError> {
        self.access.team(actor, team_id, Intent::Admin).await?;

        let unlinked = self
            .projects
            .update_many(
                move |p| p.team_id == Some(team_id),
                |p| {
                    p.team_id = None;
                    p.updated_at = Utc::now();
                },
            )
            .await
            .map_err(|e| ServiceError::storage("PROJECT", e))?;

        if let Err(e) = self.identity.remove_team_everywhere(team_id).await {
            error!("❌ [USERS] Failed to pull team {} from users: {}", team_id, e);
        }

        self.teams
            .delete(team_id)
            .await
            .map_err(|e| ServiceError::storage(TAG, e))?;

        info!("🗑️ [{}] Deleted team {} ({} projects unlinked)", TAG, team_id, unlinked);
        Ok(())
    }
}
