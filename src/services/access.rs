// Authorization rules for projects and teams.
//
// The decision functions are pure; `AccessResolver` only loads the documents
// they need and turns a deny into the right HTTP error.
use log::{debug, info};

use crate::models::{Id, Project, ServiceError, Team, TeamRole};
use crate::store::{Collection, StoreError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Intent {
    Read,
    Write,
    Admin,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Allow,
    Deny,
}

impl Decision {
    fn from_bool(allowed: bool) -> Self {
        if allowed {
            Decision::Allow
        } else {
            Decision::Deny
        }
    }

    pub fn is_allowed(self) -> bool {
        self == Decision::Allow
    }
}

/// Where a user stands relative to a team.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Standing {
    Owner,
    Member(TeamRole),
    Outsider,
}

pub fn standing(user: Id, team: &Team) -> Standing {
    // Owner wins even if a stale members entry lists them too
    if team.owner == user {
        return Standing::Owner;
    }
    match team.member(user) {
        Some(member) => Standing::Member(member.role),
        None => Standing::Outsider,
    }
}

pub fn team_decision(user: Id, team: &Team, intent: Intent) -> Decision {
    let allowed = match (standing(user, team), intent) {
        (Standing::Owner, _) => true,
        (Standing::Member(TeamRole::Editor), Intent::Read | Intent::Write) => true,
        (Standing::Member(TeamRole::Viewer), Intent::Read) => true,
        _ => false,
    };
    Decision::from_bool(allowed)
}

/// `team` is the team named by `project.team_id`, when it still exists.
pub fn project_decision(user: Id, project: &Project, team: Option<&Team>, intent: Intent) -> Decision {
    if intent == Intent::Read && !project.is_private {
        return Decision::Allow;
    }
    if project.owner == user {
        return Decision::Allow;
    }

    let team = match (project.team_id, team) {
        (Some(team_id), Some(team)) if team.id == team_id => team,
        _ => return Decision::Deny,
    };

    let allowed = match (standing(user, team), intent) {
        (_, Intent::Admin) => false,
        (Standing::Owner, _) => true,
        (Standing::Member(_), Intent::Read) => true,
        (Standing::Member(role), Intent::Write) => role == TeamRole::Editor,
        (Standing::Outsider, _) => false,
    };
    Decision::from_bool(allowed)
}

/// Loads projects and teams and applies the rules above.
#[derive(Clone)]
pub struct AccessResolver {
    projects: Collection<Project>,
    teams: Collection<Team>,
}

impl AccessResolver {
    pub fn new(projects: Collection<Project>, teams: Collection<Team>) -> Self {
        AccessResolver { projects, teams }
    }

    async fn team_of(&self, project: &Project) -> Result<Option<Team>, ServiceError> {
        let team_id = match project.team_id {
            Some(team_id) => team_id,
            None => return Ok(None),
        };
        match self.teams.find_one(team_id).await {
            Ok(team) => Ok(Some(team)),
            Err(StoreError::NotFound) => {
                debug!("Project {} points at missing team {}", project.id, team_id);
                Ok(None)
            }
            Err(e) => Err(ServiceError::storage("TEAMS", e)),
        }
    }

    /// Returns the project when `user` may act on it with `intent`.
    ///
    /// Only the read path tells a missing project (404) apart from a denied
    /// one (403); every other intent answers 403 for both.
    pub async fn project(&self, user: Id, project_id: Id, intent: Intent) -> Result<Project, ServiceError> {
        let project = match self.projects.find_one(project_id).await {
            Ok(project) => project,
            Err(StoreError::NotFound) if intent == Intent::Read => return Err(ServiceError::NotFound),
            Err(StoreError::NotFound) => return Err(ServiceError::Forbidden),
            Err(e) => return Err(ServiceError::storage("PROJECT", e)),
        };

        // Public reads and owners never need the team document
        let needs_team = project.owner != user && !(intent == Intent::Read && !project.is_private);
        let team = if needs_team { self.team_of(&project).await? } else { None };

        if project_decision(user, &project, team.as_ref(), intent).is_allowed() {
            Ok(project)
        } else {
            info!("🚫 User {} denied {:?} on project {}", user, intent, project_id);
            Err(ServiceError::Forbidden)
        }
    }

    /// Returns the team when `user` may act on it with `intent`. Missing and
    /// denied both answer 403.
    pub async fn team(&self, user: Id, team_id: Id, intent: Intent) -> Result<Team, ServiceError> {
        let team = match self.teams.find_one(team_id).await {
            Ok(team) => team,
            Err(StoreError::NotFound) => return Err(ServiceError::Forbidden),
            Err(e) => return Err(ServiceError::storage("TEAMS", e)),
        };

        if team_decision(user, &team, intent).is_allowed() {
            Ok(team)
        } else {
            info!("🚫 User {} denied {:?} on team {}", user, intent, team_id);
            Err(ServiceError::Forbidden)
        }
    }
}
