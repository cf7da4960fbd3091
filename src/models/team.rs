// src/models/team.rs
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::{Id, Project};
use crate::store::Document;

/// Role of a non-owner team member. The owner is never stored in `members`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TeamRole {
    Editor,
    Viewer,
}

impl FromStr for TeamRole {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "editor" => Ok(TeamRole::Editor),
            "viewer" => Ok(TeamRole::Viewer),
            other => Err(other.to_string()),
        }
    }
}

impl fmt::Display for TeamRole {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            TeamRole::Editor => write!(f, "editor"),
            TeamRole::Viewer => write!(f, "viewer"),
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Member {
    pub user_id: Id,
    pub role: TeamRole,
    // Snapshots taken when the member was added
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub name: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub email: String,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct Team {
    pub id: Id,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub owner: Id,
    #[serde(default)]
    pub members: Vec<Member>,
    #[serde(default)]
    pub projects: Vec<Id>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Document for Team {
    const COLLECTION: &'static str = "teams";

    fn id(&self) -> Id {
        self.id
    }
}

impl Team {
    pub fn member(&self, user_id: Id) -> Option<&Member> {
        self.members.iter().find(|m| m.user_id == user_id)
    }

    /// True for the owner and for every listed member.
    pub fn includes(&self, user_id: Id) -> bool {
        self.owner == user_id || self.member(user_id).is_some()
    }
}

#[derive(Deserialize, Debug)]
pub struct TeamCreateRequest {
    pub name: String,
    #[serde(default)]
    pub description: String,
}

#[derive(Deserialize, Debug, Default)]
pub struct TeamUpdateRequest {
    pub name: Option<String>,
    pub description: Option<String>,
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct AddMemberRequest {
    pub user_id: String,
    pub role: String,
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct LinkProjectRequest {
    pub project_id: String,
}

/// Team with its linked projects expanded, as returned by `GET /api/teams/{id}`.
#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct TeamDetail {
    #[serde(flatten)]
    pub team: Team,
    pub project_objects: Vec<Project>,
}
