// src/models/history.rs
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::Id;
use crate::store::Document;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum HistoryAction {
    ProjectCreated,
    ProjectUpdated,
    TeamMemberAdded,
    TeamMemberRemoved,
    TeamProjectUpdated,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct HistoryEntry {
    pub id: Id,
    pub user_id: Id,
    pub project_id: Id,
    pub action: HistoryAction,
    pub description: String,
    pub timestamp: DateTime<Utc>,
}

impl Document for HistoryEntry {
    const COLLECTION: &'static str = "histories";

    fn id(&self) -> Id {
        self.id
    }
}

/// A history entry enriched at read time with the current project title.
#[derive(Serialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct HistoryView {
    #[serde(flatten)]
    pub entry: HistoryEntry,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub project_title: Option<String>,
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct HistoryCreateRequest {
    pub project_id: String,
    pub action: String,
    #[serde(default)]
    pub description: String,
}
