// Append-only per-user activity log
use chrono::Utc;
use log::{error, info};
use std::collections::HashMap;

use crate::models::{HistoryAction, HistoryEntry, HistoryView, Id, Project, ServiceError};
use crate::store::Collection;

const TAG: &str = "HISTORY";
pub const DEFAULT_LIMIT: usize = 50;

#[derive(Clone)]
pub struct HistoryRecorder {
    histories: Collection<HistoryEntry>,
    projects: Collection<Project>,
}

impl HistoryRecorder {
    pub fn new(histories: Collection<HistoryEntry>, projects: Collection<Project>) -> Self {
        HistoryRecorder { histories, projects }
    }

    pub async fn append(
        &self,
        user_id: Id,
        project_id: Id,
        action: HistoryAction,
        description: String,
    ) -> Result<HistoryEntry, ServiceError> {
        let entry = HistoryEntry {
            id: Id::new(),
            user_id,
            project_id,
            action,
            description,
            timestamp: Utc::now(),
        };
        self.histories
            .insert(entry)
            .await
            .map_err(|e| ServiceError::storage(TAG, e))
    }

    /// Best-effort variant used as a side effect of other operations.
    pub async fn record(&self, user_id: Id, project_id: Id, action: HistoryAction, description: String) {
        match self.append(user_id, project_id, action, description).await {
            Ok(entry) => info!("📝 [{}] {:?} by {} on {}", TAG, entry.action, user_id, project_id),
            Err(e) => error!("❌ [{}] Failed to record {:?} for {}: {}", TAG, action, user_id, e),
        }
    }

    /// Latest `limit` entries for the user, newest first, each carrying the
    /// project's current title when the project still exists.
    pub async fn list(&self, user_id: Id, limit: usize) -> Result<Vec<HistoryView>, ServiceError> {
        let mut entries = self
            .histories
            .find(move |h| h.user_id == user_id)
            .await
            .map_err(|e| ServiceError::storage(TAG, e))?;
        entries.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        entries.truncate(limit);

        let wanted: Vec<Id> = entries.iter().map(|h| h.project_id).collect();
        let titles: HashMap<Id, String> = self
            .projects
            .find(move |p| wanted.contains(&p.id))
            .await
            .map_err(|e| ServiceError::storage("PROJECT", e))?
            .into_iter()
            .map(|p| (p.id, p.display_title().to_string()))
            .collect();

        Ok(entries
            .into_iter()
            .map(|entry| HistoryView {
                project_title: titles.get(&entry.project_id).cloned(),
                entry,
            })
            .collect())
    }
}
