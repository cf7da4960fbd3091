// Projects, their keyframe documents, and the element-keyed keyframes-JSON merge
use chrono::Utc;
use log::{error, info, warn};
use serde_json::{Map, Value};
use std::collections::HashSet;

use crate::models::{
    Id, Keyframe, KeyframeCreateRequest, KeyframeRef, KeyframeUpdateRequest, MergeVerification,
    Project, ProjectCreateRequest, ProjectUpdateRequest, ServiceError, Team,
};
use crate::services::access::{AccessResolver, Intent};
use crate::store::{Collection, StoreError};
use crate::utils::locks::ProjectLocks;

const TAG: &str = "PROJECT";
const KF_TAG: &str = "KEYFRAMES";

struct StarterProject {
    name: &'static str,
    description: &'static str,
    style: &'static str,
}

const STARTER_PROJECTS: [StarterProject; 2] = [
    StarterProject {
        name: "Salsa basics",
        description: "Core salsa steps and movements for beginners",
        style: "salsa",
    },
    StarterProject {
        name: "Bachata basics",
        description: "Core bachata steps and movements for beginners",
        style: "bachata",
    },
];

/// Parses stored keyframes JSON, falling back to an empty map when the text
/// is blank, malformed, or not an object.
pub fn parse_keyframes_map(raw: &str) -> Map<String, Value> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Map::new();
    }
    match serde_json::from_str::<Value>(trimmed) {
        Ok(Value::Object(map)) => map,
        Ok(other) => {
            warn!("⚠️ [{}] keyframesJson is not an object ({}), starting over", KF_TAG, type_name(&other));
            Map::new()
        }
        Err(e) => {
            warn!("⚠️ [{}] keyframesJson failed to parse ({}), starting over", KF_TAG, e);
            Map::new()
        }
    }
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Total number of keyframe values across every element list.
pub fn count_keyframes(map: &Map<String, Value>) -> usize {
    map.values()
        .map(|v| v.as_array().map_or(0, |list| list.len()))
        .sum()
}

/// Replaces the list stored under `element_id`, leaving every other element
/// as it was. Returns the new serialized map and its keyframe total.
pub fn replace_element(raw: &str, element_id: &str, keyframes: Vec<Value>) -> Result<(String, usize), serde_json::Error> {
    let mut map = parse_keyframes_map(raw);
    map.insert(element_id.to_string(), Value::Array(keyframes));
    let expected = count_keyframes(&map);
    Ok((serde_json::to_string(&Value::Object(map))?, expected))
}

#[derive(Clone)]
pub struct ProjectStore {
    projects: Collection<Project>,
    keyframes: Collection<Keyframe>,
    teams: Collection<Team>,
    access: AccessResolver,
    locks: ProjectLocks,
}

impl ProjectStore {
    pub fn new(
        projects: Collection<Project>,
        keyframes: Collection<Keyframe>,
        teams: Collection<Team>,
        access: AccessResolver,
        locks: ProjectLocks,
    ) -> Self {
        ProjectStore { projects, keyframes, teams, access, locks }
    }

    /// Projects the user owns, plus projects listed by any team the user
    /// belongs to, most recently updated first.
    pub async fn list_for_user(&self, user: Id) -> Result<Vec<Project>, ServiceError> {
        let teams = self
            .teams
            .find(move |t| t.includes(user))
            .await
            .map_err(|e| ServiceError::storage("TEAMS", e))?;
        let shared: HashSet<Id> = teams.into_iter().flat_map(|t| t.projects).collect();

        let mut projects = self
            .projects
            .find(move |p| p.owner == user || shared.contains(&p.id))
            .await
            .map_err(|e| ServiceError::storage(TAG, e))?;
        projects.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        Ok(projects)
    }

    pub async fn create(&self, owner: Id, req: ProjectCreateRequest) -> Result<Project, ServiceError> {
        let name = req.name.trim().to_string();
        if name.is_empty() {
            return Err(ServiceError::BadRequest("Project name is required".to_string()));
        }

        let mut project = Project::new(owner, name);
        project.description = req.description;
        project.tags = req.tags;
        if let Some(title) = req.title.filter(|t| !t.trim().is_empty()) {
            project.title = title;
        }
        project.is_private = req.is_private;
        project.video_url = req.video_url;
        project.audio_url = req.audio_url;

        let project = self
            .projects
            .insert(project)
            .await
            .map_err(|e| ServiceError::storage(TAG, e))?;
        info!("✅ [{}] Created project {} for user {}", TAG, project.id, owner);
        Ok(project)
    }

    /// Creates the starter projects for a fresh account, skipping any the user already has.
    pub async fn seed_defaults(&self, owner: Id) -> Result<usize, ServiceError> {
        let existing: HashSet<String> = self
            .projects
            .find(move |p| p.owner == owner)
            .await
            .map_err(|e| ServiceError::storage(TAG, e))?
            .into_iter()
            .map(|p| p.name)
            .collect();

        let mut created = 0;
        for starter in STARTER_PROJECTS.iter().filter(|s| !existing.contains(s.name)) {
            let mut project = Project::new(owner, starter.name.to_string());
            project.description = starter.description.to_string();
            project.tags = vec![starter.style.to_string(), "beginner".to_string(), "basics".to_string()];
            self.projects
                .insert(project)
                .await
                .map_err(|e| ServiceError::storage(TAG, e))?;
            created += 1;
        }
        Ok(created)
    }

    pub async fn get(&self, user: Id, project_id: Id) -> Result<Project, ServiceError> {
        self.access.project(user, project_id, Intent::Read).await
    }

    /// Applies content fields of a partial update. Team linkage is handled
    /// by the team store.
    pub async fn update(&self, user: Id, project_id: Id, req: ProjectUpdateRequest) -> Result<Project, ServiceError> {
        req.validate()?;
        self.access.project(user, project_id, Intent::Write).await?;

        let updated = self
            .projects
            .update(project_id, move |p| {
                if let Some(name) = req.name {
                    p.name = name;
                }
                if let Some(description) = req.description {
                    p.description = description;
                }
                if let Some(video_url) = req.video_url {
                    p.video_url = Some(video_url).filter(|u| !u.is_empty());
                }
                if let Some(audio_url) = req.audio_url {
                    p.audio_url = Some(audio_url).filter(|u| !u.is_empty());
                }
                if let Some(tags) = req.tags {
                    p.tags = tags;
                }
                if let Some(title) = req.title {
                    p.title = title;
                }
                if let Some(is_private) = req.is_private {
                    p.is_private = is_private;
                }
                p.updated_at = Utc::now();
            })
            .await
            .map_err(|e| ServiceError::storage(TAG, e))?;
        info!("✅ [{}] Updated project {}", TAG, project_id);
        Ok(updated)
    }

    /// Owner-only. Unlinks the project from its team and drops its keyframe documents.
    pub async fn delete(&self, user: Id, project_id: Id) -> Result<(), ServiceError> {
        let project = self.access.project(user, project_id, Intent::Admin).await?;

        if let Some(team_id) = project.team_id {
            match self
                .teams
                .update(team_id, move |t| t.projects.retain(|p| *p != project_id))
                .await
            {
                Ok(_) | Err(StoreError::NotFound) => {}
                Err(e) => return Err(ServiceError::storage("TEAMS", e)),
            }
        }

        let removed = self
            .keyframes
            .delete_many(move |k| k.project_id == project_id)
            .await
            .map_err(|e| ServiceError::storage(KF_TAG, e))?;

        self.projects
            .delete(project_id)
            .await
            .map_err(|e| ServiceError::storage(TAG, e))?;

        info!("🗑️ [{}] Deleted project {} and {} keyframes", TAG, project_id, removed);
        Ok(())
    }

    /// Replaces one element's keyframe list inside `keyframesJson` and checks
    /// the stored result. Runs under the project's advisory lock.
    pub async fn update_element_keyframes(
        &self,
        user: Id,
        project_id: Id,
        element_id: &str,
        keyframes: Vec<Value>,
    ) -> Result<MergeVerification, ServiceError> {
        if element_id.trim().is_empty() {
            return Err(ServiceError::BadRequest("elementId is required".to_string()));
        }
        self.access.project(user, project_id, Intent::Write).await?;

        let _lock = self.locks.acquire(project_id).await;

        let current = self
            .projects
            .find_one(project_id)
            .await
            .map_err(|e| ServiceError::storage(KF_TAG, e))?;

        let (serialized, expected) = replace_element(&current.keyframes_json, element_id, keyframes).map_err(|e| {
            error!("❌ [{}] Failed to serialize keyframes: {}", KF_TAG, e);
            ServiceError::InternalServerError
        })?;
        let written_len = serialized.len();

        // Only the keyframesJson field changes
        self.projects
            .update(project_id, move |p| p.keyframes_json = serialized)
            .await
            .map_err(|e| ServiceError::storage(KF_TAG, e))?;

        let stored = self
            .projects
            .find_one(project_id)
            .await
            .map_err(|e| ServiceError::storage(KF_TAG, e))?;

        verify_stored(&stored.keyframes_json, expected).map_err(|reason| {
            error!(
                "❌ [{}] Verification failed for project {} (wrote {} bytes): {}",
                KF_TAG, project_id, written_len, reason
            );
            ServiceError::InternalServerError
        })
    }

    pub async fn create_keyframe(&self, user: Id, req: KeyframeCreateRequest) -> Result<Keyframe, ServiceError> {
        let project_id: Id = req
            .project_id
            .parse()
            .map_err(|_| ServiceError::bad_id(&req.project_id))?;
        self.access.project(user, project_id, Intent::Write).await?;

        let now = Utc::now();
        let keyframe = Keyframe {
            id: Id::new(),
            project_id,
            timestamp: req.timestamp,
            label: req.label,
            pose_data: req.pose_data,
            image_data: req.image_data,
            created_by: user,
            created_at: now,
            updated_at: now,
        };

        let keyframe = self
            .keyframes
            .insert(keyframe)
            .await
            .map_err(|e| ServiceError::storage(KF_TAG, e))?;

        let reference = KeyframeRef {
            keyframe_id: keyframe.id,
            timestamp: keyframe.timestamp,
            label: keyframe.label.clone().unwrap_or_default(),
        };
        self.projects
            .update(project_id, move |p| {
                if !p.keyframes.iter().any(|k| k.keyframe_id == reference.keyframe_id) {
                    p.keyframes.push(reference);
                }
                p.updated_at = Utc::now();
            })
            .await
            .map_err(|e| ServiceError::storage(TAG, e))?;

        info!("✅ [{}] Created keyframe {} on project {}", KF_TAG, keyframe.id, project_id);
        Ok(keyframe)
    }

    pub async fn list_keyframes(&self, user: Id, project_id: Id) -> Result<Vec<Keyframe>, ServiceError> {
        self.access.project(user, project_id, Intent::Read).await?;
        let mut keyframes = self
            .keyframes
            .find(move |k| k.project_id == project_id)
            .await
            .map_err(|e| ServiceError::storage(KF_TAG, e))?;
        keyframes.sort_by(|a, b| a.timestamp.total_cmp(&b.timestamp));
        Ok(keyframes)
    }

    // Keyframe writes are authorized against the owning project
    async fn keyframe_for_write(&self, user: Id, keyframe_id: Id) -> Result<Keyframe, ServiceError> {
        let keyframe = match self.keyframes.find_one(keyframe_id).await {
            Ok(k) => k,
            Err(StoreError::NotFound) => return Err(ServiceError::NotFound),
            Err(e) => return Err(ServiceError::storage(KF_TAG, e)),
        };
        self.access.project(user, keyframe.project_id, Intent::Write).await?;
        Ok(keyframe)
    }

    pub async fn update_keyframe(
        &self,
        user: Id,
        keyframe_id: Id,
        req: KeyframeUpdateRequest,
    ) -> Result<Keyframe, ServiceError> {
        let existing = self.keyframe_for_write(user, keyframe_id).await?;
        let new_label = req.label.clone();

        let updated = self
            .keyframes
            .update(keyframe_id, move |k| {
                if let Some(label) = req.label {
                    k.label = Some(label);
                }
                if let Some(pose_data) = req.pose_data {
                    k.pose_data = pose_data;
                }
                if let Some(image_data) = req.image_data {
                    k.image_data = Some(image_data);
                }
                k.updated_at = Utc::now();
            })
            .await
            .map_err(|e| ServiceError::storage(KF_TAG, e))?;

        if let Some(label) = new_label {
            self.projects
                .update(existing.project_id, move |p| {
                    for reference in p.keyframes.iter_mut().filter(|r| r.keyframe_id == keyframe_id) {
                        reference.label = label.clone();
                    }
                    p.updated_at = Utc::now();
                })
                .await
                .map_err(|e| ServiceError::storage(TAG, e))?;
        }

        Ok(updated)
    }

    pub async fn delete_keyframe(&self, user: Id, keyframe_id: Id) -> Result<(), ServiceError> {
        let keyframe = self.keyframe_for_write(user, keyframe_id).await?;

        self.keyframes
            .delete(keyframe_id)
            .await
            .map_err(|e| ServiceError::storage(KF_TAG, e))?;

        self.projects
            .update(keyframe.project_id, move |p| {
                p.keyframes.retain(|r| r.keyframe_id != keyframe_id);
                p.updated_at = Utc::now();
            })
            .await
            .map_err(|e| ServiceError::storage(TAG, e))?;

        info!("🗑️ [{}] Deleted keyframe {} from project {}", KF_TAG, keyframe_id, keyframe.project_id);
        Ok(())
    }
}

fn verify_stored(stored: &str, expected: usize) -> Result<MergeVerification, String> {
    if stored.trim().is_empty() || stored.trim() == "{}" {
        return Err("stored keyframesJson is empty".to_string());
    }
    let map = match serde_json::from_str::<Value>(stored) {
        Ok(Value::Object(map)) => map,
        Ok(_) => return Err("stored keyframesJson is not an object".to_string()),
        Err(e) => return Err(format!("stored keyframesJson does not parse: {}", e)),
    };
    let total = count_keyframes(&map);
    if total != expected {
        return Err(format!("expected {} keyframes, found {}", expected, total));
    }
    Ok(MergeVerification {
        keyframes_json_length: stored.len(),
        total_keyframes: total,
    })
}
