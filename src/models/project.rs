// src/models/project.rs
use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use super::{Id, ServiceError};
use crate::store::Document;

/// Denormalized pointer from a project to one of its keyframe documents.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct KeyframeRef {
    pub keyframe_id: Id,
    pub timestamp: f64,
    #[serde(default)]
    pub label: String,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    pub id: Id,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub tags: Vec<String>,
    pub owner: Id,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub team_id: Option<Id>,
    #[serde(default)]
    pub is_private: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub video_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub audio_url: Option<String>,
    #[serde(default)]
    pub keyframes: Vec<KeyframeRef>,
    // elementId -> list of opaque keyframe values, kept as serialized text
    #[serde(default)]
    pub keyframes_json: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Document for Project {
    const COLLECTION: &'static str = "projects";

    fn id(&self) -> Id {
        self.id
    }
}

impl Project {
    pub fn new(owner: Id, name: String) -> Self {
        let now = Utc::now();
        Project {
            id: Id::new(),
            title: name.clone(),
            name,
            description: String::new(),
            tags: Vec::new(),
            owner,
            team_id: None,
            is_private: false,
            video_url: None,
            audio_url: None,
            keyframes: Vec::new(),
            keyframes_json: String::new(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn display_title(&self) -> &str {
        if self.title.is_empty() {
            &self.name
        } else {
            &self.title
        }
    }
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct ProjectCreateRequest {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub is_private: bool,
    #[serde(default)]
    pub team_id: Option<String>,
    #[serde(default)]
    pub video_url: Option<String>,
    #[serde(default)]
    pub audio_url: Option<String>,
}

/// Partial update; absent fields are left alone.
#[derive(Deserialize, Debug, Default)]
#[serde(rename_all = "camelCase")]
pub struct ProjectUpdateRequest {
    pub name: Option<String>,
    pub description: Option<String>,
    pub video_url: Option<String>,
    pub audio_url: Option<String>,
    pub tags: Option<Vec<String>>,
    pub title: Option<String>,
    pub is_private: Option<bool>,
    // Outer None: field absent. Some(None): explicit null
    #[serde(default, deserialize_with = "present")]
    pub team_id: Option<Option<String>>,
}

fn present<'de, D>(deserializer: D) -> Result<Option<Option<String>>, D::Error>
where
    D: Deserializer<'de>,
{
    Option::<String>::deserialize(deserializer).map(Some)
}

impl ProjectUpdateRequest {
    pub fn validate(&self) -> Result<(), ServiceError> {
        match &self.name {
            Some(name) if name.trim().is_empty() => {
                Err(ServiceError::BadRequest("Project name cannot be empty".to_string()))
            }
            _ => Ok(()),
        }
    }

    pub fn touches_content(&self) -> bool {
        self.name.is_some()
            || self.description.is_some()
            || self.video_url.is_some()
            || self.audio_url.is_some()
            || self.tags.is_some()
            || self.title.is_some()
            || self.is_private.is_some()
    }
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct ElementKeyframesRequest {
    pub element_id: String,
    pub keyframes: Vec<Value>,
}

#[derive(Serialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MergeVerification {
    pub keyframes_json_length: usize,
    pub total_keyframes: usize,
}
