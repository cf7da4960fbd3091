// src/models/keyframe.rs
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::Id;
use crate::store::Document;

#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct Keyframe {
    pub id: Id,
    pub project_id: Id,
    pub timestamp: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(default)]
    pub pose_data: Value,
    // base64 snapshot
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_data: Option<String>,
    pub created_by: Id,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Document for Keyframe {
    const COLLECTION: &'static str = "keyframes";

    fn id(&self) -> Id {
        self.id
    }
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct KeyframeCreateRequest {
    pub project_id: String,
    pub timestamp: f64,
    #[serde(default)]
    pub label: Option<String>,
    pub pose_data: Value,
    #[serde(default)]
    pub image_data: Option<String>,
}

#[derive(Deserialize, Debug, Default)]
#[serde(rename_all = "camelCase")]
pub struct KeyframeUpdateRequest {
    pub label: Option<String>,
    pub pose_data: Option<Value>,
    pub image_data: Option<String>,
}
