// src/models/model.rs
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::Id;
use crate::store::Document;

/// Metadata for an uploaded `.glb` asset.
#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct Model {
    pub id: Id,
    pub name: String,
    pub filename: String,
    pub original_name: String,
    pub size: u64,
    pub user_id: Id,
    pub created_at: DateTime<Utc>,
}

impl Document for Model {
    const COLLECTION: &'static str = "models";

    fn id(&self) -> Id {
        self.id
    }
}

impl Model {
    // The url is derived from the stored filename, never persisted
    pub fn to_view(&self) -> ModelView {
        ModelView {
            url: format!("/api/models/file/{}", self.filename),
            model: self.clone(),
        }
    }
}

#[derive(Serialize, Debug, Clone)]
pub struct ModelView {
    #[serde(flatten)]
    pub model: Model,
    pub url: String,
}
