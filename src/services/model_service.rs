// 3D model metadata and the .glb files behind it
use chrono::Utc;
use log::{info, warn};
use std::path::PathBuf;

use crate::models::{Id, Model, ServiceError};
use crate::store::{Collection, StoreError};
use crate::utils::uploads::{self, Category, UploadedFile, MODEL_EXTENSIONS};

const TAG: &str = "MODELS";

#[derive(Clone)]
pub struct ModelStore {
    models: Collection<Model>,
    upload_root: PathBuf,
}

impl ModelStore {
    pub fn new(models: Collection<Model>, upload_root: PathBuf) -> Self {
        ModelStore { models, upload_root }
    }

    pub async fn list_for_user(&self, user: Id) -> Result<Vec<Model>, ServiceError> {
        let mut models = self
            .models
            .find(move |m| m.user_id == user)
            .await
            .map_err(|e| ServiceError::storage(TAG, e))?;
        models.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(models)
    }

    pub async fn create(&self, user: Id, file: UploadedFile, name: Option<String>) -> Result<Model, ServiceError> {
        let ext = uploads::extension_of(&file.original_name).unwrap_or_default();
        if !MODEL_EXTENSIONS.contains(&ext.as_str()) {
            return Err(ServiceError::BadRequest("Only .glb files are allowed".to_string()));
        }

        let size = file.bytes.len() as u64;
        let filename = uploads::store(&self.upload_root, Category::Models, &ext, file.bytes).await?;
        let name = name
            .map(|n| n.trim().to_string())
            .filter(|n| !n.is_empty())
            .unwrap_or_else(|| uploads::file_stem(&file.original_name));

        let model = Model {
            id: Id::new(),
            name,
            filename,
            original_name: file.original_name,
            size,
            user_id: user,
            created_at: Utc::now(),
        };
        let model = self
            .models
            .insert(model)
            .await
            .map_err(|e| ServiceError::storage(TAG, e))?;

        info!("✅ [{}] Stored model {} ({} bytes) for {}", TAG, model.id, size, user);
        Ok(model)
    }

    /// Owner-only lookup: 404 when missing, 403 when someone else's.
    pub async fn get(&self, user: Id, model_id: Id) -> Result<Model, ServiceError> {
        let model = match self.models.find_one(model_id).await {
            Ok(model) => model,
            Err(StoreError::NotFound) => return Err(ServiceError::NotFound),
            Err(e) => return Err(ServiceError::storage(TAG, e)),
        };
        if model.user_id != user {
            return Err(ServiceError::Forbidden);
        }
        Ok(model)
    }

    pub async fn delete(&self, user: Id, model_id: Id) -> Result<(), ServiceError> {
        let model = self.get(user, model_id).await?;

        if let Err(e) = uploads::remove(&self.upload_root, Category::Models, &model.filename).await {
            warn!("⚠️ [{}] Could not remove file {}: {}", TAG, model.filename, e);
        }

        self.models
            .delete(model_id)
            .await
            .map_err(|e| ServiceError::storage(TAG, e))?;
        info!("🗑️ [{}] Deleted model {}", TAG, model_id);
        Ok(())
    }

    /// Path of a stored model file, refusing anything that could leave the models directory.
    pub fn file_path(&self, filename: &str) -> Result<PathBuf, ServiceError> {
        if !uploads::is_safe_filename(filename) {
            return Err(ServiceError::BadRequest("Invalid filename".to_string()));
        }
        Ok(uploads::stored_path(&self.upload_root, Category::Models, filename))
    }
}
