// Multipart handling and on-disk placement for uploaded media and models
use actix_multipart::Multipart;
use actix_web::web;
use futures::{StreamExt, TryStreamExt};
use log::{debug, error, info};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use uuid::Uuid;

use crate::models::ServiceError;

pub const MAX_UPLOAD_BYTES: usize = 512 * 1024 * 1024;

pub const VIDEO_EXTENSIONS: &[&str] = &["mp4", "mov", "avi", "wmv", "mkv"];
pub const AUDIO_EXTENSIONS: &[&str] = &["mp3", "wav", "ogg", "aac", "flac", "m4a"];
pub const GENERAL_EXTENSIONS: &[&str] = &[
    "jpg", "jpeg", "png", "gif", "webp", "svg", "pdf", "txt", "json", "csv", "zip", "doc", "docx",
];
pub const MODEL_EXTENSIONS: &[&str] = &["glb"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Category {
    Videos,
    Audio,
    Files,
    Models,
}

impl Category {
    pub fn dir_name(&self) -> &'static str {
        match self {
            Category::Videos => "videos",
            Category::Audio => "audio",
            Category::Files => "files",
            Category::Models => "models",
        }
    }

    /// Where a general upload lands: audio goes to its own directory, any
    /// other whitelisted extension to `files`.
    pub fn for_general(ext: &str) -> Option<Category> {
        if AUDIO_EXTENSIONS.contains(&ext) {
            Some(Category::Audio)
        } else if GENERAL_EXTENSIONS.contains(&ext) {
            Some(Category::Files)
        } else {
            None
        }
    }
}

#[derive(Debug)]
pub struct UploadedFile {
    pub original_name: String,
    pub bytes: Vec<u8>,
}

/// File parts keyed by field name, plus the plain text fields.
#[derive(Debug, Default)]
pub struct MultipartForm {
    pub files: HashMap<String, UploadedFile>,
    pub fields: HashMap<String, String>,
}

pub async fn read_form(mut payload: Multipart) -> Result<MultipartForm, ServiceError> {
    let mut form = MultipartForm::default();
    let mut total = 0usize;

    while let Some(mut field) = payload.try_next().await.map_err(|e| {
        error!("❌ [UPLOAD] Malformed multipart body: {}", e);
        ServiceError::BadRequest("Malformed multipart body".to_string())
    })? {
        let name = field.name().to_string();
        let filename = field
            .content_disposition()
            .get_filename()
            .map(|f| f.to_string());

        let mut bytes = Vec::new();
        while let Some(chunk) = field.next().await {
            let chunk = chunk.map_err(|e| {
                error!("❌ [UPLOAD] Failed reading field {}: {}", name, e);
                ServiceError::BadRequest("Malformed multipart body".to_string())
            })?;
            total += chunk.len();
            if total > MAX_UPLOAD_BYTES {
                return Err(ServiceError::BadRequest("Upload too large".to_string()));
            }
            bytes.extend_from_slice(&chunk);
        }

        match filename {
            Some(original_name) => {
                form.files.insert(name, UploadedFile { original_name, bytes });
            }
            None => {
                form.fields.insert(name, String::from_utf8_lossy(&bytes).into_owned());
            }
        }
    }

    Ok(form)
}

/// Lowercased extension without the dot.
pub fn extension_of(filename: &str) -> Option<String> {
    Path::new(filename)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_ascii_lowercase())
}

pub fn file_stem(filename: &str) -> String {
    Path::new(filename)
        .file_stem()
        .and_then(|stem| stem.to_str())
        .unwrap_or(filename)
        .to_string()
}

// Served filenames are single path components made of a conservative charset
pub fn is_safe_filename(name: &str) -> bool {
    !name.is_empty()
        && name != "."
        && name != ".."
        && !name.contains("..")
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '.' || c == '-' || c == '_')
}

/// Writes `bytes` under `{root}/{category}/` with a fresh collision-free name.
/// Returns the server-assigned filename.
pub async fn store(
    root: &Path,
    category: Category,
    ext: &str,
    bytes: Vec<u8>,
) -> Result<String, ServiceError> {
    let dir = root.join(category.dir_name());
    let filename = format!("{}.{}", Uuid::new_v4().simple(), ext);
    let path = dir.join(&filename);

    let size = bytes.len();
    web::block(move || {
        fs::create_dir_all(&dir)?;
        fs::write(&path, bytes)
    })
    .await
    .map_err(|e| {
        error!("❌ [UPLOAD] Blocking write failed: {}", e);
        ServiceError::InternalServerError
    })?
    .map_err(|e| {
        error!("❌ [UPLOAD] Failed to save file: {}", e);
        ServiceError::InternalServerError
    })?;

    info!("✅ Stored {} ({} bytes) in {}", filename, size, category.dir_name());
    Ok(filename)
}

pub fn public_url(category: Category, filename: &str) -> String {
    format!("/uploads/{}/{}", category.dir_name(), filename)
}

pub fn stored_path(root: &Path, category: Category, filename: &str) -> PathBuf {
    root.join(category.dir_name()).join(filename)
}

// Missing files are not an error; the caller only logs failures
pub async fn remove(root: &Path, category: Category, filename: &str) -> Result<(), String> {
    let path = stored_path(root, category, filename);
    web::block(move || match fs::remove_file(&path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            debug!("File {} already gone", path.display());
            Ok(())
        }
        Err(e) => Err(e.to_string()),
    })
    .await
    .map_err(|e| e.to_string())?
}
