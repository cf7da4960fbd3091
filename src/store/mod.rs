// src/store/mod.rs
//
// JSON document store: one directory per collection, one `<id>.json` file per
// document. Every operation runs on the blocking pool under a deadline.
use actix_web::web;
use derive_more::Display;
use log::{debug, warn};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fs;
use std::io;
use std::marker::PhantomData;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::time::timeout;
use uuid::Uuid;

use crate::models::Id;

/// Deadline for operations touching a single document.
pub const SINGLE_OP_DEADLINE: Duration = Duration::from_secs(5);
/// Deadline for operations that scan a whole collection.
pub const SCAN_DEADLINE: Duration = Duration::from_secs(10);

#[derive(Debug, Display)]
pub enum StoreError {
    #[display(fmt = "document not found")]
    NotFound,
    #[display(fmt = "{}", _0)]
    Conflict(String),
    #[display(fmt = "operation timed out")]
    Timeout,
    #[display(fmt = "io error: {}", _0)]
    Io(io::Error),
    #[display(fmt = "serialization error: {}", _0)]
    Serialization(serde_json::Error),
    #[display(fmt = "blocking worker failed")]
    Worker,
}

impl std::error::Error for StoreError {}

impl From<io::Error> for StoreError {
    fn from(err: io::Error) -> Self {
        StoreError::Io(err)
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(err: serde_json::Error) -> Self {
        StoreError::Serialization(err)
    }
}

/// A type persisted as one JSON file inside its collection directory.
pub trait Document: Serialize + DeserializeOwned + Clone + Send + Sync + 'static {
    const COLLECTION: &'static str;

    fn id(&self) -> Id;
}

// Runs blocking file work on the actix blocking pool, bounded by `limit`
async fn with_deadline<R, F>(limit: Duration, work: F) -> Result<R, StoreError>
where
    F: FnOnce() -> Result<R, StoreError> + Send + 'static,
    R: Send + 'static,
{
    match timeout(limit, web::block(work)).await {
        Err(_) => Err(StoreError::Timeout),
        Ok(Err(_)) => Err(StoreError::Worker),
        Ok(Ok(result)) => result,
    }
}

/// Root of one logical database on disk.
#[derive(Clone, Debug)]
pub struct Database {
    root: PathBuf,
}

impl Database {
    pub fn open(storage_dir: impl AsRef<Path>, name: &str) -> Result<Self, StoreError> {
        let root = storage_dir.as_ref().join(name);
        fs::create_dir_all(&root)?;
        debug!("📂 Opened document store at {}", root.display());
        Ok(Database { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn collection<T: Document>(&self) -> Result<Collection<T>, StoreError> {
        let dir = self.root.join(T::COLLECTION);
        fs::create_dir_all(&dir)?;
        Ok(Collection {
            dir: Arc::new(dir),
            write_lock: Arc::new(Mutex::new(())),
            _marker: PhantomData,
        })
    }
}

/// Handle to one collection. Clones share the same per-collection write lock.
pub struct Collection<T> {
    dir: Arc<PathBuf>,
    write_lock: Arc<Mutex<()>>,
    _marker: PhantomData<fn() -> T>,
}

impl<T> Clone for Collection<T> {
    fn clone(&self) -> Self {
        Collection {
            dir: Arc::clone(&self.dir),
            write_lock: Arc::clone(&self.write_lock),
            _marker: PhantomData,
        }
    }
}

impl<T: Document> Collection<T> {
    pub async fn find_one(&self, id: Id) -> Result<T, StoreError> {
        let dir = Arc::clone(&self.dir);
        with_deadline(SINGLE_OP_DEADLINE, move || read_doc::<T>(&dir, id)).await
    }

    /// First document matching `filter`, in no particular order.
    pub async fn find_first<F>(&self, filter: F) -> Result<Option<T>, StoreError>
    where
        F: Fn(&T) -> bool + Send + 'static,
    {
        let dir = Arc::clone(&self.dir);
        with_deadline(SCAN_DEADLINE, move || {
            Ok(scan::<T>(&dir)?.into_iter().find(|doc| filter(doc)))
        })
        .await
    }

    pub async fn find<F>(&self, filter: F) -> Result<Vec<T>, StoreError>
    where
        F: Fn(&T) -> bool + Send + 'static,
    {
        let dir = Arc::clone(&self.dir);
        with_deadline(SCAN_DEADLINE, move || {
            Ok(scan::<T>(&dir)?.into_iter().filter(|doc| filter(doc)).collect())
        })
        .await
    }

    pub async fn insert(&self, doc: T) -> Result<T, StoreError> {
        let dir = Arc::clone(&self.dir);
        let lock = Arc::clone(&self.write_lock);
        with_deadline(SINGLE_OP_DEADLINE, move || {
            let _guard = lock.lock().map_err(|_| StoreError::Worker)?;
            write_doc(&dir, &doc)?;
            Ok(doc)
        })
        .await
    }

    /// Inserts `doc` unless `conflict` reports a clash with an existing
    /// document. The check and the write happen under the collection lock.
    pub async fn insert_unique<C>(&self, doc: T, conflict: C) -> Result<T, StoreError>
    where
        C: Fn(&T) -> Option<String> + Send + 'static,
    {
        let dir = Arc::clone(&self.dir);
        let lock = Arc::clone(&self.write_lock);
        with_deadline(SCAN_DEADLINE, move || {
            let _guard = lock.lock().map_err(|_| StoreError::Worker)?;
            if let Some(reason) = scan::<T>(&dir)?.iter().find_map(|existing| conflict(existing)) {
                return Err(StoreError::Conflict(reason));
            }
            write_doc(&dir, &doc)?;
            Ok(doc)
        })
        .await
    }

    /// Single-document read-modify-write; returns the stored result.
    pub async fn update<F>(&self, id: Id, change: F) -> Result<T, StoreError>
    where
        F: FnOnce(&mut T) + Send + 'static,
    {
        let dir = Arc::clone(&self.dir);
        let lock = Arc::clone(&self.write_lock);
        with_deadline(SINGLE_OP_DEADLINE, move || {
            let _guard = lock.lock().map_err(|_| StoreError::Worker)?;
            let mut doc = read_doc::<T>(&dir, id)?;
            change(&mut doc);
            write_doc(&dir, &doc)?;
            Ok(doc)
        })
        .await
    }

    /// Read-modify-write that refuses the result when `conflict(updated,
    /// existing)` reports a clash with any other document. The scan and the
    /// write happen under the collection lock.
    pub async fn update_unique<F, C>(&self, id: Id, change: F, conflict: C) -> Result<T, StoreError>
    where
        F: FnOnce(&mut T) + Send + 'static,
        C: Fn(&T, &T) -> Option<String> + Send + 'static,
    {
        let dir = Arc::clone(&self.dir);
        let lock = Arc::clone(&self.write_lock);
        with_deadline(SCAN_DEADLINE, move || {
            let _guard = lock.lock().map_err(|_| StoreError::Worker)?;
            let mut doc = read_doc::<T>(&dir, id)?;
            change(&mut doc);
            let clash = scan::<T>(&dir)?
                .iter()
                .filter(|existing| existing.id() != id)
                .find_map(|existing| conflict(&doc, existing));
            if let Some(reason) = clash {
                return Err(StoreError::Conflict(reason));
            }
            write_doc(&dir, &doc)?;
            Ok(doc)
        })
        .await
    }

    /// Applies `change` to every matching document, returning how many were touched.
    pub async fn update_many<P, F>(&self, filter: P, change: F) -> Result<usize, StoreError>
    where
        P: Fn(&T) -> bool + Send + 'static,
        F: Fn(&mut T) + Send + 'static,
    {
        let dir = Arc::clone(&self.dir);
        let lock = Arc::clone(&self.write_lock);
        with_deadline(SCAN_DEADLINE, move || {
            let _guard = lock.lock().map_err(|_| StoreError::Worker)?;
            let mut touched = 0;
            for mut doc in scan::<T>(&dir)?.into_iter().filter(|doc| filter(doc)) {
                change(&mut doc);
                write_doc(&dir, &doc)?;
                touched += 1;
            }
            Ok(touched)
        })
        .await
    }

    pub async fn delete(&self, id: Id) -> Result<(), StoreError> {
        let dir = Arc::clone(&self.dir);
        let lock = Arc::clone(&self.write_lock);
        with_deadline(SINGLE_OP_DEADLINE, move || {
            let _guard = lock.lock().map_err(|_| StoreError::Worker)?;
            match fs::remove_file(doc_path(&dir, id)) {
                Ok(()) => Ok(()),
                Err(e) if e.kind() == io::ErrorKind::NotFound => Err(StoreError::NotFound),
                Err(e) => Err(e.into()),
            }
        })
        .await
    }

    pub async fn delete_many<F>(&self, filter: F) -> Result<usize, StoreError>
    where
        F: Fn(&T) -> bool + Send + 'static,
    {
        let dir = Arc::clone(&self.dir);
        let lock = Arc::clone(&self.write_lock);
        with_deadline(SCAN_DEADLINE, move || {
            let _guard = lock.lock().map_err(|_| StoreError::Worker)?;
            let mut removed = 0;
            for doc in scan::<T>(&dir)?.into_iter().filter(|doc| filter(doc)) {
                fs::remove_file(doc_path(&dir, doc.id()))?;
                removed += 1;
            }
            Ok(removed)
        })
        .await
    }
}

fn doc_path(dir: &Path, id: Id) -> PathBuf {
    dir.join(format!("{}.json", id))
}

fn read_doc<T: Document>(dir: &Path, id: Id) -> Result<T, StoreError> {
    let content = match fs::read_to_string(doc_path(dir, id)) {
        Ok(content) => content,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Err(StoreError::NotFound),
        Err(e) => return Err(e.into()),
    };
    Ok(serde_json::from_str(&content)?)
}

// Write to a sibling temp file first so readers never observe a torn document
fn write_doc<T: Document>(dir: &Path, doc: &T) -> Result<(), StoreError> {
    let json = serde_json::to_string_pretty(doc)?;
    let tmp = dir.join(format!(".{}.{}.tmp", doc.id(), Uuid::new_v4().simple()));
    fs::write(&tmp, json)?;
    if let Err(e) = fs::rename(&tmp, doc_path(dir, doc.id())) {
        let _ = fs::remove_file(&tmp);
        return Err(e.into());
    }
    Ok(())
}

fn scan<T: Document>(dir: &Path) -> Result<Vec<T>, StoreError> {
    let mut docs = Vec::new();
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if !path.is_file() || path.extension().map_or(true, |ext| ext != "json") {
            continue;
        }
        let content = match fs::read_to_string(&path) {
            Ok(content) => content,
            // Removed between listing and reading
            Err(e) if e.kind() == io::ErrorKind::NotFound => continue,
            Err(e) => return Err(e.into()),
        };
        match serde_json::from_str::<T>(&content) {
            Ok(doc) => docs.push(doc),
            Err(e) => warn!("⚠️ Skipping unreadable {} document {}: {}", T::COLLECTION, path.display(), e),
        }
    }
    Ok(docs)
}
