//! Store backed by JSON documents on disk.
//!
//! Layout under the data directory:
//!
//! ```text
//! classrooms/{id}.json
//! users/{id}.json
//! attendance/{classroom_id}/{YYYY-MM-DD}/{user_id}.json
//! ```
//!
//! Conditional inserts write a temporary file and hard-link it into place, so
//! the filesystem refuses a second document under the same name and readers
//! never see a half-written file.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::debug;
use uuid::Uuid;

use super::{sort_members, sort_records, AttendanceStore, InsertOutcome, StoreError, StoreResult};
use crate::calendar::{format_date, parse_date};
use crate::model::{
    is_valid_classroom_id, is_valid_user_id, AttendanceKey, AttendanceRecord, Classroom,
    UserProfile,
};

/// Store that keeps one JSON file per document.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    data_dir: PathBuf,
}

impl JsonFileStore {
    /// Creates a store rooted at `data_dir`. Directories are created lazily.
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
        }
    }

    /// The directory documents live under.
    #[must_use]
    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    fn classrooms_dir(&self) -> PathBuf {
        self.data_dir.join("classrooms")
    }

    fn users_dir(&self) -> PathBuf {
        self.data_dir.join("users")
    }

    fn attendance_dir(&self, classroom_id: &str) -> PathBuf {
        self.data_dir.join("attendance").join(classroom_id)
    }

    fn classroom_path(&self, id: &str) -> PathBuf {
        self.classrooms_dir().join(format!("{id}.json"))
    }

    fn user_path(&self, id: &str) -> PathBuf {
        self.users_dir().join(format!("{id}.json"))
    }

    fn record_path(&self, key: &AttendanceKey) -> PathBuf {
        self.attendance_dir(&key.classroom_id)
            .join(format_date(key.date))
            .join(format!("{}.json", key.user_id))
    }
}

fn invalid_key(what: &str, id: &str) -> StoreError {
    StoreError::InvalidKey(format!("{what} '{id}'"))
}

fn key_is_addressable(key: &AttendanceKey) -> bool {
    is_valid_classroom_id(&key.classroom_id) && is_valid_user_id(&key.user_id)
}

async fn read_doc<T: DeserializeOwned>(path: &Path) -> StoreResult<Option<T>> {
    match tokio::fs::read_to_string(path).await {
        Ok(content) => serde_json::from_str(&content)
            .map(Some)
            .map_err(|source| StoreError::ParseError {
                path: path.to_path_buf(),
                source,
            }),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
        Err(source) => Err(StoreError::ReadError {
            path: path.to_path_buf(),
            source,
        }),
    }
}

/// Reads every `*.json` document directly inside `dir`.
async fn read_dir_docs<T: DeserializeOwned>(dir: &Path) -> StoreResult<Vec<T>> {
    let read_error = |source| StoreError::ReadError {
        path: dir.to_path_buf(),
        source,
    };

    let mut entries = match tokio::fs::read_dir(dir).await {
        Ok(entries) => entries,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(read_error(e)),
    };

    let mut docs = Vec::new();
    while let Some(entry) = entries.next_entry().await.map_err(read_error)? {
        let path = entry.path();
        let is_doc = path.extension().is_some_and(|ext| ext == "json")
            && !entry.file_name().to_string_lossy().starts_with('.');
        if !is_doc {
            continue;
        }
        if let Some(doc) = read_doc(&path).await? {
            docs.push(doc);
        }
    }
    Ok(docs)
}

async fn ensure_parent(path: &Path) -> StoreResult<()> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|source| StoreError::CreateDirError {
                path: parent.to_path_buf(),
                source,
            })?;
    }
    Ok(())
}

/// Writes `value` to a fresh temporary file next to `path`.
async fn write_temp<T: Serialize>(path: &Path, value: &T) -> StoreResult<PathBuf> {
    ensure_parent(path).await?;
    let content = serde_json::to_string_pretty(value)?;
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let temp = path.with_file_name(format!(".{file_name}.{}.tmp", Uuid::new_v4()));
    tokio::fs::write(&temp, content)
        .await
        .map_err(|source| StoreError::WriteError {
            path: temp.clone(),
            source,
        })?;
    Ok(temp)
}

/// Publishes `value` at `path` only if nothing is there yet.
async fn create_doc<T: Serialize>(path: &Path, value: &T) -> StoreResult<InsertOutcome> {
    let temp = write_temp(path, value).await?;
    let linked = tokio::fs::hard_link(&temp, path).await;
    // Leftover temp files are skipped by readers.
    let _ = tokio::fs::remove_file(&temp).await;

    match linked {
        Ok(()) => Ok(InsertOutcome::Inserted),
        Err(e) if e.kind() == ErrorKind::AlreadyExists => Ok(InsertOutcome::AlreadyExists),
        Err(source) => Err(StoreError::WriteError {
            path: path.to_path_buf(),
            source,
        }),
    }
}

/// Publishes `value` at `path`, replacing any previous document.
async fn replace_doc<T: Serialize>(path: &Path, value: &T) -> StoreResult<()> {
    let temp = write_temp(path, value).await?;
    tokio::fs::rename(&temp, path)
        .await
        .map_err(|source| StoreError::WriteError {
            path: path.to_path_buf(),
            source,
        })
}

#[async_trait]
impl AttendanceStore for JsonFileStore {
    fn backend_name(&self) -> &'static str {
        "json"
    }

    async fn get_classroom(&self, id: &str) -> StoreResult<Option<Classroom>> {
        if !is_valid_classroom_id(id) {
            return Ok(None);
        }
        read_doc(&self.classroom_path(id)).await
    }

    async fn list_classrooms(&self) -> StoreResult<Vec<Classroom>> {
        let mut classrooms: Vec<Classroom> = read_dir_docs(&self.classrooms_dir()).await?;
        classrooms.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(classrooms)
    }

    async fn insert_classroom_if_absent(&self, classroom: &Classroom) -> StoreResult<InsertOutcome> {
        if !is_valid_classroom_id(&classroom.id) {
            return Err(invalid_key("classroom", &classroom.id));
        }
        let outcome = create_doc(&self.classroom_path(&classroom.id), classroom).await?;
        debug!(classroom_id = %classroom.id, ?outcome, "Classroom insert");
        Ok(outcome)
    }

    async fn get_user_profile(&self, id: &str) -> StoreResult<Option<UserProfile>> {
        if !is_valid_user_id(id) {
            return Ok(None);
        }
        read_doc(&self.user_path(id)).await
    }

    async fn put_user_profile(&self, profile: &UserProfile) -> StoreResult<()> {
        if !is_valid_user_id(&profile.id) {
            return Err(invalid_key("user", &profile.id));
        }
        replace_doc(&self.user_path(&profile.id), profile).await
    }

    async fn list_classroom_members(&self, classroom_id: &str) -> StoreResult<Vec<UserProfile>> {
        let users: Vec<UserProfile> = read_dir_docs(&self.users_dir()).await?;
        let mut members: Vec<UserProfile> = users
            .into_iter()
            .filter(|p| p.belongs_to(classroom_id))
            .collect();
        sort_members(&mut members);
        Ok(members)
    }

    async fn record_exists(&self, key: &AttendanceKey) -> StoreResult<bool> {
        if !key_is_addressable(key) {
            return Ok(false);
        }
        let path = self.record_path(key);
        match tokio::fs::try_exists(&path).await {
            Ok(exists) => Ok(exists),
            Err(source) => Err(StoreError::ReadError { path, source }),
        }
    }

    async fn insert_record_if_absent(&self, record: &AttendanceRecord) -> StoreResult<InsertOutcome> {
        let key = record.key();
        if !key_is_addressable(&key) {
            return Err(invalid_key("attendance record", &key.to_string()));
        }
        let outcome = create_doc(&self.record_path(&key), record).await?;
        debug!(%key, ?outcome, "Attendance insert");
        Ok(outcome)
    }

    async fn list_records(&self, classroom_id: &str) -> StoreResult<Vec<AttendanceRecord>> {
        if !is_valid_classroom_id(classroom_id) {
            return Ok(Vec::new());
        }
        let dir = self.attendance_dir(classroom_id);
        let read_error = |source| StoreError::ReadError {
            path: dir.clone(),
            source,
        };

        let mut days = match tokio::fs::read_dir(&dir).await {
            Ok(days) => days,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(read_error(e)),
        };

        let mut records = Vec::new();
        while let Some(day) = days.next_entry().await.map_err(read_error)? {
            let name = day.file_name();
            if parse_date(&name.to_string_lossy()).is_none() {
                continue;
            }
            let mut docs: Vec<AttendanceRecord> = read_dir_docs(&day.path()).await?;
            records.append(&mut docs);
        }
        sort_records(&mut records);
        Ok(records)
    }
}
