// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Best-effort on-disk copy of the workout collection.
//!
//! Lets a restarted process show the last known workouts before the first
//! refresh completes. It is advisory only and overwritten by every
//! successful refresh.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::Mutex;

use crate::models::Workout;

#[derive(Debug, thiserror::Error)]
pub enum MirrorError {
    #[error("mirror I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("mirror contents unreadable: {0}")]
    Format(#[from] serde_json::Error),
}

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct MirrorFile<W> {
    owner_id: String,
    saved_at: DateTime<Utc>,
    workouts: W,
}

/// Workout mirror stored as a single JSON file.
#[derive(Debug, Clone)]
pub struct LocalMirror {
    path: PathBuf,
    /// Held for a whole store; the temp file path is fixed.
    write_lock: Arc<Mutex<()>>,
}

impl LocalMirror {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Arc::new(Mutex::new(())),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Overwrite the mirror with `workouts` for `owner_id`.
    pub async fn store(&self, owner_id: &str, workouts: &[Workout]) -> Result<(), MirrorError> {
        let file = MirrorFile {
            owner_id: owner_id.to_string(),
            saved_at: Utc::now(),
            workouts,
        };
        let bytes = serde_json::to_vec(&file)?;

        let _write = self.write_lock.lock().await;
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }

        // Write then rename so a crash never leaves a truncated mirror.
        let tmp = self.path.with_extension("tmp");
        tokio::fs::write(&tmp, bytes).await?;
        tokio::fs::rename(&tmp, &self.path).await?;

        tracing::debug!(path = %self.path.display(), count = workouts.len(), "Workout mirror saved");
        Ok(())
    }

    /// Raw workout documents saved for `owner_id`.
    ///
    /// Returns an empty list when there is no mirror or it belongs to a
    /// different owner. Documents still need validating by the caller.
    pub async fn load(&self, owner_id: &str) -> Result<Vec<Value>, MirrorError> {
        let bytes = match tokio::fs::read(&self.path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let file: MirrorFile<Vec<Value>> = serde_json::from_slice(&bytes)?;
        if file.owner_id != owner_id {
            tracing::debug!("Workout mirror belongs to another owner, ignoring");
            return Ok(Vec::new());
        }
        Ok(file.workouts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn workout(id: &str) -> Workout {
        Workout {
            id: id.to_string(),
            user_id: "alice".to_string(),
            name: "Upper".to_string(),
            date: Utc.with_ymd_and_hms(2023, 1, 5, 0, 0, 0).unwrap(),
            exercises: vec![],
            category: Some("strength".to_string()),
            completed: None,
        }
    }

    #[tokio::test]
    async fn test_store_and_load_for_same_owner() {
        let dir = tempfile::tempdir().unwrap();
        let mirror = LocalMirror::new(dir.path().join("cache").join("workouts.json"));

        mirror.store("alice", &[workout("1"), workout("2")]).await.unwrap();
        let docs = mirror.load("alice").await.unwrap();

        assert_eq!(docs.len(), 2);
        assert_eq!(docs[0]["id"], "1");
        assert_eq!(docs[0]["date"], "2023-01-05T00:00:00Z");
    }

    #[tokio::test]
    async fn test_load_ignores_other_owner_and_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let mirror = LocalMirror::new(dir.path().join("workouts.json"));

        assert!(mirror.load("alice").await.unwrap().is_empty());

        mirror.store("alice", &[workout("1")]).await.unwrap();
        assert!(mirror.load("bob").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_concurrent_stores_leave_a_complete_mirror() {
        let dir = tempfile::tempdir().unwrap();
        let mirror = LocalMirror::new(dir.path().join("workouts.json"));
        let other = mirror.clone();
        let many: Vec<Workout> = (0..50).map(|i| workout(&i.to_string())).collect();
        let single = [workout("x")];

        let (a, b, c) = tokio::join!(
            mirror.store("alice", &many),
            other.store("alice", &single),
            mirror.store("alice", &many[..10]),
        );
        a.unwrap();
        b.unwrap();
        c.unwrap();

        let docs = mirror.load("alice").await.unwrap();
        assert!([1, 10, 50].contains(&docs.len()));
        assert!(!dir.path().join("workouts.tmp").exists());
    }

    #[tokio::test]
    async fn test_corrupt_mirror_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("workouts.json");
        std::fs::write(&path, b"{not json").unwrap();

        let err = LocalMirror::new(path).load("alice").await.unwrap_err();
        assert!(matches!(err, MirrorError::Format(_)));
    }
}
