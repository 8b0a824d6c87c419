//! Per-user key-value persistence.
//!
//! Stored values are never assumed well-formed: a value that fails to decode is
//! logged, removed, and reported as absent so the caller falls back to its
//! default or setup flow.

use serde::{de::DeserializeOwned, Serialize};

use crate::db::Repository;
use crate::errors::AppError;
use crate::models::{AttendanceMap, StudentSettings};

/// Key-value store with a get/set/remove contract.
#[derive(Clone)]
pub struct KvStore {
    repo: Repository,
}

pub fn attendance_key(class_id: &str) -> String {
    format!("attendance_{}", class_id)
}

pub fn customization_key(teacher_id: &str) -> String {
    format!("teacher_ai_customization_{}", teacher_id)
}

pub fn student_settings_key(student_id: &str) -> String {
    format!("student_learning_settings_{}", student_id)
}

impl KvStore {
    pub fn new(repo: Repository) -> Self {
        Self { repo }
    }

    pub async fn get(&self, key: &str) -> Result<Option<String>, AppError> {
        self.repo.kv_get(key).await
    }

    pub async fn set(&self, key: &str, value: &str) -> Result<(), AppError> {
        self.repo.kv_set(key, value).await
    }

    pub async fn remove(&self, key: &str) -> Result<(), AppError> {
        self.repo.kv_remove(key).await
    }

    /// Decode a JSON value, discarding it if corrupt.
    pub async fn load_json<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, AppError> {
        let Some(raw) = self.get(key).await? else {
            return Ok(None);
        };

        match serde_json::from_str(&raw) {
            Ok(value) => Ok(Some(value)),
            Err(e) => {
                tracing::warn!("Discarding corrupt stored value for '{}': {}", key, e);
                self.remove(key).await?;
                Ok(None)
            }
        }
    }

    pub async fn save_json<T: Serialize>(&self, key: &str, value: &T) -> Result<(), AppError> {
        let raw = serde_json::to_string(value)?;
        self.set(key, &raw).await
    }

    // ==================== TYPED ACCESSORS ====================

    pub async fn student_settings(&self, student_id: &str) -> Result<Option<StudentSettings>, AppError> {
        self.load_json(&student_settings_key(student_id)).await
    }

    pub async fn save_student_settings(
        &self,
        student_id: &str,
        settings: &StudentSettings,
    ) -> Result<(), AppError> {
        self.save_json(&student_settings_key(student_id), settings).await
    }

    /// Attendance overrides for a class; an absent or corrupt entry is empty.
    pub async fn attendance(&self, class_id: &str) -> Result<AttendanceMap, AppError> {
        Ok(self
            .load_json(&attendance_key(class_id))
            .await?
            .unwrap_or_default())
    }

    pub async fn save_attendance(&self, class_id: &str, map: &AttendanceMap) -> Result<(), AppError> {
        self.save_json(&attendance_key(class_id), map).await
    }

    /// Teacher customization text, `None` when unset or blank.
    pub async fn customization(&self, teacher_id: &str) -> Result<Option<String>, AppError> {
        Ok(self
            .get(&customization_key(teacher_id))
            .await?
            .filter(|text| !text.trim().is_empty()))
    }

    /// Store customization text; blank text clears it.
    pub async fn save_customization(&self, teacher_id: &str, text: &str) -> Result<(), AppError> {
        let key = customization_key(teacher_id);
        if text.trim().is_empty() {
            self.remove(&key).await
        } else {
            self.set(&key, text).await
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::init_database;
    use crate::models::Attendance;
    use tempfile::TempDir;

    async fn store() -> (KvStore, TempDir) {
        let dir = TempDir::new().unwrap();
        let pool = init_database(&dir.path().join("kv.sqlite")).await.unwrap();
        (KvStore::new(Repository::new(pool)), dir)
    }

    #[tokio::test]
    async fn test_corrupt_settings_fall_back_and_are_removed() {
        let (kv, _dir) = store().await;
        let key = student_settings_key("s1");

        kv.set(&key, "{not json").await.unwrap();
        assert!(kv.student_settings("s1").await.unwrap().is_none());
        assert!(kv.get(&key).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_settings_roundtrip() {
        let (kv, _dir) = store().await;
        let settings = StudentSettings {
            grade_level: 5,
            current_subject: "Science".to_string(),
        };

        kv.save_student_settings("s1", &settings).await.unwrap();
        assert_eq!(kv.student_settings("s1").await.unwrap(), Some(settings));
        assert!(kv.student_settings("s2").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_wrong_shape_attendance_is_empty() {
        let (kv, _dir) = store().await;
        kv.set(&attendance_key("c1"), "[1,2,3]").await.unwrap();
        assert!(kv.attendance("c1").await.unwrap().is_empty());

        let mut map = AttendanceMap::new();
        map.insert(
            "student-0".to_string(),
            Attendance {
                morning: true,
                evening: false,
            },
        );
        kv.save_attendance("c1", &map).await.unwrap();
        assert_eq!(kv.attendance("c1").await.unwrap(), map);
    }

    #[tokio::test]
    async fn test_blank_customization_clears() {
        let (kv, _dir) = store().await;
        kv.save_customization("t1", "Focus on fractions").await.unwrap();
        assert_eq!(
            kv.customization("t1").await.unwrap().as_deref(),
            Some("Focus on fractions")
        );
        kv.save_customization("t1", "   ").await.unwrap();
        assert!(kv.customization("t1").await.unwrap().is_none());
    }
}
