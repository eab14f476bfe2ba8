/// Course resource storage
///
/// Coordinates a file storage backend with resource metadata rows. Files are
/// stored under a course-scoped path and served statically at `/uploads`.

pub mod disk;

use crate::{
    db::models::Resource,
    error::{RollcallError, RollcallResult},
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use std::sync::Arc;
use uuid::Uuid;

/// Storage backend for resource files
#[async_trait]
pub trait BlobBackend: Send + Sync {
    async fn put(&self, course_id: &str, filename: &str, data: Vec<u8>) -> RollcallResult<()>;
    async fn delete(&self, course_id: &str, filename: &str) -> RollcallResult<()>;
}

/// Blob store manager
#[derive(Clone)]
pub struct BlobStore {
    backend: Arc<dyn BlobBackend>,
    db: SqlitePool,
    upload_limit: usize,
}

impl BlobStore {
    /// Create a new blob store over the given backend
    pub fn new(backend: Arc<dyn BlobBackend>, db: SqlitePool, upload_limit: usize) -> Self {
        Self {
            backend,
            db,
            upload_limit,
        }
    }

    /// Store an uploaded file and its metadata row
    pub async fn store_resource(
        &self,
        course_id: &str,
        filename: &str,
        mime_type: &str,
        data: Vec<u8>,
        uploaded_by: &str,
        now: DateTime<Utc>,
    ) -> RollcallResult<Resource> {
        if data.is_empty() {
            return Err(RollcallError::Validation("File is empty".to_string()));
        }

        if data.len() > self.upload_limit {
            return Err(RollcallError::Validation(format!(
                "File exceeds upload limit of {} bytes",
                self.upload_limit
            )));
        }

        validate_filename(filename)?;

        self.backend.put(course_id, filename, data).await?;

        let id = Uuid::new_v4().to_string();
        let url = format!("/uploads/{}/{}", course_id, filename);

        sqlx::query(
            "INSERT INTO resource (id, course_id, title, mime_type, url, uploaded_by, uploaded_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        )
        .bind(&id)
        .bind(course_id)
        .bind(filename)
        .bind(mime_type)
        .bind(&url)
        .bind(uploaded_by)
        .bind(now)
        .execute(&self.db)
        .await
        .map_err(RollcallError::Database)?;

        Ok(Resource {
            id,
            course_id: course_id.to_string(),
            title: filename.to_string(),
            mime_type: mime_type.to_string(),
            url,
            uploaded_by: uploaded_by.to_string(),
            uploaded_at: now,
        })
    }

    /// List resources for a course
    pub async fn list_resources(&self, course_id: &str) -> RollcallResult<Vec<Resource>> {
        sqlx::query_as::<_, Resource>(
            "SELECT id, course_id, title, mime_type, url, uploaded_by, uploaded_at
             FROM resource WHERE course_id = ?1 ORDER BY uploaded_at",
        )
        .bind(course_id)
        .fetch_all(&self.db)
        .await
        .map_err(RollcallError::Database)
    }

    /// Delete a resource and its file
    ///
    /// The file deletion is best-effort: a missing or undeletable physical
    /// file is logged and never blocks removing the metadata row.
    pub async fn delete_resource(&self, course_id: &str, resource_id: &str) -> RollcallResult<()> {
        let resource = sqlx::query_as::<_, Resource>(
            "SELECT id, course_id, title, mime_type, url, uploaded_by, uploaded_at
             FROM resource WHERE id = ?1 AND course_id = ?2",
        )
        .bind(resource_id)
        .bind(course_id)
        .fetch_optional(&self.db)
        .await
        .map_err(RollcallError::Database)?
        .ok_or_else(|| RollcallError::NotFound(format!("Resource {}", resource_id)))?;

        if let Err(e) = self.backend.delete(course_id, &resource.title).await {
            tracing::warn!(
                resource_id,
                course_id,
                "failed to delete resource file: {}",
                e
            );
        }

        sqlx::query("DELETE FROM resource WHERE id = ?1")
            .bind(resource_id)
            .execute(&self.db)
            .await
            .map_err(RollcallError::Database)?;

        Ok(())
    }
}

/// Reject filenames that could escape the course directory
fn validate_filename(filename: &str) -> RollcallResult<()> {
    if filename.is_empty()
        || filename.contains('/')
        || filename.contains('\\')
        || filename.contains("..")
    {
        return Err(RollcallError::Validation(format!(
            "Invalid filename: {}",
            filename
        )));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blob_store::disk::DiskBlobBackend;
    use crate::db::test_pool;
    use tempfile::tempdir;

    /// Seed the teacher t1 and course c1 rows the resource foreign keys require
    async fn fixture(pool: &SqlitePool) {
        sqlx::query(
            "INSERT INTO account (id, email, password_hash, first_name, last_name, role, department, usn, created_at)
             VALUES ('t1', 't1@example.edu', 'x', 't1', 'Person', 'teacher', 'CSE', NULL, ?1)",
        )
        .bind(Utc::now())
        .execute(pool)
        .await
        .unwrap();
        sqlx::query(
            "INSERT INTO course (id, name, teacher_id, department, total_sessions, created_at)
             VALUES ('c1', 'Algorithms', 't1', 'CSE', 0, ?1)",
        )
        .bind(Utc::now())
        .execute(pool)
        .await
        .unwrap();
    }

    #[tokio::test]
    async fn test_store_list_delete_resource() {
        let dir = tempdir().unwrap();
        let pool = test_pool().await;
        fixture(&pool).await;
        let store = BlobStore::new(
            Arc::new(DiskBlobBackend::new(dir.path().to_path_buf())),
            pool,
            1024,
        );
        let now = Utc::now();

        let resource = store
            .store_resource("c1", "syllabus.pdf", "application/pdf", b"pdf".to_vec(), "t1", now)
            .await
            .unwrap();
        assert_eq!(resource.url, "/uploads/c1/syllabus.pdf");
        assert!(dir.path().join("c1").join("syllabus.pdf").exists());

        let listed = store.list_resources("c1").await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].title, "syllabus.pdf");

        store.delete_resource("c1", &resource.id).await.unwrap();
        assert!(store.list_resources("c1").await.unwrap().is_empty());
        assert!(!dir.path().join("c1").join("syllabus.pdf").exists());
    }

    #[tokio::test]
    async fn test_delete_survives_missing_file() {
        let dir = tempdir().unwrap();
        let pool = test_pool().await;
        fixture(&pool).await;
        let store = BlobStore::new(
            Arc::new(DiskBlobBackend::new(dir.path().to_path_buf())),
            pool,
            1024,
        );
        let now = Utc::now();

        let resource = store
            .store_resource("c1", "notes.txt", "text/plain", b"notes".to_vec(), "t1", now)
            .await
            .unwrap();

        // Remove the physical file out from under the store
        tokio::fs::remove_file(dir.path().join("c1").join("notes.txt"))
            .await
            .unwrap();

        // Metadata deletion still succeeds
        store.delete_resource("c1", &resource.id).await.unwrap();
        assert!(store.list_resources("c1").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_upload_limit_enforced() {
        let dir = tempdir().unwrap();
        let pool = test_pool().await;
        let store = BlobStore::new(
            Arc::new(DiskBlobBackend::new(dir.path().to_path_buf())),
            pool,
            4,
        );

        let err = store
            .store_resource("c1", "big.bin", "application/octet-stream", vec![0; 5], "t1", Utc::now())
            .await
            .unwrap_err();
        assert!(matches!(err, RollcallError::Validation(_)));
    }

    #[test]
    fn test_filename_validation() {
        assert!(validate_filename("notes.pdf").is_ok());
        assert!(validate_filename("lecture 3.pptx").is_ok());
        assert!(validate_filename("").is_err());
        assert!(validate_filename("../../etc/passwd").is_err());
        assert!(validate_filename("a/b.pdf").is_err());
        assert!(validate_filename("a\\b.pdf").is_err());
    }
}
