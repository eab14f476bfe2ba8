/// Disk-based resource storage backend
///
/// Files live at {base}/{course_id}/{filename}, which is also the layout the
/// static `/uploads` route serves from.
use crate::{
    blob_store::BlobBackend,
    error::{RollcallError, RollcallResult},
};
use async_trait::async_trait;
use std::path::PathBuf;
use tokio::fs;

/// Disk storage backend
#[derive(Clone)]
pub struct DiskBlobBackend {
    base_path: PathBuf,
}

impl DiskBlobBackend {
    /// Create a new disk storage backend
    pub fn new(base_path: PathBuf) -> Self {
        Self { base_path }
    }

    fn file_path(&self, course_id: &str, filename: &str) -> PathBuf {
        self.base_path.join(course_id).join(filename)
    }
}

#[async_trait]
impl BlobBackend for DiskBlobBackend {
    async fn put(&self, course_id: &str, filename: &str, data: Vec<u8>) -> RollcallResult<()> {
        let course_dir = self.base_path.join(course_id);
        fs::create_dir_all(&course_dir).await.map_err(|e| {
            RollcallError::BlobStorage(format!("Failed to create course directory: {}", e))
        })?;

        let path = self.file_path(course_id, filename);
        fs::write(&path, data).await.map_err(|e| {
            RollcallError::BlobStorage(format!("Failed to write file {}: {}", filename, e))
        })?;

        Ok(())
    }

    async fn delete(&self, course_id: &str, filename: &str) -> RollcallResult<()> {
        let path = self.file_path(course_id, filename);

        match fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(RollcallError::BlobStorage(format!(
                "Failed to delete file {}: {}",
                filename, e
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_put_writes_under_course_directory() {
        let dir = tempdir().unwrap();
        let backend = DiskBlobBackend::new(dir.path().to_path_buf());

        backend
            .put("course-1", "notes.pdf", b"lecture notes".to_vec())
            .await
            .unwrap();

        let written = tokio::fs::read(dir.path().join("course-1").join("notes.pdf"))
            .await
            .unwrap();
        assert_eq!(written, b"lecture notes");
    }

    #[tokio::test]
    async fn test_delete_removes_file() {
        let dir = tempdir().unwrap();
        let backend = DiskBlobBackend::new(dir.path().to_path_buf());

        backend
            .put("course-1", "notes.pdf", b"data".to_vec())
            .await
            .unwrap();
        backend.delete("course-1", "notes.pdf").await.unwrap();

        assert!(!dir.path().join("course-1").join("notes.pdf").exists());
    }

    #[tokio::test]
    async fn test_delete_missing_file_is_ok() {
        let dir = tempdir().unwrap();
        let backend = DiskBlobBackend::new(dir.path().to_path_buf());

        backend.delete("course-1", "never-existed.pdf").await.unwrap();
    }
}
