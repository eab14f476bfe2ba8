/// Application context and dependency injection
use crate::{
    account::AccountManager,
    attendance::AttendanceService,
    blob_store::{disk::DiskBlobBackend, BlobStore},
    config::ServerConfig,
    course::CourseManager,
    db,
    error::RollcallResult,
};
use sqlx::SqlitePool;
use std::sync::Arc;

/// Application context holding all shared services
#[derive(Clone)]
pub struct AppContext {
    pub config: Arc<ServerConfig>,
    pub db: SqlitePool,
    pub account_manager: Arc<AccountManager>,
    pub course_manager: Arc<CourseManager>,
    pub attendance: Arc<AttendanceService>,
    pub blob_store: Arc<BlobStore>,
}

impl AppContext {
    /// Create a new application context from configuration
    pub async fn new(config: ServerConfig) -> RollcallResult<Self> {
        config.validate()?;

        Self::ensure_directories(&config).await?;

        let db = db::create_pool(&config.storage.database, db::DatabaseOptions::default()).await?;
        db::run_migrations(&db).await?;
        db::test_connection(&db).await?;

        let config = Arc::new(config);

        let account_manager = Arc::new(AccountManager::new(db.clone(), Arc::clone(&config)));
        let course_manager = Arc::new(CourseManager::new(db.clone()));
        let attendance = Arc::new(AttendanceService::new(
            db.clone(),
            config.attendance.clone(),
        ));

        let backend = Arc::new(DiskBlobBackend::new(
            config.storage.upload_directory.clone(),
        ));
        let blob_store = Arc::new(BlobStore::new(
            backend,
            db.clone(),
            config.service.upload_limit,
        ));

        Ok(Self {
            config,
            db,
            account_manager,
            course_manager,
            attendance,
            blob_store,
        })
    }

    /// Ensure required directories exist
    async fn ensure_directories(config: &ServerConfig) -> RollcallResult<()> {
        tokio::fs::create_dir_all(&config.storage.data_directory).await?;
        tokio::fs::create_dir_all(&config.storage.upload_directory).await?;

        Ok(())
    }

    /// Get service URL
    pub fn service_url(&self) -> String {
        format!(
            "http://{}:{}",
            self.config.service.hostname, self.config.service.port
        )
    }
}
