/// Configuration management for the Rollcall service
use crate::error::{RollcallError, RollcallResult};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;

/// Main server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub service: ServiceConfig,
    pub storage: StorageConfig,
    pub authentication: AuthConfig,
    pub attendance: AttendanceConfig,
    pub logging: LoggingConfig,
}

/// Service-level configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceConfig {
    pub hostname: String,
    pub port: u16,
    pub upload_limit: usize,
}

/// Storage configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    pub data_directory: PathBuf,
    pub database: PathBuf,
    pub upload_directory: PathBuf,
}

/// Authentication configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    /// Lifetime of an opaque bearer session token, in hours
    pub session_ttl_hours: i64,
}

/// Attendance protocol configuration
///
/// Defaults match the deployed tuning: a QR token is scannable for 30
/// minutes, a student may mark attendance once per 60 minutes, and the
/// scanner must be within 100 meters of the token's anchor location.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AttendanceConfig {
    pub qr_ttl_minutes: i64,
    pub cooldown_minutes: i64,
    pub proximity_threshold_meters: f64,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
}

impl ServerConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> RollcallResult<Self> {
        dotenv::dotenv().ok();

        let hostname = env::var("ROLLCALL_HOSTNAME").unwrap_or_else(|_| "localhost".to_string());
        let port = env::var("ROLLCALL_PORT")
            .unwrap_or_else(|_| "8000".to_string())
            .parse()
            .map_err(|_| RollcallError::Validation("Invalid port number".to_string()))?;
        let upload_limit = env::var("ROLLCALL_UPLOAD_LIMIT")
            .unwrap_or_else(|_| "5242880".to_string())
            .parse()
            .unwrap_or(5242880);

        let data_directory: PathBuf = env::var("ROLLCALL_DATA_DIRECTORY")
            .unwrap_or_else(|_| "./data".to_string())
            .into();
        let database = env::var("ROLLCALL_DB_LOCATION")
            .map(PathBuf::from)
            .unwrap_or_else(|_| data_directory.join("rollcall.sqlite"));
        let upload_directory = env::var("ROLLCALL_UPLOAD_DIRECTORY")
            .map(PathBuf::from)
            .unwrap_or_else(|_| data_directory.join("uploads"));

        let session_ttl_hours = env::var("ROLLCALL_SESSION_TTL_HOURS")
            .unwrap_or_else(|_| "12".to_string())
            .parse()
            .unwrap_or(12);

        let qr_ttl_minutes = env::var("ROLLCALL_QR_TTL_MINUTES")
            .unwrap_or_else(|_| "30".to_string())
            .parse()
            .unwrap_or(30);
        let cooldown_minutes = env::var("ROLLCALL_COOLDOWN_MINUTES")
            .unwrap_or_else(|_| "60".to_string())
            .parse()
            .unwrap_or(60);
        let proximity_threshold_meters = env::var("ROLLCALL_PROXIMITY_THRESHOLD_METERS")
            .unwrap_or_else(|_| "100".to_string())
            .parse()
            .unwrap_or(100.0);

        let log_level = env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());

        Ok(ServerConfig {
            service: ServiceConfig {
                hostname,
                port,
                upload_limit,
            },
            storage: StorageConfig {
                data_directory,
                database,
                upload_directory,
            },
            authentication: AuthConfig { session_ttl_hours },
            attendance: AttendanceConfig {
                qr_ttl_minutes,
                cooldown_minutes,
                proximity_threshold_meters,
            },
            logging: LoggingConfig { level: log_level },
        })
    }

    /// Validate configuration
    pub fn validate(&self) -> RollcallResult<()> {
        if self.service.hostname.is_empty() {
            return Err(RollcallError::Validation(
                "Hostname cannot be empty".to_string(),
            ));
        }

        if self.attendance.qr_ttl_minutes <= 0 {
            return Err(RollcallError::Validation(
                "QR TTL must be positive".to_string(),
            ));
        }

        if self.attendance.cooldown_minutes <= 0 {
            return Err(RollcallError::Validation(
                "Cooldown must be positive".to_string(),
            ));
        }

        if self.attendance.proximity_threshold_meters <= 0.0 {
            return Err(RollcallError::Validation(
                "Proximity threshold must be positive".to_string(),
            ));
        }

        Ok(())
    }
}

impl Default for AttendanceConfig {
    fn default() -> Self {
        Self {
            qr_ttl_minutes: 30,
            cooldown_minutes: 60,
            proximity_threshold_meters: 100.0,
        }
    }
}
