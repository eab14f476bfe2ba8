/// QR-session attendance protocol
///
/// Teachers issue location-bound, time-limited session tokens; students scan
/// them and are marked present after passing freshness, cooldown, enrollment,
/// and proximity checks. This module owns the token codec, the validator,
/// the proximity calculation, and the percentage aggregation.

pub mod proximity;
pub mod report;
mod service;
pub mod token;

pub use service::AttendanceService;
pub use token::SessionToken;

use crate::db::models::GeoPoint;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Body for the QR generation endpoint: the anchor location of the session
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerateQrRequest {
    pub latitude: f64,
    pub longitude: f64,
}

impl GenerateQrRequest {
    pub fn location(&self) -> GeoPoint {
        GeoPoint {
            latitude: self.latitude,
            longitude: self.longitude,
        }
    }
}

/// Body for the attendance marking endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarkAttendanceRequest {
    /// The raw text decoded from the scanned QR image
    pub qr_data: String,
    pub location: GeoPoint,
}

/// One attendance record in a student report
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttendanceDetail {
    pub marked_at: DateTime<Utc>,
    pub location: GeoPoint,
}

/// Per-student attendance report for one course
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentAttendanceReport {
    pub total_sessions: i64,
    pub attended_sessions: i64,
    pub percentage: f64,
    pub details: Vec<AttendanceDetail>,
}

/// One row of the teacher's per-course report
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CourseReportEntry {
    pub student_id: String,
    pub student_name: String,
    pub total_sessions: i64,
    pub attended_sessions: i64,
    pub percentage: f64,
}
