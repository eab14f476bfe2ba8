/// Attendance protocol endpoints: QR issuance, marking, and reports
use crate::{
    attendance::{CourseReportEntry, GenerateQrRequest, MarkAttendanceRequest, StudentAttendanceReport},
    auth::AuthContext,
    context::AppContext,
    db::models::{AttendanceRecord, Role},
    error::{RollcallError, RollcallResult},
};
use axum::{
    extract::{Path, State},
    http::{header, StatusCode},
    response::Response,
    routing::{get, post},
    Json, Router,
};
use chrono::Utc;
use qrcode::{render::svg, QrCode};

/// Build attendance routes
pub fn routes() -> Router<AppContext> {
    Router::new()
        .route(
            "/attendance/teacher/generate-qr/:course_id",
            post(generate_qr),
        )
        .route("/attendance/student/mark", post(mark_attendance))
        .route("/attendance/student/:course_id", get(student_report))
        .route("/attendance/teacher/:course_id", get(course_report))
}

/// Issue a session token for a course and render it as a QR image
///
/// Increments the course's session counter whether or not anyone scans.
async fn generate_qr(
    State(ctx): State<AppContext>,
    Path(course_id): Path<String>,
    auth: AuthContext,
    Json(req): Json<GenerateQrRequest>,
) -> RollcallResult<Response> {
    auth.require_role(Role::Teacher)?;

    let encoded = ctx
        .attendance
        .issue_session(&course_id, &auth.account.id, req.location(), Utc::now())
        .await?;

    let qr_svg = QrCode::new(encoded.as_bytes())
        .map_err(|e| RollcallError::Internal(format!("QR generation failed: {}", e)))?
        .render::<svg::Color>()
        .min_dimensions(256, 256)
        .build();

    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, "image/svg+xml")
        .header(header::CACHE_CONTROL, "no-store")
        .body(axum::body::Body::from(qr_svg))
        .map_err(|e| RollcallError::Internal(format!("Response build failed: {}", e)))
}

/// Mark the calling student present from a scanned QR payload
async fn mark_attendance(
    State(ctx): State<AppContext>,
    auth: AuthContext,
    Json(req): Json<MarkAttendanceRequest>,
) -> RollcallResult<Json<AttendanceRecord>> {
    auth.require_role(Role::Student)?;

    let record = ctx
        .attendance
        .mark_attendance(&req.qr_data, req.location, &auth.account.id, Utc::now())
        .await?;

    Ok(Json(record))
}

/// The calling student's attendance report for one course
async fn student_report(
    State(ctx): State<AppContext>,
    Path(course_id): Path<String>,
    auth: AuthContext,
) -> RollcallResult<Json<StudentAttendanceReport>> {
    auth.require_role(Role::Student)?;

    let report = ctx.attendance.student_report(&course_id, &auth.account).await?;

    Ok(Json(report))
}

/// Per-student report for one of the calling teacher's courses
async fn course_report(
    State(ctx): State<AppContext>,
    Path(course_id): Path<String>,
    auth: AuthContext,
) -> RollcallResult<Json<Vec<CourseReportEntry>>> {
    auth.require_role(Role::Teacher)?;

    let entries = ctx
        .attendance
        .course_report(&course_id, &auth.account.id)
        .await?;

    Ok(Json(entries))
}
