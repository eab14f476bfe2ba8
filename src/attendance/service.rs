/// Attendance validator and session issuance
///
/// The persistent store is the sole synchronization point: the session
/// counter bump and the record insert are single atomic statements, so
/// concurrent requests cannot corrupt the counter or slip a duplicate record
/// past the cooldown.
use crate::{
    attendance::{
        proximity, report, token::SessionToken, AttendanceDetail, CourseReportEntry,
        StudentAttendanceReport,
    },
    config::AttendanceConfig,
    db::models::{Account, AttendanceRecord, Course, GeoPoint},
    error::{RollcallError, RollcallResult},
};
use chrono::{DateTime, Duration, Utc};
use sqlx::{Row, SqlitePool};
use uuid::Uuid;

/// Attendance service
///
/// Every operation takes `now` explicitly; handlers pass `Utc::now()` and
/// tests inject fixed instants.
pub struct AttendanceService {
    db: SqlitePool,
    policy: AttendanceConfig,
}

impl AttendanceService {
    /// Create a new attendance service
    pub fn new(db: SqlitePool, policy: AttendanceConfig) -> Self {
        Self { db, policy }
    }

    /// Issue a session token for a course
    ///
    /// Bumps the course's `total_sessions` counter by exactly 1, whether or
    /// not any student ever scans the token. The update is scoped to the
    /// owning teacher, so a single statement covers both the ownership check
    /// and the increment.
    pub async fn issue_session(
        &self,
        course_id: &str,
        teacher_id: &str,
        anchor: GeoPoint,
        now: DateTime<Utc>,
    ) -> RollcallResult<String> {
        let result = sqlx::query(
            "UPDATE course SET total_sessions = total_sessions + 1
             WHERE id = ?1 AND teacher_id = ?2",
        )
        .bind(course_id)
        .bind(teacher_id)
        .execute(&self.db)
        .await
        .map_err(RollcallError::Database)?;

        if result.rows_affected() == 0 {
            return Err(RollcallError::CourseNotFound(course_id.to_string()));
        }

        tracing::info!(course_id, teacher_id, "issued attendance session");

        SessionToken::new(course_id.to_string(), anchor, now).encode()
    }

    /// Validate a scanned token and mark the student present
    ///
    /// Checks run in a fixed order, short-circuiting on the first failure:
    /// decode, expiry, cooldown, course, enrollment, proximity. The cooldown
    /// is global per student, not per course, and is checked before any
    /// course lookup. Rejections leave no trace in the store.
    ///
    /// A successful call always appends one record. There is deliberately no
    /// guard against re-scanning a still-valid token once the cooldown has
    /// passed: two valid scans spaced further apart than the cooldown both
    /// create records.
    pub async fn mark_attendance(
        &self,
        qr_data: &str,
        scanner_location: GeoPoint,
        student_id: &str,
        now: DateTime<Utc>,
    ) -> RollcallResult<AttendanceRecord> {
        let token = SessionToken::decode(qr_data)?;

        if token.is_expired(now, self.policy.qr_ttl_minutes) {
            return Err(RollcallError::QrExpired);
        }

        let cooldown_start = now - Duration::minutes(self.policy.cooldown_minutes);
        if self.has_record_since(student_id, cooldown_start).await? {
            return Err(RollcallError::CooldownActive {
                minutes: self.policy.cooldown_minutes,
            });
        }

        if !self.course_exists(&token.course_id).await? {
            return Err(RollcallError::CourseNotFound(token.course_id));
        }

        if !self.is_enrolled(&token.course_id, student_id).await? {
            return Err(RollcallError::NotEnrolled);
        }

        if !proximity::within_range(
            scanner_location,
            token.anchor(),
            self.policy.proximity_threshold_meters,
        ) {
            return Err(RollcallError::OutOfRange);
        }

        // The cooldown was checked above, but two near-simultaneous scans
        // could both pass that read. The insert re-asserts the cooldown in
        // one statement so only the first can land.
        let record_id = Uuid::new_v4().to_string();
        let result = sqlx::query(
            "INSERT INTO attendance_record (id, course_id, student_id, latitude, longitude, marked_at)
             SELECT ?1, ?2, ?3, ?4, ?5, ?6
             WHERE NOT EXISTS (
                 SELECT 1 FROM attendance_record WHERE student_id = ?3 AND marked_at >= ?7
             )",
        )
        .bind(&record_id)
        .bind(&token.course_id)
        .bind(student_id)
        .bind(scanner_location.latitude)
        .bind(scanner_location.longitude)
        .bind(now)
        .bind(cooldown_start)
        .execute(&self.db)
        .await
        .map_err(RollcallError::Database)?;

        if result.rows_affected() == 0 {
            return Err(RollcallError::CooldownActive {
                minutes: self.policy.cooldown_minutes,
            });
        }

        tracing::info!(student_id, course_id = %token.course_id, "attendance marked");

        Ok(AttendanceRecord {
            id: record_id,
            course_id: token.course_id,
            student_id: student_id.to_string(),
            latitude: scanner_location.latitude,
            longitude: scanner_location.longitude,
            marked_at: now,
        })
    }

    /// Attendance report for one student in one course
    ///
    /// The course must belong to the student's department.
    pub async fn student_report(
        &self,
        course_id: &str,
        student: &Account,
    ) -> RollcallResult<StudentAttendanceReport> {
        let course = sqlx::query_as::<_, Course>(
            "SELECT id, name, teacher_id, department, total_sessions, created_at
             FROM course WHERE id = ?1 AND department = ?2",
        )
        .bind(course_id)
        .bind(&student.department)
        .fetch_optional(&self.db)
        .await
        .map_err(RollcallError::Database)?
        .ok_or_else(|| RollcallError::CourseNotFound(course_id.to_string()))?;

        let records = sqlx::query_as::<_, AttendanceRecord>(
            "SELECT id, course_id, student_id, latitude, longitude, marked_at
             FROM attendance_record
             WHERE student_id = ?1 AND course_id = ?2
             ORDER BY marked_at",
        )
        .bind(&student.id)
        .bind(course_id)
        .fetch_all(&self.db)
        .await
        .map_err(RollcallError::Database)?;

        let attended_sessions = records.len() as i64;

        Ok(StudentAttendanceReport {
            total_sessions: course.total_sessions,
            attended_sessions,
            percentage: report::percentage(course.total_sessions, attended_sessions),
            details: records
                .iter()
                .map(|r| AttendanceDetail {
                    marked_at: r.marked_at,
                    location: r.location(),
                })
                .collect(),
        })
    }

    /// Per-student report for a whole course
    ///
    /// The course must be owned by the calling teacher. Iterates the
    /// enrollments and computes each student's ratio against the course's
    /// session counter.
    pub async fn course_report(
        &self,
        course_id: &str,
        teacher_id: &str,
    ) -> RollcallResult<Vec<CourseReportEntry>> {
        let course = sqlx::query_as::<_, Course>(
            "SELECT id, name, teacher_id, department, total_sessions, created_at
             FROM course WHERE id = ?1 AND teacher_id = ?2",
        )
        .bind(course_id)
        .bind(teacher_id)
        .fetch_optional(&self.db)
        .await
        .map_err(RollcallError::Database)?
        .ok_or_else(|| RollcallError::CourseNotFound(course_id.to_string()))?;

        let rows = sqlx::query(
            "SELECT e.student_id AS student_id,
                    a.first_name AS first_name,
                    a.last_name AS last_name,
                    COUNT(r.id) AS attended
             FROM enrollment e
             JOIN account a ON a.id = e.student_id
             LEFT JOIN attendance_record r
                  ON r.student_id = e.student_id AND r.course_id = e.course_id
             WHERE e.course_id = ?1
             GROUP BY e.student_id, a.first_name, a.last_name
             ORDER BY a.last_name, a.first_name",
        )
        .bind(course_id)
        .fetch_all(&self.db)
        .await
        .map_err(RollcallError::Database)?;

        Ok(rows
            .into_iter()
            .map(|row| {
                let attended: i64 = row.get("attended");
                let first_name: String = row.get("first_name");
                let last_name: String = row.get("last_name");
                CourseReportEntry {
                    student_id: row.get("student_id"),
                    student_name: format!("{} {}", first_name, last_name),
                    total_sessions: course.total_sessions,
                    attended_sessions: attended,
                    percentage: report::percentage(course.total_sessions, attended),
                }
            })
            .collect())
    }

    async fn has_record_since(
        &self,
        student_id: &str,
        since: DateTime<Utc>,
    ) -> RollcallResult<bool> {
        let row: Option<(i64,)> = sqlx::query_as(
            "SELECT 1 FROM attendance_record WHERE student_id = ?1 AND marked_at >= ?2 LIMIT 1",
        )
        .bind(student_id)
        .bind(since)
        .fetch_optional(&self.db)
        .await
        .map_err(RollcallError::Database)?;

        Ok(row.is_some())
    }

    async fn course_exists(&self, course_id: &str) -> RollcallResult<bool> {
        let row: Option<(i64,)> = sqlx::query_as("SELECT 1 FROM course WHERE id = ?1")
            .bind(course_id)
            .fetch_optional(&self.db)
            .await
            .map_err(RollcallError::Database)?;

        Ok(row.is_some())
    }

    async fn is_enrolled(&self, course_id: &str, student_id: &str) -> RollcallResult<bool> {
        let row: Option<(i64,)> = sqlx::query_as(
            "SELECT 1 FROM enrollment WHERE course_id = ?1 AND student_id = ?2",
        )
        .bind(course_id)
        .bind(student_id)
        .fetch_optional(&self.db)
        .await
        .map_err(RollcallError::Database)?;

        Ok(row.is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_pool;

    const ANCHOR: GeoPoint = GeoPoint {
        latitude: 12.9716,
        longitude: 77.5946,
    };

    fn service(pool: &SqlitePool) -> AttendanceService {
        AttendanceService::new(pool.clone(), AttendanceConfig::default())
    }

    fn t0() -> DateTime<Utc> {
        "2026-03-02T09:00:00Z".parse().unwrap()
    }

    async fn seed_account(pool: &SqlitePool, id: &str, role: &str) {
        sqlx::query(
            "INSERT INTO account (id, email, password_hash, first_name, last_name, role, department, usn, created_at)
             VALUES (?1, ?2, 'x', ?3, 'Person', ?4, 'CSE', NULL, ?5)",
        )
        .bind(id)
        .bind(format!("{}@example.edu", id))
        .bind(id)
        .bind(role)
        .bind(t0())
        .execute(pool)
        .await
        .unwrap();
    }

    async fn seed_course(pool: &SqlitePool, id: &str, teacher_id: &str) {
        sqlx::query(
            "INSERT INTO course (id, name, teacher_id, department, total_sessions, created_at)
             VALUES (?1, 'Algorithms', ?2, 'CSE', 0, ?3)",
        )
        .bind(id)
        .bind(teacher_id)
        .bind(t0())
        .execute(pool)
        .await
        .unwrap();
    }

    async fn seed_enrollment(pool: &SqlitePool, course_id: &str, student_id: &str) {
        sqlx::query(
            "INSERT INTO enrollment (id, course_id, student_id, enrolled_at)
             VALUES (?1, ?2, ?3, ?4)",
        )
        .bind(Uuid::new_v4().to_string())
        .bind(course_id)
        .bind(student_id)
        .bind(t0())
        .execute(pool)
        .await
        .unwrap();
    }

    async fn total_sessions(pool: &SqlitePool, course_id: &str) -> i64 {
        let (count,): (i64,) =
            sqlx::query_as("SELECT total_sessions FROM course WHERE id = ?1")
                .bind(course_id)
                .fetch_one(pool)
                .await
                .unwrap();
        count
    }

    async fn record_count(pool: &SqlitePool) -> i64 {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM attendance_record")
            .fetch_one(pool)
            .await
            .unwrap();
        count
    }

    /// Standard fixture: teacher t1 owns course c1, student s1 is enrolled
    async fn fixture(pool: &SqlitePool) {
        seed_account(pool, "t1", "teacher").await;
        seed_account(pool, "s1", "student").await;
        seed_course(pool, "c1", "t1").await;
        seed_enrollment(pool, "c1", "s1").await;
    }

    #[tokio::test]
    async fn test_issue_increments_counter_per_token() {
        let pool = test_pool().await;
        fixture(&pool).await;
        let svc = service(&pool);

        let encoded = svc.issue_session("c1", "t1", ANCHOR, t0()).await.unwrap();
        svc.issue_session("c1", "t1", ANCHOR, t0()).await.unwrap();

        assert_eq!(total_sessions(&pool, "c1").await, 2);

        let token = SessionToken::decode(&encoded).unwrap();
        assert_eq!(token.course_id, "c1");
        assert_eq!(token.anchor(), ANCHOR);
        assert_eq!(token.generated_at, t0());
    }

    #[tokio::test]
    async fn test_issue_rejects_non_owner() {
        let pool = test_pool().await;
        fixture(&pool).await;
        seed_account(&pool, "t2", "teacher").await;
        let svc = service(&pool);

        let err = svc.issue_session("c1", "t2", ANCHOR, t0()).await.unwrap_err();
        assert!(matches!(err, RollcallError::CourseNotFound(_)));
        assert_eq!(total_sessions(&pool, "c1").await, 0);
    }

    #[tokio::test]
    async fn test_mark_success_creates_record() {
        let pool = test_pool().await;
        fixture(&pool).await;
        let svc = service(&pool);

        let encoded = svc.issue_session("c1", "t1", ANCHOR, t0()).await.unwrap();
        let record = svc
            .mark_attendance(&encoded, ANCHOR, "s1", t0() + Duration::minutes(5))
            .await
            .unwrap();

        assert_eq!(record.course_id, "c1");
        assert_eq!(record.student_id, "s1");
        assert_eq!(record.marked_at, t0() + Duration::minutes(5));
        assert_eq!(record_count(&pool).await, 1);
    }

    #[tokio::test]
    async fn test_garbage_token_rejected_without_side_effects() {
        let pool = test_pool().await;
        fixture(&pool).await;
        let svc = service(&pool);

        let err = svc
            .mark_attendance("<<garbage>>", ANCHOR, "s1", t0())
            .await
            .unwrap_err();

        assert!(matches!(err, RollcallError::InvalidQr(_)));
        assert_eq!(record_count(&pool).await, 0);
        assert_eq!(total_sessions(&pool, "c1").await, 0);
    }

    #[tokio::test]
    async fn test_expired_token_rejected() {
        let pool = test_pool().await;
        fixture(&pool).await;
        let svc = service(&pool);

        let encoded = svc.issue_session("c1", "t1", ANCHOR, t0()).await.unwrap();

        // Valid at exactly the 30 minute boundary
        svc.mark_attendance(&encoded, ANCHOR, "s1", t0() + Duration::minutes(30))
            .await
            .unwrap();

        seed_account(&pool, "s2", "student").await;
        seed_enrollment(&pool, "c1", "s2").await;
        let err = svc
            .mark_attendance(
                &encoded,
                ANCHOR,
                "s2",
                t0() + Duration::minutes(30) + Duration::seconds(1),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, RollcallError::QrExpired));
    }

    #[tokio::test]
    async fn test_cooldown_applies_across_courses() {
        let pool = test_pool().await;
        fixture(&pool).await;
        seed_course(&pool, "c2", "t1").await;
        seed_enrollment(&pool, "c2", "s1").await;
        let svc = service(&pool);

        let first = svc.issue_session("c1", "t1", ANCHOR, t0()).await.unwrap();
        svc.mark_attendance(&first, ANCHOR, "s1", t0()).await.unwrap();

        // A different course 30 minutes later: still throttled
        let second = svc
            .issue_session("c2", "t1", ANCHOR, t0() + Duration::minutes(30))
            .await
            .unwrap();
        let err = svc
            .mark_attendance(&second, ANCHOR, "s1", t0() + Duration::minutes(30))
            .await
            .unwrap_err();
        assert!(matches!(err, RollcallError::CooldownActive { .. }));
        assert_eq!(record_count(&pool).await, 1);
    }

    #[tokio::test]
    async fn test_cooldown_checked_before_course_lookup() {
        let pool = test_pool().await;
        fixture(&pool).await;
        let svc = service(&pool);

        let encoded = svc.issue_session("c1", "t1", ANCHOR, t0()).await.unwrap();
        svc.mark_attendance(&encoded, ANCHOR, "s1", t0()).await.unwrap();

        // Token naming a course that does not exist, scanned during cooldown
        let bogus = SessionToken::new("no-such-course".to_string(), ANCHOR, t0())
            .encode()
            .unwrap();
        let err = svc
            .mark_attendance(&bogus, ANCHOR, "s1", t0() + Duration::minutes(10))
            .await
            .unwrap_err();
        assert!(matches!(err, RollcallError::CooldownActive { .. }));
    }

    #[tokio::test]
    async fn test_unknown_course_rejected() {
        let pool = test_pool().await;
        fixture(&pool).await;
        let svc = service(&pool);

        let bogus = SessionToken::new("no-such-course".to_string(), ANCHOR, t0())
            .encode()
            .unwrap();
        let err = svc.mark_attendance(&bogus, ANCHOR, "s1", t0()).await.unwrap_err();
        assert!(matches!(err, RollcallError::CourseNotFound(_)));
        assert_eq!(record_count(&pool).await, 0);
    }

    #[tokio::test]
    async fn test_unenrolled_student_rejected() {
        let pool = test_pool().await;
        fixture(&pool).await;
        seed_account(&pool, "s2", "student").await;
        let svc = service(&pool);

        let encoded = svc.issue_session("c1", "t1", ANCHOR, t0()).await.unwrap();

        // Perfect proximity, fresh token: enrollment still gates
        let err = svc.mark_attendance(&encoded, ANCHOR, "s2", t0()).await.unwrap_err();
        assert!(matches!(err, RollcallError::NotEnrolled));
    }

    #[tokio::test]
    async fn test_out_of_range_rejected() {
        let pool = test_pool().await;
        fixture(&pool).await;
        let svc = service(&pool);

        let encoded = svc.issue_session("c1", "t1", ANCHOR, t0()).await.unwrap();
        let far = GeoPoint {
            latitude: ANCHOR.latitude + 0.01,
            longitude: ANCHOR.longitude,
        };
        let err = svc.mark_attendance(&encoded, far, "s1", t0()).await.unwrap_err();
        assert!(matches!(err, RollcallError::OutOfRange));
        assert_eq!(record_count(&pool).await, 0);
    }

    #[tokio::test]
    async fn test_rescans_past_cooldown_both_count() {
        let pool = test_pool().await;
        fixture(&pool).await;
        let svc = service(&pool);

        let first = svc.issue_session("c1", "t1", ANCHOR, t0()).await.unwrap();
        svc.mark_attendance(&first, ANCHOR, "s1", t0()).await.unwrap();

        let later = t0() + Duration::minutes(61);
        let second = svc.issue_session("c1", "t1", ANCHOR, later).await.unwrap();
        svc.mark_attendance(&second, ANCHOR, "s1", later).await.unwrap();

        assert_eq!(record_count(&pool).await, 2);
    }

    #[tokio::test]
    async fn test_student_report_percentage() {
        let pool = test_pool().await;
        fixture(&pool).await;
        let svc = service(&pool);

        // Four sessions issued, three attended
        for i in 0..4 {
            let issued_at = t0() + Duration::minutes(61 * i);
            let encoded = svc.issue_session("c1", "t1", ANCHOR, issued_at).await.unwrap();
            if i < 3 {
                svc.mark_attendance(&encoded, ANCHOR, "s1", issued_at).await.unwrap();
            }
        }

        let student = sqlx::query_as::<_, Account>(
            "SELECT id, email, password_hash, first_name, last_name, role, department, usn, created_at
             FROM account WHERE id = 's1'",
        )
        .fetch_one(&pool)
        .await
        .unwrap();

        let report = svc.student_report("c1", &student).await.unwrap();
        assert_eq!(report.total_sessions, 4);
        assert_eq!(report.attended_sessions, 3);
        assert_eq!(report.percentage, 75.0);
        assert_eq!(report.details.len(), 3);
        assert_eq!(report.details[0].location, ANCHOR);
    }

    #[tokio::test]
    async fn test_student_report_zero_sessions() {
        let pool = test_pool().await;
        fixture(&pool).await;
        let svc = service(&pool);

        let student = sqlx::query_as::<_, Account>(
            "SELECT id, email, password_hash, first_name, last_name, role, department, usn, created_at
             FROM account WHERE id = 's1'",
        )
        .fetch_one(&pool)
        .await
        .unwrap();

        let report = svc.student_report("c1", &student).await.unwrap();
        assert_eq!(report.total_sessions, 0);
        assert_eq!(report.percentage, 0.0);
    }

    #[tokio::test]
    async fn test_course_report_lists_enrolled_students() {
        let pool = test_pool().await;
        fixture(&pool).await;
        seed_account(&pool, "s2", "student").await;
        seed_enrollment(&pool, "c1", "s2").await;
        let svc = service(&pool);

        let encoded = svc.issue_session("c1", "t1", ANCHOR, t0()).await.unwrap();
        svc.mark_attendance(&encoded, ANCHOR, "s1", t0()).await.unwrap();

        let entries = svc.course_report("c1", "t1").await.unwrap();
        assert_eq!(entries.len(), 2);

        let attended: Vec<_> = entries.iter().filter(|e| e.attended_sessions == 1).collect();
        assert_eq!(attended.len(), 1);
        assert_eq!(attended[0].student_id, "s1");
        assert_eq!(attended[0].percentage, 100.0);

        let absent: Vec<_> = entries.iter().filter(|e| e.attended_sessions == 0).collect();
        assert_eq!(absent.len(), 1);
        assert_eq!(absent[0].percentage, 0.0);
    }

    #[tokio::test]
    async fn test_course_report_requires_ownership() {
        let pool = test_pool().await;
        fixture(&pool).await;
        seed_account(&pool, "t2", "teacher").await;
        let svc = service(&pool);

        let err = svc.course_report("c1", "t2").await.unwrap_err();
        assert!(matches!(err, RollcallError::CourseNotFound(_)));
    }
}
