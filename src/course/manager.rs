/// Course manager implementation using runtime queries
use crate::{
    db::models::{Course, Enrollment},
    error::{RollcallError, RollcallResult},
};
use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use uuid::Uuid;

/// Course manager service
pub struct CourseManager {
    db: SqlitePool,
}

impl CourseManager {
    /// Create a new course manager
    pub fn new(db: SqlitePool) -> Self {
        Self { db }
    }

    /// Create a course owned by a teacher
    pub async fn create_course(
        &self,
        name: &str,
        teacher_id: &str,
        department: &str,
        now: DateTime<Utc>,
    ) -> RollcallResult<Course> {
        let id = Uuid::new_v4().to_string();

        sqlx::query(
            "INSERT INTO course (id, name, teacher_id, department, total_sessions, created_at)
             VALUES (?1, ?2, ?3, ?4, 0, ?5)",
        )
        .bind(&id)
        .bind(name)
        .bind(teacher_id)
        .bind(department)
        .bind(now)
        .execute(&self.db)
        .await
        .map_err(RollcallError::Database)?;

        Ok(Course {
            id,
            name: name.to_string(),
            teacher_id: teacher_id.to_string(),
            department: department.to_string(),
            total_sessions: 0,
            created_at: now,
        })
    }

    /// Fetch a course by id
    pub async fn find_course(&self, course_id: &str) -> RollcallResult<Option<Course>> {
        sqlx::query_as::<_, Course>(
            "SELECT id, name, teacher_id, department, total_sessions, created_at
             FROM course WHERE id = ?1",
        )
        .bind(course_id)
        .fetch_optional(&self.db)
        .await
        .map_err(RollcallError::Database)
    }

    /// Fetch a course by id, scoped to its owning teacher
    pub async fn find_course_for_teacher(
        &self,
        course_id: &str,
        teacher_id: &str,
    ) -> RollcallResult<Option<Course>> {
        sqlx::query_as::<_, Course>(
            "SELECT id, name, teacher_id, department, total_sessions, created_at
             FROM course WHERE id = ?1 AND teacher_id = ?2",
        )
        .bind(course_id)
        .bind(teacher_id)
        .fetch_optional(&self.db)
        .await
        .map_err(RollcallError::Database)
    }

    /// List all courses owned by a teacher
    pub async fn list_for_teacher(&self, teacher_id: &str) -> RollcallResult<Vec<Course>> {
        sqlx::query_as::<_, Course>(
            "SELECT id, name, teacher_id, department, total_sessions, created_at
             FROM course WHERE teacher_id = ?1 ORDER BY created_at",
        )
        .bind(teacher_id)
        .fetch_all(&self.db)
        .await
        .map_err(RollcallError::Database)
    }

    /// List all courses in a department
    pub async fn list_by_department(&self, department: &str) -> RollcallResult<Vec<Course>> {
        sqlx::query_as::<_, Course>(
            "SELECT id, name, teacher_id, department, total_sessions, created_at
             FROM course WHERE department = ?1 ORDER BY created_at",
        )
        .bind(department)
        .fetch_all(&self.db)
        .await
        .map_err(RollcallError::Database)
    }

    /// Idempotently enroll a student in a course
    ///
    /// The (course, student) pair is unique; re-running is a no-op. Invoked
    /// from the student listing path so courses created after the student
    /// registered still gain an enrollment row.
    pub async fn ensure_enrolled(
        &self,
        course_id: &str,
        student_id: &str,
        now: DateTime<Utc>,
    ) -> RollcallResult<()> {
        sqlx::query(
            "INSERT OR IGNORE INTO enrollment (id, course_id, student_id, enrolled_at)
             VALUES (?1, ?2, ?3, ?4)",
        )
        .bind(Uuid::new_v4().to_string())
        .bind(course_id)
        .bind(student_id)
        .bind(now)
        .execute(&self.db)
        .await
        .map_err(RollcallError::Database)?;

        Ok(())
    }

    /// Enroll a student in every existing course of a department
    ///
    /// Runs at student registration time.
    pub async fn enroll_in_department(
        &self,
        student_id: &str,
        department: &str,
        now: DateTime<Utc>,
    ) -> RollcallResult<usize> {
        let courses = self.list_by_department(department).await?;

        for course in &courses {
            self.ensure_enrolled(&course.id, student_id, now).await?;
        }

        Ok(courses.len())
    }

    /// Check whether an enrollment row exists for (course, student)
    pub async fn is_enrolled(&self, course_id: &str, student_id: &str) -> RollcallResult<bool> {
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

    /// List all enrollments for a course
    pub async fn list_enrollments(&self, course_id: &str) -> RollcallResult<Vec<Enrollment>> {
        sqlx::query_as::<_, Enrollment>(
            "SELECT id, course_id, student_id, enrolled_at
             FROM enrollment WHERE course_id = ?1 ORDER BY enrolled_at",
        )
        .bind(course_id)
        .fetch_all(&self.db)
        .await
        .map_err(RollcallError::Database)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_pool;

    async fn seed_teacher(pool: &SqlitePool, id: &str) {
        sqlx::query(
            "INSERT INTO account (id, email, password_hash, first_name, last_name, role, department, usn, created_at)
             VALUES (?1, ?2, 'x', 'T', 'Teach', 'teacher', 'CSE', NULL, ?3)",
        )
        .bind(id)
        .bind(format!("{}@example.edu", id))
        .bind(Utc::now())
        .execute(pool)
        .await
        .unwrap();
    }

    async fn seed_student(pool: &SqlitePool, id: &str) {
        sqlx::query(
            "INSERT INTO account (id, email, password_hash, first_name, last_name, role, department, usn, created_at)
             VALUES (?1, ?2, 'x', 'S', 'Stud', 'student', 'CSE', 'USN1', ?3)",
        )
        .bind(id)
        .bind(format!("{}@example.edu", id))
        .bind(Utc::now())
        .execute(pool)
        .await
        .unwrap();
    }

    #[tokio::test]
    async fn test_ensure_enrolled_is_idempotent() {
        let pool = test_pool().await;
        let mgr = CourseManager::new(pool.clone());
        let now = Utc::now();

        seed_teacher(&pool, "t1").await;
        seed_student(&pool, "s1").await;
        let course = mgr.create_course("Algorithms", "t1", "CSE", now).await.unwrap();

        mgr.ensure_enrolled(&course.id, "s1", now).await.unwrap();
        mgr.ensure_enrolled(&course.id, "s1", now).await.unwrap();

        let enrollments = mgr.list_enrollments(&course.id).await.unwrap();
        assert_eq!(enrollments.len(), 1);
        assert!(mgr.is_enrolled(&course.id, "s1").await.unwrap());
    }

    #[tokio::test]
    async fn test_enroll_in_department_covers_existing_courses() {
        let pool = test_pool().await;
        let mgr = CourseManager::new(pool.clone());
        let now = Utc::now();

        seed_teacher(&pool, "t1").await;
        seed_student(&pool, "s1").await;
        mgr.create_course("Algorithms", "t1", "CSE", now).await.unwrap();
        mgr.create_course("Databases", "t1", "CSE", now).await.unwrap();
        mgr.create_course("Thermodynamics", "t1", "MECH", now).await.unwrap();

        let enrolled = mgr.enroll_in_department("s1", "CSE", now).await.unwrap();
        assert_eq!(enrolled, 2);

        let cse = mgr.list_by_department("CSE").await.unwrap();
        for course in cse {
            assert!(mgr.is_enrolled(&course.id, "s1").await.unwrap());
        }
    }

    #[tokio::test]
    async fn test_teacher_scoped_lookup() {
        let pool = test_pool().await;
        let mgr = CourseManager::new(pool.clone());
        let now = Utc::now();

        seed_teacher(&pool, "t1").await;
        seed_teacher(&pool, "t2").await;
        let course = mgr.create_course("Algorithms", "t1", "CSE", now).await.unwrap();

        assert!(mgr.find_course_for_teacher(&course.id, "t1").await.unwrap().is_some());
        assert!(mgr.find_course_for_teacher(&course.id, "t2").await.unwrap().is_none());
    }
}
