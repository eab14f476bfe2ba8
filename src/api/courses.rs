/// Course listing endpoints
use crate::{
    auth::AuthContext,
    context::AppContext,
    course::StudentCourse,
    db::models::{Course, Role},
    error::RollcallResult,
};
use axum::{extract::State, routing::get, Json, Router};
use chrono::Utc;

/// Build course routes
pub fn routes() -> Router<AppContext> {
    Router::new()
        .route("/courses/teacher", get(teacher_courses))
        .route("/courses/student", get(student_courses))
}

/// Courses owned by the calling teacher
async fn teacher_courses(
    State(ctx): State<AppContext>,
    auth: AuthContext,
) -> RollcallResult<Json<Vec<Course>>> {
    auth.require_role(Role::Teacher)?;

    let courses = ctx.course_manager.list_for_teacher(&auth.account.id).await?;

    Ok(Json(courses))
}

/// Department courses for the calling student
///
/// Runs the ensure-enrolled pass so courses created after the student
/// registered gain an enrollment row before being listed.
async fn student_courses(
    State(ctx): State<AppContext>,
    auth: AuthContext,
) -> RollcallResult<Json<Vec<StudentCourse>>> {
    auth.require_role(Role::Student)?;

    let now = Utc::now();
    let courses = ctx
        .course_manager
        .list_by_department(&auth.account.department)
        .await?;

    let mut listed = Vec::with_capacity(courses.len());
    for course in courses {
        ctx.course_manager
            .ensure_enrolled(&course.id, &auth.account.id, now)
            .await?;
        listed.push(StudentCourse {
            course,
            enrolled: true,
        });
    }

    Ok(Json(listed))
}
