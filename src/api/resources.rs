/// Course resource upload, listing, and deletion endpoints
use crate::{
    auth::AuthContext,
    context::AppContext,
    db::models::{Resource, Role},
    error::{RollcallError, RollcallResult},
};
use axum::{
    body::Bytes,
    extract::{Path, State},
    http::HeaderMap,
    routing::{get, post},
    Json, Router,
};
use chrono::Utc;

/// Build resource routes
///
/// The second path segment is a filename on upload and a resource id on
/// delete, so both methods share one route.
pub fn routes() -> Router<AppContext> {
    Router::new()
        .route("/resources/:course_id", get(list_resources))
        .route(
            "/resources/:course_id/:item",
            post(upload_resource).delete(delete_resource),
        )
}

/// Upload a resource file for a course
///
/// Accepts the raw file in the request body with a Content-Type header.
async fn upload_resource(
    State(ctx): State<AppContext>,
    Path((course_id, filename)): Path<(String, String)>,
    auth: AuthContext,
    headers: HeaderMap,
    body: Bytes,
) -> RollcallResult<Json<Resource>> {
    auth.require_role(Role::Teacher)?;
    require_owned_course(&ctx, &course_id, &auth.account.id).await?;

    let mime_type = headers
        .get("content-type")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("application/octet-stream");

    let resource = ctx
        .blob_store
        .store_resource(
            &course_id,
            &filename,
            mime_type,
            body.to_vec(),
            &auth.account.id,
            Utc::now(),
        )
        .await?;

    Ok(Json(resource))
}

/// List resources for a course
///
/// Teachers must own the course; students must be in its department.
async fn list_resources(
    State(ctx): State<AppContext>,
    Path(course_id): Path<String>,
    auth: AuthContext,
) -> RollcallResult<Json<Vec<Resource>>> {
    match auth.account.role {
        Role::Teacher => {
            require_owned_course(&ctx, &course_id, &auth.account.id).await?;
        }
        Role::Student => {
            let course = ctx
                .course_manager
                .find_course(&course_id)
                .await?
                .ok_or_else(|| RollcallError::CourseNotFound(course_id.clone()))?;
            if course.department != auth.account.department {
                return Err(RollcallError::CourseNotFound(course_id.clone()));
            }
        }
    }

    let resources = ctx.blob_store.list_resources(&course_id).await?;

    Ok(Json(resources))
}

/// Delete a resource
async fn delete_resource(
    State(ctx): State<AppContext>,
    Path((course_id, resource_id)): Path<(String, String)>,
    auth: AuthContext,
) -> RollcallResult<Json<serde_json::Value>> {
    auth.require_role(Role::Teacher)?;
    require_owned_course(&ctx, &course_id, &auth.account.id).await?;

    ctx.blob_store.delete_resource(&course_id, &resource_id).await?;

    Ok(Json(serde_json::json!({
        "message": "Resource deleted successfully"
    })))
}

async fn require_owned_course(
    ctx: &AppContext,
    course_id: &str,
    teacher_id: &str,
) -> RollcallResult<()> {
    ctx.course_manager
        .find_course_for_teacher(course_id, teacher_id)
        .await?
        .ok_or_else(|| RollcallError::CourseNotFound(course_id.to_string()))?;

    Ok(())
}
