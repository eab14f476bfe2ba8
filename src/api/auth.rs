/// Registration, login, and session endpoints
use crate::{
    account::{LoginRequest, LoginResponse, RegisterRequest, UserSummary},
    auth::AuthContext,
    context::AppContext,
    db::models::Role,
    error::RollcallResult,
};
use axum::{
    extract::State,
    routing::{get, post},
    Json, Router,
};
use chrono::Utc;

/// Build auth routes
pub fn routes() -> Router<AppContext> {
    Router::new()
        .route("/auth/register", post(register))
        .route("/auth/login", post(login))
        .route("/auth/logout", post(logout))
        .route("/auth/session", get(get_session))
}

/// Register endpoint
///
/// A new teacher gets a course auto-created in their department; a new
/// student is enrolled in every existing course of theirs.
async fn register(
    State(ctx): State<AppContext>,
    Json(req): Json<RegisterRequest>,
) -> RollcallResult<Json<serde_json::Value>> {
    let now = Utc::now();

    let account = ctx.account_manager.create_account(req, now).await?;
    tracing::info!(account_id = %account.id, role = account.role.as_str(), "account registered");

    match account.role {
        Role::Teacher => {
            ctx.course_manager
                .create_course(
                    &format!("Course for {}", account.full_name()),
                    &account.id,
                    &account.department,
                    now,
                )
                .await?;
        }
        Role::Student => {
            let enrolled = ctx
                .course_manager
                .enroll_in_department(&account.id, &account.department, now)
                .await?;
            tracing::debug!(account_id = %account.id, enrolled, "department enrollment complete");
        }
    }

    Ok(Json(serde_json::json!({
        "message": "User registered successfully"
    })))
}

/// Login endpoint
async fn login(
    State(ctx): State<AppContext>,
    Json(req): Json<LoginRequest>,
) -> RollcallResult<Json<LoginResponse>> {
    let (account, session) = ctx
        .account_manager
        .login(&req.email, &req.password, Utc::now())
        .await?;

    Ok(Json(LoginResponse {
        token: session.token,
        user: UserSummary::from(&account),
    }))
}

/// Logout endpoint
async fn logout(
    State(ctx): State<AppContext>,
    auth: AuthContext,
) -> RollcallResult<Json<serde_json::Value>> {
    ctx.account_manager.delete_session(&auth.session_id).await?;

    Ok(Json(serde_json::json!({})))
}

/// Current session info endpoint
async fn get_session(auth: AuthContext) -> Json<UserSummary> {
    Json(UserSummary::from(&auth.account))
}
