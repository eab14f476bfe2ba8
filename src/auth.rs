/// Authentication extractor and utilities
///
/// Every protected operation receives an opaque bearer token, resolved to an
/// account through the session store. Absence or non-resolution is an
/// authentication failure; role mismatches are authorization failures.
use crate::{
    context::AppContext,
    db::models::{Account, Role},
    error::{RollcallError, RollcallResult},
};
use axum::{async_trait, extract::FromRequestParts, http::request::Parts, http::HeaderMap};
use chrono::Utc;

/// Authenticated context - extracts and validates the session from a request
#[derive(Debug, Clone)]
pub struct AuthContext {
    pub account: Account,
    pub session_id: String,
}

impl AuthContext {
    /// Reject callers without the given role
    pub fn require_role(&self, role: Role) -> RollcallResult<()> {
        if self.account.role != role {
            return Err(RollcallError::Authorization(format!(
                "Requires {} role",
                role.as_str()
            )));
        }

        Ok(())
    }
}

#[async_trait]
impl FromRequestParts<AppContext> for AuthContext {
    type Rejection = RollcallError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppContext,
    ) -> Result<Self, Self::Rejection> {
        let token = extract_bearer_token(&parts.headers).ok_or_else(|| {
            RollcallError::Authentication("Missing authorization header".to_string())
        })?;

        let validated = state
            .account_manager
            .validate_token(&token, Utc::now())
            .await?;

        let account = state
            .account_manager
            .get_account(&validated.account_id)
            .await?;

        Ok(AuthContext {
            account,
            session_id: validated.session_id,
        })
    }
}

/// Extract bearer token from Authorization header
pub fn extract_bearer_token(headers: &HeaderMap) -> Option<String> {
    headers
        .get("authorization")
        .and_then(|h| h.to_str().ok())
        .and_then(|s| s.strip_prefix("Bearer "))
        .map(|s| s.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_extract_bearer_token() {
        let mut headers = HeaderMap::new();
        headers.insert("authorization", HeaderValue::from_static("Bearer abc123"));
        assert_eq!(extract_bearer_token(&headers), Some("abc123".to_string()));
    }

    #[test]
    fn test_extract_bearer_token_wrong_scheme() {
        let mut headers = HeaderMap::new();
        headers.insert("authorization", HeaderValue::from_static("Basic abc123"));
        assert_eq!(extract_bearer_token(&headers), None);
        assert_eq!(extract_bearer_token(&HeaderMap::new()), None);
    }
}
