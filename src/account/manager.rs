/// Account manager implementation using runtime queries
use crate::{
    account::{RegisterRequest, ValidatedSession},
    config::ServerConfig,
    db::models::{Account, Role, Session},
    error::{RollcallError, RollcallResult},
};
use argon2::{
    password_hash::{rand_core::OsRng as PasswordRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use chrono::{DateTime, Duration, Utc};
use sqlx::SqlitePool;
use std::sync::Arc;
use uuid::Uuid;

/// Account manager service
pub struct AccountManager {
    db: SqlitePool,
    config: Arc<ServerConfig>,
}

impl AccountManager {
    /// Create a new account manager
    pub fn new(db: SqlitePool, config: Arc<ServerConfig>) -> Self {
        Self { db, config }
    }

    /// Register a new account
    pub async fn create_account(
        &self,
        req: RegisterRequest,
        now: DateTime<Utc>,
    ) -> RollcallResult<Account> {
        self.validate_email(&req.email)?;

        if req.password.len() < 8 {
            return Err(RollcallError::Validation(
                "Password must be at least 8 characters".to_string(),
            ));
        }

        if req.department.trim().is_empty() {
            return Err(RollcallError::Validation(
                "Department cannot be empty".to_string(),
            ));
        }

        if self.email_exists(&req.email).await? {
            return Err(RollcallError::Conflict("Email already registered".to_string()));
        }

        let password_hash = hash_password(&req.password)?;

        let id = Uuid::new_v4().to_string();
        // Students without an external number get a generated one
        let usn = req.usn.unwrap_or_else(|| Uuid::new_v4().to_string());

        sqlx::query(
            "INSERT INTO account (id, email, password_hash, first_name, last_name, role, department, usn, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
        )
        .bind(&id)
        .bind(&req.email)
        .bind(&password_hash)
        .bind(&req.first_name)
        .bind(&req.last_name)
        .bind(req.role)
        .bind(&req.department)
        .bind(&usn)
        .bind(now)
        .execute(&self.db)
        .await
        .map_err(RollcallError::Database)?;

        Ok(Account {
            id,
            email: req.email,
            password_hash,
            first_name: req.first_name,
            last_name: req.last_name,
            role: req.role,
            department: req.department,
            usn: Some(usn),
            created_at: now,
        })
    }

    /// Authenticate an account and create a fresh session
    pub async fn login(
        &self,
        email: &str,
        password: &str,
        now: DateTime<Utc>,
    ) -> RollcallResult<(Account, Session)> {
        let account = self
            .get_account_by_email(email)
            .await?
            .ok_or_else(|| RollcallError::Authentication("Invalid credentials".to_string()))?;

        if !verify_password(password, &account.password_hash)? {
            return Err(RollcallError::Authentication("Invalid credentials".to_string()));
        }

        let session = self.create_session(&account.id, now).await?;

        Ok((account, session))
    }

    /// Create a session for an account, replacing any previous live session
    pub async fn create_session(
        &self,
        account_id: &str,
        now: DateTime<Utc>,
    ) -> RollcallResult<Session> {
        let session_id = Uuid::new_v4().to_string();
        let token = generate_token();
        let expires_at = now + Duration::hours(self.config.authentication.session_ttl_hours);

        // At most one live token per account
        sqlx::query("DELETE FROM session WHERE account_id = ?1")
            .bind(account_id)
            .execute(&self.db)
            .await
            .map_err(RollcallError::Database)?;

        sqlx::query(
            "INSERT INTO session (id, account_id, token, created_at, expires_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
        )
        .bind(&session_id)
        .bind(account_id)
        .bind(&token)
        .bind(now)
        .bind(expires_at)
        .execute(&self.db)
        .await
        .map_err(RollcallError::Database)?;

        Ok(Session {
            id: session_id,
            account_id: account_id.to_string(),
            token,
            created_at: now,
            expires_at,
        })
    }

    /// Resolve a bearer token to a session, rejecting expired ones
    pub async fn validate_token(
        &self,
        token: &str,
        now: DateTime<Utc>,
    ) -> RollcallResult<ValidatedSession> {
        let session = sqlx::query_as::<_, Session>(
            "SELECT id, account_id, token, created_at, expires_at FROM session WHERE token = ?1",
        )
        .bind(token)
        .fetch_optional(&self.db)
        .await
        .map_err(RollcallError::Database)?
        .ok_or_else(|| RollcallError::Authentication("Invalid token".to_string()))?;

        if now > session.expires_at {
            return Err(RollcallError::Authentication("Session expired".to_string()));
        }

        Ok(ValidatedSession {
            account_id: session.account_id,
            session_id: session.id,
        })
    }

    /// Delete a session (logout)
    pub async fn delete_session(&self, session_id: &str) -> RollcallResult<()> {
        sqlx::query("DELETE FROM session WHERE id = ?1")
            .bind(session_id)
            .execute(&self.db)
            .await
            .map_err(RollcallError::Database)?;

        Ok(())
    }

    /// Fetch an account by id
    pub async fn get_account(&self, account_id: &str) -> RollcallResult<Account> {
        sqlx::query_as::<_, Account>(
            "SELECT id, email, password_hash, first_name, last_name, role, department, usn, created_at
             FROM account WHERE id = ?1",
        )
        .bind(account_id)
        .fetch_optional(&self.db)
        .await
        .map_err(RollcallError::Database)?
        .ok_or_else(|| RollcallError::NotFound(format!("Account {}", account_id)))
    }

    /// Fetch an account by email
    pub async fn get_account_by_email(&self, email: &str) -> RollcallResult<Option<Account>> {
        sqlx::query_as::<_, Account>(
            "SELECT id, email, password_hash, first_name, last_name, role, department, usn, created_at
             FROM account WHERE email = ?1",
        )
        .bind(email)
        .fetch_optional(&self.db)
        .await
        .map_err(RollcallError::Database)
    }

    async fn email_exists(&self, email: &str) -> RollcallResult<bool> {
        let row: Option<(i64,)> = sqlx::query_as("SELECT 1 FROM account WHERE email = ?1")
            .bind(email)
            .fetch_optional(&self.db)
            .await
            .map_err(RollcallError::Database)?;

        Ok(row.is_some())
    }

    fn validate_email(&self, email: &str) -> RollcallResult<()> {
        let valid = email.contains('@')
            && !email.starts_with('@')
            && !email.ends_with('@')
            && !email.contains(char::is_whitespace);

        if !valid {
            return Err(RollcallError::Validation(format!(
                "Invalid email address: {}",
                email
            )));
        }

        Ok(())
    }
}

/// Hash a password with Argon2id
fn hash_password(password: &str) -> RollcallResult<String> {
    let salt = SaltString::generate(&mut PasswordRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|h| h.to_string())
        .map_err(|e| RollcallError::Internal(format!("Password hashing failed: {}", e)))
}

/// Verify a password against an Argon2id hash
fn verify_password(password: &str, hash: &str) -> RollcallResult<bool> {
    let parsed = PasswordHash::new(hash)
        .map_err(|e| RollcallError::Internal(format!("Malformed password hash: {}", e)))?;

    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok())
}

/// Generate an opaque bearer token (32 random bytes, hex-encoded)
fn generate_token() -> String {
    use rand::RngCore;
    let mut buf = [0u8; 32];
    rand::rngs::OsRng.fill_bytes(&mut buf);
    hex::encode(buf)
}
