//! Authentication service implementation
//!
//! This service handles account signup and login, password hashing, and the
//! issuing and validation of session tokens. The decoded identity travels with
//! each request through the axum extractors in `middleware::auth`.

use std::sync::Arc;
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use uuid::Uuid;
use crate::config::AuthConfig;
use crate::database::UserStore;
use crate::middleware::rate_limit::LoginRateLimiter;
use crate::models::user::{AuthResponse, LoginRequest, NewUser, Role, SignupRequest, User};
use crate::utils::errors::{EventHubError, Result};
use crate::utils::helpers::{is_valid_email, normalize_email};
use crate::utils::logging::log_user_action;

/// Minimum password length accepted at signup
pub const MIN_PASSWORD_CHARS: usize = 8;

const INVALID_CREDENTIALS: &str = "Invalid email or password";

/// Session token claims
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,
    pub role: Role,
    pub name: String,
    pub iat: i64,
    pub exp: i64,
}

#[derive(Clone)]
pub struct AuthService {
    config: AuthConfig,
    users: Arc<dyn UserStore>,
    limiter: LoginRateLimiter,
}

impl AuthService {
    pub fn new(config: AuthConfig, users: Arc<dyn UserStore>) -> Self {
        let limiter = LoginRateLimiter::new(config.login_attempts_per_minute);
        Self { config, users, limiter }
    }

    /// Register a new account and sign it in
    pub async fn signup(&self, request: SignupRequest) -> Result<AuthResponse> {
        let name = request.name.trim().to_string();
        if name.is_empty() {
            return Err(EventHubError::validation("name", "name is required"));
        }
        let email = normalize_email(&request.email);
        if !is_valid_email(&email) {
            return Err(EventHubError::validation("email", "email must be a valid address"));
        }
        if request.password.chars().count() < MIN_PASSWORD_CHARS {
            return Err(EventHubError::validation(
                "password",
                format!("password must be at least {} characters", MIN_PASSWORD_CHARS),
            ));
        }

        let role = match (&self.config.staff_invite_code, request.staff_code.as_deref()) {
            (Some(invite), Some(code)) if !invite.is_empty() && invite == code.trim() => Role::Staff,
            _ => Role::User,
        };

        let user = self
            .users
            .create(NewUser {
                name,
                email,
                password_hash: hash_password(&request.password)?,
                role,
            })
            .await?;

        log_user_action(user.id, "signup", Some(user.role.as_str()));
        let token = self.issue_token(&user)?;
        Ok(AuthResponse { token, user })
    }

    /// Verify credentials and issue a token
    pub async fn login(&self, request: LoginRequest) -> Result<AuthResponse> {
        let email = normalize_email(&request.email);
        self.limiter.check(&email)?;

        let user = match self.users.find_by_email(&email).await? {
            Some(user) if verify_password(&request.password, &user.password_hash) => user,
            _ => {
                debug!("Login rejected");
                return Err(EventHubError::Unauthorized(INVALID_CREDENTIALS.to_string()));
            }
        };

        log_user_action(user.id, "login", None);
        let token = self.issue_token(&user)?;
        Ok(AuthResponse { token, user })
    }

    /// Current account of an authenticated caller
    pub async fn me(&self, user_id: Uuid) -> Result<User> {
        self.users
            .find_by_id(user_id)
            .await?
            .ok_or(EventHubError::UserNotFound(user_id))
    }

    /// Create a signed token for a user
    pub fn issue_token(&self, user: &User) -> Result<String> {
        let now = Utc::now();
        let claims = Claims {
            sub: user.id,
            role: user.role,
            name: user.name.clone(),
            iat: now.timestamp(),
            exp: (now + Duration::hours(self.config.token_ttl_hours)).timestamp(),
        };

        let token = encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.config.jwt_secret.as_bytes()),
        )?;
        info!(user_id = %user.id, role = %user.role, "Issued session token");
        Ok(token)
    }

    /// Validate a token and return its claims
    pub fn validate_token(&self, token: &str) -> Result<Claims> {
        let data = decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.config.jwt_secret.as_bytes()),
            &Validation::default(),
        )?;
        Ok(data.claims)
    }
}

fn hash_password(password: &str) -> Result<String> {
    let salt = SaltString::encode_b64(Uuid::new_v4().as_bytes())
        .map_err(|e| EventHubError::Internal(format!("Failed to build salt: {}", e)))?;
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| EventHubError::Internal(format!("Failed to hash password: {}", e)))
}

fn verify_password(password: &str, stored: &str) -> bool {
    match PasswordHash::new(stored) {
        Ok(parsed) => Argon2::default().verify_password(password.as_bytes(), &parsed).is_ok(),
        Err(_) => false,
    }
}
