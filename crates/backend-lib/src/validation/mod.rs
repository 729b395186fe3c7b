// ============================
// crates/backend-lib/src/validation/mod.rs
// ============================
//! Request validation at the HTTP boundary.

use crate::error::AppError;
use pushrelay_common::{RegisterRequest, Subscription};
use regex::Regex;
use std::sync::LazyLock;
use thiserror::Error;
use url::Url;

const MAX_USERNAME_LENGTH: usize = 64;
const MAX_EMAIL_LENGTH: usize = 254; // RFC 5321 SMTP limit
const MAX_PASSWORD_LENGTH: usize = 128;
const MAX_ENDPOINT_LENGTH: usize = 2048;

static EMAIL_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").expect("valid email regex"));

/// Possible validation errors
#[derive(Error, Debug, PartialEq, Eq)]
pub enum ValidationError {
    #[error("missing field: {0}")]
    Missing(&'static str),

    #[error("{field} must be at most {max} characters")]
    TooLong { field: &'static str, max: usize },

    #[error("invalid email: {0}")]
    InvalidEmail(String),

    #[error("invalid subscription: {0}")]
    InvalidSubscription(String),

    #[error("invalid user id: {0}")]
    InvalidUserId(String),
}

impl From<ValidationError> for AppError {
    fn from(err: ValidationError) -> Self {
        AppError::InvalidInput(err.to_string())
    }
}

/// Result type for validation operations
pub type ValidationResult<T> = Result<T, ValidationError>;

fn required<'a>(field: &'static str, value: &'a str, max: usize) -> ValidationResult<&'a str> {
    let value = value.trim();
    if value.is_empty() {
        return Err(ValidationError::Missing(field));
    }
    if value.chars().count() > max {
        return Err(ValidationError::TooLong { field, max });
    }
    Ok(value)
}

/// Validate a username
pub fn validate_username(username: &str) -> ValidationResult<&str> {
    required("username", username, MAX_USERNAME_LENGTH)
}

/// Validate an email address
pub fn validate_email(email: &str) -> ValidationResult<&str> {
    let email = required("email", email, MAX_EMAIL_LENGTH)?;
    if !EMAIL_REGEX.is_match(email) {
        return Err(ValidationError::InvalidEmail(email.to_string()));
    }
    Ok(email)
}

/// Validate a password. Only presence and length are enforced.
pub fn validate_password(password: &str) -> ValidationResult<()> {
    if password.is_empty() {
        return Err(ValidationError::Missing("password"));
    }
    if password.chars().count() > MAX_PASSWORD_LENGTH {
        return Err(ValidationError::TooLong {
            field: "password",
            max: MAX_PASSWORD_LENGTH,
        });
    }
    Ok(())
}

/// Validated registration fields, trimmed
#[derive(Debug)]
pub struct Registration<'a> {
    pub username: &'a str,
    pub email: &'a str,
}

pub fn validate_registration(req: &RegisterRequest) -> ValidationResult<Registration<'_>> {
    let username = validate_username(&req.username)?;
    let email = validate_email(&req.email)?;
    validate_password(&req.password)?;
    Ok(Registration { username, email })
}

/// A subscription must at least carry an absolute http(s) endpoint
pub fn validate_subscription(sub: Option<&Subscription>) -> ValidationResult<&Subscription> {
    let sub = sub.ok_or(ValidationError::Missing("subscription"))?;
    let endpoint = sub.endpoint.trim();
    if endpoint.is_empty() {
        return Err(ValidationError::Missing("subscription.endpoint"));
    }
    if endpoint.len() > MAX_ENDPOINT_LENGTH {
        return Err(ValidationError::TooLong {
            field: "subscription.endpoint",
            max: MAX_ENDPOINT_LENGTH,
        });
    }
    let url = Url::parse(endpoint)
        .map_err(|e| ValidationError::InvalidSubscription(format!("endpoint: {e}")))?;
    if url.scheme() != "https" && url.scheme() != "http" {
        return Err(ValidationError::InvalidSubscription(format!(
            "unsupported endpoint scheme {}",
            url.scheme()
        )));
    }
    Ok(sub)
}

/// Parse a user id path segment
pub fn parse_user_id(raw: &str) -> ValidationResult<uuid::Uuid> {
    uuid::Uuid::parse_str(raw.trim()).map_err(|_| ValidationError::InvalidUserId(raw.to_string()))
}
