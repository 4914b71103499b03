use lazy_static::lazy_static;
use regex::Regex;

use crate::auth::dto::RegisterRequest;
use crate::auth::repo_types::Role;
use crate::error::AuthError;

pub(crate) fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

fn is_blank(v: Option<&str>) -> bool {
    v.map_or(true, |s| s.trim().is_empty())
}

pub(crate) fn require_credentials(email: &str, password: &str) -> Result<(), AuthError> {
    if email.trim().is_empty() || password.is_empty() {
        return Err(AuthError::validation("Please fill in the fields"));
    }
    Ok(())
}

/// Checks a registration form. Runs before any store call.
pub(crate) fn validate_registration(req: &RegisterRequest) -> Result<(), AuthError> {
    let role = req.role.unwrap_or_default();
    if req.email.trim().is_empty()
        || req.password.is_empty()
        || (role == Role::User
            && (is_blank(req.first_name.as_deref()) || is_blank(req.last_name.as_deref())))
    {
        return Err(AuthError::validation("Please fill all the required fields"));
    }
    if !is_valid_email(&req.email) {
        return Err(AuthError::validation("Invalid email"));
    }
    Ok(())
}
