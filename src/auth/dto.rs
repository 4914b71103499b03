use serde::{Deserialize, Serialize};

use crate::auth::repo_types::{Principal, Role};

/// Request body for user registration.
#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub role: Option<Role>,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
}

/// Request body for login.
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Request body for the email-only password reset.
#[derive(Debug, Deserialize)]
pub struct PasswordResetRequest {
    pub email: String,
    pub new_password: String,
}

/// Request body for changing the signed-in user's password.
#[derive(Debug, Deserialize)]
pub struct UpdatePasswordRequest {
    pub new_password: String,
}

/// Response returned after login or register.
#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub user: Principal,
    /// Where the client should land next, by role.
    pub redirect_to: &'static str,
}
