use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{
    repo_types::{Role, User},
    services::is_valid_email,
};

/// Request body for user registration. Self-registered accounts are always patients.
#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
    pub name: String,
}

/// Request body for editing the current account.
#[derive(Debug, Deserialize)]
pub struct UpdateProfileRequest {
    pub email: String,
    pub name: String,
}

impl UpdateProfileRequest {
    /// Trims both fields, lowercases the email and checks them.
    pub fn validate(mut self) -> Result<Self, String> {
        self.email = self.email.trim().to_lowercase();
        self.name = self.name.trim().to_string();
        if !is_valid_email(&self.email) {
            return Err("Invalid email".into());
        }
        if self.name.is_empty() {
            return Err("Name is required".into());
        }
        Ok(self)
    }
}

/// Request body for login.
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Request body for token refresh.
#[derive(Debug, Deserialize)]
pub struct RefreshRequest {
    pub refresh_token: String,
}

/// Response returned after login, register or refresh.
#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub access_token: String,
    pub refresh_token: String,
    pub user: PublicUser,
}

/// Public part of the user returned to the client.
#[derive(Debug, Serialize)]
pub struct PublicUser {
    pub id: Uuid,
    pub email: String,
    pub name: String,
    pub role: Role,
}

impl PublicUser {
    pub fn new(user: User, role: Role) -> Self {
        Self {
            id: user.id,
            email: user.email,
            name: user.name,
            role,
        }
    }
}
