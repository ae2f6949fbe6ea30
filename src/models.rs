use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

use crate::model::role::Role;
use crate::model::user::{Gender, UserProfile};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Claims {
    pub user_id: u64,
    pub email: String,
    pub role: Role,
    pub iat: usize,
    pub exp: usize,
    pub jti: String,
}

#[derive(Deserialize, Validate, ToSchema)]
pub struct LoginReqDto {
    #[validate(custom(
        function = "crate::utils::validation::not_blank",
        message = "Email and password are required"
    ))]
    #[schema(example = "admin@company.com")]
    pub email: String,
    #[validate(length(min = 1, message = "Email and password are required"))]
    #[schema(example = "admin123")]
    pub password: String,
}

#[derive(Deserialize, Validate, ToSchema)]
pub struct RegisterReq {
    #[validate(custom(
        function = "crate::utils::validation::not_blank",
        message = "Name, email, password and department are required"
    ))]
    #[schema(example = "Asha Patel")]
    pub name: String,
    #[validate(email(message = "Please provide a valid email address"))]
    #[schema(example = "asha@company.com")]
    pub email: String,
    #[validate(length(min = 6, message = "Password must be at least 6 characters long"))]
    #[schema(example = "secret1")]
    pub password: String,
    #[validate(custom(
        function = "crate::utils::validation::not_blank",
        message = "Name, email, password and department are required"
    ))]
    #[schema(example = "Engineering")]
    pub department: String,
    pub gender: Option<Gender>,
}

#[derive(Serialize, ToSchema)]
pub struct AuthResponse {
    #[schema(example = "Login successful")]
    pub message: String,
    pub token: String,
    pub user: UserProfile,
}

#[derive(Deserialize, Validate, ToSchema)]
pub struct UpdateProfileReq {
    #[validate(custom(
        function = "crate::utils::validation::not_blank",
        message = "Name cannot be empty"
    ))]
    pub name: Option<String>,
    #[validate(custom(
        function = "crate::utils::validation::not_blank",
        message = "Department cannot be empty"
    ))]
    pub department: Option<String>,
}

#[derive(Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ChangePasswordReq {
    #[validate(length(min = 1, message = "Current password and new password are required"))]
    pub current_password: String,
    #[validate(length(min = 6, message = "Password must be at least 6 characters long"))]
    pub new_password: String,
    pub confirm_password: String,
}

#[derive(Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ChangeEmailReq {
    #[validate(email(message = "Please provide a valid email address"))]
    #[schema(example = "asha.patel@company.com")]
    pub new_email: String,
    /// Current password, re-checked before the change
    #[validate(length(min = 1, message = "Password is required"))]
    pub password: String,
}

#[derive(Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ChangeEmailResponse {
    #[schema(example = "Email changed successfully")]
    pub message: String,
    pub new_email: String,
}

#[derive(Serialize, ToSchema)]
pub struct MessageResponse {
    #[schema(example = "Logged out successfully")]
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}
