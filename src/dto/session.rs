//! Session bodies.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

use crate::dto::validation::validate_username;

/// Credentials of the user signing in on this device.
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct SignInRequest {
    /// Name shown on the site.
    #[validate(custom(function = "validate_username"))]
    pub username: String,
    /// Token issued by the identity provider; opaque here.
    #[validate(length(min = 1, max = 4096))]
    pub token: String,
}

/// Current session as seen by the backend. The token is never echoed back.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SessionResponse {
    /// Whether a session is open.
    pub signed_in: bool,
    /// Signed-in user.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
}

impl SessionResponse {
    /// Open session of `username`.
    pub fn signed_in(username: String) -> Self {
        Self {
            signed_in: true,
            username: Some(username),
        }
    }

    /// No session.
    pub fn signed_out() -> Self {
        Self {
            signed_in: false,
            username: None,
        }
    }
}
