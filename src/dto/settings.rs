//! Settings bodies.

use serde::Serialize;
use utoipa::ToSchema;

use crate::{
    dao::models::Settings,
    services::settings_service::{ResolvedSettings, SettingsProvider},
};

/// Settings currently in effect and where they were read from.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SettingsView {
    /// Values in effect.
    #[serde(flatten)]
    pub settings: Settings,
    /// `remote`, `cache` or `defaults`.
    pub source: String,
}

impl From<ResolvedSettings> for SettingsView {
    fn from(resolved: ResolvedSettings) -> Self {
        Self {
            settings: resolved.settings,
            source: resolved.provider.name().to_string(),
        }
    }
}

impl SettingsView {
    /// View of the built-in defaults.
    pub fn defaults(settings: Settings) -> Self {
        Self {
            settings,
            source: SettingsProvider::Defaults.name().to_string(),
        }
    }
}

/// Outcome of a settings update.
#[derive(Debug, Serialize, ToSchema)]
pub struct SettingsUpdateResponse {
    /// Whether the settings were saved remotely.
    pub success: bool,
    /// Outcome description.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// Saved values, on success.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub settings: Option<Settings>,
}

impl SettingsUpdateResponse {
    /// Settings were persisted.
    pub fn saved(settings: Settings) -> Self {
        Self {
            success: true,
            message: Some("Settings saved successfully".into()),
            settings: Some(settings),
        }
    }

    /// Settings were rejected or could not be saved.
    pub fn failed(message: String) -> Self {
        Self {
            success: false,
            message: Some(message),
            settings: None,
        }
    }
}
