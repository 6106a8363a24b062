//! Model provider records and request payloads.

use crate::error::{KbError, Result};
use crate::fields::{check_len, check_max};
use crate::model::ModelType;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

pub const API_KEY_MAX: usize = 1000;
pub const API_BASE_URL_MAX: usize = 500;
pub const DESCRIPTION_MAX: usize = 1000;

/// Supported AI platforms.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Platform {
    Deepseek,
    AlibabaTongyi,
    VolcanoArk,
}

impl Platform {
    pub const ALL: [Platform; 3] = [
        Platform::Deepseek,
        Platform::AlibabaTongyi,
        Platform::VolcanoArk,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Platform::Deepseek => "DEEPSEEK",
            Platform::AlibabaTongyi => "ALIBABA_TONGYI",
            Platform::VolcanoArk => "VOLCANO_ARK",
        }
    }

    /// Parse a platform name, ignoring ASCII case.
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|p| p.as_str().eq_ignore_ascii_case(s.trim()))
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A stored model provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelProvider {
    pub id: String,
    pub platform: Platform,
    pub api_key: String,
    pub api_base_url: Option<String>,
    pub description: Option<String>,
    /// Free-form platform settings; always a JSON object when present.
    pub config: Option<Value>,
    /// Distinct types of the live models the creator added to this provider.
    #[serde(default)]
    pub model_types: Vec<ModelType>,
    pub creator_id: String,
    pub create_time: DateTime<Utc>,
    pub updater_id: Option<String>,
    pub update_time: Option<DateTime<Utc>>,
    pub deleted: bool,
}

impl ModelProvider {
    /// The API key with all but its last four characters hidden.
    pub fn masked_api_key(&self) -> String {
        let chars: Vec<char> = self.api_key.chars().collect();
        if chars.len() <= 4 {
            return "*".repeat(chars.len());
        }
        let tail: String = chars[chars.len() - 4..].iter().collect();
        format!("{}{}", "*".repeat(chars.len() - 4), tail)
    }
}

/// Payload for registering a provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreateModelProvider {
    pub platform: Platform,
    pub api_key: String,
    pub api_base_url: Option<String>,
    pub description: Option<String>,
    pub config: Option<Value>,
}

impl CreateModelProvider {
    pub fn validate(&self) -> Result<()> {
        check_len("api_key", &self.api_key, 1, API_KEY_MAX)?;
        check_max("api_base_url", self.api_base_url.as_deref(), API_BASE_URL_MAX)?;
        check_max("description", self.description.as_deref(), DESCRIPTION_MAX)?;
        check_config(self.config.as_ref())
    }
}

/// Partial update of a provider. The platform cannot change.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UpdateModelProvider {
    pub api_key: Option<String>,
    pub api_base_url: Option<Option<String>>,
    pub description: Option<Option<String>>,
    pub config: Option<Option<Value>>,
}

impl UpdateModelProvider {
    pub fn validate(&self) -> Result<()> {
        if let Some(api_key) = &self.api_key {
            check_len("api_key", api_key, 1, API_KEY_MAX)?;
        }
        if let Some(url) = &self.api_base_url {
            check_max("api_base_url", url.as_deref(), API_BASE_URL_MAX)?;
        }
        if let Some(description) = &self.description {
            check_max("description", description.as_deref(), DESCRIPTION_MAX)?;
        }
        if let Some(config) = &self.config {
            check_config(config.as_ref())?;
        }
        Ok(())
    }

    /// Whether the patch changes nothing.
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    pub(crate) fn apply(self, provider: &mut ModelProvider) {
        if let Some(api_key) = self.api_key {
            provider.api_key = api_key;
        }
        if let Some(url) = self.api_base_url {
            provider.api_base_url = url;
        }
        if let Some(description) = self.description {
            provider.description = description;
        }
        if let Some(config) = self.config {
            provider.config = config;
        }
    }
}

fn check_config(config: Option<&Value>) -> Result<()> {
    match config {
        None | Some(Value::Null) | Some(Value::Object(_)) => Ok(()),
        Some(_) => Err(KbError::ValidationError(
            "config must be a JSON object".to_string(),
        )),
    }
}
