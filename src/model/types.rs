//! Model records and request payloads.

use crate::error::{KbError, Result};
use crate::fields::check_len;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

pub const NAME_MAX: usize = 255;
pub const PROVIDER_ID_MAX: usize = 64;

/// What a model does.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ModelType {
    #[serde(rename = "LLM")]
    Llm,
    #[serde(rename = "TEXT_EMBEDDING")]
    TextEmbedding,
    #[serde(rename = "RERANK")]
    Rerank,
    #[serde(rename = "SPEECH2TEXT")]
    Speech2Text,
    #[serde(rename = "TTS")]
    Tts,
}

impl ModelType {
    pub const ALL: [ModelType; 5] = [
        ModelType::Llm,
        ModelType::TextEmbedding,
        ModelType::Rerank,
        ModelType::Speech2Text,
        ModelType::Tts,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ModelType::Llm => "LLM",
            ModelType::TextEmbedding => "TEXT_EMBEDDING",
            ModelType::Rerank => "RERANK",
            ModelType::Speech2Text => "SPEECH2TEXT",
            ModelType::Tts => "TTS",
        }
    }

    /// Parse a type name, ignoring ASCII case.
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|t| t.as_str().eq_ignore_ascii_case(s.trim()))
    }
}

impl fmt::Display for ModelType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A stored model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Model {
    pub id: String,
    pub provider_id: String,
    pub name: String,
    pub model_type: ModelType,
    pub context_length: Option<u32>,
    pub creator_id: String,
    pub create_time: DateTime<Utc>,
    pub updater_id: Option<String>,
    pub update_time: Option<DateTime<Utc>>,
    pub deleted: bool,
}

/// Payload for adding a model to a provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreateModel {
    pub provider_id: String,
    pub name: String,
    pub model_type: ModelType,
    pub context_length: Option<u32>,
}

impl CreateModel {
    pub fn validate(&self) -> Result<()> {
        check_len("provider_id", &self.provider_id, 1, PROVIDER_ID_MAX)?;
        check_len("name", &self.name, 1, NAME_MAX)?;
        check_context_length(self.context_length)
    }
}

/// Partial update of a model.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UpdateModel {
    pub provider_id: Option<String>,
    pub name: Option<String>,
    pub model_type: Option<ModelType>,
    pub context_length: Option<Option<u32>>,
}

impl UpdateModel {
    pub fn validate(&self) -> Result<()> {
        if let Some(provider_id) = &self.provider_id {
            check_len("provider_id", provider_id, 1, PROVIDER_ID_MAX)?;
        }
        if let Some(name) = &self.name {
            check_len("name", name, 1, NAME_MAX)?;
        }
        if let Some(context_length) = self.context_length {
            check_context_length(context_length)?;
        }
        Ok(())
    }

    /// Whether the patch changes nothing.
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    pub(crate) fn apply(self, model: &mut Model) {
        if let Some(provider_id) = self.provider_id {
            model.provider_id = provider_id;
        }
        if let Some(name) = self.name {
            model.name = name;
        }
        if let Some(model_type) = self.model_type {
            model.model_type = model_type;
        }
        if let Some(context_length) = self.context_length {
            model.context_length = context_length;
        }
    }
}

fn check_context_length(value: Option<u32>) -> Result<()> {
    if value == Some(0) {
        return Err(KbError::ValidationError(
            "context_length must be a positive integer".to_string(),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create(name: &str) -> CreateModel {
        CreateModel {
            provider_id: "p-1".to_string(),
            name: name.to_string(),
            model_type: ModelType::Llm,
            context_length: Some(65536),
        }
    }

    #[test]
    fn test_model_type_names() {
        assert_eq!(ModelType::from_str("llm"), Some(ModelType::Llm));
        assert_eq!(ModelType::from_str("TEXT_EMBEDDING"), Some(ModelType::TextEmbedding));
        assert_eq!(ModelType::from_str("speech2text"), Some(ModelType::Speech2Text));
        assert_eq!(ModelType::from_str("IMAGE"), None);

        assert_eq!(
            serde_json::to_string(&ModelType::Speech2Text).unwrap(),
            "\"SPEECH2TEXT\""
        );
        assert_eq!(ModelType::Tts.to_string(), "TTS");
    }

    #[test]
    fn test_validate_create() {
        assert!(create("deepseek-chat").validate().is_ok());
        assert!(create("").validate().is_err());
        assert!(create(&"m".repeat(256)).validate().is_err());

        let mut no_provider = create("deepseek-chat");
        no_provider.provider_id = String::new();
        assert!(no_provider.validate().is_err());

        let mut zero_context = create("deepseek-chat");
        zero_context.context_length = Some(0);
        let err = zero_context.validate().unwrap_err();
        assert!(err.to_string().contains("positive integer"));

        zero_context.context_length = None;
        assert!(zero_context.validate().is_ok());
    }

    #[test]
    fn test_validate_update() {
        assert!(UpdateModel::default().validate().is_ok());
        assert!(UpdateModel::default().is_empty());

        let clear_context = UpdateModel {
            context_length: Some(None),
            ..Default::default()
        };
        assert!(clear_context.validate().is_ok());
        assert!(!clear_context.is_empty());

        let blank_name = UpdateModel {
            name: Some(String::new()),
            ..Default::default()
        };
        assert!(blank_name.validate().is_err());
    }
}
