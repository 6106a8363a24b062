//! Model config records and request payloads.

use crate::error::{KbError, Result};
use crate::fields::check_range;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A stored model config.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelConfig {
    pub id: String,
    /// `None` marks the global config.
    pub provider_id: Option<String>,
    pub temperature: Option<f64>,
    pub max_tokens: Option<u32>,
    pub top_p: Option<f64>,
    pub frequency_penalty: Option<f64>,
    pub presence_penalty: Option<f64>,
    /// Extra settings passed through to the platform; a JSON object when present.
    pub other_config: Option<Value>,
    pub creator_id: String,
    pub create_time: DateTime<Utc>,
    pub updater_id: Option<String>,
    pub update_time: Option<DateTime<Utc>>,
    pub deleted: bool,
}

impl ModelConfig {
    pub fn is_global(&self) -> bool {
        self.provider_id.is_none()
    }
}

/// Payload for creating a config.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CreateModelConfig {
    pub provider_id: Option<String>,
    pub temperature: Option<f64>,
    pub max_tokens: Option<u32>,
    pub top_p: Option<f64>,
    pub frequency_penalty: Option<f64>,
    pub presence_penalty: Option<f64>,
    pub other_config: Option<Value>,
}

impl CreateModelConfig {
    pub fn validate(&self) -> Result<()> {
        check_temperature(self.temperature)?;
        check_max_tokens(self.max_tokens)?;
        check_top_p(self.top_p)?;
        check_penalty("frequency_penalty", self.frequency_penalty)?;
        check_penalty("presence_penalty", self.presence_penalty)?;
        check_other_config(self.other_config.as_ref())
    }
}

/// Partial update of a config. `Some(None)` clears a field; clearing
/// `provider_id` turns the config into a global one.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UpdateModelConfig {
    pub provider_id: Option<Option<String>>,
    pub temperature: Option<Option<f64>>,
    pub max_tokens: Option<Option<u32>>,
    pub top_p: Option<Option<f64>>,
    pub frequency_penalty: Option<Option<f64>>,
    pub presence_penalty: Option<Option<f64>>,
    pub other_config: Option<Option<Value>>,
}

impl UpdateModelConfig {
    pub fn validate(&self) -> Result<()> {
        check_temperature(self.temperature.flatten())?;
        check_max_tokens(self.max_tokens.flatten())?;
        check_top_p(self.top_p.flatten())?;
        check_penalty("frequency_penalty", self.frequency_penalty.flatten())?;
        check_penalty("presence_penalty", self.presence_penalty.flatten())?;
        if let Some(other) = &self.other_config {
            check_other_config(other.as_ref())?;
        }
        Ok(())
    }

    /// Whether the patch changes nothing.
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    pub(crate) fn apply(self, config: &mut ModelConfig) {
        if let Some(provider_id) = self.provider_id {
            config.provider_id = provider_id;
        }
        if let Some(temperature) = self.temperature {
            config.temperature = temperature;
        }
        if let Some(max_tokens) = self.max_tokens {
            config.max_tokens = max_tokens;
        }
        if let Some(top_p) = self.top_p {
            config.top_p = top_p;
        }
        if let Some(penalty) = self.frequency_penalty {
            config.frequency_penalty = penalty;
        }
        if let Some(penalty) = self.presence_penalty {
            config.presence_penalty = penalty;
        }
        if let Some(other) = self.other_config {
            config.other_config = other.filter(|c| !c.is_null());
        }
    }
}

fn check_temperature(value: Option<f64>) -> Result<()> {
    check_range("temperature", value, 0.0, 2.0)
}

fn check_top_p(value: Option<f64>) -> Result<()> {
    check_range("top_p", value, 0.0, 1.0)
}

fn check_penalty(field: &str, value: Option<f64>) -> Result<()> {
    check_range(field, value, -2.0, 2.0)
}

fn check_max_tokens(value: Option<u32>) -> Result<()> {
    if value == Some(0) {
        return Err(KbError::ValidationError(
            "max_tokens must be a positive integer".to_string(),
        ));
    }
    Ok(())
}

fn check_other_config(value: Option<&Value>) -> Result<()> {
    match value {
        None | Some(Value::Null) | Some(Value::Object(_)) => Ok(()),
        Some(_) => Err(KbError::ValidationError(
            "other_config must be a JSON object".to_string(),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_validate_ranges() {
        let ok = CreateModelConfig {
            temperature: Some(2.0),
            max_tokens: Some(4096),
            top_p: Some(0.0),
            frequency_penalty: Some(-2.0),
            presence_penalty: Some(2.0),
            other_config: Some(json!({"stream": true})),
            ..Default::default()
        };
        assert!(ok.validate().is_ok());
        assert!(CreateModelConfig::default().validate().is_ok());

        let cases = [
            CreateModelConfig { temperature: Some(2.1), ..Default::default() },
            CreateModelConfig { max_tokens: Some(0), ..Default::default() },
            CreateModelConfig { top_p: Some(1.01), ..Default::default() },
            CreateModelConfig { frequency_penalty: Some(-2.5), ..Default::default() },
            CreateModelConfig { presence_penalty: Some(3.0), ..Default::default() },
            CreateModelConfig { other_config: Some(json!([1])), ..Default::default() },
        ];
        for case in cases {
            assert!(
                matches!(case.validate(), Err(KbError::ValidationError(_))),
                "{case:?}"
            );
        }
    }

    #[test]
    fn test_update_patch() {
        assert!(UpdateModelConfig::default().is_empty());

        let clear = UpdateModelConfig {
            temperature: Some(None),
            ..Default::default()
        };
        assert!(clear.validate().is_ok());
        assert!(!clear.is_empty());

        let bad = UpdateModelConfig {
            top_p: Some(Some(-0.1)),
            ..Default::default()
        };
        assert!(bad.validate().unwrap_err().to_string().contains("top_p"));
    }
}
