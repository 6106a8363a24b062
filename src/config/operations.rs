//! Config loading, validation, and utility operations.

use super::model::{Config, ProviderSettings, WikiSettings};
use super::types::{MAX_WAIT_TIMEOUT_MS, WikiIdentity};
use crate::error::{KbError, Result};
use crate::locks::KeyTemplate;
use std::path::Path;

impl Config {
    /// Load config from a YAML file.
    ///
    /// Unknown fields in the YAML are silently ignored for forward compatibility.
    ///
    /// # Returns
    ///
    /// * `Ok(Config)` - Successfully loaded and validated config
    /// * `Err(KbError::UserError)` - Read error, parse error or validation failure
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        let content = std::fs::read_to_string(path).map_err(|e| {
            KbError::UserError(format!(
                "failed to read config file '{}': {}",
                path.display(),
                e
            ))
        })?;

        Self::from_yaml(&content)
    }

    /// Load config if the file exists, otherwise fall back to defaults.
    ///
    /// A present but invalid file is still an error.
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if path.exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }

    /// Parse config from a YAML string.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        // serde_yaml rejects an empty document for a struct; treat it as all defaults.
        let config: Config = if yaml.trim().is_empty() {
            Config::default()
        } else {
            serde_yaml::from_str(yaml)
                .map_err(|e| KbError::UserError(format!("failed to parse config YAML: {}", e)))?
        };

        config.validate()?;
        Ok(config)
    }

    /// Serialize config to YAML string.
    pub fn to_yaml(&self) -> Result<String> {
        serde_yaml::to_string(self)
            .map_err(|e| KbError::UserError(format!("failed to serialize config to YAML: {}", e)))
    }

    /// Validate config values and return error on invalid values.
    ///
    /// Validation rules:
    /// - `lock.ttl_ms` and `lock.wait_timeout_ms` must be positive
    /// - `lock.wait_timeout_ms` must not exceed one hour
    /// - `lock.poll_interval_ms` must be positive and not exceed the wait timeout
    /// - lock key templates must parse and only use the placeholders their
    ///   uniqueness rule allows (see [`WikiSettings::lock_template`])
    pub fn validate(&self) -> Result<()> {
        if self.lock.ttl_ms == 0 {
            return Err(invalid("lock.ttl_ms must be greater than 0"));
        }

        if self.lock.wait_timeout_ms == 0 {
            return Err(invalid("lock.wait_timeout_ms must be greater than 0"));
        }

        if self.lock.wait_timeout_ms > MAX_WAIT_TIMEOUT_MS {
            return Err(invalid(&format!(
                "lock.wait_timeout_ms must be at most {}",
                MAX_WAIT_TIMEOUT_MS
            )));
        }

        if self.lock.poll_interval_ms == 0 || self.lock.poll_interval_ms > self.lock.wait_timeout_ms
        {
            return Err(invalid(
                "lock.poll_interval_ms must be greater than 0 and at most lock.wait_timeout_ms",
            ));
        }

        self.wiki.lock_template().map_err(|e| {
            KbError::UserError(format!("config validation failed: wiki.create_lock_key: {}", e))
        })?;

        self.provider.lock_template().map_err(|e| {
            KbError::UserError(format!(
                "config validation failed: provider.create_lock_key: {}",
                e
            ))
        })?;

        Ok(())
    }
}

impl WikiSettings {
    /// Parse the effective creation lock key template.
    ///
    /// In path identity mode two requests for the same path must contend
    /// for the same key, so the key may only depend on `#{path}`. A fixed
    /// key is also accepted; it serializes every creation.
    pub fn lock_template(&self) -> Result<KeyTemplate> {
        let template = KeyTemplate::parse(self.create_lock_template())?;
        let allowed: &[&str] = match self.identity {
            WikiIdentity::Path => &["path"],
            WikiIdentity::Id => &["path", "name", "creator_id"],
        };
        check_placeholders(&template, allowed)?;
        Ok(template)
    }
}

impl ProviderSettings {
    /// Parse the creation lock key template.
    ///
    /// The key may only depend on the creator and the platform, the pair a
    /// provider is unique on.
    pub fn lock_template(&self) -> Result<KeyTemplate> {
        let template = KeyTemplate::parse(&self.create_lock_key)?;
        check_placeholders(&template, &["creator_id", "platform"])?;
        Ok(template)
    }
}

fn check_placeholders(template: &KeyTemplate, allowed: &[&str]) -> Result<()> {
    if let Some(name) = template
        .placeholders()
        .into_iter()
        .find(|name| !allowed.contains(name))
    {
        let allowed: Vec<String> = allowed.iter().map(|a| format!("#{{{}}}", a)).collect();
        return Err(KbError::UserError(format!(
            "placeholder '#{{{}}}' is not allowed in '{}' (allowed: {})",
            name,
            template,
            allowed.join(", ")
        )));
    }
    Ok(())
}

fn invalid(message: &str) -> KbError {
    KbError::UserError(format!("config validation failed: {}", message))
}
