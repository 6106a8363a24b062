//! Lock key templates.
//!
//! A template such as `wiki-repo:create:#{path}` is parsed once and rendered
//! per request from named arguments. Literal-only templates are valid and
//! render to themselves, which serializes every caller on one key.

use crate::error::{KbError, Result};
use regex::Regex;
use std::fmt;
use std::sync::LazyLock;

static PLACEHOLDER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"#\{([A-Za-z_][A-Za-z0-9_]*)\}").expect("valid placeholder regex"));

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Placeholder(String),
}

/// A parsed lock key template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyTemplate {
    source: String,
    segments: Vec<Segment>,
}

impl KeyTemplate {
    /// Parse a template string.
    ///
    /// Fails when the template is blank or contains a `#{` that does not
    /// form a valid `#{name}` placeholder.
    pub fn parse(template: &str) -> Result<Self> {
        if template.trim().is_empty() {
            return Err(KbError::UserError(
                "lock key template must not be empty".to_string(),
            ));
        }

        let mut segments = Vec::new();
        let mut last = 0;
        for caps in PLACEHOLDER.captures_iter(template) {
            let whole = caps.get(0).expect("capture 0 always present");
            push_literal(&mut segments, &template[last..whole.start()])?;
            segments.push(Segment::Placeholder(caps[1].to_string()));
            last = whole.end();
        }
        push_literal(&mut segments, &template[last..])?;

        Ok(Self {
            source: template.to_string(),
            segments,
        })
    }

    /// Names of all placeholders, in order of appearance.
    pub fn placeholders(&self) -> Vec<&str> {
        self.segments
            .iter()
            .filter_map(|s| match s {
                Segment::Placeholder(name) => Some(name.as_str()),
                Segment::Literal(_) => None,
            })
            .collect()
    }

    /// Whether the template renders to the same key for every request.
    pub fn is_fixed(&self) -> bool {
        self.placeholders().is_empty()
    }

    /// Render the key from `(name, value)` arguments.
    ///
    /// Every placeholder needs a non-empty value; unused arguments are ignored.
    pub fn render(&self, args: &[(&str, &str)]) -> Result<String> {
        let mut key = String::new();
        for segment in &self.segments {
            match segment {
                Segment::Literal(text) => key.push_str(text),
                Segment::Placeholder(name) => {
                    let value = args
                        .iter()
                        .find(|(arg, _)| arg == name)
                        .map(|(_, value)| *value)
                        .filter(|value| !value.is_empty())
                        .ok_or_else(|| {
                            KbError::UserError(format!(
                                "lock key '{}' needs a value for '#{{{}}}'",
                                self.source, name
                            ))
                        })?;
                    key.push_str(value);
                }
            }
        }
        Ok(key)
    }

    /// The original template text.
    pub fn as_str(&self) -> &str {
        &self.source
    }
}

impl fmt::Display for KeyTemplate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}

fn push_literal(segments: &mut Vec<Segment>, text: &str) -> Result<()> {
    if text.contains("#{") {
        return Err(KbError::UserError(format!(
            "malformed placeholder in lock key template near '{}'",
            text
        )));
    }
    if !text.is_empty() {
        segments.push(Segment::Literal(text.to_string()));
    }
    Ok(())
}
