//! Event-keyed configuration templates
//!
//! A template pairs a [`Condition`] on discovery event keys with one or more
//! partial configurations. Every partial of every matching template is
//! deep-merged over each candidate configuration, so a template can override
//! fields, add new ones, or fan one candidate out into several. String values
//! may reference event keys as `${data.<key>}`.

use crate::{
    builder::ModuleConfig,
    bus::BusEvent,
    error::{Error, Result},
};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{debug, warn};

/// Transformation applied to freshly built configurations
pub trait ConfigTemplate: Send + Sync {
    /// Rewrite `configs` for `event`
    fn apply(&self, event: &BusEvent, configs: Vec<ModuleConfig>) -> Vec<ModuleConfig>;
}

/// One template rule
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TemplateConfig {
    /// When the rule applies
    pub condition: Condition,
    /// Partial configurations merged over each candidate
    pub config: Vec<Value>,
}

/// Predicate on discovery event keys
///
/// Every clause that is present must hold.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Condition {
    /// Keys whose values must equal the given ones
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub equals: Option<Map<String, Value>>,
    /// Keys whose string values must contain the given substrings
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contains: Option<Map<String, Value>>,
    /// All nested conditions must hold
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub and: Option<Vec<Condition>>,
    /// At least one nested condition must hold
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub or: Option<Vec<Condition>>,
    /// The nested condition must not hold
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub not: Option<Box<Condition>>,
}

impl Condition {
    /// Evaluate against an event
    pub fn matches(&self, event: &BusEvent) -> bool {
        let equals = self.equals.as_ref().is_none_or(|fields| {
            fields
                .iter()
                .all(|(key, expected)| event.get(key).is_some_and(|v| loose_eq(v, expected)))
        });
        let contains = self.contains.as_ref().is_none_or(|fields| {
            fields.iter().all(|(key, needle)| {
                match (event.get(key).map(as_text), as_text(needle)) {
                    (Some(haystack), needle) => haystack.contains(&needle),
                    (None, _) => false,
                }
            })
        });
        let and = self
            .and
            .as_ref()
            .is_none_or(|conditions| conditions.iter().all(|c| c.matches(event)));
        let or = self
            .or
            .as_ref()
            .is_none_or(|conditions| conditions.iter().any(|c| c.matches(event)));
        let not = self.not.as_ref().is_none_or(|condition| !condition.matches(event));

        equals && contains && and && or && not
    }

    fn validate(&self) -> Result<()> {
        if self.equals.is_none()
            && self.contains.is_none()
            && self.and.is_none()
            && self.or.is_none()
            && self.not.is_none()
        {
            return Err(Error::InvalidTemplate("condition has no clauses".to_string()));
        }
        for nested in self.and.iter().chain(self.or.iter()).flatten() {
            nested.validate()?;
        }
        if let Some(nested) = &self.not {
            nested.validate()?;
        }
        Ok(())
    }
}

/// Numbers and strings compare by their textual form
fn loose_eq(actual: &Value, expected: &Value) -> bool {
    actual == expected || as_text(actual) == as_text(expected)
}

fn as_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Applies [`TemplateConfig`] rules in order
#[derive(Debug, Clone, Default)]
pub struct TemplateMapper {
    templates: Vec<TemplateConfig>,
}

impl TemplateMapper {
    /// Create a mapper, rejecting rules with empty conditions or no partials
    pub fn new(templates: Vec<TemplateConfig>) -> Result<Self> {
        for template in &templates {
            template.condition.validate()?;
            if template.config.is_empty() {
                return Err(Error::InvalidTemplate(
                    "template has no config entries".to_string(),
                ));
            }
        }
        Ok(Self { templates })
    }

    /// Number of rules
    pub fn len(&self) -> usize {
        self.templates.len()
    }

    /// Whether there are no rules
    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }

    /// Partial configs of every rule matching `event`, placeholders resolved
    ///
    /// `None` when no rule matches.
    fn overlays(&self, event: &BusEvent) -> Option<Vec<Value>> {
        let matching: Vec<&TemplateConfig> = self
            .templates
            .iter()
            .filter(|template| template.condition.matches(event))
            .collect();
        if matching.is_empty() {
            return None;
        }

        let overlays = matching
            .into_iter()
            .flat_map(|template| template.config.iter())
            .filter_map(|partial| match substitute(partial, event) {
                Ok(resolved) => Some(resolved),
                Err(key) => {
                    warn!("template references missing event key '{}', skipping", key);
                    None
                }
            })
            .collect();
        Some(overlays)
    }
}

impl ConfigTemplate for TemplateMapper {
    fn apply(&self, event: &BusEvent, configs: Vec<ModuleConfig>) -> Vec<ModuleConfig> {
        let Some(overlays) = self.overlays(event) else {
            return configs;
        };

        let mut expanded = Vec::with_capacity(configs.len() * overlays.len());
        for config in configs {
            let base = match serde_json::to_value(&config) {
                Ok(base) => base,
                Err(e) => {
                    warn!("unable to encode config for module {}: {}", config.module, e);
                    continue;
                }
            };
            for overlay in &overlays {
                let mut merged = base.clone();
                merge(&mut merged, overlay);
                match serde_json::from_value::<ModuleConfig>(merged) {
                    Ok(config) => expanded.push(config),
                    Err(e) => warn!("template produced an invalid config: {}", e),
                }
            }
        }
        debug!("templates expanded configs to {}", expanded.len());
        expanded
    }
}

/// Deep-merge `overlay` into `base`; objects merge, everything else replaces
fn merge(base: &mut Value, overlay: &Value) {
    match (base, overlay) {
        (Value::Object(base), Value::Object(overlay)) => {
            for (key, value) in overlay {
                match base.get_mut(key) {
                    Some(existing) => merge(existing, value),
                    None => {
                        base.insert(key.clone(), value.clone());
                    }
                }
            }
        }
        (base, overlay) => *base = overlay.clone(),
    }
}

const PLACEHOLDER_PREFIX: &str = "${data.";

/// Resolve `${data.<key>}` placeholders, returning the first missing key on failure
fn substitute(value: &Value, event: &BusEvent) -> std::result::Result<Value, String> {
    match value {
        Value::String(s) => substitute_str(s, event),
        Value::Array(items) => items
            .iter()
            .map(|item| substitute(item, event))
            .collect::<std::result::Result<Vec<_>, _>>()
            .map(Value::Array),
        Value::Object(fields) => fields
            .iter()
            .map(|(k, v)| substitute(v, event).map(|v| (k.clone(), v)))
            .collect::<std::result::Result<Map<_, _>, _>>()
            .map(Value::Object),
        other => Ok(other.clone()),
    }
}

fn substitute_str(s: &str, event: &BusEvent) -> std::result::Result<Value, String> {
    // a lone placeholder keeps the event value's type
    if let Some(key) = s
        .strip_prefix(PLACEHOLDER_PREFIX)
        .and_then(|rest| rest.strip_suffix('}'))
        .filter(|key| !key.contains('}'))
    {
        return event.get(key).cloned().ok_or_else(|| key.to_string());
    }

    let mut out = String::with_capacity(s.len());
    let mut rest = s;
    while let Some(start) = rest.find(PLACEHOLDER_PREFIX) {
        out.push_str(&rest[..start]);
        let after = &rest[start + PLACEHOLDER_PREFIX.len()..];
        let Some(end) = after.find('}') else {
            out.push_str(&rest[start..]);
            return Ok(Value::String(out));
        };
        let key = &after[..end];
        let value = event.get(key).ok_or_else(|| key.to_string())?;
        out.push_str(&as_text(value));
        rest = &after[end + 1..];
    }
    out.push_str(rest);
    Ok(Value::String(out))
}
