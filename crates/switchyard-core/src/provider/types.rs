//! Provider profile types

use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::app::AppId;

/// A named provider configuration for one application
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Provider {
    /// Unique within the app; a config-file key for additive apps
    pub id: String,
    /// Display name (not unique)
    pub name: String,
    /// Provider-specific connection/auth settings
    #[serde(default)]
    pub settings_config: Value,
    /// Position among the app's providers
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sort_index: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meta: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub website_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon_color: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    /// Unix millis, set once on first insert
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<i64>,
}

impl Provider {
    /// Create a provider with the given id, name and settings
    #[must_use]
    pub fn new(id: impl Into<String>, name: impl Into<String>, settings_config: Value) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            settings_config,
            sort_index: None,
            meta: None,
            website_url: None,
            category: None,
            icon: None,
            icon_color: None,
            notes: None,
            created_at: None,
        }
    }

    /// Set the sort index
    #[must_use]
    pub fn with_sort_index(mut self, sort_index: i64) -> Self {
        self.sort_index = Some(sort_index);
        self
    }

    /// Copy this provider under a new id.
    ///
    /// Payloads are cloned by value, so the copy never shares `settings_config`
    /// or `meta` with the original.
    #[must_use]
    pub fn duplicate_as(&self, id: String, sort_index: Option<i64>) -> Self {
        Self {
            id,
            name: format!("{} copy", self.name),
            settings_config: self.settings_config.clone(),
            sort_index,
            meta: self.meta.clone(),
            website_url: self.website_url.clone(),
            category: self.category.clone(),
            icon: self.icon.clone(),
            icon_color: self.icon_color.clone(),
            notes: self.notes.clone(),
            created_at: Some(now_millis()),
        }
    }
}

/// Providers of one app plus its current pointer
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderList {
    pub app: AppId,
    /// Ordered by sort index
    pub providers: Vec<Provider>,
    pub current_provider_id: Option<String>,
}

impl ProviderList {
    /// Look up a provider by id
    #[must_use]
    pub fn get(&self, id: &str) -> Option<&Provider> {
        self.providers.iter().find(|p| p.id == id)
    }
}

/// Event broadcast whenever an app's current provider changes
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SwitchEvent {
    #[serde(rename = "appType")]
    pub app: AppId,
    /// `None` when the current provider was cleared
    pub provider_id: Option<String>,
}

/// Current time as Unix millis
#[must_use]
pub fn now_millis() -> i64 {
    Utc::now().timestamp_millis()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_duplicate_deep_copies_payloads() {
        let mut original = Provider::new("a", "Alpha", json!({"env": {"KEY": "1"}}));
        original.meta = Some(json!({"tags": ["x"]}));
        original.website_url = Some("https://example.com".into());

        let mut copy = original.duplicate_as("b".into(), Some(3));
        copy.settings_config["env"]["KEY"] = json!("2");
        copy.meta.as_mut().unwrap()["tags"][0] = json!("y");

        assert_eq!(original.settings_config["env"]["KEY"], "1");
        assert_eq!(original.meta.as_ref().unwrap()["tags"][0], "x");
        assert_eq!(copy.name, "Alpha copy");
        assert_eq!(copy.website_url, original.website_url);
        assert_eq!(copy.sort_index, Some(3));
    }

    #[test]
    fn test_provider_serializes_camel_case() {
        let provider = Provider::new("a", "Alpha", json!({})).with_sort_index(2);
        let value = serde_json::to_value(&provider).unwrap();
        assert_eq!(value["sortIndex"], 2);
        assert!(value.get("settingsConfig").is_some());
        assert!(value.get("meta").is_none());
    }

    #[test]
    fn test_switch_event_wire_shape() {
        let event = SwitchEvent {
            app: AppId::Codex,
            provider_id: Some("p1".into()),
        };
        let value = serde_json::to_value(&event).unwrap();
        assert_eq!(value, json!({"appType": "codex", "providerId": "p1"}));

        let cleared = SwitchEvent {
            app: AppId::Codex,
            provider_id: None,
        };
        let value = serde_json::to_value(&cleared).unwrap();
        assert_eq!(value, json!({"appType": "codex", "providerId": null}));
    }
}
