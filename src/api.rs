//! Backend contract for the AI settings endpoints.
//!
//! The shapes mirror what the matcher backend serves under `/ai-providers`,
//! `/ai-settings`, `/ai-models` and `/test-ai`.  [`SettingsBackend`] is the
//! seam the settings panel talks through; [`http::HttpBackend`] is the real
//! implementation and tests substitute their own.

pub mod http;

use std::fmt;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Result;

pub use http::HttpBackend;

/// One entry of `GET /ai-providers`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderDescriptor {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub requires_api_key: bool,
    /// Locally hosted providers (Ollama) take a host/port instead of a key
    /// and can pull models on demand.
    #[serde(default)]
    pub requires_host: bool,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub(crate) struct ProviderList {
    #[serde(default)]
    pub providers: Vec<ProviderDescriptor>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub(crate) struct ModelList {
    #[serde(default)]
    pub models: Vec<String>,
}

/// `GET /ai-settings`: the active configuration.
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CurrentSettings {
    pub provider: String,
    #[serde(default)]
    pub model_name: String,
    /// Only present when the backend chooses to return the stored key.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    #[serde(default)]
    pub api_key_set: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub host: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,
    #[serde(default)]
    pub configured: bool,
}

impl fmt::Debug for CurrentSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CurrentSettings")
            .field("provider", &self.provider)
            .field("model_name", &self.model_name)
            .field("api_key", &self.api_key.as_ref().map(|_| "[REDACTED]"))
            .field("api_key_set", &self.api_key_set)
            .field("host", &self.host)
            .field("port", &self.port)
            .field("configured", &self.configured)
            .finish()
    }
}

/// `POST /ai-settings` body.  An empty `api_key` tells the backend to keep
/// the key it already has.
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SaveRequest {
    pub provider: String,
    pub model_name: String,
    pub api_key: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub host: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,
}

impl fmt::Debug for SaveRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SaveRequest")
            .field("provider", &self.provider)
            .field("model_name", &self.model_name)
            .field("api_key", &redacted(&self.api_key))
            .field("host", &self.host)
            .field("port", &self.port)
            .finish()
    }
}

/// `POST /test-ai` body.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestRequest {
    pub provider: String,
    pub config: TestConfig,
}

#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestConfig {
    pub api_key: String,
    pub model: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub host: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,
}

impl fmt::Debug for TestConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TestConfig")
            .field("api_key", &redacted(&self.api_key))
            .field("model", &self.model)
            .field("host", &self.host)
            .field("port", &self.port)
            .finish()
    }
}

/// `POST /test-ai` response.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestResponse {
    #[serde(default)]
    pub connected: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// Parameters of `POST /ai-models/pull`, sent as a query string.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PullRequest {
    pub provider: String,
    pub model_name: String,
    pub host: String,
    pub port: u16,
}

fn redacted(value: &str) -> &'static str {
    if value.is_empty() { "" } else { "[REDACTED]" }
}

/// The REST surface the settings panel depends on.
#[async_trait]
pub trait SettingsBackend: Send + Sync {
    /// `GET /ai-providers`
    async fn providers(&self) -> Result<Vec<ProviderDescriptor>>;

    /// `GET /ai-settings`
    async fn current_settings(&self) -> Result<CurrentSettings>;

    /// `POST /ai-settings`
    async fn save_settings(&self, request: &SaveRequest) -> Result<()>;

    /// `GET /ai-models/{provider}`
    async fn models(&self, provider: &str) -> Result<Vec<String>>;

    /// `POST /ai-models/pull`; queues a download and returns immediately.
    async fn pull_model(&self, request: &PullRequest) -> Result<()>;

    /// `POST /test-ai`
    async fn test_connection(&self, request: &TestRequest) -> Result<TestResponse>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unconfigured_settings_deserialize_with_defaults() {
        let json = r#"{
            "provider": "ollama",
            "model_name": "llama2",
            "host": "ollama",
            "port": 11434,
            "configured": false
        }"#;
        let settings: CurrentSettings = serde_json::from_str(json).unwrap();
        assert_eq!(settings.provider, "ollama");
        assert!(!settings.configured);
        assert!(!settings.api_key_set);
        assert!(settings.api_key.is_none());
        assert_eq!(settings.port, Some(11434));
    }

    #[test]
    fn configured_settings_tolerate_extra_fields() {
        let json = r#"{
            "id": 3,
            "provider": "huggingface",
            "model_name": "mistralai/Mistral-7B-Instruct-v0.3",
            "api_key": "hf_secret",
            "api_key_set": true,
            "host": null,
            "port": null,
            "configured": true,
            "created_at": "2025-01-01T00:00:00",
            "updated_at": null
        }"#;
        let settings: CurrentSettings = serde_json::from_str(json).unwrap();
        assert_eq!(settings.api_key.as_deref(), Some("hf_secret"));
        assert!(settings.api_key_set);
        assert!(settings.host.is_none());
    }

    #[test]
    fn debug_output_never_contains_keys() {
        let settings = CurrentSettings {
            provider: "gemini".into(),
            api_key: Some("sk-live".into()),
            ..Default::default()
        };
        let save = SaveRequest {
            provider: "gemini".into(),
            model_name: "gemini-pro".into(),
            api_key: "sk-live".into(),
            ..Default::default()
        };
        let test = TestRequest {
            provider: "gemini".into(),
            config: TestConfig {
                api_key: "sk-live".into(),
                model: "gemini-pro".into(),
                ..Default::default()
            },
        };
        for rendered in [
            format!("{settings:?}"),
            format!("{save:?}"),
            format!("{test:?}"),
        ] {
            assert!(!rendered.contains("sk-live"), "leaked key in {rendered}");
        }
    }

    #[test]
    fn save_request_omits_host_for_cloud_providers() {
        let save = SaveRequest {
            provider: "gemini".into(),
            model_name: "gemini-pro".into(),
            api_key: String::new(),
            ..Default::default()
        };
        let value = serde_json::to_value(&save).unwrap();
        assert_eq!(
            value,
            serde_json::json!({"provider": "gemini", "model_name": "gemini-pro", "api_key": ""})
        );
    }
}
