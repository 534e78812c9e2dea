//! `reqwest` implementation of [`SettingsBackend`].

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Response};
use tracing::{debug, instrument, warn};
use url::Url;

use super::{
    CurrentSettings, ModelList, ProviderDescriptor, ProviderList, PullRequest, SaveRequest,
    SettingsBackend, TestRequest, TestResponse,
};
use crate::error::{Error, Result};

/// HTTP client for the matcher backend.
#[derive(Debug, Clone)]
pub struct HttpBackend {
    client: Client,
    base: Url,
}

impl HttpBackend {
    /// Build a client rooted at `base_url`.  Endpoint paths are joined
    /// relative to it, so a backend mounted under a prefix works too.
    pub fn new(base_url: &str, timeout: Option<Duration>) -> Result<Self> {
        let mut base = Url::parse(base_url.trim())?;
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }

        let mut builder = Client::builder().user_agent(concat!(
            "matcher-settings/",
            env!("CARGO_PKG_VERSION")
        ));
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }

        Ok(Self {
            client: builder.build()?,
            base,
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base
    }

    fn endpoint(&self, path: &str) -> Result<Url> {
        Ok(self.base.join(path)?)
    }
}

/// Turn a non-success response into [`Error::Status`] carrying its body.
async fn ensure_success(response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    warn!(status = status.as_u16(), "backend returned an error");
    Err(Error::status(status.as_u16(), body))
}

#[async_trait]
impl SettingsBackend for HttpBackend {
    #[instrument(skip(self))]
    async fn providers(&self) -> Result<Vec<ProviderDescriptor>> {
        let url = self.endpoint("ai-providers")?;
        let response = ensure_success(self.client.get(url).send().await?).await?;
        let list: ProviderList = response.json().await?;
        debug!(count = list.providers.len(), "loaded provider catalog");
        Ok(list.providers)
    }

    #[instrument(skip(self))]
    async fn current_settings(&self) -> Result<CurrentSettings> {
        let url = self.endpoint("ai-settings")?;
        let response = ensure_success(self.client.get(url).send().await?).await?;
        let settings: CurrentSettings = response.json().await?;
        debug!(
            provider = %settings.provider,
            configured = settings.configured,
            "loaded current settings"
        );
        Ok(settings)
    }

    #[instrument(skip(self, request), fields(provider = %request.provider, model = %request.model_name))]
    async fn save_settings(&self, request: &SaveRequest) -> Result<()> {
        let url = self.endpoint("ai-settings")?;
        let response = self.client.post(url).json(request).send().await?;
        ensure_success(response).await?;
        debug!(key_changed = !request.api_key.is_empty(), "settings saved");
        Ok(())
    }

    #[instrument(skip(self))]
    async fn models(&self, provider: &str) -> Result<Vec<String>> {
        let url = self.endpoint(&format!("ai-models/{}", urlencoding::encode(provider)))?;
        let response = ensure_success(self.client.get(url).send().await?).await?;
        let list: ModelList = response.json().await?;
        debug!(count = list.models.len(), "loaded models");
        Ok(list.models)
    }

    #[instrument(skip(self, request), fields(provider = %request.provider, model = %request.model_name))]
    async fn pull_model(&self, request: &PullRequest) -> Result<()> {
        let mut url = self.endpoint("ai-models/pull")?;
        url.query_pairs_mut()
            .append_pair("provider", &request.provider)
            .append_pair("model_name", &request.model_name)
            .append_pair("host", &request.host)
            .append_pair("port", &request.port.to_string());
        let response = self.client.post(url).send().await?;
        ensure_success(response).await?;
        debug!("model pull queued");
        Ok(())
    }

    #[instrument(skip(self, request), fields(provider = %request.provider, model = %request.config.model))]
    async fn test_connection(&self, request: &TestRequest) -> Result<TestResponse> {
        let url = self.endpoint("test-ai")?;
        let response = self.client.post(url).json(request).send().await?;
        let outcome: TestResponse = ensure_success(response).await?.json().await?;
        debug!(connected = outcome.connected, "connection test finished");
        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_url_gains_trailing_slash() {
        let backend = HttpBackend::new("http://localhost:8000/api", None).unwrap();
        assert_eq!(backend.base_url().as_str(), "http://localhost:8000/api/");
        assert_eq!(
            backend.endpoint("ai-settings").unwrap().as_str(),
            "http://localhost:8000/api/ai-settings"
        );
    }

    #[test]
    fn provider_ids_are_percent_encoded() {
        let backend = HttpBackend::new("http://localhost:8000", None).unwrap();
        let url = backend
            .endpoint(&format!("ai-models/{}", urlencoding::encode("my provider/x")))
            .unwrap();
        assert_eq!(
            url.as_str(),
            "http://localhost:8000/ai-models/my%20provider%2Fx"
        );
    }

    #[test]
    fn invalid_base_url_is_rejected() {
        assert!(matches!(
            HttpBackend::new("not a url", None),
            Err(Error::Url(_))
        ));
    }
}
