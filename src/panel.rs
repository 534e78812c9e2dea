//! Settings panel controller.
//!
//! Owns the AI settings dialog: the provider catalog and active
//! configuration fetched from the backend, the session copy of the stored
//! API key, and the form the dialog renders.  Network calls run on spawned
//! tasks and report back as [`PanelEvent`]s through the application's action
//! channel, so all state changes happen on the event-loop task.

pub mod form;

use std::sync::Arc;
use std::time::Duration;

use secrecy::{ExposeSecret, SecretString};
use thiserror::Error;
use tokio::sync::mpsc::UnboundedSender;
use tracing::{debug, error, info, warn};

use crate::action::Action;
use crate::api::{
    CurrentSettings, ProviderDescriptor, PullRequest, SaveRequest, SettingsBackend, TestConfig,
    TestRequest, TestResponse,
};
use crate::config::Config;
use crate::providers::{FALLBACK_PROVIDER, ProviderCatalog};

pub use form::{ConnectionBanner, Field, KeyField, ModelChoices, PullForm, SettingsForm};

/// Completion of a background request, delivered as `Action::Panel`.
#[derive(Debug, Clone, PartialEq)]
pub enum PanelEvent {
    Loaded(Result<(Vec<ProviderDescriptor>, CurrentSettings), String>),
    ModelsLoaded {
        provider: String,
        generation: u64,
        result: Result<Vec<String>, String>,
    },
    Saved {
        request: SaveRequest,
        result: Result<(), String>,
    },
    Tested(Result<TestResponse, String>),
    PullQueued {
        provider: String,
        result: Result<(), String>,
    },
    /// Delayed model refresh after a pull was queued.
    RefreshModels(String),
}

/// Problems with user input, reported before any request is made.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Please choose a model first")]
    MissingModel,
    #[error("Please enter an API key first")]
    MissingKey,
    #[error("The stored API key is not available in this session; press Change to enter it")]
    StoredKeyUnavailable,
    #[error("Please enter the name of the model to pull")]
    MissingPullModel,
    #[error("Port must be a number between 1 and 65535")]
    InvalidPort,
    #[error("The selected provider does not host models locally")]
    PullUnavailable,
    #[error("A model pull is already in progress")]
    PullInFlight,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PanelError {
    #[error("unknown provider: {0}")]
    UnknownProvider(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Visibility {
    #[default]
    Closed,
    Open,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Info,
    Error,
}

/// Non-blocking user notification (shown as a toast by the host).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub level: NoticeLevel,
    pub text: String,
}

impl Notice {
    pub fn info(text: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Info,
            text: text.into(),
        }
    }

    pub fn error(text: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Error,
            text: text.into(),
        }
    }
}

/// Tunables taken from [`Config`].
#[derive(Debug, Clone)]
pub struct PanelOptions {
    pub fallback_provider: String,
    pub model_refresh_delay: Duration,
    pub default_host: String,
    pub default_port: u16,
}

impl Default for PanelOptions {
    fn default() -> Self {
        Self {
            fallback_provider: FALLBACK_PROVIDER.to_string(),
            model_refresh_delay: Duration::from_secs(5),
            default_host: "localhost".to_string(),
            default_port: 11434,
        }
    }
}

impl PanelOptions {
    pub fn from_config(config: &Config) -> Self {
        Self {
            fallback_provider: config.fallback_provider.clone(),
            model_refresh_delay: Duration::from_secs(config.model_refresh_delay_secs),
            default_host: config.default_host.clone(),
            default_port: config.default_port,
        }
    }
}

pub struct SettingsPanel {
    backend: Arc<dyn SettingsBackend>,
    action_tx: UnboundedSender<Action>,
    options: PanelOptions,
    host_ready: bool,
    init_deferred: bool,
    mounted: bool,
    visibility: Visibility,
    catalog: ProviderCatalog,
    current: Option<CurrentSettings>,
    cached_key: Option<SecretString>,
    form: SettingsForm,
    model_generation: u64,
    notices: Vec<Notice>,
}

impl SettingsPanel {
    pub fn new(
        backend: Arc<dyn SettingsBackend>,
        action_tx: UnboundedSender<Action>,
        options: PanelOptions,
    ) -> Self {
        Self {
            backend,
            action_tx,
            options,
            host_ready: false,
            init_deferred: false,
            mounted: false,
            visibility: Visibility::Closed,
            catalog: ProviderCatalog::default(),
            current: None,
            cached_key: None,
            form: SettingsForm::default(),
            model_generation: 0,
            notices: Vec::new(),
        }
    }

    // ── Lifecycle ───────────────────────────────────────────────────────────

    /// Mount the panel and start loading.  Returns `true` only on the call
    /// that actually mounted it; later calls are no-ops.  Before the host is
    /// ready the call is remembered and replayed by [`Self::host_ready`].
    pub fn initialize(&mut self) -> bool {
        if self.mounted {
            debug!("settings panel already mounted");
            return false;
        }
        if !self.host_ready {
            debug!("host not ready, deferring settings panel init");
            self.init_deferred = true;
            return false;
        }
        self.mounted = true;
        info!("settings panel mounted");
        self.load_providers_and_config();
        true
    }

    /// The host finished starting up; run a deferred initialization.
    pub fn host_ready(&mut self) {
        self.host_ready = true;
        if std::mem::take(&mut self.init_deferred) {
            self.initialize();
        }
    }

    pub fn is_mounted(&self) -> bool {
        self.mounted
    }

    /// Show the dialog.  No data is reloaded.
    pub fn open(&mut self) -> bool {
        if !self.mounted {
            return false;
        }
        self.visibility = Visibility::Open;
        true
    }

    pub fn close(&mut self) {
        self.visibility = Visibility::Closed;
    }

    pub fn is_open(&self) -> bool {
        self.visibility == Visibility::Open
    }

    pub fn visibility(&self) -> Visibility {
        self.visibility
    }

    // ── Accessors ───────────────────────────────────────────────────────────

    pub fn catalog(&self) -> &ProviderCatalog {
        &self.catalog
    }

    pub fn current_config(&self) -> Option<&CurrentSettings> {
        self.current.as_ref()
    }

    pub fn selected_provider(&self) -> &str {
        &self.form.provider
    }

    pub fn selected_descriptor(&self) -> Option<&ProviderDescriptor> {
        self.catalog.get(&self.form.provider)
    }

    pub fn form(&self) -> &SettingsForm {
        &self.form
    }

    pub fn form_mut(&mut self) -> &mut SettingsForm {
        &mut self.form
    }

    pub fn key_field(&self) -> &KeyField {
        &self.form.key
    }

    pub fn models(&self) -> &ModelChoices {
        &self.form.models
    }

    pub fn selected_model(&self) -> Option<&str> {
        self.form.models.selected()
    }

    pub fn banner(&self) -> &ConnectionBanner {
        &self.form.banner
    }

    pub fn has_cached_key(&self) -> bool {
        self.cached_key.is_some()
    }

    pub fn notices(&self) -> &[Notice] {
        &self.notices
    }

    pub fn drain_notices(&mut self) -> Vec<Notice> {
        std::mem::take(&mut self.notices)
    }

    // ── Loading ─────────────────────────────────────────────────────────────

    /// Fetch the catalog and the active configuration together.
    pub fn load_providers_and_config(&mut self) {
        let backend = Arc::clone(&self.backend);
        let tx = self.action_tx.clone();
        tokio::spawn(async move {
            let result = tokio::try_join!(backend.providers(), backend.current_settings())
                .map_err(|e| e.to_string());
            let _ = tx.send(Action::Panel(PanelEvent::Loaded(result)));
        });
    }

    fn on_loaded(&mut self, result: Result<(Vec<ProviderDescriptor>, CurrentSettings), String>) {
        let (providers, settings) = match result {
            Ok(loaded) => loaded,
            Err(err) => {
                error!(error = %err, "failed to load AI settings");
                self.notify(Notice::error(format!("Failed to load AI settings: {err}")));
                return;
            }
        };

        self.catalog = ProviderCatalog::new(providers);
        if let Some(key) = settings.api_key.as_deref().filter(|k| !k.is_empty()) {
            self.cached_key = Some(SecretString::new(key.to_string()));
        }

        let wanted = if settings.configured {
            settings.provider.clone()
        } else {
            self.options.fallback_provider.clone()
        };
        self.current = Some(settings);

        let provider = if self.catalog.contains(&wanted) {
            wanted
        } else if let Some(first) = self.catalog.first() {
            warn!(provider = %wanted, fallback = %first.id, "provider not offered by backend");
            first.id.clone()
        } else {
            warn!("backend offers no AI providers");
            return;
        };

        info!(provider = %provider, providers = self.catalog.len(), "AI settings loaded");
        self.form.provider = provider;
        if let Err(err) = self.provider_changed() {
            error!(error = %err, "could not build settings form");
        }
    }

    /// Rebuild the key and model part of the form for the selected provider
    /// and start loading its models.
    pub fn provider_changed(&mut self) -> Result<(), PanelError> {
        let id = self.form.provider.clone();
        let descriptor = self
            .catalog
            .get(&id)
            .cloned()
            .ok_or_else(|| PanelError::UnknownProvider(id.clone()))?;

        self.form.description = descriptor.description.clone();
        self.form.key = if !descriptor.requires_api_key {
            KeyField::Hidden
        } else if self.key_stored_for(&id) {
            KeyField::Stored
        } else {
            KeyField::editable()
        };
        self.form.pull = descriptor.requires_host.then(|| {
            let (host, port) = self.host_and_port_for(&id);
            PullForm::new(&host, port)
        });
        self.form.models = ModelChoices::Loading;
        self.form.clamp_focus();

        self.load_models(&id);
        Ok(())
    }

    fn key_stored_for(&self, provider: &str) -> bool {
        self.current
            .as_ref()
            .is_some_and(|c| c.api_key_set && c.provider == provider)
    }

    fn host_and_port_for(&self, provider: &str) -> (String, u16) {
        let saved = self.current.as_ref().filter(|c| c.provider == provider);
        let host = saved
            .and_then(|c| c.host.clone())
            .filter(|h| !h.is_empty())
            .unwrap_or_else(|| self.options.default_host.clone());
        let port = saved
            .and_then(|c| c.port)
            .unwrap_or(self.options.default_port);
        (host, port)
    }

    /// Request the model list for `provider`.  Only the newest request's
    /// answer is applied.
    pub fn load_models(&mut self, provider: &str) {
        self.model_generation += 1;
        let generation = self.model_generation;
        let provider = provider.to_string();
        let backend = Arc::clone(&self.backend);
        let tx = self.action_tx.clone();
        debug!(provider = %provider, generation, "loading models");
        tokio::spawn(async move {
            let result = backend.models(&provider).await.map_err(|e| e.to_string());
            let _ = tx.send(Action::Panel(PanelEvent::ModelsLoaded {
                provider,
                generation,
                result,
            }));
        });
    }

    fn on_models_loaded(
        &mut self,
        provider: String,
        generation: u64,
        result: Result<Vec<String>, String>,
    ) {
        if provider != self.form.provider {
            debug!(provider = %provider, selected = %self.form.provider, "dropping models for deselected provider");
            return;
        }
        if generation != self.model_generation {
            debug!(provider = %provider, generation, "dropping superseded model list");
            return;
        }

        self.form.models = match result {
            Ok(models) if models.is_empty() => ModelChoices::Empty,
            Ok(models) => {
                let saved = self
                    .current
                    .as_ref()
                    .filter(|c| c.provider == provider)
                    .map(|c| c.model_name.as_str());
                let selected = saved
                    .and_then(|m| models.iter().position(|candidate| candidate == m))
                    .unwrap_or(0);
                ModelChoices::Loaded { models, selected }
            }
            Err(err) => {
                error!(provider = %provider, error = %err, "failed to load models");
                ModelChoices::Failed
            }
        };
    }

    // ── Form edits ──────────────────────────────────────────────────────────

    /// Select a provider from the catalog and rebuild the form for it.
    pub fn select_provider(&mut self, id: &str) -> Result<(), PanelError> {
        if !self.catalog.contains(id) {
            return Err(PanelError::UnknownProvider(id.to_string()));
        }
        self.form.provider = id.to_string();
        self.provider_changed()
    }

    /// Step through the catalog (provider selector arrows).
    pub fn cycle_provider(&mut self, offset: isize) -> Result<(), PanelError> {
        let Some(next) = self
            .catalog
            .neighbour(&self.form.provider, offset)
            .map(|p| p.id.clone())
        else {
            return Ok(());
        };
        self.select_provider(&next)
    }

    pub fn select_model(&mut self, model: &str) -> bool {
        self.form.models.select(model)
    }

    pub fn cycle_model(&mut self, offset: isize) {
        self.form.models.step(offset);
    }

    /// Replace the contents of the key input, if it is enabled.
    pub fn set_key_input(&mut self, value: &str) -> bool {
        match self.form.key.input_mut() {
            Some(input) => {
                *input = tui_input::Input::new(value.to_string());
                true
            }
            None => false,
        }
    }

    /// Switch a stored key to an empty editable input so a replacement can
    /// be typed without revealing the old one.
    pub fn enable_key_edit(&mut self) -> bool {
        if !self.form.key.change_visible() {
            return false;
        }
        self.form.key = KeyField::Editable {
            input: tui_input::Input::default(),
            replacing: true,
        };
        self.form.focus = Field::ApiKey;
        true
    }

    pub fn set_pull_model_name(&mut self, name: &str) -> bool {
        match self.form.pull.as_mut() {
            Some(pull) => {
                pull.model_name = tui_input::Input::new(name.to_string());
                true
            }
            None => false,
        }
    }

    // ── Save ────────────────────────────────────────────────────────────────

    /// Persist the form.  An unchanged (disabled) key is sent as `""`.
    pub fn save(&mut self) -> Result<(), ValidationError> {
        let request = match self.build_save_request() {
            Ok(request) => request,
            Err(err) => {
                self.notify(Notice::error(err.to_string()));
                return Err(err);
            }
        };

        info!(provider = %request.provider, model = %request.model_name, "saving AI settings");
        let backend = Arc::clone(&self.backend);
        let tx = self.action_tx.clone();
        tokio::spawn(async move {
            let result = backend
                .save_settings(&request)
                .await
                .map_err(|e| e.to_string());
            let _ = tx.send(Action::Panel(PanelEvent::Saved { request, result }));
        });
        Ok(())
    }

    fn build_save_request(&self) -> Result<SaveRequest, ValidationError> {
        let model = self
            .form
            .models
            .selected()
            .ok_or(ValidationError::MissingModel)?;
        // An unusable port leaves the saved endpoint as it was.
        let (host, port) = match self.form.pull.as_ref().map(|p| (p.host(), p.port())) {
            Some((host, Some(port))) => (Some(host.to_string()), Some(port)),
            Some((_, None)) => {
                warn!(provider = %self.form.provider, "invalid port, saving without host and port");
                (None, None)
            }
            None => (None, None),
        };
        Ok(SaveRequest {
            provider: self.form.provider.clone(),
            model_name: model.to_string(),
            api_key: self.form.key.value().unwrap_or_default().to_string(),
            host,
            port,
        })
    }

    fn on_saved(&mut self, request: SaveRequest, result: Result<(), String>) {
        if let Err(err) = result {
            warn!(error = %err, "saving AI settings failed");
            self.notify(Notice::error(format!("Failed to save settings: {err}")));
            return;
        }

        let current = self.current.get_or_insert_with(CurrentSettings::default);
        let provider_changed = current.provider != request.provider;
        if !request.api_key.is_empty() {
            current.api_key_set = true;
            self.cached_key = Some(SecretString::new(request.api_key.clone()));
        } else if provider_changed {
            current.api_key_set = false;
            self.cached_key = None;
        }
        current.api_key = None;
        current.provider = request.provider;
        current.model_name = request.model_name;
        if request.host.is_some() {
            current.host = request.host;
            current.port = request.port;
        }
        current.configured = true;
        let key_stored = current.api_key_set;
        info!(provider = %current.provider, "AI settings saved");

        if self.form.key.is_visible() && self.form.provider == current.provider {
            self.form.key = if key_stored {
                KeyField::Stored
            } else {
                KeyField::editable()
            };
            self.form.clamp_focus();
        }
        self.notify(Notice::info("Settings saved."));
        self.close();
    }

    // ── Connection test ─────────────────────────────────────────────────────

    /// Ask the backend to try the current form values without saving them.
    pub fn test_connection(&mut self) -> Result<(), ValidationError> {
        let request = match self.build_test_request() {
            Ok(request) => request,
            Err(err) => {
                self.form.banner = ConnectionBanner::Failed(err.to_string());
                return Err(err);
            }
        };

        self.form.banner = ConnectionBanner::Pending;
        debug!(provider = %request.provider, model = %request.config.model, "testing connection");
        let backend = Arc::clone(&self.backend);
        let tx = self.action_tx.clone();
        tokio::spawn(async move {
            let result = backend
                .test_connection(&request)
                .await
                .map_err(|e| e.to_string());
            let _ = tx.send(Action::Panel(PanelEvent::Tested(result)));
        });
        Ok(())
    }

    fn build_test_request(&self) -> Result<TestRequest, ValidationError> {
        let model = self
            .form
            .models
            .selected()
            .ok_or(ValidationError::MissingModel)?;

        let api_key = match &self.form.key {
            KeyField::Hidden => String::new(),
            KeyField::Stored => self
                .cached_key
                .as_ref()
                .map(|k| k.expose_secret().clone())
                .ok_or(ValidationError::StoredKeyUnavailable)?,
            KeyField::Editable { input, .. } => {
                let value = input.value();
                if value.is_empty() {
                    return Err(ValidationError::MissingKey);
                }
                value.to_string()
            }
        };

        let (host, port) = match &self.form.pull {
            Some(pull) => (Some(pull.host().to_string()), pull.port()),
            None => (None, None),
        };

        Ok(TestRequest {
            provider: self.form.provider.clone(),
            config: TestConfig {
                api_key,
                model: model.to_string(),
                host,
                port,
            },
        })
    }

    fn on_tested(&mut self, result: Result<TestResponse, String>) {
        self.form.banner = match result {
            Ok(response) if response.connected => {
                info!(provider = %self.form.provider, "connection test succeeded");
                ConnectionBanner::Connected
            }
            Ok(response) => {
                let message = response
                    .message
                    .filter(|m| !m.is_empty())
                    .unwrap_or_else(|| "Unable to connect".to_string());
                warn!(provider = %self.form.provider, message = %message, "connection test failed");
                ConnectionBanner::Failed(message)
            }
            Err(err) => {
                warn!(provider = %self.form.provider, error = %err, "connection test request failed");
                ConnectionBanner::Failed(err)
            }
        };
    }

    // ── Model pull ──────────────────────────────────────────────────────────

    /// Queue a model download on a locally hosted provider.  The model list
    /// is refreshed after a fixed delay whether or not the download finished.
    pub fn pull_model(&mut self) -> Result<(), ValidationError> {
        let request = match self.build_pull_request() {
            Ok(request) => request,
            Err(err) => {
                self.notify(Notice::error(err.to_string()));
                return Err(err);
            }
        };
        if let Some(pull) = self.form.pull.as_mut() {
            pull.in_flight = true;
        }
        self.form.clamp_focus();

        info!(provider = %request.provider, model = %request.model_name, "queueing model pull");
        let backend = Arc::clone(&self.backend);
        let tx = self.action_tx.clone();
        tokio::spawn(async move {
            let provider = request.provider.clone();
            let result = backend
                .pull_model(&request)
                .await
                .map_err(|e| e.to_string());
            let _ = tx.send(Action::Panel(PanelEvent::PullQueued { provider, result }));
        });
        Ok(())
    }

    fn build_pull_request(&self) -> Result<PullRequest, ValidationError> {
        let pull = self
            .form
            .pull
            .as_ref()
            .ok_or(ValidationError::PullUnavailable)?;
        if pull.in_flight {
            return Err(ValidationError::PullInFlight);
        }
        let model_name = pull.model_name.value().trim();
        if model_name.is_empty() {
            return Err(ValidationError::MissingPullModel);
        }
        let port = pull.port().ok_or(ValidationError::InvalidPort)?;
        Ok(PullRequest {
            provider: self.form.provider.clone(),
            model_name: model_name.to_string(),
            host: pull.host().to_string(),
            port,
        })
    }

    fn on_pull_queued(&mut self, provider: String, result: Result<(), String>) {
        let still_selected = provider == self.form.provider;
        if still_selected {
            if let Some(pull) = self.form.pull.as_mut() {
                pull.in_flight = false;
            }
        }

        if let Err(err) = result {
            warn!(provider = %provider, error = %err, "model pull failed");
            self.notify(Notice::error(format!("Error: {err}")));
            return;
        }

        self.notify(Notice::info(
            "Model queued for download. You can close this dialog; it continues in the background.",
        ));
        if still_selected {
            if let Some(pull) = self.form.pull.as_mut() {
                pull.model_name.reset();
            }
        }

        let delay = self.options.model_refresh_delay;
        let tx = self.action_tx.clone();
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let _ = tx.send(Action::Panel(PanelEvent::RefreshModels(provider)));
        });
    }

    // ── Event plumbing ──────────────────────────────────────────────────────

    /// Apply the completion of a background request.
    pub fn handle_event(&mut self, event: PanelEvent) {
        match event {
            PanelEvent::Loaded(result) => self.on_loaded(result),
            PanelEvent::ModelsLoaded {
                provider,
                generation,
                result,
            } => self.on_models_loaded(provider, generation, result),
            PanelEvent::Saved { request, result } => self.on_saved(request, result),
            PanelEvent::Tested(result) => self.on_tested(result),
            PanelEvent::PullQueued { provider, result } => self.on_pull_queued(provider, result),
            PanelEvent::RefreshModels(provider) => {
                if provider == self.form.provider {
                    self.load_models(&provider);
                } else {
                    debug!(provider = %provider, "skipping refresh for deselected provider");
                }
            }
        }
    }

    fn notify(&mut self, notice: Notice) {
        debug!(level = ?notice.level, text = %notice.text, "notice");
        self.notices.push(notice);
    }
}
