//! Headless subcommands: the same backend operations as the dialog, for
//! scripts and terminals without a TUI.

use std::time::Duration;

use anyhow::{Context, Result, bail};
use clap::Subcommand;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::debug;

use crate::api::{PullRequest, SaveRequest, SettingsBackend, TestConfig, TestRequest};
use crate::config::Config;
use crate::providers::ProviderCatalog;
use crate::theme as t;

#[derive(Debug, Clone, Subcommand, strum::IntoStaticStr)]
#[strum(serialize_all = "kebab-case")]
pub enum SettingsCommand {
    /// List the providers the backend offers
    Providers,
    /// Show the active AI configuration
    Show,
    /// List the models available for a provider
    Models {
        /// Provider id (defaults to the active provider)
        provider: Option<String>,
    },
    /// Check that a provider/model combination works, without saving it
    Test(TargetArgs),
    /// Save the AI configuration
    Save(TargetArgs),
    /// Queue a model download on a locally hosted provider
    Pull {
        /// Model to download
        model_name: String,
        #[arg(long)]
        provider: Option<String>,
        #[arg(long)]
        host: Option<String>,
        #[arg(long)]
        port: Option<u16>,
    },
}

#[derive(Debug, Clone, Default, clap::Args)]
pub struct TargetArgs {
    /// Provider id (defaults to the active provider)
    #[arg(long)]
    pub provider: Option<String>,
    /// Model name (defaults to the active model)
    #[arg(long)]
    pub model: Option<String>,
    /// API key.  Omit to keep the stored key.
    #[arg(long, env = "MATCHER_API_KEY", hide_env_values = true)]
    pub api_key: Option<String>,
    /// Prompt for the API key without echoing it
    #[arg(long, conflicts_with = "api_key")]
    pub prompt_key: bool,
    #[arg(long)]
    pub host: Option<String>,
    #[arg(long)]
    pub port: Option<u16>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandResponse {
    pub messages: Vec<String>,
}

impl CommandResponse {
    fn new(messages: Vec<String>) -> Self {
        Self { messages }
    }
}

/// Run `command`, showing a spinner while the backend works, and print the
/// result.
pub async fn run(command: SettingsCommand, backend: &dyn SettingsBackend, config: &Config) -> Result<()> {
    let command = resolve_prompts(command)?;

    let spinner = ProgressBar::new_spinner();
    spinner.set_style(
        ProgressStyle::with_template("{spinner:.cyan} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    spinner.set_message(format!("Contacting {}…", config.backend_url));
    spinner.enable_steady_tick(Duration::from_millis(80));

    let result = execute(&command, backend, config).await;
    spinner.finish_and_clear();

    for line in result?.messages {
        println!("{line}");
    }
    Ok(())
}

fn resolve_prompts(command: SettingsCommand) -> Result<SettingsCommand> {
    let prompt = |mut args: TargetArgs| -> Result<TargetArgs> {
        if args.prompt_key {
            let key = rpassword::prompt_password(t::accent("API key: "))
                .context("Failed to read API key")?;
            args.api_key = Some(key);
        }
        Ok(args)
    };
    Ok(match command {
        SettingsCommand::Test(args) => SettingsCommand::Test(prompt(args)?),
        SettingsCommand::Save(args) => SettingsCommand::Save(prompt(args)?),
        other => other,
    })
}

/// Execute `command` against `backend` and describe the outcome.
pub async fn execute(
    command: &SettingsCommand,
    backend: &dyn SettingsBackend,
    config: &Config,
) -> Result<CommandResponse> {
    let name: &'static str = command.into();
    debug!(command = name, backend = %config.backend_url, "executing");
    match command {
        SettingsCommand::Providers => {
            let catalog = ProviderCatalog::new(backend.providers().await?);
            let current = backend.current_settings().await?;
            let mut messages = vec![t::heading("AI providers:")];
            if catalog.is_empty() {
                messages.push(format!("  {}", t::muted("The backend offers no providers.")));
            }
            for provider in catalog.iter() {
                let marker = if current.configured && current.provider == provider.id {
                    t::icon_ok("")
                } else {
                    "  ".to_string()
                };
                let mut needs = Vec::new();
                if provider.requires_api_key {
                    needs.push("API key");
                }
                if provider.requires_host {
                    needs.push("local host");
                }
                let needs = if needs.is_empty() {
                    String::new()
                } else {
                    t::muted(&format!(" (needs {})", needs.join(", ")))
                };
                messages.push(format!(
                    "{marker} {:<14} {}{needs}",
                    t::accent_bright(&provider.id),
                    provider.name
                ));
                if !provider.description.is_empty() {
                    messages.push(format!("     {}", t::muted(&provider.description)));
                }
            }
            Ok(CommandResponse::new(messages))
        }

        SettingsCommand::Show => {
            let (providers, current) =
                tokio::try_join!(backend.providers(), backend.current_settings())?;
            let catalog = ProviderCatalog::new(providers);
            if !current.configured {
                return Ok(CommandResponse::new(vec![
                    t::icon_warn("No AI provider configured yet."),
                    t::muted(&format!(
                        "The dialog will suggest {}.",
                        config.fallback_provider
                    )),
                ]));
            }
            let key = if current.api_key_set { "stored" } else { "none" };
            let mut messages = vec![
                t::heading("Active AI configuration:"),
                format!(
                    "  Provider  {} ({})",
                    t::accent_bright(catalog.display_name(&current.provider)),
                    current.provider
                ),
                format!("  Model     {}", current.model_name),
                format!("  API key   {key}"),
            ];
            if let Some(host) = &current.host {
                let port = current.port.map(|p| format!(":{p}")).unwrap_or_default();
                messages.push(format!("  Host      {host}{port}"));
            }
            Ok(CommandResponse::new(messages))
        }

        SettingsCommand::Models { provider } => {
            let provider = match provider {
                Some(provider) => provider.clone(),
                None => active_provider(backend, config).await?,
            };
            let models = backend.models(&provider).await?;
            if models.is_empty() {
                return Ok(CommandResponse::new(vec![t::icon_warn(&format!(
                    "No models available for {provider}."
                ))]));
            }
            let mut messages = vec![t::heading(&format!("Models for {provider}:"))];
            messages.extend(models.iter().map(|m| format!("  {m}")));
            Ok(CommandResponse::new(messages))
        }

        SettingsCommand::Test(args) => {
            let current = backend.current_settings().await?;
            let provider = args
                .provider
                .clone()
                .unwrap_or_else(|| default_provider(&current, config));
            let descriptor = ProviderCatalog::new(backend.providers().await?)
                .get(&provider)
                .cloned()
                .with_context(|| format!("Unknown provider: {provider}"))?;
            let model = args
                .model
                .clone()
                .or_else(|| (current.provider == provider).then(|| current.model_name.clone()))
                .filter(|m| !m.is_empty())
                .context("Please choose a model first (--model)")?;

            let api_key = if !descriptor.requires_api_key {
                String::new()
            } else if let Some(key) = args.api_key.clone().filter(|k| !k.is_empty()) {
                key
            } else if let Some(key) = current
                .api_key
                .clone()
                .filter(|k| !k.is_empty() && current.provider == provider)
            {
                key
            } else {
                bail!("Please enter an API key first (--api-key or --prompt-key)");
            };

            let (host, port) = if descriptor.requires_host {
                host_and_port(args.host.clone(), args.port, &current, &provider, config)
            } else {
                (None, None)
            };

            let response = backend
                .test_connection(&TestRequest {
                    provider: provider.clone(),
                    config: TestConfig {
                        api_key,
                        model,
                        host,
                        port,
                    },
                })
                .await?;
            let line = if response.connected {
                t::icon_ok("Connection successful!")
            } else {
                let message = response
                    .message
                    .filter(|m| !m.is_empty())
                    .unwrap_or_else(|| "Unable to connect".to_string());
                t::icon_err(&format!("Error: {message}"))
            };
            Ok(CommandResponse::new(vec![line]))
        }

        SettingsCommand::Save(args) => {
            let current = backend.current_settings().await?;
            let provider = args
                .provider
                .clone()
                .unwrap_or_else(|| default_provider(&current, config));
            let descriptor = ProviderCatalog::new(backend.providers().await?)
                .get(&provider)
                .cloned()
                .with_context(|| format!("Unknown provider: {provider}"))?;
            let model_name = args
                .model
                .clone()
                .or_else(|| (current.provider == provider).then(|| current.model_name.clone()))
                .filter(|m| !m.is_empty())
                .context("Please choose a model first (--model)")?;
            let (host, port) = if descriptor.requires_host {
                host_and_port(args.host.clone(), args.port, &current, &provider, config)
            } else {
                (None, None)
            };

            let request = SaveRequest {
                provider: provider.clone(),
                model_name,
                api_key: args.api_key.clone().unwrap_or_default(),
                host,
                port,
            };
            backend.save_settings(&request).await?;

            let mut messages = vec![t::icon_ok("Settings saved.")];
            if descriptor.requires_api_key && request.api_key.is_empty() {
                messages.push(t::muted("The stored API key was left unchanged."));
            }
            Ok(CommandResponse::new(messages))
        }

        SettingsCommand::Pull {
            model_name,
            provider,
            host,
            port,
        } => {
            let current = backend.current_settings().await?;
            let provider = provider
                .clone()
                .unwrap_or_else(|| default_provider(&current, config));
            let descriptor = ProviderCatalog::new(backend.providers().await?)
                .get(&provider)
                .cloned()
                .with_context(|| format!("Unknown provider: {provider}"))?;
            if !descriptor.requires_host {
                bail!("{} does not host models locally", descriptor.name);
            }
            let model_name = model_name.trim();
            if model_name.is_empty() {
                bail!("Please enter the name of the model to pull");
            }
            let (host, port) = host_and_port(host.clone(), *port, &current, &provider, config);
            backend
                .pull_model(&PullRequest {
                    provider,
                    model_name: model_name.to_string(),
                    host: host.unwrap_or_else(|| config.default_host.clone()),
                    port: port.unwrap_or(config.default_port),
                })
                .await?;
            Ok(CommandResponse::new(vec![
                t::icon_ok("Model queued for download."),
                t::muted("It continues in the background; run `models` later to see it."),
            ]))
        }
    }
}

fn default_provider(current: &crate::api::CurrentSettings, config: &Config) -> String {
    if current.configured {
        current.provider.clone()
    } else {
        config.fallback_provider.clone()
    }
}

async fn active_provider(backend: &dyn SettingsBackend, config: &Config) -> Result<String> {
    Ok(default_provider(&backend.current_settings().await?, config))
}

/// Explicit values win, then what is saved for `provider`, then the
/// configured defaults.
fn host_and_port(
    host: Option<String>,
    port: Option<u16>,
    current: &crate::api::CurrentSettings,
    provider: &str,
    config: &Config,
) -> (Option<String>, Option<u16>) {
    let saved = (current.provider == provider).then_some(current);
    let host = host
        .or_else(|| saved.and_then(|c| c.host.clone()))
        .filter(|h| !h.is_empty())
        .unwrap_or_else(|| config.default_host.clone());
    let port = port
        .or_else(|| saved.and_then(|c| c.port))
        .unwrap_or(config.default_port);
    (Some(host), Some(port))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::CurrentSettings;

    #[test]
    fn host_and_port_prefers_explicit_then_saved() {
        let config = Config::default();
        let current = CurrentSettings {
            provider: "ollama".into(),
            host: Some("gpu-box".into()),
            port: Some(9000),
            configured: true,
            ..Default::default()
        };

        assert_eq!(
            host_and_port(None, None, &current, "ollama", &config),
            (Some("gpu-box".into()), Some(9000))
        );
        assert_eq!(
            host_and_port(Some("other".into()), Some(1), &current, "ollama", &config),
            (Some("other".into()), Some(1))
        );
        assert_eq!(
            host_and_port(None, None, &current, "lmstudio", &config),
            (Some("localhost".into()), Some(11434))
        );
    }

    #[test]
    fn default_provider_falls_back_when_unconfigured() {
        let config = Config::default();
        assert_eq!(default_provider(&CurrentSettings::default(), &config), "gemini");
        let current = CurrentSettings {
            provider: "openai".into(),
            configured: true,
            ..Default::default()
        };
        assert_eq!(default_provider(&current, &config), "openai");
    }
}
