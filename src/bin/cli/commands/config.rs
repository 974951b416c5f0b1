use anyhow::{Context, Result};

use studymate_lib::ai::{AiConfig, Provider};
use studymate_lib::sync::SyncConfig;

use crate::app::App;
use crate::OutputFormat;

/// Fields of `config set-sync`; `None` keeps the stored value
pub struct SyncSettings {
    pub enabled: Option<bool>,
    pub app_id: Option<String>,
    pub app_secret: Option<String>,
    pub app_token: Option<String>,
    pub table_id: Option<String>,
    pub delay_secs: Option<u64>,
}

/// Keep the last four characters of a secret
fn mask(secret: &str) -> String {
    let chars: Vec<char> = secret.trim().chars().collect();
    if chars.is_empty() {
        return "(not set)".to_string();
    }
    if chars.len() <= 4 {
        return "****".to_string();
    }
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("****{}", tail)
}

pub fn run_show(app: &App, format: &OutputFormat) -> Result<()> {
    let ai = AiConfig::load(app.backend.as_ref())?;
    let sync = SyncConfig::load(app.backend.as_ref())?;

    match format {
        OutputFormat::Json => {
            let output = serde_json::json!({
                "dataDir": app.data_dir,
                "ai": {
                    "provider": ai.provider.to_string(),
                    "apiKey": mask(&ai.api_key),
                    "baseUrl": ai.base_url(),
                    "model": ai.model(),
                },
                "sync": {
                    "enabled": sync.enabled,
                    "complete": sync.is_complete(),
                    "appId": sync.app_id,
                    "appSecret": mask(&sync.app_secret),
                    "appToken": sync.app_token,
                    "tableId": sync.table_id,
                    "delaySecs": sync.delay_secs,
                },
            });
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
        OutputFormat::Plain => {
            println!("Data directory: {}", app.data_dir.display());
            println!();
            println!("AI");
            println!("  provider: {}", ai.provider);
            println!("  api key:  {}", mask(&ai.api_key));
            println!("  base url: {}", ai.base_url());
            println!("  model:    {}", ai.model());
            println!();
            println!("Sync");
            let state = match (sync.enabled, sync.is_complete()) {
                (true, true) => "enabled",
                (true, false) => "enabled (incomplete, not running)",
                _ => "disabled",
            };
            println!("  status:     {}", state);
            println!("  app id:     {}", sync.app_id);
            println!("  app secret: {}", mask(&sync.app_secret));
            println!("  app token:  {}", sync.app_token);
            println!("  table id:   {}", sync.table_id);
            println!("  delay:      {}s", sync.delay_secs);
        }
    }
    Ok(())
}

pub fn run_set_ai(
    app: &App,
    provider: Option<String>,
    api_key: Option<String>,
    base_url: Option<String>,
    model: Option<String>,
) -> Result<()> {
    let mut config = AiConfig::load(app.backend.as_ref())?;

    if let Some(provider) = provider {
        let provider: Provider = provider.parse()?;
        if provider != config.provider {
            // Endpoint and model of the old provider do not carry over
            config.base_url = None;
            config.model = None;
        }
        config.provider = provider;
    }
    if let Some(key) = api_key {
        config.api_key = key.trim().to_string();
    }
    if let Some(url) = base_url {
        config.base_url = Some(url.trim().to_string()).filter(|u| !u.is_empty());
    }
    if let Some(model) = model {
        config.model = Some(model.trim().to_string()).filter(|m| !m.is_empty());
    }

    config
        .save(app.backend.as_ref())
        .context("Failed to save AI config")?;
    println!(
        "AI provider set to {} ({}, {})",
        config.provider,
        config.model(),
        config.base_url()
    );
    Ok(())
}

pub fn run_set_sync(app: &App, settings: SyncSettings) -> Result<()> {
    let mut config = SyncConfig::load(app.backend.as_ref())?;

    if let Some(enabled) = settings.enabled {
        config.enabled = enabled;
    }
    if let Some(app_id) = settings.app_id {
        config.app_id = app_id.trim().to_string();
    }
    if let Some(app_secret) = settings.app_secret {
        config.app_secret = app_secret.trim().to_string();
    }
    if let Some(app_token) = settings.app_token {
        config.app_token = app_token.trim().to_string();
    }
    if let Some(table_id) = settings.table_id {
        config.table_id = table_id.trim().to_string();
    }
    if let Some(delay) = settings.delay_secs {
        config.delay_secs = delay;
    }

    config
        .save(app.backend.as_ref())
        .context("Failed to save sync config")?;

    if config.enabled && !config.is_complete() {
        println!("Sync enabled but incomplete: app id, app secret, app token and table id are all required.");
    } else {
        println!(
            "Sync {}",
            if config.enabled { "enabled" } else { "disabled" }
        );
    }
    Ok(())
}
