use std::{path::Path, time::Duration};

use anyhow::{bail, Context};
use config::{Config, Environment, File};
use serde::Deserialize;
use url::Url;

use crate::progress::ProgressSettings;

pub const DEFAULT_CONFIG_FILE: &str = "ats_client.toml";
pub const BASE_URL_ENV: &str = "ATS_API_BASE_URL";

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ClientSettings {
    pub base_url: String,
    pub analyze_path: String,
    pub health_path: String,
    pub request_timeout_secs: u64,
    pub progress_tick_ms: u64,
    pub progress_step: u8,
    pub progress_cap: u8,
}

impl Default for ClientSettings {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:8000".into(),
            analyze_path: "/api/analyze-resume".into(),
            health_path: "/health".into(),
            request_timeout_secs: 120,
            progress_tick_ms: 200,
            progress_step: 10,
            progress_cap: 90,
        }
    }
}

impl ClientSettings {
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn progress_settings(&self) -> ProgressSettings {
        ProgressSettings {
            tick: Duration::from_millis(self.progress_tick_ms),
            step: self.progress_step,
            cap: self.progress_cap,
        }
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        let url = Url::parse(&self.base_url)
            .with_context(|| format!("invalid analyzer base url '{}'", self.base_url))?;
        if !matches!(url.scheme(), "http" | "https") {
            bail!("analyzer base url must use http or https, got '{}'", url.scheme());
        }
        if !self.analyze_path.starts_with('/') || !self.health_path.starts_with('/') {
            bail!("endpoint paths must start with '/'");
        }
        if self.request_timeout_secs == 0 {
            bail!("request_timeout_secs must be positive");
        }
        if self.progress_tick_ms == 0 || self.progress_step == 0 {
            bail!("progress_tick_ms and progress_step must be positive");
        }
        if self.progress_cap >= 100 {
            bail!("progress_cap must stay below 100, got {}", self.progress_cap);
        }
        Ok(())
    }
}

pub fn load_settings() -> anyhow::Result<ClientSettings> {
    load_settings_from(Path::new(DEFAULT_CONFIG_FILE))
}

/// Defaults, then the optional TOML file, then `APP__*` variables, then
/// `ATS_API_BASE_URL`.
pub fn load_settings_from(path: &Path) -> anyhow::Result<ClientSettings> {
    let mut settings: ClientSettings = Config::builder()
        .add_source(File::from(path).required(false))
        .add_source(
            Environment::with_prefix("APP")
                .prefix_separator("__")
                .separator("__")
                .try_parsing(true),
        )
        .build()
        .with_context(|| format!("failed to load client settings from '{}'", path.display()))?
        .try_deserialize()
        .context("failed to decode client settings")?;

    if let Ok(v) = std::env::var(BASE_URL_ENV) {
        settings.base_url = v;
    }

    settings.base_url = settings.base_url.trim().trim_end_matches('/').to_string();
    settings.validate()?;
    Ok(settings)
}

#[cfg(test)]
#[path = "tests/config_tests.rs"]
mod tests;
