// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Context, Result, anyhow, bail};
use crmdesk_app::ViewKind;
use serde::Deserialize;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const APP_NAME: &str = "crmdesk";
const CONFIG_VERSION: i64 = 1;
const DEFAULT_LOG_FILTER: &str = "info";
const CONFIG_PATH_ENV: &str = "CRMDESK_CONFIG_PATH";
const API_URL_ENV: &str = "CRMDESK_API_URL";

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub version: i64,
    #[serde(default)]
    pub api: Api,
    #[serde(default)]
    pub ui: Ui,
    #[serde(default)]
    pub chat: Chat,
    #[serde(default)]
    pub log: Log,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            version: CONFIG_VERSION,
            api: Api::default(),
            ui: Ui::default(),
            chat: Chat::default(),
            log: Log::default(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Api {
    pub base_url: Option<String>,
    pub timeout: Option<String>,
}

impl Default for Api {
    fn default() -> Self {
        Self {
            base_url: Some(crmdesk_api::DEFAULT_BASE_URL.to_owned()),
            timeout: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Ui {
    pub start_view: Option<String>,
}

impl Default for Ui {
    fn default() -> Self {
        Self {
            start_view: Some("dashboard".to_owned()),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Chat {
    pub enabled: Option<bool>,
}

impl Default for Chat {
    fn default() -> Self {
        Self {
            enabled: Some(true),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Log {
    pub path: Option<String>,
    pub filter: Option<String>,
}

impl Default for Log {
    fn default() -> Self {
        Self {
            path: None,
            filter: Some(DEFAULT_LOG_FILTER.to_owned()),
        }
    }
}

impl Config {
    pub fn default_path() -> Result<PathBuf> {
        if let Some(path) = env::var_os(CONFIG_PATH_ENV) {
            return Ok(PathBuf::from(path));
        }

        let config_root = dirs::config_dir().ok_or_else(|| {
            anyhow!("cannot resolve config directory; set {CONFIG_PATH_ENV} to the config file")
        })?;
        Ok(config_root.join(APP_NAME).join("config.toml"))
    }

    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let raw = fs::read_to_string(path)
            .with_context(|| format!("read config file {}", path.display()))?;
        let value: toml::Value = toml::from_str(&raw)
            .with_context(|| format!("parse TOML config {}", path.display()))?;

        let version = value
            .get("version")
            .and_then(toml::Value::as_integer)
            .ok_or_else(|| {
                anyhow!(
                    "config file {} has no version. Add `version = 1` and put values under [api], [ui], [chat] and [log]",
                    path.display()
                )
            })?;

        if version != CONFIG_VERSION {
            bail!(
                "unsupported config version {} in {}; expected version = 1",
                version,
                path.display()
            );
        }

        let config: Config = value
            .try_into()
            .with_context(|| format!("decode config {}", path.display()))?;
        config.validate(path)?;
        Ok(config)
    }

    fn validate(&self, path: &Path) -> Result<()> {
        if let Some(base_url) = &self.api.base_url {
            crmdesk_api::normalize_base_url(base_url)
                .with_context(|| format!("invalid [api] section in {}", path.display()))?;
        }

        if let Some(timeout) = &self.api.timeout {
            let parsed = parse_duration(timeout)?;
            if parsed <= Duration::ZERO {
                bail!(
                    "api.timeout in {} must be positive, got {}",
                    path.display(),
                    timeout
                );
            }
        }

        if let Some(view) = &self.ui.start_view
            && ViewKind::parse(view).is_none()
        {
            let known = ViewKind::ALL
                .iter()
                .map(|view| view.label())
                .collect::<Vec<_>>()
                .join(", ");
            bail!(
                "ui.start_view {view:?} in {} is not a view; use one of: {known}",
                path.display()
            );
        }

        Ok(())
    }

    /// Backend base URL; `CRMDESK_API_URL` wins over the file.
    pub fn api_base_url(&self) -> Result<String> {
        if let Some(raw) = env::var_os(API_URL_ENV) {
            let raw = raw.to_string_lossy();
            return crmdesk_api::normalize_base_url(&raw)
                .with_context(|| format!("invalid {API_URL_ENV}"));
        }
        crmdesk_api::normalize_base_url(
            self.api
                .base_url
                .as_deref()
                .unwrap_or(crmdesk_api::DEFAULT_BASE_URL),
        )
    }

    pub fn api_timeout(&self) -> Result<Option<Duration>> {
        self.api.timeout.as_deref().map(parse_duration).transpose()
    }

    pub fn start_view(&self) -> ViewKind {
        self.ui
            .start_view
            .as_deref()
            .and_then(ViewKind::parse)
            .unwrap_or(ViewKind::Dashboard)
    }

    pub fn chat_enabled(&self) -> bool {
        self.chat.enabled.unwrap_or(true)
    }

    pub fn log_filter(&self) -> &str {
        self.log.filter.as_deref().unwrap_or(DEFAULT_LOG_FILTER)
    }

    pub fn log_path(&self) -> Result<PathBuf> {
        if let Some(path) = &self.log.path {
            return Ok(PathBuf::from(path));
        }
        let cache_root = dirs::cache_dir().ok_or_else(|| {
            anyhow!("cannot resolve cache directory; set [log].path in the config")
        })?;
        Ok(cache_root.join(APP_NAME).join("crmdesk.log"))
    }

    pub fn example_config(path: &Path) -> String {
        format!(
            "# crmdesk config\n# Place this file at: {}\n\nversion = 1\n\n[api]\nbase_url = \"{}\"\n# Optional. Unset means requests never time out.\n# timeout = \"30s\"\n\n[ui]\nstart_view = \"dashboard\"\n\n[chat]\nenabled = true\n\n[log]\n# Optional. Default is the platform cache dir (for example ~/.cache/crmdesk/crmdesk.log)\n# path = \"/absolute/path/to/crmdesk.log\"\nfilter = \"{}\"\n",
            path.display(),
            crmdesk_api::DEFAULT_BASE_URL,
            DEFAULT_LOG_FILTER,
        )
    }
}

fn parse_duration(raw: &str) -> Result<Duration> {
    if let Some(value) = raw.strip_suffix("ms") {
        let millis: u64 = value
            .parse()
            .with_context(|| format!("invalid timeout duration {raw:?}"))?;
        return Ok(Duration::from_millis(millis));
    }
    if let Some(value) = raw.strip_suffix('s') {
        let secs: u64 = value
            .parse()
            .with_context(|| format!("invalid timeout duration {raw:?}"))?;
        return Ok(Duration::from_secs(secs));
    }
    if let Some(value) = raw.strip_suffix('m') {
        let mins: u64 = value
            .parse()
            .with_context(|| format!("invalid timeout duration {raw:?}"))?;
        return Ok(Duration::from_secs(mins * 60));
    }

    bail!("invalid duration {raw:?}; use one of: <N>ms, <N>s, <N>m (for example 500ms or 30s)")
}
