use std::{fs, path::Path, time::Duration};

use anyhow::Context;
use client_core::{AdminOptions, APPS_COLLECTION, SAVE_TIMEOUT};
use serde::Deserialize;

pub const SETTINGS_FILE: &str = "portfolio.toml";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub database_url: String,
    pub collection: String,
    pub admin_email: String,
    /// Identity the CLI acts as; unset means signed out.
    pub operator_email: Option<String>,
    pub save_timeout_seconds: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            database_url: "sqlite://./data/portfolio.db".into(),
            collection: APPS_COLLECTION.into(),
            admin_email: "admin@example.com".into(),
            operator_email: None,
            save_timeout_seconds: SAVE_TIMEOUT.as_secs(),
        }
    }
}

impl Settings {
    pub fn admin_options(&self) -> AdminOptions {
        AdminOptions {
            collection: self.collection.clone(),
            save_timeout: Duration::from_secs(self.save_timeout_seconds),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct FileSettings {
    database_url: Option<String>,
    collection: Option<String>,
    admin_email: Option<String>,
    operator_email: Option<String>,
    save_timeout_seconds: Option<u64>,
}

pub fn load_settings() -> anyhow::Result<Settings> {
    load_settings_from(Path::new(SETTINGS_FILE), |key| std::env::var(key).ok())
}

/// Defaults, then the settings file if it exists, then the environment.
pub fn load_settings_from(
    file: &Path,
    env: impl Fn(&str) -> Option<String>,
) -> anyhow::Result<Settings> {
    let mut settings = Settings::default();

    if file.exists() {
        let raw = fs::read_to_string(file)
            .with_context(|| format!("failed to read settings file '{}'", file.display()))?;
        let file_cfg: FileSettings = toml::from_str(&raw)
            .with_context(|| format!("failed to parse settings file '{}'", file.display()))?;
        if let Some(v) = file_cfg.database_url {
            settings.database_url = v;
        }
        if let Some(v) = file_cfg.collection {
            settings.collection = v;
        }
        if let Some(v) = file_cfg.admin_email {
            settings.admin_email = v;
        }
        if let Some(v) = file_cfg.operator_email {
            settings.operator_email = Some(v);
        }
        if let Some(v) = file_cfg.save_timeout_seconds {
            settings.save_timeout_seconds = v;
        }
    }

    if let Some(v) = env("DATABASE_URL") {
        settings.database_url = v;
    }
    if let Some(v) = env("APP__DATABASE_URL") {
        settings.database_url = v;
    }

    if let Some(v) = env("ADMIN_EMAIL") {
        settings.admin_email = v;
    }
    if let Some(v) = env("APP__ADMIN_EMAIL") {
        settings.admin_email = v;
    }

    if let Some(v) = env("OPERATOR_EMAIL") {
        settings.operator_email = Some(v);
    }
    if let Some(v) = env("APP__OPERATOR_EMAIL") {
        settings.operator_email = Some(v);
    }

    if let Some(v) = env("APP__COLLECTION") {
        settings.collection = v;
    }

    if let Some(v) = env("APP__SAVE_TIMEOUT_SECONDS") {
        settings.save_timeout_seconds = v
            .parse()
            .with_context(|| format!("APP__SAVE_TIMEOUT_SECONDS is not a number: '{v}'"))?;
    }

    Ok(settings)
}

pub fn normalize_database_url(raw_database_url: &str) -> String {
    let raw_database_url = raw_database_url.trim();

    if raw_database_url.is_empty() {
        return Settings::default().database_url;
    }

    if raw_database_url.starts_with("sqlite::memory:")
        || raw_database_url.starts_with("sqlite://")
        || raw_database_url.contains("://")
    {
        return raw_database_url.to_string();
    }

    if let Some(path) = raw_database_url.strip_prefix("sqlite:") {
        return format!("sqlite://{}", path.replace('\\', "/"));
    }

    format!("sqlite://{}", raw_database_url.replace('\\', "/"))
}

#[cfg(test)]
#[path = "tests/config_tests.rs"]
mod tests;
