// Resolves runtime settings from command-line/env overrides, stored values and defaults

use crate::db;
use crate::error::{BlogError, Result};
use crate::export::PdfOptions;

use reqwest::Url;
use rusqlite::Connection;

pub const DEFAULT_API_URL: &str = "http://localhost:8000/generate";
pub const DEFAULT_IMAGE_SEARCH_URL: &str = "https://api.pexels.com/v1/search";
pub const DEFAULT_PDF_RENDERER: &str = "wkhtmltopdf";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigKey {
    ApiUrl,
    ImageSearchUrl,
    PexelsApiKey,
    PdfRenderer,
}

impl ConfigKey {
    pub const ALL: [ConfigKey; 4] = [
        ConfigKey::ApiUrl,
        ConfigKey::ImageSearchUrl,
        ConfigKey::PexelsApiKey,
        ConfigKey::PdfRenderer,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ConfigKey::ApiUrl => "api_url",
            ConfigKey::ImageSearchUrl => "image_search_url",
            ConfigKey::PexelsApiKey => "pexels_api_key",
            ConfigKey::PdfRenderer => "pdf_renderer",
        }
    }

    pub fn parse(key: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|k| k.as_str() == key)
            .ok_or_else(|| BlogError::Config(format!("unknown key '{}'", key)))
    }

    fn is_url(&self) -> bool {
        matches!(self, ConfigKey::ApiUrl | ConfigKey::ImageSearchUrl)
    }

    fn is_secret(&self) -> bool {
        matches!(self, ConfigKey::PexelsApiKey)
    }
}

/// Values supplied on the command line or through the environment.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub api_url: Option<String>,
    pub image_search_url: Option<String>,
    pub pexels_api_key: Option<String>,
    pub pdf_renderer: Option<String>,
}

impl Overrides {
    fn get(&self, key: ConfigKey) -> Option<&str> {
        let value = match key {
            ConfigKey::ApiUrl => &self.api_url,
            ConfigKey::ImageSearchUrl => &self.image_search_url,
            ConfigKey::PexelsApiKey => &self.pexels_api_key,
            ConfigKey::PdfRenderer => &self.pdf_renderer,
        };
        value.as_deref().filter(|v| !v.trim().is_empty())
    }
}

#[derive(Debug, Clone)]
pub struct Settings {
    pub api_url: String,
    pub image_search_url: String,
    pub pexels_api_key: Option<String>,
    pub pdf: PdfOptions,
}

impl Settings {
    /// Override beats stored value beats default.
    pub fn resolve(conn: &Connection, overrides: &Overrides) -> Result<Self> {
        let lookup = |key: ConfigKey| -> Result<Option<String>> {
            if let Some(value) = overrides.get(key) {
                return Ok(Some(value.to_string()));
            }
            Ok(db::get_config_value(conn, key.as_str())?)
        };

        let api_url = lookup(ConfigKey::ApiUrl)?.unwrap_or_else(|| DEFAULT_API_URL.to_string());
        let image_search_url = lookup(ConfigKey::ImageSearchUrl)?
            .unwrap_or_else(|| DEFAULT_IMAGE_SEARCH_URL.to_string());
        validate_url(ConfigKey::ApiUrl, &api_url)?;
        validate_url(ConfigKey::ImageSearchUrl, &image_search_url)?;

        let mut pdf = PdfOptions::default();
        if let Some(renderer) = lookup(ConfigKey::PdfRenderer)? {
            pdf.renderer = renderer;
        }

        Ok(Self {
            api_url,
            image_search_url,
            pexels_api_key: lookup(ConfigKey::PexelsApiKey)?,
            pdf,
        })
    }
}

fn validate_url(key: ConfigKey, value: &str) -> Result<()> {
    let url = Url::parse(value)
        .map_err(|e| BlogError::Config(format!("{} '{}' is not a valid URL: {}", key.as_str(), value, e)))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(BlogError::Config(format!(
            "{} must use http or https, got '{}'",
            key.as_str(),
            url.scheme()
        )));
    }
    Ok(())
}

/// Persists a setting after validating it.
pub fn set_value(conn: &Connection, key: &str, value: &str) -> Result<()> {
    let key = ConfigKey::parse(key)?;
    let value = value.trim();
    if value.is_empty() {
        return Err(BlogError::Config(format!("{} must not be empty", key.as_str())));
    }
    if key.is_url() {
        validate_url(key, value)?;
    }
    db::update_config_value(conn, key.as_str(), value)?;
    tracing::info!("stored setting {}", key.as_str());
    Ok(())
}

pub fn unset_value(conn: &Connection, key: &str) -> Result<()> {
    let key = ConfigKey::parse(key)?;
    db::delete_config_value(conn, key.as_str())?;
    Ok(())
}

/// Stored value for `key`, with secrets masked.
pub fn display_value(conn: &Connection, key: ConfigKey) -> Result<Option<String>> {
    let value = db::get_config_value(conn, key.as_str())?;
    Ok(value.map(|v| if key.is_secret() { mask(&v) } else { v }))
}

fn mask(secret: &str) -> String {
    if secret.chars().count() <= 4 {
        return "****".to_string();
    }
    let visible: String = secret.chars().rev().take(4).collect::<Vec<_>>().into_iter().rev().collect();
    format!("****{}", visible)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn memory() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        db::init_schema(&conn).unwrap();
        conn
    }

    #[test]
    fn defaults_apply_when_nothing_is_set() {
        let settings = Settings::resolve(&memory(), &Overrides::default()).unwrap();

        assert_eq!(settings.api_url, DEFAULT_API_URL);
        assert_eq!(settings.image_search_url, DEFAULT_IMAGE_SEARCH_URL);
        assert_eq!(settings.pexels_api_key, None);
        assert_eq!(settings.pdf.renderer, DEFAULT_PDF_RENDERER);
    }

    #[test]
    fn overrides_beat_stored_values() {
        let conn = memory();
        set_value(&conn, "api_url", "http://stored:9000/generate").unwrap();
        set_value(&conn, "pexels_api_key", "stored-key").unwrap();

        let overrides = Overrides {
            api_url: Some("http://flag:1/generate".into()),
            pexels_api_key: Some("  ".into()),
            ..Overrides::default()
        };
        let settings = Settings::resolve(&conn, &overrides).unwrap();

        assert_eq!(settings.api_url, "http://flag:1/generate");
        assert_eq!(settings.pexels_api_key.as_deref(), Some("stored-key"));
    }

    #[test]
    fn rejects_unknown_keys_and_bad_urls() {
        let conn = memory();
        assert!(matches!(set_value(&conn, "colour", "blue"), Err(BlogError::Config(_))));
        assert!(matches!(set_value(&conn, "api_url", "not a url"), Err(BlogError::Config(_))));
        assert!(matches!(set_value(&conn, "api_url", "ftp://x/y"), Err(BlogError::Config(_))));
        assert!(matches!(set_value(&conn, "pdf_renderer", " "), Err(BlogError::Config(_))));
    }

    #[test]
    fn secrets_are_masked_and_unset_restores_defaults() {
        let conn = memory();
        set_value(&conn, "pexels_api_key", "abcdef123456").unwrap();
        assert_eq!(
            display_value(&conn, ConfigKey::PexelsApiKey).unwrap().as_deref(),
            Some("****3456")
        );

        set_value(&conn, "pexels_api_key", "abc").unwrap();
        assert_eq!(
            display_value(&conn, ConfigKey::PexelsApiKey).unwrap().as_deref(),
            Some("****")
        );
        assert_eq!(mask("abcd"), "****");
        assert_eq!(mask("abcde"), "****bcde");

        unset_value(&conn, "pexels_api_key").unwrap();
        assert_eq!(display_value(&conn, ConfigKey::PexelsApiKey).unwrap(), None);
    }
}
