//! Application configuration.

use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Application configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Server configuration.
    pub server: ServerConfig,
    /// Database configuration.
    pub database: DatabaseConfig,
    /// Site behaviour (pagination, caching, media).
    #[serde(default)]
    pub site: SiteConfig,
    /// Administrator account created at startup if missing.
    #[serde(default)]
    pub admin: Option<AdminConfig>,
}

/// Server configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Host to bind to.
    #[serde(default = "default_host")]
    pub host: String,
    /// Port to bind to.
    #[serde(default = "default_port")]
    pub port: u16,
    /// Public URL of this site.
    pub url: String,
}

/// Database connection configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// Database connection URL.
    pub url: String,
    /// Maximum number of connections in the pool.
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    /// Minimum number of connections in the pool.
    #[serde(default = "default_min_connections")]
    pub min_connections: u32,
}

/// Site configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct SiteConfig {
    /// Number of posts on every paginated page.
    #[serde(default = "default_posts_per_page")]
    pub posts_per_page: u64,
    /// Lifetime of a cached index page, in seconds.
    #[serde(default = "default_index_cache_ttl_secs")]
    pub index_cache_ttl_secs: u64,
    /// Directory uploaded images are written to.
    #[serde(default = "default_media_root")]
    pub media_root: PathBuf,
    /// URL prefix uploaded images are served from.
    #[serde(default = "default_media_url")]
    pub media_url: String,
    /// Only send the session cookie over HTTPS.
    #[serde(default)]
    pub secure_cookies: bool,
    /// Largest accepted request body (post image uploads).
    #[serde(default = "default_max_upload_bytes")]
    pub max_upload_bytes: usize,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            posts_per_page: default_posts_per_page(),
            index_cache_ttl_secs: default_index_cache_ttl_secs(),
            media_root: default_media_root(),
            media_url: default_media_url(),
            secure_cookies: false,
            max_upload_bytes: default_max_upload_bytes(),
        }
    }
}

/// Bootstrap administrator account.
#[derive(Debug, Clone, Deserialize)]
pub struct AdminConfig {
    /// Administrator username.
    pub username: String,
    /// Administrator password.
    pub password: String,
    /// Administrator email.
    #[serde(default)]
    pub email: String,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

const fn default_port() -> u16 {
    8000
}

const fn default_max_connections() -> u32 {
    20
}

const fn default_min_connections() -> u32 {
    2
}

const fn default_posts_per_page() -> u64 {
    10
}

const fn default_index_cache_ttl_secs() -> u64 {
    60 * 15
}

fn default_media_root() -> PathBuf {
    PathBuf::from("./media")
}

fn default_media_url() -> String {
    "/media".to_string()
}

const fn default_max_upload_bytes() -> usize {
    5 * 1024 * 1024
}

impl Config {
    /// Load configuration from files and environment variables.
    ///
    /// Configuration is loaded in the following order:
    /// 1. `config/default.toml`
    /// 2. `config/{environment}.toml` (based on `YATUBE_ENV`)
    /// 3. Environment variables with `YATUBE__` prefix
    pub fn load() -> Result<Self, config::ConfigError> {
        let env = std::env::var("YATUBE_ENV").unwrap_or_else(|_| "development".to_string());

        let config = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name(&format!("config/{env}")).required(false))
            .add_source(
                config::Environment::with_prefix("YATUBE")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }

    /// Load configuration from a specific file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, config::ConfigError> {
        let config = config::Config::builder()
            .add_source(config::File::from(path.as_ref()))
            .add_source(
                config::Environment::with_prefix("YATUBE")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_site_defaults() {
        let site = SiteConfig::default();
        assert_eq!(site.posts_per_page, 10);
        assert_eq!(site.index_cache_ttl_secs, 900);
        assert_eq!(site.media_url, "/media");
        assert!(!site.secure_cookies);
    }

    #[test]
    fn test_minimal_config_fills_defaults() {
        let config = config::Config::builder()
            .add_source(config::File::from_str(
                r#"
                [server]
                url = "http://localhost:8000"

                [database]
                url = "postgres://localhost/yatube"
                "#,
                config::FileFormat::Toml,
            ))
            .build()
            .unwrap();

        let config: Config = config.try_deserialize().unwrap();
        assert_eq!(config.server.port, 8000);
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.database.max_connections, 20);
        assert_eq!(config.site.posts_per_page, 10);
        assert!(config.admin.is_none());
    }

    #[test]
    fn test_site_section_overrides() {
        let config = config::Config::builder()
            .add_source(config::File::from_str(
                r#"
                [server]
                url = "http://localhost:8000"

                [database]
                url = "sqlite::memory:"

                [site]
                posts_per_page = 3
                index_cache_ttl_secs = 5

                [admin]
                username = "root"
                password = "correct horse"
                "#,
                config::FileFormat::Toml,
            ))
            .build()
            .unwrap();

        let config: Config = config.try_deserialize().unwrap();
        assert_eq!(config.site.posts_per_page, 3);
        assert_eq!(config.site.index_cache_ttl_secs, 5);
        assert_eq!(config.site.media_url, "/media");
        let admin = config.admin.unwrap();
        assert_eq!(admin.username, "root");
        assert!(admin.email.is_empty());
    }
}
