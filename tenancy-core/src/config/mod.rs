use crate::error::AppError;
use crate::tenancy::BypassMatcher;
use config::{Config as Cfg, File};
use serde::Deserialize;
use uuid::Uuid;

pub const DEFAULT_TENANT_HEADER: &str = "X-Tenant-ID";

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default)]
    pub tenancy: TenancyConfig,
}

fn default_port() -> u16 {
    8080
}

/// Settings for tenant resolution, read from the `tenancy` section.
///
/// ```toml
/// [tenancy]
/// ignored_paths = ["/actuator/**"]
///
/// [[tenancy.bootstrap_tenants]]
/// slug = "tenant-green"
///
/// [[tenancy.bootstrap_tenants]]
/// id = "5f0c1c8e-4d7a-4a8e-9a55-0a2b7d3c9e11"
/// slug = "tenant-disabled"
/// active = false
/// ```
#[derive(Debug, Deserialize, Clone)]
pub struct TenancyConfig {
    #[serde(default = "default_header_name")]
    pub header_name: String,
    /// An explicitly empty list disables bypass entirely.
    #[serde(default = "default_ignored_paths")]
    pub ignored_paths: Vec<String>,
    #[serde(default)]
    pub bootstrap_tenants: Vec<TenantSeed>,
}

impl Default for TenancyConfig {
    fn default() -> Self {
        Self {
            header_name: default_header_name(),
            ignored_paths: default_ignored_paths(),
            bootstrap_tenants: Vec::new(),
        }
    }
}

fn default_header_name() -> String {
    DEFAULT_TENANT_HEADER.to_string()
}

fn default_ignored_paths() -> Vec<String> {
    vec!["/actuator/**".to_string()]
}

/// A tenant supplied through static configuration.
#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
pub struct TenantSeed {
    /// Derived from the slug when omitted.
    #[serde(default)]
    pub id: Option<Uuid>,
    #[serde(default)]
    pub slug: String,
    #[serde(default = "default_active")]
    pub active: bool,
}

fn default_active() -> bool {
    true
}

impl TenantSeed {
    pub fn new(slug: impl Into<String>) -> Self {
        Self {
            id: None,
            slug: slug.into(),
            active: true,
        }
    }

    pub fn with_id(mut self, id: Uuid) -> Self {
        self.id = Some(id);
        self
    }

    pub fn inactive(mut self) -> Self {
        self.active = false;
        self
    }
}

impl TenancyConfig {
    /// Compile `ignored_paths`, failing on patterns that are not absolute.
    pub fn bypass_matcher(&self) -> Result<BypassMatcher, AppError> {
        BypassMatcher::new(&self.ignored_paths).map_err(|e| AppError::ConfigError(e.into()))
    }
}

impl Config {
    pub fn load() -> Result<Self, AppError> {
        dotenvy::dotenv().ok();

        let config = Cfg::builder()
            .add_source(File::with_name("configuration").required(false))
            .add_source(
                config::Environment::with_prefix("APP")
                    .separator("__")
                    .list_separator(",")
                    .with_list_parse_key("tenancy.ignored_paths")
                    .try_parsing(true),
            )
            .build()?;

        Ok(config.try_deserialize()?)
    }
}
