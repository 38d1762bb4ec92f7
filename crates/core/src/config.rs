use std::collections::HashMap;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use tracing::{debug, info};

use crate::error::{DeskError, Result};
use crate::pricing::PricingConfig;

pub const DEFAULT_SECRETS_PATH: &str = "secrets.toml";
pub const DEFAULT_ROLODEX_KEY: &str = "rolodex.csv";
pub const DEFAULT_CONTACTS_KEY: &str = "partnercontacts.csv";
pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8000";
pub const DEFAULT_STATUS_TTL_SECS: u64 = 300;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AgentBackend {
    Bedrock,
    Local,
}

impl AgentBackend {
    pub fn from_str(value: &str) -> Option<Self> {
        match value.to_lowercase().as_str() {
            "bedrock" => Some(AgentBackend::Bedrock),
            "local" => Some(AgentBackend::Local),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct AwsSettings {
    pub access_key_id: Option<String>,
    pub secret_access_key: Option<SecretString>,
    pub region: Option<String>,
    pub endpoint_url: Option<String>,
}

impl AwsSettings {
    pub fn static_credentials(&self) -> Option<(&str, &str)> {
        match (&self.access_key_id, &self.secret_access_key) {
            (Some(id), Some(secret)) => Some((id.as_str(), secret.expose_secret().as_str())),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataKeys {
    pub rolodex: String,
    pub contacts: String,
}

impl Default for DataKeys {
    fn default() -> Self {
        Self {
            rolodex: DEFAULT_ROLODEX_KEY.to_string(),
            contacts: DEFAULT_CONTACTS_KEY.to_string(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct AgentSettings {
    pub backend: AgentBackend,
    pub agent_id: String,
    pub alias_id: String,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub aws: AwsSettings,
    pub bucket: String,
    pub keys: DataKeys,
    pub agent: AgentSettings,
    pub password: SecretString,
    pub bind_addr: String,
    pub status_ttl_secs: u64,
    pub pricing: PricingConfig,
}

#[derive(Debug, Default, Deserialize)]
struct SecretsFile {
    #[serde(default)]
    pricing: Option<PricingConfig>,
    #[serde(flatten)]
    values: HashMap<String, toml::Value>,
}

impl SecretsFile {
    fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            debug!(path = %path.display(), "no secrets file, using environment");
            return Ok(Self::default());
        }
        let contents = fs::read_to_string(path)?;
        toml::from_str(&contents).map_err(|err| {
            DeskError::Config(format!("invalid secrets file {}: {err}", path.display()))
        })
    }

    fn get(&self, key: &str) -> Option<String> {
        match self.values.get(key)? {
            toml::Value::String(value) => Some(value.clone()),
            toml::Value::Integer(value) => Some(value.to_string()),
            toml::Value::Boolean(value) => Some(value.to_string()),
            _ => None,
        }
    }
}

impl AppConfig {
    pub fn load() -> Result<Self> {
        let _ = dotenvy::dotenv();
        let secrets_path = env::var("PARTNERDESK_SECRETS")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(DEFAULT_SECRETS_PATH));
        Self::load_from(&secrets_path)
    }

    pub fn load_from(secrets_path: &Path) -> Result<Self> {
        let _ = dotenvy::dotenv();
        let secrets = SecretsFile::load(secrets_path)?;
        let pricing = secrets.pricing.clone().unwrap_or_default();
        let config = Self::from_lookup(
            |key| {
                secrets
                    .get(key)
                    .or_else(|| env::var(key).ok())
                    .filter(|value| !value.trim().is_empty())
            },
            pricing,
        )?;
        info!(
            bucket = %config.bucket,
            rolodex_key = %config.keys.rolodex,
            contacts_key = %config.keys.contacts,
            "configuration loaded"
        );
        Ok(config)
    }

    pub fn from_lookup<F>(lookup: F, pricing: PricingConfig) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let require = |key: &str| {
            lookup(key).ok_or_else(|| DeskError::Config(format!("{key} is not set")))
        };
        let backend_name = lookup("AGENT_BACKEND").unwrap_or_else(|| "bedrock".to_string());
        let backend = AgentBackend::from_str(&backend_name)
            .ok_or_else(|| DeskError::Config(format!("unknown agent backend {backend_name}")))?;
        let agent = match backend {
            AgentBackend::Bedrock => AgentSettings {
                backend,
                agent_id: require("BEDROCK_AGENT_ID")?,
                alias_id: require("BEDROCK_AGENT_ALIAS_ID")?,
            },
            AgentBackend::Local => AgentSettings {
                backend,
                agent_id: lookup("BEDROCK_AGENT_ID").unwrap_or_else(|| "local".to_string()),
                alias_id: lookup("BEDROCK_AGENT_ALIAS_ID").unwrap_or_else(|| "local".to_string()),
            },
        };
        let status_ttl_secs = match lookup("STATUS_CACHE_TTL_SECS") {
            Some(raw) => raw.parse().map_err(|_| {
                DeskError::Config(format!("STATUS_CACHE_TTL_SECS must be a number, got {raw}"))
            })?,
            None => DEFAULT_STATUS_TTL_SECS,
        };
        Ok(Self {
            aws: AwsSettings {
                access_key_id: lookup("AWS_ACCESS_KEY_ID"),
                secret_access_key: lookup("AWS_SECRET_ACCESS_KEY").map(SecretString::new),
                region: lookup("AWS_DEFAULT_REGION"),
                endpoint_url: lookup("S3_ENDPOINT_URL"),
            },
            bucket: require("BUCKET_NAME")?,
            keys: DataKeys {
                rolodex: lookup("ROL_KEY").unwrap_or_else(|| DEFAULT_ROLODEX_KEY.to_string()),
                contacts: lookup("CONTACTS_KEY")
                    .unwrap_or_else(|| DEFAULT_CONTACTS_KEY.to_string()),
            },
            agent,
            password: SecretString::new(require("APP_PASSWORD")?),
            bind_addr: lookup("BIND_ADDR").unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string()),
            status_ttl_secs,
            pricing,
        })
    }

    pub fn password_matches(&self, candidate: &str) -> bool {
        self.password.expose_secret() == candidate
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_fill_optional_keys() {
        let config = AppConfig::from_lookup(
            lookup_from(&[
                ("BUCKET_NAME", "partners"),
                ("APP_PASSWORD", "hunter2"),
                ("AGENT_BACKEND", "local"),
            ]),
            PricingConfig::default(),
        )
        .unwrap();
        assert_eq!(config.keys, DataKeys::default());
        assert_eq!(config.bind_addr, DEFAULT_BIND_ADDR);
        assert_eq!(config.agent.backend, AgentBackend::Local);
        assert!(config.password_matches("hunter2"));
        assert!(!config.password_matches("hunter3"));
        assert!(config.aws.static_credentials().is_none());
    }

    #[test]
    fn bedrock_backend_requires_agent_ids() {
        let err = AppConfig::from_lookup(
            lookup_from(&[("BUCKET_NAME", "partners"), ("APP_PASSWORD", "x")]),
            PricingConfig::default(),
        )
        .unwrap_err();
        assert!(err.to_string().contains("BEDROCK_AGENT_ID"));
    }

    #[test]
    fn secrets_file_reads_flat_keys_and_pricing() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "BUCKET_NAME = \"partners\"").unwrap();
        writeln!(file, "ROL_KEY = \"data/rolodex.csv\"").unwrap();
        writeln!(file, "[pricing]").unwrap();
        writeln!(file, "input_per_1m = 3.0").unwrap();
        let secrets = SecretsFile::load(file.path()).unwrap();
        assert_eq!(secrets.get("BUCKET_NAME").as_deref(), Some("partners"));
        assert_eq!(secrets.get("ROL_KEY").as_deref(), Some("data/rolodex.csv"));
        assert_eq!(secrets.pricing.unwrap().input_per_1m, Some(3.0));
    }
}
