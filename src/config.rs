//! Runtime configuration (spec §6 "Configuration (environment)"): the
//! catalog connection, the directory connection, processing knobs, the
//! trust anchor location, the server's own listen settings, and the ICAO
//! portal check scheduler. Every field is sourced from the environment;
//! [`AppConfig::from_env`] reads `std::env`, [`AppConfig::from_map`] reads
//! an arbitrary key/value source so the parsing logic is testable without
//! touching process-global state.

use std::{collections::HashMap, path::PathBuf};

use anyhow::{anyhow, Context, Result};

/// Relational catalog connection, spec §6.
#[derive(Clone, Debug, PartialEq, Eq, serde::Deserialize)]
pub struct CatalogConfig {
    pub host: String,
    pub port: u16,
    pub name: String,
    pub user: String,
    pub password: String,
}

/// LDAP-like directory connection, spec §6. Reads go to any of
/// `read_hosts`, writes go only to `write_host`.
#[derive(Clone, Debug, PartialEq, Eq, serde::Deserialize)]
pub struct DirectoryConfig {
    pub read_hosts: Vec<String>,
    pub write_host: String,
    pub bind_dn: String,
    pub bind_password: String,
    pub base_dn: String,
    pub data_container: String,
    pub nc_data_container: String,
}

/// Ingestion/reconciliation behavior knobs, spec §6.
#[derive(Clone, Debug, PartialEq, Eq, serde::Deserialize)]
pub struct ProcessingConfig {
    pub auto_reconcile: bool,
    pub sync_interval_minutes: u32,
    pub max_reconcile_batch_size: usize,
}

/// Location of the CSCA trust anchor set used to verify Master Lists,
/// spec §6.
#[derive(Clone, Debug, PartialEq, Eq, serde::Deserialize)]
pub struct CryptoConfig {
    pub trust_anchor_path: PathBuf,
}

/// This mirror's own HTTP listener, spec §6.
#[derive(Clone, Debug, PartialEq, Eq, serde::Deserialize)]
pub struct ServerConfig {
    pub port: u16,
    pub thread_num: usize,
    pub max_body_size_mb: usize,
}

/// The scheduled ICAO portal version check, spec §6.
#[derive(Clone, Debug, PartialEq, Eq, serde::Deserialize)]
pub struct SchedulerConfig {
    pub icao_check_enabled: bool,
    pub icao_check_hour_local: u8,
}

/// The full set of environment-sourced configuration, spec §6.
#[derive(Clone, Debug, PartialEq, Eq, serde::Deserialize)]
pub struct AppConfig {
    pub catalog: CatalogConfig,
    pub directory: DirectoryConfig,
    pub processing: ProcessingConfig,
    pub crypto: CryptoConfig,
    pub server: ServerConfig,
    pub scheduler: SchedulerConfig,
}

impl AppConfig {
    /// Reads configuration from the process environment.
    pub fn from_env() -> Result<Self> {
        Self::from_map(&std::env::vars().collect())
    }

    /// Reads configuration from an arbitrary `KEY=value` source. Exists so
    /// the parsing and default logic can be exercised without mutating
    /// process-global environment state.
    pub fn from_map(vars: &HashMap<String, String>) -> Result<Self> {
        Ok(Self {
            catalog: CatalogConfig {
                host: required(vars, "PKD_CATALOG_HOST")?,
                port: parse_or(vars, "PKD_CATALOG_PORT", 5432)?,
                name: required(vars, "PKD_CATALOG_NAME")?,
                user: required(vars, "PKD_CATALOG_USER")?,
                password: required(vars, "PKD_CATALOG_PASSWORD")?,
            },
            directory: DirectoryConfig {
                read_hosts: list_or(vars, "PKD_DIRECTORY_READ_HOSTS", Vec::new()),
                write_host: required(vars, "PKD_DIRECTORY_WRITE_HOST")?,
                bind_dn: required(vars, "PKD_DIRECTORY_BIND_DN")?,
                bind_password: required(vars, "PKD_DIRECTORY_BIND_PASSWORD")?,
                base_dn: required(vars, "PKD_DIRECTORY_BASE_DN")?,
                data_container: string_or(vars, "PKD_DIRECTORY_DATA_CONTAINER", "ou=data"),
                nc_data_container: string_or(vars, "PKD_DIRECTORY_NC_DATA_CONTAINER", "ou=nc-data"),
            },
            processing: ProcessingConfig {
                auto_reconcile: parse_or(vars, "PKD_PROCESSING_AUTO_RECONCILE", true)?,
                sync_interval_minutes: parse_or(vars, "PKD_PROCESSING_SYNC_INTERVAL_MINUTES", 60)?,
                max_reconcile_batch_size: parse_or(vars, "PKD_PROCESSING_MAX_RECONCILE_BATCH_SIZE", 1000)?,
            },
            crypto: CryptoConfig {
                trust_anchor_path: PathBuf::from(required(vars, "PKD_CRYPTO_TRUST_ANCHOR_PATH")?),
            },
            server: ServerConfig {
                port: parse_or(vars, "PKD_SERVER_PORT", 8080)?,
                thread_num: parse_or(vars, "PKD_SERVER_THREAD_NUM", 4)?,
                max_body_size_mb: parse_or(vars, "PKD_SERVER_MAX_BODY_SIZE_MB", 64)?,
            },
            scheduler: SchedulerConfig {
                icao_check_enabled: parse_or(vars, "PKD_SCHEDULER_ICAO_CHECK_ENABLED", false)?,
                icao_check_hour_local: parse_or(vars, "PKD_SCHEDULER_ICAO_CHECK_HOUR_LOCAL", 3)?,
            },
        })
    }
}

fn required(vars: &HashMap<String, String>, key: &str) -> Result<String> {
    vars.get(key)
        .cloned()
        .ok_or_else(|| anyhow!("missing required environment variable {key}"))
}

fn string_or(vars: &HashMap<String, String>, key: &str, default: &str) -> String {
    vars.get(key).cloned().unwrap_or_else(|| default.to_string())
}

fn parse_or<T>(vars: &HashMap<String, String>, key: &str, default: T) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match vars.get(key) {
        Some(raw) => raw
            .parse()
            .map_err(|e| anyhow!("{key}: {e}"))
            .with_context(|| format!("invalid value for {key}: {raw:?}")),
        None => Ok(default),
    }
}

fn list_or(vars: &HashMap<String, String>, key: &str, default: Vec<String>) -> Vec<String> {
    match vars.get(key) {
        Some(raw) if !raw.is_empty() => raw.split(',').map(|s| s.trim().to_string()).collect(),
        _ => default,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_vars() -> HashMap<String, String> {
        let mut vars = HashMap::new();
        vars.insert("PKD_CATALOG_HOST".to_string(), "db.internal".to_string());
        vars.insert("PKD_CATALOG_NAME".to_string(), "pkd".to_string());
        vars.insert("PKD_CATALOG_USER".to_string(), "pkd_svc".to_string());
        vars.insert("PKD_CATALOG_PASSWORD".to_string(), "secret".to_string());
        vars.insert("PKD_DIRECTORY_WRITE_HOST".to_string(), "ldap.internal".to_string());
        vars.insert("PKD_DIRECTORY_BIND_DN".to_string(), "cn=admin,o=pkd".to_string());
        vars.insert("PKD_DIRECTORY_BIND_PASSWORD".to_string(), "secret".to_string());
        vars.insert("PKD_DIRECTORY_BASE_DN".to_string(), "o=pkd".to_string());
        vars.insert("PKD_CRYPTO_TRUST_ANCHOR_PATH".to_string(), "/etc/pkd/anchors".to_string());
        vars
    }

    #[test]
    fn fills_in_defaults_when_optional_values_are_absent() {
        let config = AppConfig::from_map(&base_vars()).unwrap();
        assert_eq!(config.catalog.port, 5432);
        assert_eq!(config.server.port, 8080);
        assert!(config.processing.auto_reconcile);
        assert!(config.directory.read_hosts.is_empty());
    }

    #[test]
    fn parses_comma_separated_read_hosts() {
        let mut vars = base_vars();
        vars.insert(
            "PKD_DIRECTORY_READ_HOSTS".to_string(),
            "ldap-ro-1.internal, ldap-ro-2.internal".to_string(),
        );
        let config = AppConfig::from_map(&vars).unwrap();
        assert_eq!(
            config.directory.read_hosts,
            vec!["ldap-ro-1.internal".to_string(), "ldap-ro-2.internal".to_string()]
        );
    }

    #[test]
    fn missing_required_field_is_an_error() {
        let vars = HashMap::new();
        assert!(AppConfig::from_map(&vars).is_err());
    }

    #[test]
    fn invalid_numeric_value_is_an_error() {
        let mut vars = base_vars();
        vars.insert("PKD_SERVER_PORT".to_string(), "not-a-port".to_string());
        assert!(AppConfig::from_map(&vars).is_err());
    }
}
