//! Configuration management for the LTO indexer.
//!
//! This module handles loading configuration from:
//! - TOML files
//! - Environment variables referenced as `${VAR_NAME}`
//! - Default values (fallbacks)

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;

use lto_index_core::{TX_ANCHOR, TX_ASSOCIATION, TX_DATA, TX_REVOKE_ASSOCIATION};

/// Main configuration for the indexer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Node connection
    pub node: NodeConfig,

    /// Block monitor settings
    #[serde(default)]
    pub monitor: MonitorConfig,

    /// Storage backend
    #[serde(default)]
    pub storage: StorageConfig,

    /// Which derived indexes to maintain
    #[serde(default)]
    pub indexing: IndexingConfig,

    /// Trust network role definitions
    #[serde(default)]
    pub trust_network: TrustNetworkConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Node connection configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeConfig {
    /// Base URL of the node REST API
    pub url: String,

    /// Optional API key sent as `X-API-Key`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Request timeout in seconds
    #[serde(default = "default_node_timeout_secs")]
    pub timeout_secs: u64,
}

/// Where the scanner starts when no checkpoint exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartingBlock {
    /// First block to index.
    Height(u64),
    /// Start at the node's current height.
    Last,
}

impl Default for StartingBlock {
    fn default() -> Self {
        StartingBlock::Height(1)
    }
}

impl fmt::Display for StartingBlock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StartingBlock::Height(h) => write!(f, "{}", h),
            StartingBlock::Last => write!(f, "last"),
        }
    }
}

// Accepts either an integer or the string "last"
impl Serialize for StartingBlock {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        match self {
            StartingBlock::Height(h) => serializer.serialize_u64(*h),
            StartingBlock::Last => serializer.serialize_str("last"),
        }
    }
}

impl<'de> Deserialize<'de> for StartingBlock {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Height(u64),
            Name(String),
        }

        match Raw::deserialize(deserializer)? {
            Raw::Height(h) => Ok(StartingBlock::Height(h)),
            Raw::Name(name) if name == "last" => Ok(StartingBlock::Last),
            Raw::Name(name) => match name.parse::<u64>() {
                Ok(h) => Ok(StartingBlock::Height(h)),
                Err(_) => Err(serde::de::Error::custom(format!(
                    "starting_block must be a height or \"last\" (got '{}')",
                    name
                ))),
            },
        }
    }
}

/// Block monitor configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitorConfig {
    /// Height to start from when there is no checkpoint
    #[serde(default)]
    pub starting_block: StartingBlock,

    /// Delay between scan passes in milliseconds
    #[serde(default = "default_interval_ms")]
    pub interval_ms: u64,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            starting_block: StartingBlock::default(),
            interval_ms: default_interval_ms(),
        }
    }
}

/// Storage backend selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageType {
    /// In-process maps, lost on restart
    Memory,
    /// SQLite database file
    #[default]
    Sqlite,
}

/// Storage configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Backend to use
    #[serde(rename = "type", default)]
    pub storage_type: StorageType,

    /// SQLite settings (used when `type = "sqlite"`)
    #[serde(default)]
    pub sqlite: SqliteConfig,
}

/// SQLite backend configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SqliteConfig {
    /// Database URL (e.g., "sqlite://lto-index.db")
    #[serde(default = "default_sqlite_url")]
    pub url: String,

    /// Maximum number of connections in the pool
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,

    /// Minimum number of connections in the pool
    #[serde(default = "default_min_connections")]
    pub min_connections: u32,
}

impl Default for SqliteConfig {
    fn default() -> Self {
        Self {
            url: default_sqlite_url(),
            max_connections: default_max_connections(),
            min_connections: default_min_connections(),
        }
    }
}

/// Derived index toggles.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexingConfig {
    /// Type tags that reach the anchor/identity/association handlers.
    /// Generic transaction indexing runs for every type regardless.
    #[serde(default = "default_relevant_types")]
    pub relevant_types: Vec<u8>,

    /// Per-address transaction history
    #[serde(default = "default_true")]
    pub transactions: bool,

    /// Anchor hash index
    #[serde(default = "default_true")]
    pub anchors: bool,

    /// Public keys and verification methods
    #[serde(default = "default_true")]
    pub identities: bool,

    /// Association graph
    #[serde(default = "default_true")]
    pub associations: bool,

    /// Trust network roles
    #[serde(default = "default_true")]
    pub trust_network: bool,

    /// Daily transaction statistics
    #[serde(default = "default_true")]
    pub statistics: bool,
}

impl Default for IndexingConfig {
    fn default() -> Self {
        Self {
            relevant_types: default_relevant_types(),
            transactions: true,
            anchors: true,
            identities: true,
            associations: true,
            trust_network: true,
            statistics: true,
        }
    }
}

/// A role a definition may issue, bound to the association type that grants it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleIssue {
    /// Role name granted.
    pub role: String,

    /// Association type code that grants it.
    #[serde(rename = "type")]
    pub association_type: u64,
}

/// Static definition of a trust network role.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleDefinition {
    /// Human readable description
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Roles holders of this role may issue
    #[serde(default)]
    pub issues: Vec<RoleIssue>,

    /// Authorization scopes holders of this role may issue
    #[serde(default)]
    pub authorization: Vec<String>,
}

/// Trust network configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TrustNetworkConfig {
    /// Address implicitly holding the `root` role
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub root_address: Option<String>,

    /// Role-definition table, by role name
    #[serde(default)]
    pub roles: BTreeMap<String, RoleDefinition>,
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level: trace, debug, info, warn, error
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log format: json or pretty
    #[serde(default = "default_log_format")]
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

// Default value functions
fn default_node_timeout_secs() -> u64 {
    30
}

fn default_interval_ms() -> u64 {
    5000
}

fn default_sqlite_url() -> String {
    "sqlite://lto-index.db".to_string()
}

fn default_max_connections() -> u32 {
    5
}

fn default_min_connections() -> u32 {
    1
}

fn default_relevant_types() -> Vec<u8> {
    vec![TX_DATA, TX_ANCHOR, TX_ASSOCIATION, TX_REVOKE_ASSOCIATION]
}

fn default_true() -> bool {
    true
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

impl Config {
    /// Load configuration from a TOML file.
    ///
    /// Environment variables can be referenced using `${VAR_NAME}` syntax.
    /// For example: `api_key = "${LTO_NODE_API_KEY}"`
    ///
    /// # Example
    /// ```no_run
    /// # use lto_indexer::config::Config;
    /// let config = Config::from_file("indexer.toml")?;
    /// # Ok::<(), anyhow::Error>(())
    /// ```
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let expanded = expand_env_vars(&contents)?;

        let config: Config = toml::from_str(&expanded)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        config.validate()?;

        Ok(config)
    }

    /// Load configuration from a TOML string.
    pub fn from_toml_str(toml: &str) -> Result<Self> {
        let config: Config = toml::from_str(toml).context("Failed to parse TOML configuration")?;

        config.validate()?;

        Ok(config)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<()> {
        if self.node.url.trim().is_empty() {
            anyhow::bail!("Node URL cannot be empty");
        }
        if !self.node.url.starts_with("http://") && !self.node.url.starts_with("https://") {
            anyhow::bail!("Node URL must start with http:// or https://");
        }
        if self.node.timeout_secs == 0 {
            anyhow::bail!("Node timeout_secs must be > 0");
        }

        if self.monitor.interval_ms == 0 {
            anyhow::bail!("Monitor interval_ms must be > 0");
        }

        if self.storage.storage_type == StorageType::Sqlite {
            let sqlite = &self.storage.sqlite;
            if sqlite.url.is_empty() {
                anyhow::bail!("Storage sqlite url cannot be empty");
            }
            if sqlite.max_connections == 0 {
                anyhow::bail!("Storage sqlite max_connections must be > 0");
            }
            if sqlite.min_connections > sqlite.max_connections {
                anyhow::bail!(
                    "Storage sqlite min_connections ({}) cannot exceed max_connections ({})",
                    sqlite.min_connections,
                    sqlite.max_connections
                );
            }
        }

        if let Some(root) = &self.trust_network.root_address {
            if root.trim().is_empty() {
                anyhow::bail!("Trust network root_address cannot be empty when provided");
            }
        }

        for (name, definition) in &self.trust_network.roles {
            for issue in &definition.issues {
                if issue.role.trim().is_empty() {
                    anyhow::bail!("Role '{}' issues a role with an empty name", name);
                }
            }
        }

        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.logging.level.as_str()) {
            anyhow::bail!(
                "Logging level must be one of: {} (got '{}')",
                valid_levels.join(", "),
                self.logging.level
            );
        }

        let valid_formats = ["json", "pretty"];
        if !valid_formats.contains(&self.logging.format.as_str()) {
            anyhow::bail!(
                "Logging format must be one of: {} (got '{}')",
                valid_formats.join(", "),
                self.logging.format
            );
        }

        Ok(())
    }
}

/// Expand `${VAR_NAME}` placeholders from the environment.
///
/// Placeholders after a `#` that is outside a string are part of a comment and
/// left untouched. Referencing an unset variable is an error.
fn expand_env_vars(input: &str) -> Result<String> {
    let mut result = String::with_capacity(input.len());
    let mut chars = input.char_indices().peekable();
    let mut quote: Option<char> = None;
    let mut in_comment = false;
    let mut escaped = false;

    while let Some((pos, ch)) = chars.next() {
        if in_comment {
            if ch == '\n' {
                in_comment = false;
            }
            result.push(ch);
            continue;
        }

        if escaped {
            escaped = false;
            result.push(ch);
            continue;
        }

        match (ch, quote) {
            ('\\', Some('"')) => escaped = true,
            ('"', None) | ('\'', None) => quote = Some(ch),
            (c, Some(q)) if c == q => quote = None,
            ('#', None) => in_comment = true,
            ('$', _) if matches!(chars.peek(), Some((_, '{'))) => {
                chars.next();

                let mut name = String::new();
                let mut closed = false;
                for (_, c) in chars.by_ref() {
                    if c == '}' {
                        closed = true;
                        break;
                    }
                    name.push(c);
                }

                if !closed {
                    anyhow::bail!(
                        "Unclosed environment variable placeholder at position {}",
                        pos
                    );
                }
                if name.is_empty() {
                    anyhow::bail!("Empty environment variable name at position {}", pos);
                }

                let value = std::env::var(&name).map_err(|_| {
                    anyhow::anyhow!(
                        "Environment variable '{}' is not set (referenced at position {})",
                        name,
                        pos
                    )
                })?;
                result.push_str(&value);
                continue;
            }
            _ => {}
        }

        result.push(ch);
    }

    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINIMAL: &str = r#"
[node]
url = "https://testnet.lto.network"
"#;

    #[test]
    fn test_load_example_config() {
        let toml = r#"
[node]
url = "https://nodes.lto.network"
api_key = "secret"
timeout_secs = 10

[monitor]
starting_block = "last"
interval_ms = 1000

[storage]
type = "memory"

[indexing]
relevant_types = [12, 15]
statistics = false

[trust_network]
root_address = "3NBcx7AQqDopBj3WfwCVARNYuZyt1L9xEVM"

[trust_network.roles.root]
description = "Root of the trust network"
issues = [{ role = "validator", type = 100 }]
authorization = ["tx:anchor"]

[trust_network.roles.validator]
issues = [{ role = "node", type = 101 }]

[logging]
level = "debug"
format = "json"
        "#;

        let config = Config::from_toml_str(toml).unwrap();
        assert_eq!(config.node.timeout_secs, 10);
        assert_eq!(config.node.api_key.as_deref(), Some("secret"));
        assert_eq!(config.monitor.starting_block, StartingBlock::Last);
        assert_eq!(config.storage.storage_type, StorageType::Memory);
        assert_eq!(config.indexing.relevant_types, vec![12, 15]);
        assert!(!config.indexing.statistics);
        assert!(config.indexing.anchors);

        let root = &config.trust_network.roles["root"];
        assert_eq!(
            root.issues,
            vec![RoleIssue {
                role: "validator".to_string(),
                association_type: 100
            }]
        );
        assert_eq!(root.authorization, vec!["tx:anchor".to_string()]);
    }

    #[test]
    fn test_shipped_example_parses() {
        let config = Config::from_toml_str(include_str!("../../../indexer.example.toml")).unwrap();
        assert_eq!(config.storage.storage_type, StorageType::Sqlite);
        assert_eq!(config.trust_network.roles.len(), 3);
        assert!(config.trust_network.root_address.is_none());
    }

    #[test]
    fn test_default_values() {
        let config = Config::from_toml_str(MINIMAL).unwrap();

        assert_eq!(config.node.timeout_secs, 30);
        assert_eq!(config.monitor.starting_block, StartingBlock::Height(1));
        assert_eq!(config.monitor.interval_ms, 5000);
        assert_eq!(config.storage.storage_type, StorageType::Sqlite);
        assert_eq!(config.storage.sqlite.url, "sqlite://lto-index.db");
        assert_eq!(config.indexing.relevant_types, vec![12, 15, 16, 17]);
        assert!(config.trust_network.roles.is_empty());
        assert_eq!(config.logging.level, "info");
        assert_eq!(config.logging.format, "pretty");
    }

    #[test]
    fn test_starting_block_formats() {
        for (raw, expected) in [
            ("1200", StartingBlock::Height(1200)),
            ("\"1200\"", StartingBlock::Height(1200)),
            ("\"last\"", StartingBlock::Last),
        ] {
            let toml = format!("{}\n[monitor]\nstarting_block = {}\n", MINIMAL, raw);
            let config = Config::from_toml_str(&toml).unwrap();
            assert_eq!(config.monitor.starting_block, expected);
        }

        let toml = format!("{}\n[monitor]\nstarting_block = \"first\"\n", MINIMAL);
        assert!(Config::from_toml_str(&toml).is_err());
    }

    #[test]
    fn test_validation_empty_node_url() {
        let result = Config::from_toml_str("[node]\nurl = \"\"\n");
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("Node URL"));
    }

    #[test]
    fn test_validation_zero_interval() {
        let toml = format!("{}\n[monitor]\ninterval_ms = 0\n", MINIMAL);
        let result = Config::from_toml_str(&toml);
        assert!(result.unwrap_err().to_string().contains("interval_ms"));
    }

    #[test]
    fn test_validation_pool_bounds() {
        let toml = format!(
            "{}\n[storage.sqlite]\nmax_connections = 1\nmin_connections = 2\n",
            MINIMAL
        );
        let result = Config::from_toml_str(&toml);
        assert!(result.unwrap_err().to_string().contains("min_connections"));
    }

    #[test]
    fn test_validation_logging_format() {
        let toml = format!("{}\n[logging]\nformat = \"xml\"\n", MINIMAL);
        let result = Config::from_toml_str(&toml);
        assert!(result.unwrap_err().to_string().contains("Logging format"));
    }

    #[test]
    fn test_expand_env_vars() {
        std::env::set_var("LTO_INDEXER_TEST_KEY", "abc123");
        let expanded = expand_env_vars("api_key = \"${LTO_INDEXER_TEST_KEY}\"").unwrap();
        assert_eq!(expanded, "api_key = \"abc123\"");
    }

    #[test]
    fn test_expand_env_vars_undefined() {
        let result = expand_env_vars("key = \"${LTO_INDEXER_TEST_UNSET_VAR}\"");
        assert!(result.unwrap_err().to_string().contains("is not set"));
    }

    #[test]
    fn test_expand_env_vars_unclosed_and_empty() {
        assert!(expand_env_vars("key = \"${OOPS\"")
            .unwrap_err()
            .to_string()
            .contains("Unclosed"));
        assert!(expand_env_vars("key = \"${}\"")
            .unwrap_err()
            .to_string()
            .contains("Empty"));
    }

    #[test]
    fn test_expand_env_vars_ignore_comments() {
        let input = "# api_key = \"${LTO_INDEXER_TEST_UNSET_VAR}\"\nurl = \"x\" # ${ALSO_UNSET}\n";
        assert_eq!(expand_env_vars(input).unwrap(), input);
    }

    #[test]
    fn test_expand_env_vars_hash_in_string() {
        std::env::set_var("LTO_INDEXER_TEST_HASH", "value");
        let input = "key = \"a#b ${LTO_INDEXER_TEST_HASH}\"";
        assert_eq!(expand_env_vars(input).unwrap(), "key = \"a#b value\"");
    }

    #[test]
    fn test_config_from_file_with_env_vars() {
        std::env::set_var("LTO_INDEXER_TEST_NODE", "https://node.example.com");

        let file = tempfile::NamedTempFile::new().unwrap();
        std::fs::write(
            file.path(),
            "# node url comes from ${LTO_INDEXER_TEST_UNSET_VAR}\n[node]\nurl = \"${LTO_INDEXER_TEST_NODE}\"\n",
        )
        .unwrap();

        let config = Config::from_file(file.path()).unwrap();
        assert_eq!(config.node.url, "https://node.example.com");
    }
}
