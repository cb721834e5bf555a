//! History configuration

use serde::{Deserialize, Serialize};

use waymark_history::{
    BrowserHistoryOptions, HashHistoryOptions, HashType, MemoryHistoryOptions, UserConfirmation,
};
use waymark_location::LocationDescriptor;

use crate::error::CoreError;
use crate::Result;

/// Longest key a v4 uuid can supply
const MAX_KEY_LENGTH: usize = 32;

/// Which backend to build
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HistoryKind {
    Browser,
    Hash,
    #[default]
    Memory,
}

impl HistoryKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            HistoryKind::Browser => "browser",
            HistoryKind::Hash => "hash",
            HistoryKind::Memory => "memory",
        }
    }
}

impl std::fmt::Display for HistoryKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for HistoryKind {
    type Err = CoreError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "browser" => Ok(HistoryKind::Browser),
            "hash" => Ok(HistoryKind::Hash),
            "memory" => Ok(HistoryKind::Memory),
            _ => Err(CoreError::Config(format!("Unknown history kind: {}", s))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HistoryConfig {
    pub kind: HistoryKind,
    /// Browser and hash only
    pub basename: Option<String>,
    /// Browser and memory only; 0 produces keyless locations
    pub key_length: usize,
    /// Browser only
    pub force_refresh: bool,
    /// Browser only
    pub replicated: bool,
    /// Hash only
    pub hash_type: HashType,
    /// Memory only
    pub initial_entries: Vec<LocationDescriptor>,
    /// Memory only
    pub initial_index: usize,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            kind: HistoryKind::default(),
            basename: None,
            key_length: 6,
            force_refresh: false,
            replicated: false,
            hash_type: HashType::default(),
            initial_entries: vec![LocationDescriptor::from("/")],
            initial_index: 0,
        }
    }
}

impl HistoryConfig {
    pub fn new(kind: HistoryKind) -> Self {
        Self {
            kind,
            ..Self::default()
        }
    }

    /// Parse and validate a JSON config
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn validate(&self) -> Result<()> {
        if let Some(basename) = &self.basename {
            if basename.contains(['?', '#']) {
                return Err(CoreError::Config(format!(
                    "Basename must be a plain path: {}",
                    basename
                )));
            }
        }

        if self.key_length > MAX_KEY_LENGTH {
            return Err(CoreError::Config(format!(
                "Key length {} exceeds {}",
                self.key_length, MAX_KEY_LENGTH
            )));
        }

        Ok(())
    }

    pub fn browser_options(
        &self,
        user_confirmation: Option<UserConfirmation>,
    ) -> BrowserHistoryOptions {
        BrowserHistoryOptions {
            basename: self.basename.clone(),
            force_refresh: self.force_refresh,
            key_length: self.key_length,
            user_confirmation,
            replicated: self.replicated,
        }
    }

    pub fn hash_options(&self, user_confirmation: Option<UserConfirmation>) -> HashHistoryOptions {
        HashHistoryOptions {
            basename: self.basename.clone(),
            hash_type: self.hash_type,
            user_confirmation,
        }
    }

    pub fn memory_options(
        &self,
        user_confirmation: Option<UserConfirmation>,
    ) -> MemoryHistoryOptions {
        MemoryHistoryOptions {
            initial_entries: self.initial_entries.clone(),
            initial_index: self.initial_index,
            key_length: self.key_length,
            user_confirmation,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use waymark_location::PartialLocation;

    #[test]
    fn test_defaults_from_empty_json() {
        let config = HistoryConfig::from_json("{}").unwrap();
        assert_eq!(config, HistoryConfig::default());
        assert_eq!(config.kind, HistoryKind::Memory);
        assert_eq!(config.key_length, 6);
    }

    #[test]
    fn test_from_json() {
        let config = HistoryConfig::from_json(
            r#"{
                "kind": "hash",
                "basename": "/app",
                "hash_type": "hashbang",
                "initial_entries": ["/a", {"pathname": "/b", "key": "k1"}]
            }"#,
        )
        .unwrap();

        assert_eq!(config.kind, HistoryKind::Hash);
        assert_eq!(config.hash_type, HashType::HashBang);
        assert_eq!(config.initial_entries[0], LocationDescriptor::from("/a"));
        assert_eq!(
            config.initial_entries[1],
            LocationDescriptor::Partial(PartialLocation {
                pathname: Some("/b".to_string()),
                key: Some("k1".to_string()),
                ..PartialLocation::default()
            })
        );
    }

    #[test]
    fn test_invalid_config() {
        assert!(matches!(
            HistoryConfig::from_json(r#"{"basename": "/app#x"}"#),
            Err(CoreError::Config(_))
        ));
        assert!(matches!(
            HistoryConfig::from_json(r#"{"key_length": 64}"#),
            Err(CoreError::Config(_))
        ));
        assert!(matches!(
            HistoryConfig::from_json(r#"{"kind": "tab"}"#),
            Err(CoreError::Serialization(_))
        ));
    }

    #[test]
    fn test_json_round_trip() {
        let config = HistoryConfig {
            replicated: true,
            ..HistoryConfig::new(HistoryKind::Browser)
        };
        let parsed = HistoryConfig::from_json(&config.to_json().unwrap()).unwrap();
        assert_eq!(parsed, config);
    }

    #[test]
    fn test_kind_parsing() {
        assert_eq!("browser".parse::<HistoryKind>().unwrap(), HistoryKind::Browser);
        assert!("tab".parse::<HistoryKind>().is_err());
        assert_eq!(HistoryKind::Hash.to_string(), "hash");
    }

    #[test]
    fn test_option_conversion() {
        let config = HistoryConfig {
            basename: Some("/app".to_string()),
            key_length: 8,
            ..HistoryConfig::new(HistoryKind::Browser)
        };
        let options = config.browser_options(None);
        assert_eq!(options.basename.as_deref(), Some("/app"));
        assert_eq!(options.key_length, 8);
        assert_eq!(config.memory_options(None).initial_entries.len(), 1);
    }
}
