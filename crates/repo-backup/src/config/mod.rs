//! Configuration loading and validation.

mod types;
mod validation;

pub use types::*;

use crate::error::Result;
use std::path::Path;

impl Config {
    /// Load configuration from a YAML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    /// Parse configuration from a YAML string.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let config: Config = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<()> {
        validation::validate(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_yaml_applies_defaults() {
        let yaml = "\
backup:
  storages: [default]
strategy:
  command: /usr/bin/repo-transfer
catalog:
  inventory: inventory.yaml
";
        let config = Config::from_yaml(yaml).unwrap();
        assert_eq!(config.backup.max_concurrency, 1);
        assert_eq!(config.backup.max_storage_concurrency, 1);
        assert!(config.backup.is_sequential());
        assert!(config.strategy.args.is_empty());
    }

    #[test]
    fn test_from_yaml_rejects_invalid_ceilings() {
        let yaml = "\
backup:
  max_concurrency: 4
  max_storage_concurrency: 0
  storages: [default]
strategy:
  command: /usr/bin/repo-transfer
catalog:
  inventory: inventory.yaml
";
        assert!(Config::from_yaml(yaml).is_err());
    }
}
