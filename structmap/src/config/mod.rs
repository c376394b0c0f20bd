use crate::codec::CodecKind;
use crate::error::{Result, StructMapError};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Mapper settings, usually read from a YAML file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MapperConfig {
    /// SQLite database file used by `Mapper::from_config`.
    pub database: Option<PathBuf>,
    /// Most reference hops followed by one load.
    pub max_reference_depth: usize,
    /// Emit `REFERENCES` clauses for reference columns.
    pub foreign_key_constraints: bool,
    /// Turn on `PRAGMA foreign_keys` for connections opened from `database`.
    pub enforce_foreign_keys: bool,
    pub blob_codec: CodecKind,
    pub busy_timeout_ms: Option<u64>,
}

impl Default for MapperConfig {
    fn default() -> Self {
        MapperConfig {
            database: None,
            max_reference_depth: 32,
            foreign_key_constraints: true,
            enforce_foreign_keys: false,
            blob_codec: CodecKind::Json,
            busy_timeout_ms: None,
        }
    }
}

impl MapperConfig {
    pub fn validate(&self) -> Result<()> {
        if self.max_reference_depth == 0 {
            return Err(StructMapError::Config(
                "max_reference_depth must be at least 1".into(),
            ));
        }
        Ok(())
    }
}

/// Parse a mapper config file.
pub fn parse_config(path: &Path) -> Result<MapperConfig> {
    let content = std::fs::read_to_string(path)?;
    parse_config_str(&content)
}

/// Parse a mapper config from a YAML string.
pub fn parse_config_str(content: &str) -> Result<MapperConfig> {
    let config: MapperConfig = serde_yaml::from_str(content)?;
    config.validate()?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_defaults_from_empty_mapping() {
        let config = parse_config_str("{}").unwrap();
        assert_eq!(config, MapperConfig::default());
    }

    #[test]
    fn test_parse_all_keys() {
        let config = parse_config_str(
            "
database: data/app.db
max_reference_depth: 4
foreign_key_constraints: false
enforce_foreign_keys: true
blob_codec: yaml
busy_timeout_ms: 250
",
        )
        .unwrap();
        assert_eq!(
            config,
            MapperConfig {
                database: Some(PathBuf::from("data/app.db")),
                max_reference_depth: 4,
                foreign_key_constraints: false,
                enforce_foreign_keys: true,
                blob_codec: CodecKind::Yaml,
                busy_timeout_ms: Some(250),
            }
        );
    }

    #[test]
    fn test_zero_depth_rejected() {
        let err = parse_config_str("max_reference_depth: 0").unwrap_err();
        assert!(matches!(err, StructMapError::Config(_)));
    }

    #[test]
    fn test_unknown_codec_rejected() {
        assert!(matches!(
            parse_config_str("blob_codec: toml"),
            Err(StructMapError::Yaml(_))
        ));
    }

    #[test]
    fn test_parse_config_file() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("structmap.yaml");
        std::fs::write(&path, "max_reference_depth: 8\n").unwrap();
        assert_eq!(parse_config(&path).unwrap().max_reference_depth, 8);
    }
}
