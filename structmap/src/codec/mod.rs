use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Encodes structured-blob contents into the text stored in a blob column.
pub trait BlobCodec: Send + Sync + fmt::Debug {
    fn name(&self) -> &'static str;

    fn encode(&self, value: &serde_json::Value) -> Result<String>;

    fn decode(&self, text: &str) -> Result<serde_json::Value>;
}

/// JSON text. The default.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

impl BlobCodec for JsonCodec {
    fn name(&self) -> &'static str {
        "json"
    }

    fn encode(&self, value: &serde_json::Value) -> Result<String> {
        Ok(serde_json::to_string(value)?)
    }

    fn decode(&self, text: &str) -> Result<serde_json::Value> {
        Ok(serde_json::from_str(text)?)
    }
}

/// YAML text, for stores meant to be read by people.
#[derive(Debug, Clone, Copy, Default)]
pub struct YamlCodec;

impl BlobCodec for YamlCodec {
    fn name(&self) -> &'static str {
        "yaml"
    }

    fn encode(&self, value: &serde_json::Value) -> Result<String> {
        Ok(serde_yaml::to_string(value)?)
    }

    fn decode(&self, text: &str) -> Result<serde_json::Value> {
        Ok(serde_yaml::from_str(text)?)
    }
}

/// Codec selection in configuration files.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CodecKind {
    #[default]
    Json,
    Yaml,
}

impl CodecKind {
    pub fn codec(self) -> Box<dyn BlobCodec> {
        match self {
            CodecKind::Json => Box::new(JsonCodec),
            CodecKind::Yaml => Box::new(YamlCodec),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_json_codec() {
        let value = json!({ "some_data": 5, "tags": ["a", "b"] });
        let text = JsonCodec.encode(&value).unwrap();
        assert!(text.contains("\"some_data\":5"));
        assert_eq!(JsonCodec.decode(&text).unwrap(), value);
    }

    #[test]
    fn test_yaml_codec() {
        let value = json!({ "some_data": 5, "nested": { "ok": true } });
        let text = YamlCodec.encode(&value).unwrap();
        assert!(text.contains("some_data: 5"));
        assert_eq!(YamlCodec.decode(&text).unwrap(), value);
    }

    #[test]
    fn test_decode_garbage_fails() {
        assert!(JsonCodec.decode("{not json").is_err());
    }

    #[test]
    fn test_codec_kind() {
        assert_eq!(CodecKind::default().codec().name(), "json");
        assert_eq!(CodecKind::Yaml.codec().name(), "yaml");
    }
}
