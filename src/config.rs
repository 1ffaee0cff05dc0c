//! Configuration for a stubbed client.
//!
//! Declares whether stubbing is enabled, the stubs queued per operation, and
//! logging/recording settings.

use crate::adapter::is_http_response_stub;
use crate::model::ServiceModel;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

/// Main configuration for a stubbed client.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub struct StubConfig {
    /// Serve stubs instead of calling the transport
    #[serde(default)]
    pub stub_responses: bool,

    /// Raw stub specifications per operation, served in order
    #[serde(default)]
    pub stubs: BTreeMap<String, Vec<serde_json::Value>>,

    /// Global settings
    #[serde(default)]
    pub settings: GlobalSettings,
}

impl StubConfig {
    /// Load configuration from a YAML file.
    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = serde_yaml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Create from a YAML configuration string.
    pub fn from_yaml(yaml: &str) -> Result<Self, serde_yaml::Error> {
        serde_yaml::from_str(yaml)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> anyhow::Result<()> {
        if !self.stub_responses && !self.stubs.is_empty() {
            anyhow::bail!("Stubs are configured but stub_responses is false");
        }
        for (operation, stubs) in &self.stubs {
            if operation.is_empty() {
                anyhow::bail!("Operation name cannot be empty");
            }
            for (i, stub) in stubs.iter().enumerate() {
                validate_stub(stub).map_err(|e| anyhow::anyhow!("{} stub {}: {}", operation, i, e))?;
            }
        }
        Ok(())
    }

    /// Check that every configured operation exists in `model`.
    pub fn validate_against(&self, model: &ServiceModel) -> anyhow::Result<()> {
        for operation in self.stubs.keys() {
            if !model.operations.contains_key(operation) {
                anyhow::bail!(
                    "Unknown operation {} for service {}",
                    operation,
                    model.metadata.service_id
                );
            }
        }
        Ok(())
    }
}

fn validate_stub(stub: &serde_json::Value) -> anyhow::Result<()> {
    let Some(map) = stub.as_object().filter(|m| is_http_response_stub(m)) else {
        return Ok(());
    };
    let status = map["status_code"].as_u64().unwrap_or(0);
    if !(100..=599).contains(&status) {
        anyhow::bail!("Invalid status code: {}", map["status_code"]);
    }
    if let Some(body) = map.get("body").filter(|b| b.is_object()) {
        let body: ResponseBody = serde_json::from_value(body.clone())?;
        body.to_bytes()?;
    }
    Ok(())
}

/// Body of a literal wire-response stub.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ResponseBody {
    /// Plain text body
    Text { content: String },
    /// JSON body
    Json { content: serde_json::Value },
    /// Base64 encoded binary
    Base64 { content: String },
    /// Load from file
    File { path: String },
}

impl ResponseBody {
    /// Get the body content as bytes.
    pub fn to_bytes(&self) -> anyhow::Result<Vec<u8>> {
        match self {
            ResponseBody::Text { content } => Ok(content.as_bytes().to_vec()),
            ResponseBody::Json { content } => Ok(serde_json::to_string(content)?.into_bytes()),
            ResponseBody::Base64 { content } => {
                use base64::Engine;
                base64::engine::general_purpose::STANDARD
                    .decode(content)
                    .map_err(|e| anyhow::anyhow!("Invalid base64: {}", e))
            }
            ResponseBody::File { path } => std::fs::read(path)
                .map_err(|e| anyhow::anyhow!("Failed to read file {}: {}", path, e)),
        }
    }
}

/// Global settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GlobalSettings {
    /// Log every stub resolution
    #[serde(default = "default_true")]
    pub log_resolutions: bool,

    /// Record stubbed invocations for later inspection
    #[serde(default = "default_true")]
    pub record_requests: bool,

    /// Validate invocation params against the input shape
    #[serde(default = "default_true")]
    pub validate_params: bool,
}

impl Default for GlobalSettings {
    fn default() -> Self {
        Self {
            log_resolutions: true,
            record_requests: true,
            validate_params: true,
        }
    }
}

fn default_true() -> bool {
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::tests::storage_model;

    #[test]
    fn test_parse_stub_sequence() {
        let yaml = r#"
stub_responses: true
stubs:
  HeadObject:
    - NotFound
    - content_length: 150
"#;
        let config = StubConfig::from_yaml(yaml).unwrap();
        config.validate().unwrap();
        let stubs = &config.stubs["HeadObject"];
        assert_eq!(stubs.len(), 2);
        assert_eq!(stubs[0], "NotFound");
        assert_eq!(stubs[1]["content_length"], 150);
        assert!(config.settings.log_resolutions);
    }

    #[test]
    fn test_parse_literal_response() {
        let yaml = r#"
stub_responses: true
stubs:
  ListBuckets:
    - status_code: 500
      headers:
        Content-Type: text/plain
      body:
        type: text
        content: "Internal Server Error"
"#;
        let config = StubConfig::from_yaml(yaml).unwrap();
        config.validate().unwrap();
        assert_eq!(config.stubs["ListBuckets"][0]["status_code"], 500);
    }

    #[test]
    fn test_invalid_status_code() {
        let yaml = r#"
stub_responses: true
stubs:
  ListBuckets:
    - status_code: 42
      headers: {}
      body: ""
"#;
        let config = StubConfig::from_yaml(yaml).unwrap();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("Invalid status code"));
    }

    #[test]
    fn test_invalid_base64_body() {
        let yaml = r#"
stub_responses: true
stubs:
  ListBuckets:
    - status_code: 200
      headers: {}
      body:
        type: base64
        content: "not base64!"
"#;
        let config = StubConfig::from_yaml(yaml).unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_stubs_require_stubbing_enabled() {
        let yaml = r#"
stubs:
  HeadObject:
    - NotFound
"#;
        let config = StubConfig::from_yaml(yaml).unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_unknown_fields_rejected() {
        let yaml = r#"
stub_responses: true
stub_everything: true
"#;
        assert!(StubConfig::from_yaml(yaml).is_err());
    }

    #[test]
    fn test_validate_against_model() {
        let model = storage_model();
        let mut config = StubConfig {
            stub_responses: true,
            ..Default::default()
        };
        config
            .stubs
            .insert("HeadObject".to_string(), vec![serde_json::json!("NotFound")]);
        config.validate_against(&model).unwrap();

        config.stubs.insert("Teleport".to_string(), Vec::new());
        assert!(config.validate_against(&model).is_err());
    }

    #[test]
    fn test_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("stubs.yaml");
        std::fs::write(
            &path,
            "stub_responses: true\nsettings:\n  record_requests: false\n",
        )
        .unwrap();

        let config = StubConfig::from_file(&path).unwrap();
        assert!(config.stub_responses);
        assert!(!config.settings.record_requests);
        assert!(config.settings.validate_params);
    }

    #[test]
    fn test_response_body_to_bytes() {
        let text = ResponseBody::Text {
            content: "hello".to_string(),
        };
        assert_eq!(text.to_bytes().unwrap(), b"hello");

        let json = ResponseBody::Json {
            content: serde_json::json!({"Code": "NotFound"}),
        };
        assert_eq!(json.to_bytes().unwrap(), br#"{"Code":"NotFound"}"#);

        let binary = ResponseBody::Base64 {
            content: "AAEC".to_string(),
        };
        assert_eq!(binary.to_bytes().unwrap(), vec![0u8, 1, 2]);
    }
}
