use serde::Deserialize;

use crate::document::HttpMethod;
use crate::error::ReflectError;

/// Options controlling how a [`Reflector`](crate::reflect::Reflector) shapes its output.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ReflectorConfig {
    /// Content type used for JSON request and response bodies.
    pub json_content_type: String,
    /// Drop the namespace prefix from component names (`User` instead of `BillingUser`).
    pub strip_namespace: bool,
    /// Methods that never carry a request body unless the request type forces one.
    pub bodyless_methods: Vec<HttpMethod>,
}

impl Default for ReflectorConfig {
    fn default() -> Self {
        Self {
            json_content_type: "application/json".to_string(),
            strip_namespace: false,
            bodyless_methods: vec![
                HttpMethod::Get,
                HttpMethod::Head,
                HttpMethod::Delete,
                HttpMethod::Trace,
            ],
        }
    }
}

impl ReflectorConfig {
    /// Parse a config from YAML. Missing keys fall back to defaults.
    pub fn from_yaml(input: &str) -> Result<Self, ReflectError> {
        Ok(serde_yaml_ng::from_str(input)?)
    }

    pub fn is_bodyless(&self, method: HttpMethod) -> bool {
        self.bodyless_methods.contains(&method)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ReflectorConfig::default();
        assert_eq!(config.json_content_type, "application/json");
        assert!(!config.strip_namespace);
        assert!(config.is_bodyless(HttpMethod::Get));
        assert!(config.is_bodyless(HttpMethod::Delete));
        assert!(!config.is_bodyless(HttpMethod::Post));
    }

    #[test]
    fn test_parse_config_yaml() {
        let yaml = r#"
json_content_type: application/vnd.api+json
strip_namespace: true
bodyless_methods: [get, head]
"#;
        let config = ReflectorConfig::from_yaml(yaml).unwrap();
        assert_eq!(config.json_content_type, "application/vnd.api+json");
        assert!(config.strip_namespace);
        assert_eq!(
            config.bodyless_methods,
            vec![HttpMethod::Get, HttpMethod::Head]
        );
        assert!(!config.is_bodyless(HttpMethod::Delete));
    }

    #[test]
    fn test_parse_minimal_config() {
        let config = ReflectorConfig::from_yaml("strip_namespace: true\n").unwrap();
        assert!(config.strip_namespace);
        assert_eq!(config.json_content_type, "application/json");
        assert_eq!(config.bodyless_methods.len(), 4);
    }

    #[test]
    fn test_parse_invalid_config() {
        let err = ReflectorConfig::from_yaml("bodyless_methods: [fetch]\n").unwrap_err();
        assert!(matches!(err, ReflectError::Config(_)));
    }
}
