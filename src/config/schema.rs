//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the
//! emulation proxy. All types derive Serde traits for deserialization
//! from the config file.

use serde::{Deserialize, Serialize};

/// Root configuration for the emulation proxy.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct ProxyConfig {
    /// Listener configuration (bind address).
    pub listener: ListenerConfig,

    /// Local Lambda invocation endpoint settings.
    pub lambda: LambdaConfig,

    /// Deployment descriptor location.
    pub descriptor: DescriptorConfig,

    /// Origin the proxy forwards non-terminated requests to.
    pub origin: OriginConfig,

    /// Timeout configuration.
    pub timeouts: TimeoutConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "127.0.0.1:8080").
    pub bind_address: String,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "127.0.0.1:8080".to_string(),
        }
    }
}

/// Invocation endpoint configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LambdaConfig {
    /// Lambda-compatible invocation endpoint URL.
    pub endpoint: String,

    /// Read timeout for one invocation, in seconds. Exceeding it is a
    /// transport failure, never an indefinite hang.
    pub invoke_timeout_secs: u64,
}

impl Default for LambdaConfig {
    fn default() -> Self {
        Self {
            endpoint: "http://127.0.0.1:3001".to_string(),
            invoke_timeout_secs: 15,
        }
    }
}

/// Deployment descriptor location.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct DescriptorConfig {
    /// Path to the deployment descriptor (CloudFormation/SAM template).
    /// Empty means no routing configured: every stage passes through.
    pub path: String,
}

/// Origin forwarding configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct OriginConfig {
    /// Origin authority (e.g., "127.0.0.1:8000").
    pub address: String,
}

impl Default for OriginConfig {
    fn default() -> Self {
        Self {
            address: "127.0.0.1:8000".to_string(),
        }
    }
}

/// Timeout configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Overall request timeout in seconds.
    pub request_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self { request_secs: 60 }
    }
}

/// Observability settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Whether to expose Prometheus metrics.
    pub metrics_enabled: bool,

    /// Metrics exporter bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            metrics_enabled: false,
            metrics_address: "127.0.0.1:9090".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_the_local_development_setup() {
        let config = ProxyConfig::default();
        assert_eq!(config.lambda.endpoint, "http://127.0.0.1:3001");
        assert_eq!(config.lambda.invoke_timeout_secs, 15);
        assert!(config.descriptor.path.is_empty());
    }

    #[test]
    fn minimal_toml_parses_with_defaults() {
        let config: ProxyConfig = toml::from_str(
            r#"
            [descriptor]
            path = "template.yaml"
            "#,
        )
        .unwrap();
        assert_eq!(config.descriptor.path, "template.yaml");
        assert_eq!(config.listener.bind_address, "127.0.0.1:8080");
    }
}
