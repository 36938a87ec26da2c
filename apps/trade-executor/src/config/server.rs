//! Server configuration for the HTTP command surface.

use serde::{Deserialize, Serialize};

/// Server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Whether the command surface is served.
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    /// HTTP port.
    #[serde(default = "default_http_port")]
    pub http_port: u16,
    /// Bind address.
    #[serde(default = "default_bind_address")]
    pub bind_address: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            enabled: default_enabled(),
            http_port: default_http_port(),
            bind_address: default_bind_address(),
        }
    }
}

impl ServerConfig {
    /// `address:port` to bind.
    #[must_use]
    pub fn socket_addr(&self) -> String {
        format!("{}:{}", self.bind_address, self.http_port)
    }
}

const fn default_enabled() -> bool {
    true
}

const fn default_http_port() -> u16 {
    8080
}

fn default_bind_address() -> String {
    "127.0.0.1".to_string()
}
