use crate::error::{to_env_var, ConfigError};
use config::{Config, Environment};
use myna::service::azure::DEFAULT_API_VERSION;
use serde::Deserialize;
use std::net::SocketAddr;

#[derive(Debug, Default, Deserialize)]
pub struct ServerSettings {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

impl ServerSettings {
    pub fn socket_addr(&self) -> SocketAddr {
        format!("{}:{}", self.host, self.port)
            .parse()
            .expect("Failed to parse socket address")
    }
}

/// Connection and assistant settings for the hosted assistants service.
#[derive(Debug, Deserialize)]
pub struct ServiceSettings {
    /// Base URL of the Azure OpenAI resource.
    pub endpoint: String,
    pub api_key: String,
    #[serde(default = "default_api_version")]
    pub api_version: String,
    /// Reuse an existing assistant instead of registering one at startup.
    #[serde(default)]
    pub assistant_id: Option<String>,
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_instructions")]
    pub instructions: String,
    /// Vector store to wire into the assistant's file search, if any.
    #[serde(default)]
    pub vector_store_id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub server: ServerSettings,
    pub service: ServiceSettings,
}

impl Settings {
    pub fn new() -> Result<Self, ConfigError> {
        Self::load_and_validate()
    }

    fn load_and_validate() -> Result<Self, ConfigError> {
        // Start with default configuration
        let config = Config::builder()
            // Server defaults
            .set_default("server.host", default_host())?
            .set_default("server.port", default_port())?
            // Service defaults
            .set_default("service.api_version", default_api_version())?
            .set_default("service.model", default_model())?
            .set_default("service.instructions", default_instructions())?
            // Layer on the environment variables
            .add_source(
                Environment::with_prefix("MYNA")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        // Try to deserialize the configuration
        let result: Result<Self, config::ConfigError> = config.try_deserialize();

        // Handle missing field errors specially
        match result {
            Ok(settings) => Ok(settings),
            Err(err) => {
                tracing::debug!("Configuration error: {:?}", &err);

                // Handle both NotFound and missing field message variants
                let error_str = err.to_string();
                if error_str.starts_with("missing field") {
                    // Extract field name from error message "missing field `endpoint`"
                    let field = error_str
                        .trim_start_matches("missing field `")
                        .trim_end_matches("`");
                    let env_var = to_env_var(field);
                    Err(ConfigError::MissingEnvVar { env_var })
                } else if let config::ConfigError::NotFound(field) = &err {
                    let env_var = to_env_var(field);
                    Err(ConfigError::MissingEnvVar { env_var })
                } else {
                    Err(ConfigError::Other(err))
                }
            }
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    5000
}

fn default_api_version() -> String {
    DEFAULT_API_VERSION.to_string()
}

fn default_model() -> String {
    "gpt-4.1-mini".to_string()
}

fn default_instructions() -> String {
    "You are a helpful assistant. Answer from the configured data sources; \
     when something cannot be verified from them, say so instead of guessing."
        .to_string()
}
