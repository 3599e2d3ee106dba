use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required configuration. Please set the {env_var} environment variable.")]
    MissingEnvVar { env_var: String },

    #[error(transparent)]
    Other(#[from] config::ConfigError),
}

/// Map a missing configuration field back to the environment variable
/// that supplies it, so startup errors tell the operator what to set.
pub fn to_env_var(field: &str) -> String {
    // A whole missing section means nothing was configured at all; point
    // at the first variable someone has to set.
    if field == "service" {
        return "MYNA_SERVICE__ENDPOINT".to_string();
    }
    let known_service_fields = [
        "endpoint",
        "api_key",
        "api_version",
        "assistant_id",
        "model",
        "instructions",
        "vector_store_id",
    ];
    if known_service_fields.contains(&field) {
        return format!("MYNA_SERVICE__{}", field.to_uppercase());
    }
    if field == "host" || field == "port" {
        return format!("MYNA_SERVER__{}", field.to_uppercase());
    }
    format!("MYNA_{}", field.to_uppercase().replace('.', "__"))
}
