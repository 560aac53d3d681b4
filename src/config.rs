use serde::Deserialize;

// Re-export config crate error if needed, or use custom error
pub use config::ConfigError;

#[derive(Debug, Deserialize, Clone)]
pub struct Settings {
    pub fcm: FcmSettings,
    #[serde(default)]
    pub dispatch: DispatchSettings,
    #[serde(default = "default_server_settings")]
    pub server: ServerSettings,
}

#[derive(Debug, Deserialize, Clone)]
pub struct FcmSettings {
    pub project_id: String,
    /// Path to a service-account JSON key. Falls back to
    /// GOOGLE_APPLICATION_CREDENTIALS when unset.
    pub credentials_path: Option<String>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DispatchSettings {
    /// Maximum number of in-flight sends per request.
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,
    /// When true, `receiver` and `notificationType` must be present in the
    /// request body instead of silently defaulting to "all" / "normal".
    #[serde(default)]
    pub require_targeting_fields: bool,
}

impl Default for DispatchSettings {
    fn default() -> Self {
        DispatchSettings {
            concurrency: default_concurrency(),
            require_targeting_fields: false,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerSettings {
    #[serde(default = "default_listen_addr")]
    pub listen_addr: String,
}

fn default_server_settings() -> ServerSettings {
    ServerSettings {
        listen_addr: default_listen_addr(),
    }
}

fn default_listen_addr() -> String {
    "0.0.0.0:8000".to_string()
}

fn default_concurrency() -> usize {
    20
}

impl Settings {
    pub fn new() -> Result<Self, ConfigError> {
        let config_dir = std::env::current_dir().map_err(|e| {
            ConfigError::Message(format!("Failed to get current dir: {}", e))
        })?;
        let config_path = config_dir.join("config").join("settings.yaml");

        let s = config::Config::builder()
            .add_source(config::File::from(config_path).required(false))
            // E.g. `EVENT_PUSH__FCM__PROJECT_ID=my-project` overrides `fcm.project_id`
            .add_source(config::Environment::with_prefix("EVENT_PUSH").separator("__"))
            .build()?;

        s.try_deserialize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dispatch_settings_defaults() {
        let settings = DispatchSettings::default();
        assert_eq!(settings.concurrency, 20);
        assert!(!settings.require_targeting_fields);
    }

    #[test]
    fn test_server_settings_default_listen_addr() {
        let settings = default_server_settings();
        assert_eq!(settings.listen_addr, "0.0.0.0:8000");
    }
}
