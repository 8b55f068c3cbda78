use anyhow::Result;
use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};

/// Application configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub database: DatabaseConfig,
    pub logging: LoggingConfig,
    pub model: ModelConfig,
    pub pipeline: PipelineConfig,
    pub trend: TrendConfig,
    pub retention: RetentionConfig,
    pub export: ExportConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub connection_timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
    pub file_path: Option<String>,
    pub format: String, // "json" or "text"
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelConfig {
    /// Directory holding vectorizer.json and classifier.json
    pub directory: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    pub max_message_length: usize,
    pub min_token_length: usize,
    /// Deployment-specific stopwords removed in addition to the built-in
    /// English list
    #[serde(default)]
    pub extra_stopwords: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrendConfig {
    pub increase_threshold: f64,
    pub decrease_threshold: f64,
    pub default_window_days: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetentionConfig {
    /// Predictions older than this are eligible for cleanup
    pub days: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportConfig {
    pub default_format: String,
    pub output_directory: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database: DatabaseConfig {
                url: "sqlite:data/spam_detector.db".to_string(),
                max_connections: 10,
                connection_timeout_secs: 30,
            },
            logging: LoggingConfig {
                level: "info".to_string(),
                file_path: None,
                format: "text".to_string(),
            },
            model: ModelConfig {
                directory: "models/current".to_string(),
            },
            pipeline: PipelineConfig {
                max_message_length: 10_000,
                min_token_length: 3,
                extra_stopwords: Vec::new(),
            },
            trend: TrendConfig {
                increase_threshold: 10.0,
                decrease_threshold: -10.0,
                default_window_days: 7,
            },
            retention: RetentionConfig { days: 90 },
            export: ExportConfig {
                default_format: "csv".to_string(),
                output_directory: "./output".to_string(),
            },
        }
    }
}

impl AppConfig {
    /// Load configuration from multiple sources with precedence
    pub fn load() -> Result<Self> {
        let mut builder = Config::builder();
        // Start with default values
        for (key, value) in AppConfig::default() {
            builder = builder.set_default(key, value)?;
        }

        let config = builder
            // Add config file if it exists
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name("config/local").required(false))
            .add_source(File::with_name("config").required(false))
            // Add environment variables with prefix
            .add_source(Environment::with_prefix("SPAM_DETECTOR").separator("_"))
            .build()
            .map_err(|e| anyhow::anyhow!("Failed to load configuration: {}", e))?;

        let app_config: AppConfig = config
            .try_deserialize()
            .map_err(|e| anyhow::anyhow!("Failed to deserialize configuration: {}", e))?;

        // Validate configuration
        app_config.validate()?;

        Ok(app_config)
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        // Validate database config
        if self.database.max_connections == 0 {
            return Err(anyhow::anyhow!("max_connections must be greater than 0"));
        }
        crate::validation::InputValidator::validate_database_url(&self.database.url)
            .map_err(|e| anyhow::anyhow!("Invalid database URL: {e}"))?;

        // Validate logging config
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.logging.level.as_str()) {
            return Err(anyhow::anyhow!(
                "Invalid log level: {}. Must be one of: {:?}",
                self.logging.level,
                valid_levels
            ));
        }

        let valid_formats = ["text", "json"];
        if !valid_formats.contains(&self.logging.format.as_str()) {
            return Err(anyhow::anyhow!(
                "Invalid log format: {}. Must be one of: {:?}",
                self.logging.format,
                valid_formats
            ));
        }

        // Validate model config
        if self.model.directory.trim().is_empty() {
            return Err(anyhow::anyhow!("model.directory must not be empty"));
        }

        // Validate pipeline config
        if self.pipeline.max_message_length == 0 {
            return Err(anyhow::anyhow!("max_message_length must be greater than 0"));
        }

        // Validate trend config
        if self.trend.increase_threshold <= self.trend.decrease_threshold {
            return Err(anyhow::anyhow!(
                "increase_threshold must be greater than decrease_threshold"
            ));
        }
        if self.trend.default_window_days == 0 {
            return Err(anyhow::anyhow!(
                "default_window_days must be greater than 0"
            ));
        }

        // Validate export config
        let valid_formats = ["csv", "json"];
        if !valid_formats.contains(&self.export.default_format.as_str()) {
            return Err(anyhow::anyhow!(
                "Invalid export format: {}. Must be one of: {:?}",
                self.export.default_format,
                valid_formats
            ));
        }

        Ok(())
    }

    /// Get database URL from environment or config
    pub fn get_database_url(&self) -> String {
        std::env::var("DATABASE_URL").unwrap_or_else(|_| self.database.url.clone())
    }

    /// Get model directory from environment or config
    pub fn get_model_directory(&self) -> String {
        std::env::var("MODEL_DIR").unwrap_or_else(|_| self.model.directory.clone())
    }

    /// Get log level from environment or config
    pub fn get_log_level(&self) -> String {
        std::env::var("RUST_LOG").unwrap_or_else(|_| self.logging.level.clone())
    }
}

impl IntoIterator for AppConfig {
    type Item = (String, config::Value);
    type IntoIter = std::collections::hash_map::IntoIter<String, config::Value>;

    fn into_iter(self) -> Self::IntoIter {
        let mut map = std::collections::HashMap::new();

        // Flatten the configuration into key-value pairs
        map.insert(
            "database.url".to_string(),
            config::Value::from(self.database.url),
        );
        map.insert(
            "database.max_connections".to_string(),
            config::Value::from(self.database.max_connections),
        );
        map.insert(
            "database.connection_timeout_secs".to_string(),
            config::Value::from(self.database.connection_timeout_secs),
        );

        map.insert(
            "logging.level".to_string(),
            config::Value::from(self.logging.level),
        );
        if let Some(file_path) = self.logging.file_path {
            map.insert("logging.file_path".to_string(), config::Value::from(file_path));
        }
        map.insert(
            "logging.format".to_string(),
            config::Value::from(self.logging.format),
        );

        map.insert(
            "model.directory".to_string(),
            config::Value::from(self.model.directory),
        );

        map.insert(
            "pipeline.max_message_length".to_string(),
            config::Value::from(self.pipeline.max_message_length as u64),
        );
        map.insert(
            "pipeline.min_token_length".to_string(),
            config::Value::from(self.pipeline.min_token_length as u64),
        );
        map.insert(
            "pipeline.extra_stopwords".to_string(),
            config::Value::from(self.pipeline.extra_stopwords),
        );

        map.insert(
            "trend.increase_threshold".to_string(),
            config::Value::from(self.trend.increase_threshold),
        );
        map.insert(
            "trend.decrease_threshold".to_string(),
            config::Value::from(self.trend.decrease_threshold),
        );
        map.insert(
            "trend.default_window_days".to_string(),
            config::Value::from(self.trend.default_window_days),
        );

        map.insert(
            "retention.days".to_string(),
            config::Value::from(self.retention.days),
        );

        map.insert(
            "export.default_format".to_string(),
            config::Value::from(self.export.default_format),
        );
        map.insert(
            "export.output_directory".to_string(),
            config::Value::from(self.export.output_directory),
        );

        map.into_iter()
    }
}

/// A settings change, as a closed set of typed events rather than
/// name-keyed callbacks with unchecked payloads
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigEvent {
    /// The classifier bundle directory changed; takes effect on reload
    ModelDirectoryChanged(String),
    /// Trend policy thresholds changed
    TrendThresholdsChanged {
        /// New increase threshold, percent
        increase: f64,
        /// New decrease threshold, percent
        decrease: f64,
    },
    /// Retention window changed, in days
    RetentionChanged(u32),
    /// Maximum accepted message length changed, in characters
    MaxMessageLengthChanged(usize),
}

/// Implemented by components that react to settings changes. The service
/// facade implements this to apply trend, retention and length changes
/// without a restart.
pub trait ConfigObserver {
    /// Called once per event, on the thread that applied the change
    fn on_config_event(&mut self, event: &ConfigEvent);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.database.url, "sqlite:data/spam_detector.db");
        assert_eq!(config.logging.level, "info");
        assert_eq!(config.pipeline.max_message_length, 10_000);
        assert_eq!(config.retention.days, 90);
    }

    #[test]
    fn test_config_validation() {
        let config = AppConfig::default();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_invalid_config() {
        let mut config = AppConfig::default();
        config.database.max_connections = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_non_sqlite_url_rejected() {
        let mut config = AppConfig::default();
        config.database.url = "postgres://localhost/spam".to_string();
        assert!(config.validate().is_err());
        config.database.url = String::new();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_inverted_trend_thresholds_rejected() {
        let mut config = AppConfig::default();
        config.trend.increase_threshold = -20.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_observers_receive_typed_events() {
        struct Recorder {
            seen: Vec<ConfigEvent>,
        }
        impl ConfigObserver for Recorder {
            fn on_config_event(&mut self, event: &ConfigEvent) {
                self.seen.push(event.clone());
            }
        }

        let mut recorder = Recorder { seen: Vec::new() };
        {
            // Dispatch through the trait object, as a caller would
            let observer: &mut dyn ConfigObserver = &mut recorder;
            observer.on_config_event(&ConfigEvent::RetentionChanged(30));
            observer.on_config_event(&ConfigEvent::TrendThresholdsChanged {
                increase: 5.0,
                decrease: -5.0,
            });
        }

        assert_eq!(recorder.seen.len(), 2);
        assert_eq!(recorder.seen[0], ConfigEvent::RetentionChanged(30));
        assert!(matches!(
            recorder.seen[1],
            ConfigEvent::TrendThresholdsChanged { .. }
        ));
    }

    #[test]
    fn test_flattened_keys_cover_every_section() {
        let keys: Vec<String> = AppConfig::default().into_iter().map(|(k, _)| k).collect();
        for prefix in [
            "database.", "logging.", "model.", "pipeline.", "trend.", "retention.", "export.",
        ] {
            assert!(
                keys.iter().any(|k| k.starts_with(prefix)),
                "missing keys for {prefix}"
            );
        }
    }
}
