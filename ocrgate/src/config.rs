use serde::Deserialize;
use std::env;
use std::str::FromStr;

use crate::models::Color;

fn parse_env_or<T: FromStr>(var: &str, default: T) -> T
where
    T::Err: std::fmt::Display,
{
    match env::var(var) {
        Ok(val) => match val.parse() {
            Ok(parsed) => parsed,
            Err(e) => {
                tracing::warn!("Invalid value '{}' for {}: {}. Using default.", val, var, e);
                default
            }
        },
        Err(_) => default,
    }
}

fn env_non_empty(var: &str) -> Option<String> {
    env::var(var).ok().filter(|v| !v.trim().is_empty())
}

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub ocr: OcrConfig,
    pub pipeline: PipelineConfig,
    pub queue: QueueConfig,
    pub storage: StorageConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Bearer tokens accepted on protected routes. Empty means open access.
    pub api_keys: Vec<String>,
    pub max_body_bytes: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub auth_token: Option<String>,
    pub local_path: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OcrConfig {
    /// `local/tesseract` or `remote/<name>`.
    pub model: String,
    pub api_key: Option<String>,
    pub base_url: Option<String>,
    pub tessdata_path: Option<String>,
    pub timeout_secs: u64,
    pub max_image_dimension: u32,
}

/// How overlay colors are picked for kept detections.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColorMode {
    Fixed,
    Random,
}

impl FromStr for ColorMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "fixed" => Ok(Self::Fixed),
            "random" => Ok(Self::Random),
            other => Err(format!("unknown color mode '{other}' (expected fixed|random)")),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct PipelineConfig {
    pub default_confidence: f64,
    pub color_mode: ColorMode,
    pub box_color: Color,
    /// Emit row boxes as JSON-encoded strings instead of point lists.
    pub legacy_box_strings: bool,
    /// Prefix the overlay with `data:image/png;base64,`.
    pub overlay_data_uri: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            default_confidence: 0.5,
            color_mode: ColorMode::Fixed,
            box_color: Color::GREEN,
            legacy_box_strings: false,
            overlay_data_uri: true,
        }
    }
}

/// When the consumer acknowledges a claimed message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AckMode {
    /// Acknowledge as soon as the message is claimed (at-most-once).
    OnReceipt,
    /// Acknowledge only after the response has been published (at-least-once).
    AfterPublish,
}

impl FromStr for AckMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "on_receipt" | "auto" => Ok(Self::OnReceipt),
            "after_publish" | "manual" => Ok(Self::AfterPublish),
            other => Err(format!(
                "unknown ack mode '{other}' (expected on_receipt|after_publish)"
            )),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct QueueConfig {
    pub input_queue: String,
    pub response_queue: String,
    pub poll_interval_ms: u64,
    pub ack_mode: AckMode,
    /// An in-flight message claimed longer ago than this is handed out again.
    pub visibility_timeout_secs: u64,
    /// Replies older than this are deleted from the response queue.
    pub reply_retention_secs: u64,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            input_queue: "image_processing".to_string(),
            response_queue: "image_response".to_string(),
            poll_interval_ms: 500,
            ack_mode: AckMode::AfterPublish,
            visibility_timeout_secs: 300,
            reply_retention_secs: 86_400,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct StorageConfig {
    /// Store overlay blobs and result records in the database.
    pub persist_results: bool,
    /// Folder used when a request does not name one.
    pub default_folder: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                host: env::var("OCRGATE_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
                port: parse_env_or("OCRGATE_PORT", 5000),
                api_keys: env::var("OCRGATE_API_KEYS")
                    .map(|keys| {
                        keys.split(',')
                            .map(|s| s.trim().to_string())
                            .filter(|s| !s.is_empty())
                            .collect()
                    })
                    .unwrap_or_default(),
                max_body_bytes: parse_env_or("OCRGATE_MAX_BODY_BYTES", 20 * 1024 * 1024),
            },
            database: DatabaseConfig {
                url: env::var("DATABASE_URL").unwrap_or_else(|_| "file:ocrgate.db".to_string()),
                auth_token: env::var("DATABASE_AUTH_TOKEN").ok(),
                local_path: env::var("DATABASE_LOCAL_PATH").ok(),
            },
            ocr: OcrConfig {
                model: env::var("OCR_MODEL").unwrap_or_else(|_| "local/tesseract".to_string()),
                api_key: env_non_empty("OCR_API_KEY"),
                base_url: env_non_empty("OCR_BASE_URL"),
                tessdata_path: env_non_empty("OCR_TESSDATA_PATH"),
                timeout_secs: parse_env_or("OCR_TIMEOUT", 60),
                max_image_dimension: parse_env_or("OCR_MAX_DIMENSION", 8192),
            },
            pipeline: PipelineConfig {
                default_confidence: parse_env_or("PIPELINE_DEFAULT_CONFIDENCE", 0.5),
                color_mode: parse_env_or("PIPELINE_COLOR_MODE", ColorMode::Fixed),
                box_color: parse_env_or("PIPELINE_BOX_COLOR", Color::GREEN),
                legacy_box_strings: parse_env_or("PIPELINE_LEGACY_BOX_STRINGS", false),
                overlay_data_uri: parse_env_or("PIPELINE_OVERLAY_DATA_URI", true),
            },
            queue: QueueConfig {
                input_queue: env::var("QUEUE_INPUT")
                    .unwrap_or_else(|_| "image_processing".to_string()),
                response_queue: env::var("QUEUE_RESPONSE")
                    .unwrap_or_else(|_| "image_response".to_string()),
                poll_interval_ms: parse_env_or("QUEUE_POLL_INTERVAL_MS", 500),
                ack_mode: parse_env_or("QUEUE_ACK_MODE", AckMode::AfterPublish),
                visibility_timeout_secs: parse_env_or("QUEUE_VISIBILITY_TIMEOUT_SECS", 300),
                reply_retention_secs: parse_env_or("QUEUE_REPLY_RETENTION_SECS", 86_400),
            },
            storage: StorageConfig {
                persist_results: parse_env_or("STORAGE_PERSIST_RESULTS", false),
                default_folder: env_non_empty("STORAGE_DEFAULT_FOLDER"),
            },
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        Self::default()
    }
}

/// Split an OCR model string into (provider, model). Unprefixed names are local.
pub fn parse_ocr_model(model: &str) -> (&str, &str) {
    match model.split_once('/') {
        Some((prefix, rest)) => (prefix, rest),
        None => ("local", model),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    fn clear(vars: &[&str]) {
        for var in vars {
            std::env::remove_var(var);
        }
    }

    #[test]
    #[serial]
    fn test_defaults() {
        clear(&[
            "OCRGATE_PORT",
            "OCRGATE_API_KEYS",
            "OCR_MODEL",
            "PIPELINE_COLOR_MODE",
            "PIPELINE_BOX_COLOR",
            "QUEUE_ACK_MODE",
            "QUEUE_INPUT",
            "QUEUE_RESPONSE",
            "QUEUE_VISIBILITY_TIMEOUT_SECS",
            "QUEUE_REPLY_RETENTION_SECS",
            "STORAGE_PERSIST_RESULTS",
        ]);

        let config = Config::default();
        assert_eq!(config.server.port, 5000);
        assert!(config.server.api_keys.is_empty());
        assert_eq!(config.ocr.model, "local/tesseract");
        assert_eq!(config.pipeline.default_confidence, 0.5);
        assert_eq!(config.pipeline.color_mode, ColorMode::Fixed);
        assert_eq!(config.pipeline.box_color, Color::GREEN);
        assert!(config.pipeline.overlay_data_uri);
        assert_eq!(config.queue.input_queue, "image_processing");
        assert_eq!(config.queue.response_queue, "image_response");
        assert_eq!(config.queue.ack_mode, AckMode::AfterPublish);
        assert_eq!(config.queue.visibility_timeout_secs, 300);
        assert_eq!(config.queue.reply_retention_secs, 86_400);
        assert!(!config.storage.persist_results);
    }

    #[test]
    #[serial]
    fn test_pipeline_from_env() {
        std::env::set_var("PIPELINE_COLOR_MODE", "random");
        std::env::set_var("PIPELINE_BOX_COLOR", "255, 0, 0");
        std::env::set_var("PIPELINE_LEGACY_BOX_STRINGS", "true");

        let config = Config::default();
        assert_eq!(config.pipeline.color_mode, ColorMode::Random);
        assert_eq!(config.pipeline.box_color, Color::new(255, 0, 0));
        assert!(config.pipeline.legacy_box_strings);

        clear(&[
            "PIPELINE_COLOR_MODE",
            "PIPELINE_BOX_COLOR",
            "PIPELINE_LEGACY_BOX_STRINGS",
        ]);
    }

    #[test]
    #[serial]
    fn test_invalid_values_fall_back_to_defaults() {
        std::env::set_var("QUEUE_ACK_MODE", "sometimes");
        std::env::set_var("OCRGATE_PORT", "not-a-port");

        let config = Config::default();
        assert_eq!(config.queue.ack_mode, AckMode::AfterPublish);
        assert_eq!(config.server.port, 5000);

        clear(&["QUEUE_ACK_MODE", "OCRGATE_PORT"]);
    }

    #[test]
    #[serial]
    fn test_api_keys_split_and_trimmed() {
        std::env::set_var("OCRGATE_API_KEYS", " a , b ,,");
        let config = Config::default();
        assert_eq!(config.server.api_keys, vec!["a".to_string(), "b".to_string()]);
        clear(&["OCRGATE_API_KEYS"]);
    }

    #[test]
    fn test_ack_mode_aliases() {
        assert_eq!("auto".parse::<AckMode>().unwrap(), AckMode::OnReceipt);
        assert_eq!("after_publish".parse::<AckMode>().unwrap(), AckMode::AfterPublish);
        assert!("never".parse::<AckMode>().is_err());
    }

    #[test]
    fn test_parse_ocr_model() {
        assert_eq!(parse_ocr_model("local/tesseract"), ("local", "tesseract"));
        assert_eq!(parse_ocr_model("remote/paddle"), ("remote", "paddle"));
        assert_eq!(parse_ocr_model("tesseract"), ("local", "tesseract"));
    }
}
