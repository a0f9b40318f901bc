use std::path::PathBuf;
use std::str::FromStr;

use tracing::warn;

const DEFAULT_ALLOWED_ORIGINS: &str = "http://localhost:8080,http://127.0.0.1:8080,http://localhost:5173,http://127.0.0.1:5173,http://localhost:3000,http://127.0.0.1:3000";

/// Process-wide settings, read once at startup.
#[derive(Debug, Clone)]
pub struct Settings {
    pub app_name: String,
    pub bind_addr: String,
    pub openai_api_key: Option<String>,
    pub gemini_api_key: Option<String>,
    pub vision_model: Option<String>,
    pub gemini_text_model: Option<String>,
    pub gemini_image_model: Option<String>,
    pub allowed_origins: Vec<String>,
    pub max_body_bytes: usize,
    pub extraction_timeout_secs: u64,
    pub classify_concurrency: usize,
    pub classify_votes: usize,
    /// Where annotated copies of processed images go; disabled when unset
    pub debug_output_dir: Option<PathBuf>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            app_name: "Interior Design Backend".to_string(),
            bind_addr: "0.0.0.0:3000".to_string(),
            openai_api_key: None,
            gemini_api_key: None,
            vision_model: None,
            gemini_text_model: None,
            gemini_image_model: None,
            allowed_origins: split_origins(DEFAULT_ALLOWED_ORIGINS),
            max_body_bytes: 10 * 1024 * 1024, // 10MB max for images
            extraction_timeout_secs: 30,
            classify_concurrency: 4,
            classify_votes: 1,
            debug_output_dir: None,
        }
    }
}

impl Settings {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build settings from any key lookup; unset or blank keys keep their defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let defaults = Self::default();

        Self {
            app_name: get("APP_NAME").unwrap_or(defaults.app_name),
            bind_addr: get("BIND_ADDR").unwrap_or(defaults.bind_addr),
            openai_api_key: get("OPENAI_API_KEY"),
            gemini_api_key: get("GEMINI_API_KEY"),
            vision_model: get("VISION_MODEL"),
            gemini_text_model: get("GEMINI_TEXT_MODEL"),
            gemini_image_model: get("GEMINI_IMAGE_MODEL"),
            allowed_origins: get("ALLOWED_ORIGINS")
                .map(|v| split_origins(&v))
                .unwrap_or(defaults.allowed_origins),
            max_body_bytes: parse_or("MAX_BODY_BYTES", get("MAX_BODY_BYTES"), defaults.max_body_bytes),
            extraction_timeout_secs: parse_or(
                "EXTRACTION_TIMEOUT_SECS",
                get("EXTRACTION_TIMEOUT_SECS"),
                defaults.extraction_timeout_secs,
            ),
            classify_concurrency: parse_or(
                "CLASSIFY_CONCURRENCY",
                get("CLASSIFY_CONCURRENCY"),
                defaults.classify_concurrency,
            )
            .max(1),
            classify_votes: parse_or("CLASSIFY_VOTES", get("CLASSIFY_VOTES"), defaults.classify_votes)
                .max(1),
            debug_output_dir: get("DEBUG_OUTPUT_DIR").map(PathBuf::from),
        }
    }
}

fn split_origins(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

fn parse_or<T: FromStr>(key: &str, value: Option<String>, default: T) -> T {
    match value {
        Some(raw) => raw.trim().parse().unwrap_or_else(|_| {
            warn!("Ignoring invalid {}={:?}, using default", key, raw);
            default
        }),
        None => default,
    }
}
