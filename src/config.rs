use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct LlmConfig {
    pub api_url: String,
    pub api_key: Option<String>,
    pub model: String,
    pub temperature: f32,
    pub max_tokens: u32,
    pub timeout: Duration,
}

#[derive(Debug, Clone)]
pub struct TransliterationConfig {
    pub program: String,
    pub script: PathBuf,
    pub timeout: Duration,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub bind_addr: SocketAddr,
    pub data_dir: PathBuf,
    pub static_dir: Option<PathBuf>,
    pub llm: LlmConfig,
    pub dictionary_url: String,
    pub dictionary_timeout: Duration,
    pub transliteration: TransliterationConfig,
    pub job_ttl: Duration,
    pub job_sweep_interval: Duration,
    pub session_ttl: Duration,
    pub cache_ttl: Duration,
    pub cache_max_entries: usize,
    pub cache_prune_interval: Duration,
}

impl AppConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the config from any key lookup; missing or malformed values
    /// fall back to defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let port: u16 = parse_or(&lookup, "PORT", 3000);
        let host = lookup("BIND_ADDR").unwrap_or_else(|| "0.0.0.0".to_string());
        let bind_addr = format!("{}:{}", host, port).parse::<SocketAddr>().unwrap_or_else(|e| {
            tracing::warn!("Invalid BIND_ADDR '{}': {}, using 0.0.0.0", host, e);
            SocketAddr::from(([0, 0, 0, 0], port))
        });

        let llm = LlmConfig {
            api_url: lookup("LLM_API_URL")
                .unwrap_or_else(|| "https://api.deepseek.com/v1/chat/completions".to_string()),
            api_key: lookup("LLM_API_KEY").filter(|key| !key.trim().is_empty()),
            model: lookup("LLM_MODEL").unwrap_or_else(|| "deepseek-chat".to_string()),
            temperature: parse_or(&lookup, "LLM_TEMPERATURE", 1.5),
            max_tokens: parse_or(&lookup, "LLM_MAX_TOKENS", 3000),
            timeout: Duration::from_secs(parse_or(&lookup, "LLM_TIMEOUT_SECS", 120)),
        };

        AppConfig {
            bind_addr,
            data_dir: lookup("DATA_DIR").map_or_else(|| PathBuf::from("./data"), PathBuf::from),
            static_dir: lookup("STATIC_DIR").map(PathBuf::from),
            llm,
            dictionary_url: lookup("DICTIONARY_URL")
                .unwrap_or_else(|| "https://www.thai2english.com".to_string()),
            dictionary_timeout: Duration::from_secs(parse_or(&lookup, "DICTIONARY_TIMEOUT_SECS", 10)),
            transliteration: TransliterationConfig {
                program: lookup("PYTHON_BIN").unwrap_or_else(|| "python3".to_string()),
                script: lookup("TRANSLITERATE_SCRIPT")
                    .map_or_else(|| PathBuf::from("./scripts/transliterate.py"), PathBuf::from),
                timeout: Duration::from_secs(parse_or(&lookup, "TRANSLITERATE_TIMEOUT_SECS", 5)),
            },
            job_ttl: Duration::from_secs(parse_or(&lookup, "JOB_TTL_SECS", 600)),
            job_sweep_interval: Duration::from_secs(parse_or(&lookup, "JOB_SWEEP_SECS", 60)),
            session_ttl: Duration::from_secs(parse_or(&lookup, "SESSION_TTL_SECS", 24 * 60 * 60)),
            cache_ttl: Duration::from_secs(parse_or(&lookup, "CACHE_TTL_SECS", 24 * 60 * 60)),
            cache_max_entries: parse_or(&lookup, "CACHE_MAX_ENTRIES", 500),
            cache_prune_interval: Duration::from_secs(parse_or(&lookup, "CACHE_PRUNE_SECS", 60 * 60)),
        }
    }

    pub fn response_times_path(&self) -> PathBuf {
        self.data_dir.join("response_times.json")
    }

    pub fn progress_dir(&self) -> PathBuf {
        self.data_dir.join("progress")
    }
}

fn parse_or<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> T
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(key) {
        Some(raw) => raw.trim().parse().unwrap_or_else(|e| {
            tracing::warn!("Invalid {} '{}': {}, using default", key, raw, e);
            default
        }),
        None => default,
    }
}
