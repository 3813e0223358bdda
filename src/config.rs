//! Configuración central del servidor.
//! Carga variables de entorno (.env incluido, una sola vez) y expone una
//! estructura inmutable `AppConfig`. Los valores ausentes o vacíos toman el
//! valor por defecto; los presentes pero no parseables son `ConfigError`.
use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use canvas_persistence::{init_dotenv, PersistenceError, StoreBackend, StoreConfig};
use canvas_policies::DEFAULT_MARKER;
use log::info;
use thiserror::Error;

pub const DEFAULT_PORT: u16 = 8080;
pub const DEFAULT_PROVER_URL: &str = "https://example.com";
pub const DEFAULT_PUBLISHER_URL: &str = "https://publisher.walrus-testnet.walrus.space";
pub const DEFAULT_AGGREGATOR_URL: &str = "https://aggregator.walrus-testnet.walrus.space/v1/";
pub const DEFAULT_EPOCHS: u32 = 5;
pub const DEFAULT_MAX_CONCURRENT_JOBS: usize = 4;
pub const DEFAULT_JOB_TIMEOUT_SECS: u64 = 600;
pub const DEFAULT_JOB_RETENTION_SECS: u64 = 3600;
/// Las imágenes viajan en base64 dentro del JSON; 2 MiB se quedan cortos.
pub const DEFAULT_MAX_BODY_BYTES: usize = 64 * 1024 * 1024;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid value for {key}: '{value}' ({reason})")] Invalid { key: String, value: String, reason: String },
    #[error(transparent)] Store(#[from] PersistenceError),
}

/// Destino de subida de blobs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WalrusConfig {
    pub publisher_url: String,
    pub aggregator_url: String,
    pub epochs: u32,
}

/// Límites del pool de jobs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JobsConfig {
    pub max_concurrent: usize,
    pub timeout: Duration,
    /// Latencia simulada del sintetizador placeholder.
    pub proof_delay: Duration,
    /// Tiempo que un registro terminal sigue en la tabla antes de podarse.
    pub retention: Duration,
}

impl Default for JobsConfig {
    fn default() -> Self {
        Self { max_concurrent: DEFAULT_MAX_CONCURRENT_JOBS,
               timeout: Duration::from_secs(DEFAULT_JOB_TIMEOUT_SECS),
               proof_delay: Duration::ZERO,
               retention: Duration::from_secs(DEFAULT_JOB_RETENTION_SECS) }
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub port: u16,
    pub store: StoreConfig,
    pub admission_marker: String,
    /// `None` desactiva el ping de vida.
    pub prover_url: Option<String>,
    pub walrus: WalrusConfig,
    pub jobs: JobsConfig,
    /// `None` = sin límite para las llamadas HTTP salientes.
    pub http_timeout: Option<Duration>,
    /// Tope del cuerpo de `POST /verify`; `None` = sin tope.
    pub max_body_bytes: Option<usize>,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        init_dotenv();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Construye la configuración desde una función de búsqueda arbitraria.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        // vacío cuenta como ausente
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let port = match get("PORT") {
            Some(v) => parse_value("PORT", &v)?,
            None => {
                info!("config: PORT not set, defaulting to {DEFAULT_PORT}");
                DEFAULT_PORT
            }
        };
        let backend = match get("STORE_BACKEND") {
            Some(v) => v.parse::<StoreBackend>()?,
            None => StoreBackend::Fs,
        };
        let scratch_dir = get("SCRATCH_DIR").map(PathBuf::from).unwrap_or_else(env::temp_dir);
        // PROVER_URL="" desactiva el ping; ausente usa el default
        let prover_url = match lookup("PROVER_URL") {
            Some(v) if v.trim().is_empty() => None,
            Some(v) => Some(v.trim().to_string()),
            None => Some(DEFAULT_PROVER_URL.to_string()),
        };
        let max_concurrent: usize = parse_or("MAX_CONCURRENT_JOBS", get("MAX_CONCURRENT_JOBS"), DEFAULT_MAX_CONCURRENT_JOBS)?;
        if max_concurrent == 0 {
            return Err(ConfigError::Invalid { key: "MAX_CONCURRENT_JOBS".into(),
                                              value: "0".into(),
                                              reason: "must be at least 1".into() });
        }
        let http_timeout_secs: u64 = parse_or("HTTP_TIMEOUT_SECS", get("HTTP_TIMEOUT_SECS"), 0)?;
        // MAX_BODY_BYTES=0 quita el tope
        let max_body_bytes: usize = parse_or("MAX_BODY_BYTES", get("MAX_BODY_BYTES"), DEFAULT_MAX_BODY_BYTES)?;

        Ok(Self { port,
                  store: StoreConfig { backend, scratch_dir },
                  admission_marker: get("ADMISSION_MARKER").unwrap_or_else(|| DEFAULT_MARKER.to_string()),
                  prover_url,
                  walrus: WalrusConfig { publisher_url: get("WALRUS_PUBLISHER_URL").unwrap_or_else(|| DEFAULT_PUBLISHER_URL.into()),
                                         aggregator_url: get("WALRUS_AGGREGATOR_URL").unwrap_or_else(|| DEFAULT_AGGREGATOR_URL.into()),
                                         epochs: parse_or("WALRUS_EPOCHS", get("WALRUS_EPOCHS"), DEFAULT_EPOCHS)? },
                  jobs: JobsConfig { max_concurrent,
                                     timeout: Duration::from_secs(parse_or("JOB_TIMEOUT_SECS",
                                                                           get("JOB_TIMEOUT_SECS"),
                                                                           DEFAULT_JOB_TIMEOUT_SECS)?),
                                     proof_delay: Duration::from_millis(parse_or("PROOF_DELAY_MS", get("PROOF_DELAY_MS"), 0)?),
                                     retention: Duration::from_secs(parse_or("JOB_RETENTION_SECS",
                                                                             get("JOB_RETENTION_SECS"),
                                                                             DEFAULT_JOB_RETENTION_SECS)?) },
                  http_timeout: (http_timeout_secs > 0).then(|| Duration::from_secs(http_timeout_secs)),
                  max_body_bytes: (max_body_bytes > 0).then_some(max_body_bytes) })
    }
}

fn parse_value<T>(key: &str, raw: &str) -> Result<T, ConfigError>
    where T: FromStr,
          T::Err: std::fmt::Display
{
    raw.trim().parse().map_err(|e: T::Err| ConfigError::Invalid { key: key.to_string(),
                                                                  value: raw.to_string(),
                                                                  reason: e.to_string() })
}

fn parse_or<T>(key: &str, raw: Option<String>, default: T) -> Result<T, ConfigError>
    where T: FromStr,
          T::Err: std::fmt::Display
{
    raw.map_or(Ok(default), |v| parse_value(key, &v))
}
