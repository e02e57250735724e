//! Environment configuration surface.
//!
//! Everything comes from process environment variables (with `.env`
//! support handled by the binary). A missing transport credential is a
//! fatal startup error; every other knob has a default.

use std::{path::PathBuf, str::FromStr, time::Duration};

use {secrecy::Secret, tracing::warn};

use clipferry_media::FetchLimits;

/// Upload ceiling enforced by the Telegram bot API.
///
/// The fetch-side size limit must stay strictly below this: both limits
/// are enforced independently, so the smaller one has to govern.
pub const DELIVERY_UPLOAD_CEILING_BYTES: u64 = 50 * 1024 * 1024;

const DEFAULT_PORT: u16 = 5000;
const DEFAULT_DATA_DIR: &str = "data";
const DEFAULT_MAX_DURATION_SECS: u64 = 600;
const DEFAULT_MAX_FILE_SIZE_MB: u64 = 45;
const DEFAULT_FETCH_WORKERS: usize = 4;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("TELEGRAM_TOKEN is not set")]
    MissingToken,

    #[error("invalid value for {name}: {value:?}")]
    Invalid { name: &'static str, value: String },

    #[error(
        "MAX_FILE_SIZE_MB of {configured} bytes is not below the {DELIVERY_UPLOAD_CEILING_BYTES} byte upload ceiling"
    )]
    LimitAboveCeiling { configured: u64 },
}

/// Startup configuration for the whole process.
#[derive(Clone)]
pub struct AppConfig {
    /// Transport credential. Absence is fatal before any connection.
    pub token: Secret<String>,
    /// Liveness endpoint port.
    pub port: u16,
    /// Artifact root directory; always explicit, never the process cwd.
    pub artifact_root: PathBuf,
    /// Cookie file passed to the fetch tool for authenticated sources.
    pub cookie_file: Option<PathBuf>,
    pub limits: FetchLimits,
    /// Cap on concurrent fetch subprocesses.
    pub fetch_workers: usize,
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("token", &"[REDACTED]")
            .field("port", &self.port)
            .field("artifact_root", &self.artifact_root)
            .field("cookie_file", &self.cookie_file)
            .field("limits", &self.limits)
            .field("fetch_workers", &self.fetch_workers)
            .finish()
    }
}

impl AppConfig {
    /// Read configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Read configuration through an arbitrary lookup, so tests never
    /// mutate process-wide environment state.
    pub fn from_lookup(get: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let token = get("TELEGRAM_TOKEN")
            .filter(|t| !t.trim().is_empty())
            .ok_or(ConfigError::MissingToken)?;

        let port = parse_or(&get, "PORT", DEFAULT_PORT)?;
        let artifact_root =
            PathBuf::from(get("DATA_DIR").unwrap_or_else(|| DEFAULT_DATA_DIR.to_string()));

        let max_duration_secs = parse_or(&get, "MAX_DURATION_SECS", DEFAULT_MAX_DURATION_SECS)?;
        let max_file_size_mb = parse_or(&get, "MAX_FILE_SIZE_MB", DEFAULT_MAX_FILE_SIZE_MB)?;
        let max_file_size_bytes = max_file_size_mb * 1024 * 1024;
        if max_file_size_bytes >= DELIVERY_UPLOAD_CEILING_BYTES {
            return Err(ConfigError::LimitAboveCeiling {
                configured: max_file_size_bytes,
            });
        }

        let fetch_workers = parse_or(&get, "FETCH_WORKERS", DEFAULT_FETCH_WORKERS)?;
        if fetch_workers == 0 {
            return Err(ConfigError::Invalid {
                name: "FETCH_WORKERS",
                value: "0".to_string(),
            });
        }

        let cookie_file = get("COOKIE_FILE").map(PathBuf::from).filter(|path| {
            if path.is_file() {
                true
            } else {
                warn!(path = %path.display(), "COOKIE_FILE does not exist, ignoring");
                false
            }
        });

        Ok(Self {
            token: Secret::new(token),
            port,
            artifact_root,
            cookie_file,
            limits: FetchLimits {
                max_duration: Duration::from_secs(max_duration_secs),
                max_file_size_bytes,
            },
            fetch_workers,
        })
    }
}

fn parse_or<T: FromStr>(
    get: &impl Fn(&str) -> Option<String>,
    name: &'static str,
    default: T,
) -> Result<T, ConfigError> {
    match get(name) {
        None => Ok(default),
        Some(raw) => raw.trim().parse().map_err(|_| ConfigError::Invalid {
            name,
            value: raw,
        }),
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use {super::*, secrecy::ExposeSecret, std::collections::HashMap};

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn defaults_apply_when_only_the_token_is_set() {
        let config = AppConfig::from_lookup(lookup(&[("TELEGRAM_TOKEN", "123:ABC")])).unwrap();
        assert_eq!(config.token.expose_secret(), "123:ABC");
        assert_eq!(config.port, 5000);
        assert_eq!(config.artifact_root, PathBuf::from("data"));
        assert_eq!(config.limits.max_duration, Duration::from_secs(600));
        assert_eq!(config.limits.max_file_size_bytes, 45 * 1024 * 1024);
        assert_eq!(config.fetch_workers, 4);
        assert!(config.cookie_file.is_none());
    }

    #[test]
    fn missing_token_is_fatal() {
        let err = AppConfig::from_lookup(lookup(&[])).unwrap_err();
        assert!(matches!(err, ConfigError::MissingToken));

        let err = AppConfig::from_lookup(lookup(&[("TELEGRAM_TOKEN", "  ")])).unwrap_err();
        assert!(matches!(err, ConfigError::MissingToken));
    }

    #[test]
    fn size_limit_must_stay_below_the_upload_ceiling() {
        let err = AppConfig::from_lookup(lookup(&[
            ("TELEGRAM_TOKEN", "123:ABC"),
            ("MAX_FILE_SIZE_MB", "50"),
        ]))
        .unwrap_err();
        assert!(matches!(err, ConfigError::LimitAboveCeiling { .. }));

        let config = AppConfig::from_lookup(lookup(&[
            ("TELEGRAM_TOKEN", "123:ABC"),
            ("MAX_FILE_SIZE_MB", "49"),
        ]))
        .unwrap();
        assert_eq!(config.limits.max_file_size_bytes, 49 * 1024 * 1024);
    }

    #[test]
    fn unparseable_values_are_rejected_with_the_variable_name() {
        let err = AppConfig::from_lookup(lookup(&[
            ("TELEGRAM_TOKEN", "123:ABC"),
            ("PORT", "not-a-port"),
        ]))
        .unwrap_err();
        match err {
            ConfigError::Invalid { name, value } => {
                assert_eq!(name, "PORT");
                assert_eq!(value, "not-a-port");
            },
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn zero_fetch_workers_is_rejected() {
        let err = AppConfig::from_lookup(lookup(&[
            ("TELEGRAM_TOKEN", "123:ABC"),
            ("FETCH_WORKERS", "0"),
        ]))
        .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { name: "FETCH_WORKERS", .. }));
    }

    #[test]
    fn missing_cookie_file_is_ignored() {
        let config = AppConfig::from_lookup(lookup(&[
            ("TELEGRAM_TOKEN", "123:ABC"),
            ("COOKIE_FILE", "/definitely/not/here.txt"),
        ]))
        .unwrap();
        assert!(config.cookie_file.is_none());
    }
}
