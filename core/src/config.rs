/// Configuration management
use crate::error::{Result, SyncError};
use serde::{Deserialize, Serialize};
use std::time::Duration;

const DEFAULT_API_URL: &str = "http://127.0.0.1:5000";
const DEFAULT_GRACE_PERIOD_MS: u64 = 500;
const DEFAULT_EVENT_CAPACITY: usize = 256;

/// Log filter used when `RUST_LOG` is not set
pub const DEFAULT_LOG_FILTER: &str = "info";

/// Client configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Our own user id
    pub self_id: String,

    /// The counterpart to open a conversation with
    pub counterpart_id: String,

    /// Counterpart display name (falls back to the id)
    pub display_name: Option<String>,

    /// Base URL of the message store API
    pub api_url: String,

    /// Bearer token for the message store
    pub token: Option<String>,

    /// Push transport address (`host:port`), None = history only
    pub transport_addr: Option<String>,

    /// How long a live event may wait for the conversation id to resolve
    pub grace_period: Duration,

    /// Transport connect timeout
    pub connect_timeout: Duration,

    /// Capacity of the view/scroll broadcast channels
    pub event_capacity: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            self_id: String::new(),
            counterpart_id: String::new(),
            display_name: None,
            api_url: DEFAULT_API_URL.to_string(),
            token: None,
            transport_addr: None,
            grace_period: Duration::from_millis(DEFAULT_GRACE_PERIOD_MS),
            connect_timeout: Duration::from_secs(10),
            event_capacity: DEFAULT_EVENT_CAPACITY,
        }
    }
}

impl Config {
    /// Create config from command line arguments
    pub fn from_args(args: &[String]) -> Result<Self> {
        if args.len() < 3 {
            return Err(SyncError::Config(format!(
                "Usage: {} <self_id> <counterpart_id> [--name <display>] [--api-url <url>] [--token <token>] [--transport <host:port>] [--grace-ms <ms>]",
                args.first().map(String::as_str).unwrap_or("chatsync")
            )));
        }

        let self_id = args[1].trim().to_string();
        let counterpart_id = args[2].trim().to_string();
        if self_id.is_empty() || counterpart_id.is_empty() {
            return Err(SyncError::Config("User ids must not be empty".to_string()));
        }

        let mut config = Self {
            self_id,
            counterpart_id,
            ..Default::default()
        };

        let mut i = 3;
        while i < args.len() {
            let flag = args[i].as_str();
            let value = || {
                args.get(i + 1)
                    .cloned()
                    .ok_or_else(|| SyncError::Config(format!("{} requires an argument", flag)))
            };
            match flag {
                "--name" => config.display_name = Some(value()?),
                "--api-url" => config.api_url = value()?,
                "--token" => config.token = Some(value()?),
                "--transport" => config.transport_addr = Some(value()?),
                "--grace-ms" => {
                    let ms = value()?.parse::<u64>().map_err(|_| {
                        SyncError::Config("--grace-ms must be a number of milliseconds".to_string())
                    })?;
                    config.grace_period = Duration::from_millis(ms);
                }
                other => {
                    return Err(SyncError::Config(format!("Unknown argument: {}", other)));
                }
            }
            i += 2;
        }

        config.apply_env(|key| std::env::var(key).ok());
        config.api_url = config.api_url.trim_end_matches('/').to_string();
        Ok(config)
    }

    /// Env overrides (nice for scripts)
    fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(url) = lookup("CHATSYNC_API_URL").filter(|s| !s.is_empty()) {
            self.api_url = url;
        }
        if let Some(token) = lookup("CHATSYNC_TOKEN").filter(|s| !s.is_empty()) {
            self.token = Some(token);
        }
        if let Some(addr) = lookup("CHATSYNC_TRANSPORT").filter(|s| !s.is_empty()) {
            self.transport_addr = Some(addr);
        }
    }

    /// Name shown in the header and used for the avatar color
    pub fn display_name(&self) -> &str {
        self.display_name.as_deref().unwrap_or(&self.counterpart_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_default_log_filter_parses() {
        assert_eq!(DEFAULT_LOG_FILTER, "info");
        assert!(tracing_subscriber::EnvFilter::try_new(DEFAULT_LOG_FILTER).is_ok());
    }

    #[test]
    fn test_requires_both_ids() {
        assert!(Config::from_args(&args(&["chatsync", "u1"])).is_err());
        assert!(Config::from_args(&args(&["chatsync", " ", "u2"])).is_err());
    }

    #[test]
    fn test_parses_flags() {
        let config = Config::from_args(&args(&[
            "chatsync",
            "u1",
            "u2",
            "--name",
            "Bob",
            "--api-url",
            "http://localhost:9000/",
            "--token",
            "secret",
            "--grace-ms",
            "750",
        ]))
        .unwrap();

        assert_eq!(config.self_id, "u1");
        assert_eq!(config.counterpart_id, "u2");
        assert_eq!(config.display_name(), "Bob");
        assert_eq!(config.token.as_deref(), Some("secret"));
        assert_eq!(config.grace_period, Duration::from_millis(750));
        assert!(config.api_url.starts_with("http://localhost:9000"));
    }

    #[test]
    fn test_rejects_bad_flags() {
        assert!(Config::from_args(&args(&["chatsync", "u1", "u2", "--grace-ms", "soon"])).is_err());
        assert!(Config::from_args(&args(&["chatsync", "u1", "u2", "--token"])).is_err());
        assert!(Config::from_args(&args(&["chatsync", "u1", "u2", "--bogus", "x"])).is_err());
    }

    #[test]
    fn test_env_overrides() {
        let mut config = Config::default();
        config.apply_env(|key| match key {
            "CHATSYNC_TOKEN" => Some("from-env".to_string()),
            "CHATSYNC_TRANSPORT" => Some("127.0.0.1:7000".to_string()),
            _ => None,
        });
        assert_eq!(config.token.as_deref(), Some("from-env"));
        assert_eq!(config.transport_addr.as_deref(), Some("127.0.0.1:7000"));
        assert_eq!(config.api_url, DEFAULT_API_URL);
    }

    #[test]
    fn test_display_name_falls_back_to_id() {
        let config = Config {
            counterpart_id: "u2".to_string(),
            ..Default::default()
        };
        assert_eq!(config.display_name(), "u2");
    }
}
