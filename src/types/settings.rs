use serde::{Deserialize, Serialize};

/// Top-level LinkVault settings container.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct LinkVaultSettings {
    #[serde(default)]
    pub backend: BackendSettings,
    #[serde(default)]
    pub feed: FeedSettings,
    #[serde(default)]
    pub logging: LoggingSettings,
    #[serde(default)]
    pub notifications: NotificationSettings,
}

/// Where the bundled local backend keeps its data.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BackendSettings {
    /// SQLite file path. `None` keeps everything in memory.
    pub database_path: Option<String>,
    /// User the demo binary signs in as.
    pub demo_user: String,
}

impl Default for BackendSettings {
    fn default() -> Self {
        Self {
            database_path: None,
            demo_user: "demo-user".to_string(),
        }
    }
}

/// Change feed tuning.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FeedSettings {
    /// Buffered payloads per subscription before the sender waits.
    pub channel_capacity: usize,
}

impl Default for FeedSettings {
    fn default() -> Self {
        Self {
            channel_capacity: 256,
        }
    }
}

/// Output format for log lines.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Compact,
    Json,
}

/// Logging configuration for the binary.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LoggingSettings {
    /// `EnvFilter` directive used when `LINKVAULT_LOG` is not set.
    pub filter: String,
    pub format: LogFormat,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            filter: "linkvault=info,warn".to_string(),
            format: LogFormat::Compact,
        }
    }
}

/// Notification side-channel settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NotificationSettings {
    /// Prefix placed before failure messages, e.g. "Failed to".
    pub failure_prefix: String,
}

impl Default for NotificationSettings {
    fn default() -> Self {
        Self {
            failure_prefix: "Failed to".to_string(),
        }
    }
}
