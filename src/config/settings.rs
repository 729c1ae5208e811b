use std::collections::HashSet;
use std::time::Duration;

use serde::Deserialize;
use tracing::warn;

use crate::authorizer::Action;

/// Top-level configuration settings for the gateway.
#[derive(Debug, Deserialize, Clone, Default)]
pub struct Settings {
    pub server: ServerSettings,
    pub broker: BrokerSettings,
    pub authorizer: AuthorizerSettings,
    pub logging: LoggingSettings,
}

/// Where the server listens and which routes/origins it serves.
#[derive(Debug, Deserialize, Clone)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
    pub publish_endpoint: String,
    /// Comma separated list of allowed `Origin` values; `*` allows any.
    pub allowed_origins: String,
}

/// Broker limits.
#[derive(Debug, Deserialize, Clone)]
pub struct BrokerSettings {
    /// Ceiling on concurrently attached subscribers.
    pub max_connections: usize,
    /// Messages a subscriber may have queued before new ones are dropped.
    pub inbox_capacity: usize,
}

/// Outbound authorization callout.
#[derive(Debug, Deserialize, Clone)]
pub struct AuthorizerSettings {
    /// Unset or empty means every action is allowed.
    pub webhook_url: Option<String>,
    pub timeout_ms: u64,
    /// Comma separated actions forwarded to the webhook.
    pub events: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct LoggingSettings {
    pub level: String,
}

impl ServerSettings {
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn origins(&self) -> Vec<String> {
        split_list(&self.allowed_origins)
    }
}

impl AuthorizerSettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Actions named in `events`. Unknown names are logged and skipped.
    pub fn actions(&self) -> HashSet<Action> {
        split_list(&self.events)
            .into_iter()
            .filter_map(|name| match name.parse::<Action>() {
                Ok(action) => Some(action),
                Err(e) => {
                    warn!(error = %e, "ignoring authorizer event");
                    None
                }
            })
            .collect()
    }
}

fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}

/// Partial configuration settings loaded from files or environment.
///
/// Every field is optional; missing values are filled from the defaults.
#[derive(Debug, Deserialize, Default)]
pub struct PartialSettings {
    pub server: Option<PartialServerSettings>,
    pub broker: Option<PartialBrokerSettings>,
    pub authorizer: Option<PartialAuthorizerSettings>,
    pub logging: Option<PartialLoggingSettings>,
}

#[derive(Debug, Deserialize, Default)]
pub struct PartialServerSettings {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub publish_endpoint: Option<String>,
    pub allowed_origins: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
pub struct PartialBrokerSettings {
    pub max_connections: Option<usize>,
    pub inbox_capacity: Option<usize>,
}

#[derive(Debug, Deserialize, Default)]
pub struct PartialAuthorizerSettings {
    pub webhook_url: Option<String>,
    pub timeout_ms: Option<u64>,
    pub events: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
pub struct PartialLoggingSettings {
    pub level: Option<String>,
}

impl PartialSettings {
    /// Overlay whatever was provided onto `defaults`.
    pub fn merge(self, defaults: Settings) -> Settings {
        let server = self.server.unwrap_or_default();
        let broker = self.broker.unwrap_or_default();
        let authorizer = self.authorizer.unwrap_or_default();
        let logging = self.logging.unwrap_or_default();

        Settings {
            server: ServerSettings {
                host: server.host.unwrap_or(defaults.server.host),
                port: server.port.unwrap_or(defaults.server.port),
                publish_endpoint: server
                    .publish_endpoint
                    .map(normalize_endpoint)
                    .unwrap_or(defaults.server.publish_endpoint),
                allowed_origins: server
                    .allowed_origins
                    .unwrap_or(defaults.server.allowed_origins),
            },
            broker: BrokerSettings {
                max_connections: broker
                    .max_connections
                    .unwrap_or(defaults.broker.max_connections),
                inbox_capacity: broker
                    .inbox_capacity
                    .unwrap_or(defaults.broker.inbox_capacity),
            },
            authorizer: AuthorizerSettings {
                webhook_url: authorizer.webhook_url.or(defaults.authorizer.webhook_url),
                timeout_ms: authorizer
                    .timeout_ms
                    .unwrap_or(defaults.authorizer.timeout_ms),
                events: authorizer.events.unwrap_or(defaults.authorizer.events),
            },
            logging: LoggingSettings {
                level: logging.level.unwrap_or(defaults.logging.level),
            },
        }
    }
}

/// Routes are registered with a leading slash and without a trailing one.
fn normalize_endpoint(raw: String) -> String {
    let trimmed = raw.trim().trim_end_matches('/');
    if trimmed.starts_with('/') {
        trimmed.to_string()
    } else {
        format!("/{trimmed}")
    }
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
            publish_endpoint: "/publish".to_string(),
            allowed_origins: "*".to_string(),
        }
    }
}

impl Default for BrokerSettings {
    fn default() -> Self {
        Self {
            max_connections: 1000,
            inbox_capacity: 256,
        }
    }
}

impl Default for AuthorizerSettings {
    fn default() -> Self {
        Self {
            webhook_url: None,
            timeout_ms: 3000,
            events: "connect,disconnect,subscribe,unsubscribe".to_string(),
        }
    }
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}
