//! Remote learning-management system configuration.

use std::{borrow::Cow, collections::BTreeMap, time::Duration};

use duration_str::deserialize_duration;
use serde::{Deserialize, Deserializer};
use url::Url;

/// Configuration for the remote LMS the gateway delegates logins to.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LmsConfig {
    /// Base URL of the remote system. Required; the token and web-service
    /// endpoints are resolved relative to it.
    pub base_url: Url,
    /// Timeout applied to every outbound call.
    #[serde(default = "default_request_timeout", deserialize_with = "deserialize_duration")]
    pub request_timeout: Duration,
    /// How long a passed attempt may wait for its post-authentication step
    /// before the held token and profile are discarded.
    #[serde(default = "default_attempt_ttl", deserialize_with = "deserialize_duration")]
    pub attempt_ttl: Duration,
    /// The path under which the authentication endpoints are mounted.
    #[serde(default = "default_path")]
    pub path: Cow<'static, str>,
    /// Usernames granted (or stripped of) the privileged group on login,
    /// keyed by canonical username.
    #[serde(default)]
    pub auto_privileged: BTreeMap<String, AutoPrivilege>,
}

fn default_request_timeout() -> Duration {
    Duration::from_secs(5)
}

fn default_attempt_ttl() -> Duration {
    Duration::from_secs(120)
}

fn default_path() -> Cow<'static, str> {
    Cow::Borrowed("/auth")
}

/// Per-user privileged-group policy.
///
/// In the TOML file the value is either the literal string `"unset"` or the
/// email address the remote profile must present for the grant to apply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AutoPrivilege {
    /// Membership in the privileged group is revoked on login.
    Unset,
    /// Membership is granted when the remote profile carries this email.
    Email(String),
}

impl<'de> Deserialize<'de> for AutoPrivilege {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = String::deserialize(deserializer)?;

        if value == "unset" {
            Ok(AutoPrivilege::Unset)
        } else {
            Ok(AutoPrivilege::Email(value))
        }
    }
}
