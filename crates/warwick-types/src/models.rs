use std::fmt;

use serde::{Deserialize, Serialize};

/// Seconds the bot watches a message for reactions when a server never set its own window.
pub const DEFAULT_REACTION_OBSERVING_TIMEOUT_SECS: i64 = 300;

/// The five credentials needed to act as a user on X.
///
/// Either all five are known or the server has no usable bundle; there is no partial form.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthenticationBundle {
    pub bearer_token: String,
    pub api_key: String,
    pub api_key_secret: String,
    pub access_token: String,
    pub access_token_secret: String,
}

// Secrets stay out of logs.
impl fmt::Debug for AuthenticationBundle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthenticationBundle")
            .field("bearer_token", &"<redacted>")
            .field("api_key", &self.api_key)
            .field("api_key_secret", &"<redacted>")
            .field("access_token", &"<redacted>")
            .field("access_token_secret", &"<redacted>")
            .finish()
    }
}

/// Snapshot of one server's configuration row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerConfig {
    pub id: String,
    pub trigger_emoji: Option<String>,
    pub emoji_reaction_threshold: Option<i64>,
    pub reaction_observing_timeout_secs: i64,
    /// True when all five credential columns are populated.
    pub credentials_configured: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bundle() -> AuthenticationBundle {
        AuthenticationBundle {
            bearer_token: "bearer".into(),
            api_key: "key".into(),
            api_key_secret: "key-secret".into(),
            access_token: "token".into(),
            access_token_secret: "token-secret".into(),
        }
    }

    #[test]
    fn debug_redacts_secrets() {
        let rendered = format!("{:?}", bundle());
        assert!(rendered.contains("key"));
        assert!(!rendered.contains("key-secret"));
        assert!(!rendered.contains("token-secret"));
        assert!(!rendered.contains("bearer\""));
    }

    #[test]
    fn bundle_serializes_with_plain_field_names() {
        let json = serde_json::to_value(bundle()).unwrap();
        assert_eq!(json["api_key"], "key");
        assert_eq!(json["access_token_secret"], "token-secret");
    }
}
