use std::fmt;

use rusqlite::ToSql;
use rusqlite::types::ToSqlOutput;

/// Name of the one table this store owns. Part of the on-disk contract.
pub const TABLE: &str = "server_configs";

/// Every column of `server_configs`. The set is closed: adding a column means
/// adding a variant here and a migration step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Column {
    Id,
    TriggerEmoji,
    EmojiReactionThreshhold,
    ReactionObservingTimeoutSecs,
    ApiKey,
    ApiKeySecret,
    BearerToken,
    AccessToken,
    AccessTokenSecret,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SqlType {
    Text,
    Integer,
}

impl SqlType {
    pub fn as_str(self) -> &'static str {
        match self {
            SqlType::Text => "TEXT",
            SqlType::Integer => "INTEGER",
        }
    }
}

impl Column {
    pub const ALL: [Column; 9] = [
        Column::Id,
        Column::TriggerEmoji,
        Column::EmojiReactionThreshhold,
        Column::ReactionObservingTimeoutSecs,
        Column::ApiKey,
        Column::ApiKeySecret,
        Column::BearerToken,
        Column::AccessToken,
        Column::AccessTokenSecret,
    ];

    /// Credential columns, in the order the bundle query selects them.
    pub const AUTH: [Column; 5] = [
        Column::BearerToken,
        Column::ApiKey,
        Column::ApiKeySecret,
        Column::AccessToken,
        Column::AccessTokenSecret,
    ];

    /// Column name as stored on disk. `emoji_reaction_threshhold` keeps its
    /// historical spelling.
    pub fn as_str(self) -> &'static str {
        match self {
            Column::Id => "id",
            Column::TriggerEmoji => "trigger_emoji",
            Column::EmojiReactionThreshhold => "emoji_reaction_threshhold",
            Column::ReactionObservingTimeoutSecs => "reaction_observing_timeout_secs",
            Column::ApiKey => "api_key",
            Column::ApiKeySecret => "api_key_secret",
            Column::BearerToken => "bearer_token",
            Column::AccessToken => "access_token",
            Column::AccessTokenSecret => "access_token_secret",
        }
    }

    pub fn sql_type(self) -> SqlType {
        match self {
            Column::EmojiReactionThreshhold | Column::ReactionObservingTimeoutSecs => {
                SqlType::Integer
            }
            _ => SqlType::Text,
        }
    }
}

impl fmt::Display for Column {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A value read from or written to a single configuration column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldValue {
    Text(String),
    Integer(i64),
}

impl FieldValue {
    pub fn sql_type(&self) -> SqlType {
        match self {
            FieldValue::Text(_) => SqlType::Text,
            FieldValue::Integer(_) => SqlType::Integer,
        }
    }

    pub fn as_integer(&self) -> Option<i64> {
        match self {
            FieldValue::Integer(n) => Some(*n),
            FieldValue::Text(_) => None,
        }
    }

    pub fn into_text(self) -> Option<String> {
        match self {
            FieldValue::Text(s) => Some(s),
            FieldValue::Integer(_) => None,
        }
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        FieldValue::Text(value.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        FieldValue::Text(value)
    }
}

impl From<i64> for FieldValue {
    fn from(value: i64) -> Self {
        FieldValue::Integer(value)
    }
}

impl ToSql for FieldValue {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        match self {
            FieldValue::Text(s) => s.to_sql(),
            FieldValue::Integer(n) => n.to_sql(),
        }
    }
}
