use anyhow::{Result, anyhow, bail};
use rusqlite::Connection;
use rusqlite::types::ValueRef;
use tracing::error;

use crate::models::{Column, FieldValue, SqlType, TABLE};
use crate::{AuthenticationBundle, ConfigStore, DEFAULT_REACTION_OBSERVING_TIMEOUT_SECS, ServerConfig};

impl ConfigStore {
    // -- Generic column access --

    /// Upsert a single column for `server_id`. Creates the row if needed and
    /// leaves every other column untouched.
    pub fn set_field(&self, server_id: &str, col: Column, value: impl Into<FieldValue>) -> Result<()> {
        let value = value.into();

        if server_id.is_empty() {
            bail!("Server id must not be empty");
        }
        if col == Column::Id {
            bail!("The id column cannot be set directly");
        }
        if value.sql_type() != col.sql_type() {
            bail!(
                "Column {} takes {} values, got {}",
                col,
                col.sql_type().as_str(),
                value.sql_type().as_str()
            );
        }

        self.with_conn(|conn| {
            conn.execute(
                &format!(
                    "INSERT INTO {TABLE} ({id}, {col}) VALUES (?1, ?2)
                     ON CONFLICT({id}) DO UPDATE SET {col} = excluded.{col}",
                    id = Column::Id,
                ),
                rusqlite::params![server_id, value],
            )?;
            Ok(())
        })
    }

    /// Read one column. `None` when the row doesn't exist or the column was never set.
    pub fn get_field(&self, server_id: &str, col: Column) -> Result<Option<FieldValue>> {
        self.with_conn(|conn| query_field(conn, server_id, col))
    }

    // -- Reaction settings --

    pub fn set_trigger_emoji(&self, server_id: &str, trigger_emoji: &str) -> Result<()> {
        self.set_field(server_id, Column::TriggerEmoji, trigger_emoji)
    }

    pub fn get_trigger_emoji(&self, server_id: &str) -> Result<Option<String>> {
        Ok(self
            .get_field(server_id, Column::TriggerEmoji)?
            .and_then(FieldValue::into_text))
    }

    pub fn set_emoji_reaction_threshold(&self, server_id: &str, threshold: i64) -> Result<()> {
        self.set_field(server_id, Column::EmojiReactionThreshhold, threshold)
    }

    pub fn get_emoji_reaction_threshold(&self, server_id: &str) -> Result<Option<i64>> {
        Ok(self
            .get_field(server_id, Column::EmojiReactionThreshhold)?
            .and_then(|v| v.as_integer()))
    }

    pub fn set_reaction_observing_timeout_secs(&self, server_id: &str, secs: i64) -> Result<()> {
        self.set_field(server_id, Column::ReactionObservingTimeoutSecs, secs)
    }

    /// Never absent: servers that haven't set a window get
    /// [`DEFAULT_REACTION_OBSERVING_TIMEOUT_SECS`].
    pub fn get_reaction_observing_timeout_secs(&self, server_id: &str) -> Result<i64> {
        Ok(self
            .get_field(server_id, Column::ReactionObservingTimeoutSecs)?
            .and_then(|v| v.as_integer())
            .unwrap_or(DEFAULT_REACTION_OBSERVING_TIMEOUT_SECS))
    }

    // -- Credentials --

    pub fn set_api_key(&self, server_id: &str, api_key: &str) -> Result<()> {
        self.set_field(server_id, Column::ApiKey, api_key)
    }

    pub fn set_api_key_secret(&self, server_id: &str, api_key_secret: &str) -> Result<()> {
        self.set_field(server_id, Column::ApiKeySecret, api_key_secret)
    }

    pub fn set_bearer_token(&self, server_id: &str, bearer_token: &str) -> Result<()> {
        self.set_field(server_id, Column::BearerToken, bearer_token)
    }

    pub fn set_access_token(&self, server_id: &str, access_token: &str) -> Result<()> {
        self.set_field(server_id, Column::AccessToken, access_token)
    }

    pub fn set_access_token_secret(&self, server_id: &str, access_token_secret: &str) -> Result<()> {
        self.set_field(server_id, Column::AccessTokenSecret, access_token_secret)
    }

    /// Write all five credentials in one upsert.
    pub fn set_authentication_bundle(&self, server_id: &str, auth: &AuthenticationBundle) -> Result<()> {
        if server_id.is_empty() {
            bail!("Server id must not be empty");
        }

        let cols = Column::AUTH.map(Column::as_str);
        let updates = cols
            .iter()
            .map(|c| format!("{c} = excluded.{c}"))
            .collect::<Vec<_>>()
            .join(", ");

        self.with_conn(|conn| {
            conn.execute(
                &format!(
                    "INSERT INTO {TABLE} ({id}, {}) VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                     ON CONFLICT({id}) DO UPDATE SET {updates}",
                    cols.join(", "),
                    id = Column::Id,
                ),
                rusqlite::params![
                    server_id,
                    auth.bearer_token,
                    auth.api_key,
                    auth.api_key_secret,
                    auth.access_token,
                    auth.access_token_secret,
                ],
            )?;
            Ok(())
        })
    }

    /// Returns `None` (and logs) unless all five credential columns are set.
    pub fn get_authentication_bundle(&self, server_id: &str) -> Result<Option<AuthenticationBundle>> {
        let bundle = self.with_conn(|conn| query_authentication_bundle(conn, server_id))?;

        if bundle.is_none() {
            error!("Requested auth bundle for server '{}' is incomplete", server_id);
        }

        Ok(bundle)
    }

    // -- Whole row --

    pub fn get_server_config(&self, server_id: &str) -> Result<Option<ServerConfig>> {
        self.with_conn(|conn| query_server_config(conn, server_id))
    }
}

fn query_field(conn: &Connection, server_id: &str, col: Column) -> Result<Option<FieldValue>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {col} FROM {TABLE} WHERE {id} = ?1",
        id = Column::Id
    ))?;

    let value = stmt
        .query_row([server_id], |row| {
            let raw = row.get_ref(0)?;
            Ok(field_from_sql(col, raw))
        })
        .optional()?;

    // Outer: no row. Inner: column is NULL or holds something unexpected.
    match value {
        Some(converted) => converted,
        None => Ok(None),
    }
}

/// Convert a raw SQLite value into the column's declared kind.
fn field_from_sql(col: Column, raw: ValueRef<'_>) -> Result<Option<FieldValue>> {
    let value = match (col.sql_type(), raw) {
        (_, ValueRef::Null) => return Ok(None),
        (SqlType::Text, ValueRef::Text(bytes)) => FieldValue::Text(std::str::from_utf8(bytes)?.to_string()),
        (SqlType::Integer, ValueRef::Integer(n)) => FieldValue::Integer(n),
        // Integer affinity leaves non-numeric text as text.
        (SqlType::Integer, ValueRef::Text(bytes)) => {
            let text = std::str::from_utf8(bytes)?;
            FieldValue::Integer(
                text.trim()
                    .parse()
                    .map_err(|_| anyhow!("Column {} holds non-integer value '{}'", col, text))?,
            )
        }
        (_, other) => bail!("Column {} holds unexpected {:?} value", col, other.data_type()),
    };
    Ok(Some(value))
}

fn query_authentication_bundle(conn: &Connection, server_id: &str) -> Result<Option<AuthenticationBundle>> {
    let cols = Column::AUTH.map(Column::as_str).join(", ");
    let mut stmt = conn.prepare(&format!(
        "SELECT {cols} FROM {TABLE} WHERE {id} = ?1",
        id = Column::Id
    ))?;

    let row = stmt
        .query_row([server_id], |row| {
            Ok((
                row.get::<_, Option<String>>(0)?,
                row.get::<_, Option<String>>(1)?,
                row.get::<_, Option<String>>(2)?,
                row.get::<_, Option<String>>(3)?,
                row.get::<_, Option<String>>(4)?,
            ))
        })
        .optional()?;

    let Some((bearer_token, api_key, api_key_secret, access_token, access_token_secret)) = row else {
        return Ok(None);
    };

    Ok(match (bearer_token, api_key, api_key_secret, access_token, access_token_secret) {
        (Some(bearer_token), Some(api_key), Some(api_key_secret), Some(access_token), Some(access_token_secret)) => {
            Some(AuthenticationBundle {
                bearer_token,
                api_key,
                api_key_secret,
                access_token,
                access_token_secret,
            })
        }
        _ => None,
    })
}

fn query_server_config(conn: &Connection, server_id: &str) -> Result<Option<ServerConfig>> {
    let cols = Column::ALL.map(Column::as_str).join(", ");
    let mut stmt = conn.prepare(&format!(
        "SELECT {cols} FROM {TABLE} WHERE {id} = ?1",
        id = Column::Id
    ))?;

    let row = stmt
        .query_row([server_id], |row| {
            let mut fields = Vec::with_capacity(Column::ALL.len());
            for (idx, col) in Column::ALL.iter().enumerate() {
                fields.push(field_from_sql(*col, row.get_ref(idx)?));
            }
            Ok(fields)
        })
        .optional()?;

    let Some(fields) = row else {
        return Ok(None);
    };
    let fields = fields.into_iter().collect::<Result<Vec<_>>>()?;

    // `Column::ALL` is in declaration order, so a variant's discriminant is its index.
    let value = |col: Column| fields[col as usize].clone();

    Ok(Some(ServerConfig {
        id: server_id.to_string(),
        trigger_emoji: value(Column::TriggerEmoji).and_then(FieldValue::into_text),
        emoji_reaction_threshold: value(Column::EmojiReactionThreshhold).and_then(|v| v.as_integer()),
        reaction_observing_timeout_secs: value(Column::ReactionObservingTimeoutSecs)
            .and_then(|v| v.as_integer())
            .unwrap_or(DEFAULT_REACTION_OBSERVING_TIMEOUT_SECS),
        credentials_configured: Column::AUTH.iter().all(|col| value(*col).is_some()),
    }))
}

/// Extension trait for optional query results
trait OptionalExt<T> {
    fn optional(self) -> Result<Option<T>>;
}

impl<T> OptionalExt<T> for std::result::Result<T, rusqlite::Error> {
    fn optional(self) -> Result<Option<T>> {
        match self {
            Ok(val) => Ok(Some(val)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}
