use std::collections::HashSet;

use anyhow::Result;
use rusqlite::Connection;
use tracing::info;

use crate::models::{Column, TABLE};

/// Bring the schema up to date. Safe to run against a store that is already
/// current, and against `server_configs` tables created before versioning existed.
pub fn run(conn: &Connection) -> Result<()> {
    conn.execute_batch("CREATE TABLE IF NOT EXISTS schema_version (version INTEGER NOT NULL);")?;

    let version: i64 =
        conn.query_row("SELECT COALESCE(MAX(version), 0) FROM schema_version", [], |r| {
            r.get(0)
        })?;

    if version < 1 {
        info!("Config store: running migration v1 (initial schema)");
        let tx = conn.unchecked_transaction()?;
        tx.execute_batch(&format!(
            "
            CREATE TABLE IF NOT EXISTS {TABLE} (
                {} TEXT PRIMARY KEY,
                {} TEXT,
                {} INTEGER,
                {} INTEGER,
                {} TEXT,
                {} TEXT,
                {} TEXT,
                {} TEXT,
                {} TEXT
            );

            INSERT INTO schema_version (version) VALUES (1);
            ",
            Column::Id,
            Column::TriggerEmoji,
            Column::EmojiReactionThreshhold,
            Column::ReactionObservingTimeoutSecs,
            Column::ApiKey,
            Column::ApiKeySecret,
            Column::BearerToken,
            Column::AccessToken,
            Column::AccessTokenSecret,
        ))?;
        tx.commit()?;
    }

    if version < 2 {
        // Tables from earlier revisions survive v1 untouched and may lack columns.
        let tx = conn.unchecked_transaction()?;
        let existing = existing_columns(&tx)?;
        for col in Column::ALL {
            if !existing.contains(col.as_str()) {
                info!("Config store: adding missing column {}", col);
                tx.execute_batch(&format!(
                    "ALTER TABLE {TABLE} ADD COLUMN {} {};",
                    col,
                    col.sql_type().as_str()
                ))?;
            }
        }

        // The first release prefixed credential columns with `x_`.
        for col in Column::AUTH {
            let legacy = format!("x_{}", col);
            if existing.contains(&legacy) {
                let copied = tx.execute(
                    &format!("UPDATE {TABLE} SET {col} = {legacy} WHERE {col} IS NULL AND {legacy} IS NOT NULL"),
                    [],
                )?;
                info!("Config store: carried {} value(s) from {} into {}", copied, legacy, col);
            }
        }

        tx.execute("INSERT INTO schema_version (version) VALUES (2)", [])?;
        tx.commit()?;
        info!("Config store: migration v2 complete");
    }

    Ok(())
}

fn existing_columns(conn: &Connection) -> Result<HashSet<String>> {
    let mut stmt = conn.prepare(&format!("PRAGMA table_info({TABLE})"))?;
    let names = stmt
        .query_map([], |row| row.get::<_, String>(1))?
        .collect::<std::result::Result<HashSet<_>, _>>()?;
    Ok(names)
}
