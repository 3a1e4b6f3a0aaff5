// SPDX-FileCopyrightText: 2026 Kestrel Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! User trade statistics reads and the completion upsert.

use chrono::{DateTime, Utc};
use kestrel_core::{KestrelError, UserTradeStats};
use rusqlite::params;

use crate::database::Database;
use crate::queries::{fmt_ts, parse_opt_ts};

/// Per-deal deltas folded into a user's statistics on completion.
#[derive(Debug, Clone, Copy)]
pub(crate) struct CompletionDeltas {
    pub lamports_sent: i64,
    pub lamports_received: i64,
    pub assets_sent: i64,
    pub assets_received: i64,
}

/// Fold one completed deal into the user's statistics row.
///
/// Runs inside the completion transaction in `queries::deals`; callers
/// guarantee at-most-once invocation per deal via the `stats_recorded`
/// marker on the deal row itself.
pub(crate) fn upsert_completion(
    conn: &rusqlite::Connection,
    user_id: &str,
    deltas: CompletionDeltas,
    completed_at: &DateTime<Utc>,
) -> Result<(), rusqlite::Error> {
    conn.execute(
        "INSERT INTO user_trade_stats
            (user_id, deal_count, completed_count, lamports_sent, lamports_received,
             assets_sent, assets_received, last_deal_at)
         VALUES (?1, 1, 1, ?2, ?3, ?4, ?5, ?6)
         ON CONFLICT(user_id) DO UPDATE SET
            deal_count = deal_count + 1,
            completed_count = completed_count + 1,
            lamports_sent = lamports_sent + excluded.lamports_sent,
            lamports_received = lamports_received + excluded.lamports_received,
            assets_sent = assets_sent + excluded.assets_sent,
            assets_received = assets_received + excluded.assets_received,
            last_deal_at = excluded.last_deal_at",
        params![
            user_id,
            deltas.lamports_sent,
            deltas.lamports_received,
            deltas.assets_sent,
            deltas.assets_received,
            fmt_ts(completed_at),
        ],
    )?;
    Ok(())
}

/// Get the trade statistics for a user, if any deal has been accounted yet.
pub async fn get_user_stats(
    db: &Database,
    user_id: &str,
) -> Result<Option<UserTradeStats>, KestrelError> {
    let user_id = user_id.to_string();
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT user_id, deal_count, completed_count, lamports_sent,
                        lamports_received, assets_sent, assets_received, last_deal_at
                 FROM user_trade_stats WHERE user_id = ?1",
            )?;
            let result = stmt.query_row(params![user_id], |row| {
                Ok(UserTradeStats {
                    user_id: row.get(0)?,
                    deal_count: row.get(1)?,
                    completed_count: row.get(2)?,
                    lamports_sent: row.get(3)?,
                    lamports_received: row.get(4)?,
                    assets_sent: row.get(5)?,
                    assets_received: row.get(6)?,
                    last_deal_at: parse_opt_ts(7, row.get(7)?)?,
                })
            });
            match result {
                Ok(stats) => Ok(Some(stats)),
                Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                Err(e) => Err(e),
            }
        })
        .await
        .map_err(crate::database::map_tr_err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    async fn setup_db() -> (Database, tempfile::TempDir) {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("test.db");
        let db = Database::open(db_path.to_str().unwrap()).await.unwrap();
        (db, dir)
    }

    #[tokio::test]
    async fn stats_for_unknown_user_returns_none() {
        let (db, _dir) = setup_db().await;
        let stats = get_user_stats(&db, "nobody").await.unwrap();
        assert!(stats.is_none());
        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn upsert_inserts_then_accumulates() {
        let (db, _dir) = setup_db().await;
        let now = Utc::now();

        db.connection()
            .call(move |conn| -> Result<(), rusqlite::Error> {
                upsert_completion(
                    conn,
                    "user-1",
                    CompletionDeltas {
                        lamports_sent: 100,
                        lamports_received: 0,
                        assets_sent: 0,
                        assets_received: 1,
                    },
                    &now,
                )?;
                upsert_completion(
                    conn,
                    "user-1",
                    CompletionDeltas {
                        lamports_sent: 50,
                        lamports_received: 200,
                        assets_sent: 1,
                        assets_received: 0,
                    },
                    &now,
                )?;
                Ok(())
            })
            .await
            .unwrap();

        let stats = get_user_stats(&db, "user-1").await.unwrap().unwrap();
        assert_eq!(stats.deal_count, 2);
        assert_eq!(stats.completed_count, 2);
        assert_eq!(stats.lamports_sent, 150);
        assert_eq!(stats.lamports_received, 200);
        assert_eq!(stats.assets_sent, 1);
        assert_eq!(stats.assets_received, 1);
        assert!(stats.last_deal_at.is_some());

        db.close().await.unwrap();
    }
}
