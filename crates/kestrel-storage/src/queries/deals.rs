// SPDX-FileCopyrightText: 2026 Kestrel Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Deal persistence and guarded status transitions.
//!
//! Every transition is a single conditional UPDATE of the form
//! `SET status = <new> WHERE id = ?1 AND status = <expected>`. The
//! rows-changed count is the success signal: zero rows means a concurrent
//! writer already moved the deal, reported to the caller as `false`.
//! Transitions are never decomposed into read-then-write.

use chrono::{DateTime, Utc};
use kestrel_core::{Deal, DealStatus, KestrelError, OfferSide};
use rusqlite::params;
use std::str::FromStr;

use crate::database::Database;
use crate::queries::stats::{upsert_completion, CompletionDeltas};
use crate::queries::{fmt_ts, offer_from_json, offer_to_json, parse_opt_ts, parse_ts};

const DEAL_COLUMNS: &str = "id, user_id, chat_id, user_offer, agent_offer, user_offer_value, \
     agent_offer_value, profit_lamports, status, created_at, expires_at, \
     payment_claimed_at, verified_at, stats_recorded, status_message_id";

/// Map one row (selected with [`DEAL_COLUMNS`]) into a [`Deal`].
fn read_deal(row: &rusqlite::Row<'_>) -> Result<Deal, rusqlite::Error> {
    let status_raw: String = row.get(8)?;
    let status = DealStatus::from_str(&status_raw).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(8, rusqlite::types::Type::Text, Box::new(e))
    })?;
    let user_offer_raw: String = row.get(3)?;
    let agent_offer_raw: String = row.get(4)?;
    let created_raw: String = row.get(9)?;
    let expires_raw: String = row.get(10)?;

    Ok(Deal {
        id: row.get(0)?,
        user_id: row.get(1)?,
        chat_id: row.get(2)?,
        user_offer: offer_from_json(3, &user_offer_raw)?,
        agent_offer: offer_from_json(4, &agent_offer_raw)?,
        user_offer_value: row.get(5)?,
        agent_offer_value: row.get(6)?,
        profit_lamports: row.get(7)?,
        status,
        created_at: parse_ts(9, &created_raw)?,
        expires_at: parse_ts(10, &expires_raw)?,
        payment_claimed_at: parse_opt_ts(11, row.get(11)?)?,
        verified_at: parse_opt_ts(12, row.get(12)?)?,
        stats_recorded: row.get(13)?,
        status_message_id: row.get(14)?,
    })
}

/// Persist a newly proposed deal.
pub async fn insert_deal(db: &Database, deal: &Deal) -> Result<(), KestrelError> {
    let deal = deal.clone();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT INTO deals (id, user_id, chat_id, user_offer, agent_offer,
                    user_offer_value, agent_offer_value, profit_lamports, status,
                    created_at, expires_at, payment_claimed_at, verified_at,
                    stats_recorded, status_message_id)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15)",
                params![
                    deal.id,
                    deal.user_id,
                    deal.chat_id,
                    offer_to_json(&deal.user_offer)?,
                    offer_to_json(&deal.agent_offer)?,
                    deal.user_offer_value,
                    deal.agent_offer_value,
                    deal.profit_lamports,
                    deal.status.to_string(),
                    fmt_ts(&deal.created_at),
                    fmt_ts(&deal.expires_at),
                    deal.payment_claimed_at.as_ref().map(fmt_ts),
                    deal.verified_at.as_ref().map(fmt_ts),
                    deal.stats_recorded,
                    deal.status_message_id,
                ],
            )?;
            Ok(())
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Get a deal by ID.
pub async fn get_deal(db: &Database, id: &str) -> Result<Option<Deal>, KestrelError> {
    let id = id.to_string();
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {DEAL_COLUMNS} FROM deals WHERE id = ?1"
            ))?;
            let result = stmt.query_row(params![id], read_deal);
            match result {
                Ok(deal) => Ok(Some(deal)),
                Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                Err(e) => Err(e),
            }
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// `proposed -> accepted`. Re-bases `expires_at` to the fresh verification
/// deadline supplied by the caller (not an extension of the old one).
pub async fn accept_deal(
    db: &Database,
    id: &str,
    new_expires_at: DateTime<Utc>,
) -> Result<bool, KestrelError> {
    let id = id.to_string();
    db.connection()
        .call(move |conn| {
            let changed = conn.execute(
                "UPDATE deals SET status = 'accepted', expires_at = ?2
                 WHERE id = ?1 AND status = 'proposed'",
                params![id, fmt_ts(&new_expires_at)],
            )?;
            Ok(changed == 1)
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// `proposed -> declined`.
pub async fn decline_deal(db: &Database, id: &str) -> Result<bool, KestrelError> {
    let id = id.to_string();
    db.connection()
        .call(move |conn| {
            let changed = conn.execute(
                "UPDATE deals SET status = 'declined'
                 WHERE id = ?1 AND status = 'proposed'",
                params![id],
            )?;
            Ok(changed == 1)
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// `accepted -> payment_claimed`. Records the claim timestamp; payment
/// itself is verified later by the on-chain poll worker.
pub async fn claim_payment(
    db: &Database,
    id: &str,
    claimed_at: DateTime<Utc>,
) -> Result<bool, KestrelError> {
    let id = id.to_string();
    db.connection()
        .call(move |conn| {
            let changed = conn.execute(
                "UPDATE deals SET status = 'payment_claimed', payment_claimed_at = ?2
                 WHERE id = ?1 AND status = 'accepted'",
                params![id, fmt_ts(&claimed_at)],
            )?;
            Ok(changed == 1)
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// `payment_claimed -> verified`. Invoked by the verification worker once
/// on-chain payment has been confirmed.
pub async fn mark_verified(
    db: &Database,
    id: &str,
    verified_at: DateTime<Utc>,
) -> Result<bool, KestrelError> {
    let id = id.to_string();
    db.connection()
        .call(move |conn| {
            let changed = conn.execute(
                "UPDATE deals SET status = 'verified', verified_at = ?2
                 WHERE id = ?1 AND status = 'payment_claimed'",
                params![id, fmt_ts(&verified_at)],
            )?;
            Ok(changed == 1)
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// `proposed|accepted -> expired`. Never reverses other terminal states.
pub async fn expire_deal(db: &Database, id: &str) -> Result<bool, KestrelError> {
    let id = id.to_string();
    db.connection()
        .call(move |conn| {
            let changed = conn.execute(
                "UPDATE deals SET status = 'expired'
                 WHERE id = ?1 AND status IN ('proposed', 'accepted')",
                params![id],
            )?;
            Ok(changed == 1)
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// `verified -> completed`, folding the deal into the user's trade
/// statistics in the same transaction.
///
/// The status flip and the `stats_recorded` marker are one conditional
/// update, so re-invoking completion for an already accounted deal matches
/// zero rows and the statistics are untouched: accounting is idempotent
/// per deal regardless of how many times the settlement worker retries.
pub async fn complete_deal(
    db: &Database,
    id: &str,
    completed_at: DateTime<Utc>,
) -> Result<bool, KestrelError> {
    let id = id.to_string();
    db.connection()
        .call(move |conn| {
            let tx = conn.transaction()?;

            let changed = tx.execute(
                "UPDATE deals SET status = 'completed', stats_recorded = 1
                 WHERE id = ?1 AND status = 'verified' AND stats_recorded = 0",
                params![id],
            )?;
            if changed != 1 {
                tx.commit()?;
                return Ok(false);
            }

            let (user_id, user_offer_raw, agent_offer_raw, user_value, agent_value): (
                String,
                String,
                String,
                i64,
                i64,
            ) = tx.query_row(
                "SELECT user_id, user_offer, agent_offer, user_offer_value, agent_offer_value
                 FROM deals WHERE id = ?1",
                params![id],
                |row| {
                    Ok((
                        row.get(0)?,
                        row.get(1)?,
                        row.get(2)?,
                        row.get(3)?,
                        row.get(4)?,
                    ))
                },
            )?;

            let user_offer = offer_from_json(1, &user_offer_raw)?;
            let agent_offer = offer_from_json(2, &agent_offer_raw)?;

            // The user sends their own offer side and receives the agent's.
            let mut deltas = CompletionDeltas {
                lamports_sent: 0,
                lamports_received: 0,
                assets_sent: 0,
                assets_received: 0,
            };
            match user_offer {
                OfferSide::Currency { .. } => deltas.lamports_sent = user_value,
                OfferSide::Asset { .. } => deltas.assets_sent = 1,
            }
            match agent_offer {
                OfferSide::Currency { .. } => deltas.lamports_received = agent_value,
                OfferSide::Asset { .. } => deltas.assets_received = 1,
            }

            upsert_completion(&tx, &user_id, deltas, &completed_at)?;
            tx.commit()?;
            Ok(true)
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Bind the chat message that displays this deal, for later edits.
pub async fn set_status_message(
    db: &Database,
    id: &str,
    message_id: &str,
) -> Result<bool, KestrelError> {
    let id = id.to_string();
    let message_id = message_id.to_string();
    db.connection()
        .call(move |conn| {
            let changed = conn.execute(
                "UPDATE deals SET status_message_id = ?2 WHERE id = ?1",
                params![id, message_id],
            )?;
            Ok(changed == 1)
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Deals whose payment claim awaits on-chain verification, oldest claim
/// first so no deal starves behind newer ones. Pure read.
pub async fn list_awaiting_verification(
    db: &Database,
    limit: u32,
) -> Result<Vec<Deal>, KestrelError> {
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {DEAL_COLUMNS} FROM deals
                 WHERE status = 'payment_claimed'
                 ORDER BY payment_claimed_at ASC
                 LIMIT ?1"
            ))?;
            let rows = stmt.query_map(params![limit], read_deal)?;
            let mut deals = Vec::new();
            for row in rows {
                deals.push(row?);
            }
            Ok(deals)
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Verified deals awaiting asset execution, oldest verification first.
/// Pure read.
pub async fn list_awaiting_execution(
    db: &Database,
    limit: u32,
) -> Result<Vec<Deal>, KestrelError> {
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {DEAL_COLUMNS} FROM deals
                 WHERE status = 'verified'
                 ORDER BY verified_at ASC
                 LIMIT ?1"
            ))?;
            let rows = stmt.query_map(params![limit], read_deal)?;
            let mut deals = Vec::new();
            for row in rows {
                deals.push(row?);
            }
            Ok(deals)
        })
        .await
        .map_err(crate::database::map_tr_err)
}
