// SPDX-FileCopyrightText: 2026 Kestrel Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The deal engine: guarded lifecycle operations over the storage layer.
//!
//! Transitions follow `proposed -> accepted -> payment_claimed -> verified
//! -> completed`, with `declined` reachable from `proposed` and `expired`
//! from `proposed` or `accepted`. Each guarded operation returns a plain
//! `bool`: `false` means the precondition failed -- a concurrent writer
//! already moved the deal, or the deal was in the wrong state. Callers
//! branch on it; they must not retry blindly or treat it as fatal.
//!
//! Storage faults never escape the engine: reads degrade to empty results
//! and writes report failure, both with a logged warning.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use kestrel_config::model::DealsConfig;
use kestrel_core::{Deal, DealStatus, KestrelError, OfferSide};
use kestrel_storage::queries::deals as deal_queries;
use kestrel_storage::Database;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Inputs for proposing a deal. Identity, status, and timestamps are
/// assigned by the engine.
#[derive(Debug, Clone)]
pub struct NewDeal {
    pub user_id: String,
    pub chat_id: String,
    pub user_offer: OfferSide,
    pub agent_offer: OfferSide,
    pub user_offer_value: i64,
    pub agent_offer_value: i64,
    pub profit_lamports: i64,
}

/// Pure expiry predicate: a deal is expired strictly after its deadline.
/// A deal checked exactly at `expires_at` is not yet expired.
///
/// This only answers the question; enforcement is [`DealEngine::expire`],
/// driven by an external scheduler. The engine never self-expires on read.
pub fn is_expired(deal: &Deal, now: DateTime<Utc>) -> bool {
    now > deal.expires_at
}

/// Escrow deal lifecycle engine.
pub struct DealEngine {
    db: Arc<Database>,
    proposal_window: Duration,
    verification_window: Duration,
    queue_page_size: u32,
}

impl DealEngine {
    /// Create an engine over an opened database with the configured windows.
    pub fn new(db: Arc<Database>, config: &DealsConfig) -> Self {
        Self {
            db,
            proposal_window: Duration::seconds(config.proposal_window_secs as i64),
            verification_window: Duration::seconds(config.verification_window_secs as i64),
            queue_page_size: config.queue_page_size,
        }
    }

    /// Validate and persist a new deal in `proposed` status.
    ///
    /// The proposal deadline is `now + proposal_window`; acceptance later
    /// re-bases it to a fresh verification window.
    pub async fn propose(&self, new: NewDeal) -> Result<Deal, KestrelError> {
        if new.user_offer_value < 0 || new.agent_offer_value < 0 {
            return Err(KestrelError::InvalidDeal(
                "offer values must be non-negative".to_string(),
            ));
        }
        if new.profit_lamports < 0 {
            return Err(KestrelError::InvalidDeal(
                "profit must be non-negative".to_string(),
            ));
        }

        let now = Utc::now();
        let deal = Deal {
            id: Uuid::new_v4().to_string(),
            user_id: new.user_id,
            chat_id: new.chat_id,
            user_offer: new.user_offer,
            agent_offer: new.agent_offer,
            user_offer_value: new.user_offer_value,
            agent_offer_value: new.agent_offer_value,
            profit_lamports: new.profit_lamports,
            status: DealStatus::Proposed,
            created_at: now,
            expires_at: now + self.proposal_window,
            payment_claimed_at: None,
            verified_at: None,
            stats_recorded: false,
            status_message_id: None,
        };

        deal_queries::insert_deal(&self.db, &deal)
            .await
            .inspect_err(|e| {
                warn!(deal_id = deal.id.as_str(), error = %e, "failed to persist proposed deal");
            })?;

        info!(
            deal_id = deal.id.as_str(),
            user_id = deal.user_id.as_str(),
            profit_lamports = deal.profit_lamports,
            "deal proposed"
        );
        Ok(deal)
    }

    /// Get a deal by ID. Storage faults degrade to `None` with a warning.
    pub async fn get(&self, id: &str) -> Option<Deal> {
        match deal_queries::get_deal(&self.db, id).await {
            Ok(deal) => deal,
            Err(e) => {
                warn!(deal_id = id, error = %e, "deal read failed");
                None
            }
        }
    }

    /// `proposed -> accepted`. Re-bases the deadline to a fresh
    /// verification window -- not an extension of the old one.
    pub async fn accept(&self, id: &str) -> bool {
        let new_deadline = Utc::now() + self.verification_window;
        self.report(
            "accept",
            id,
            deal_queries::accept_deal(&self.db, id, new_deadline).await,
        )
    }

    /// `proposed -> declined`.
    pub async fn decline(&self, id: &str) -> bool {
        self.report("decline", id, deal_queries::decline_deal(&self.db, id).await)
    }

    /// `accepted -> payment_claimed`. Records when the user claimed to
    /// have paid; verification is the on-chain poll worker's job.
    pub async fn claim_payment(&self, id: &str) -> bool {
        self.report(
            "claim_payment",
            id,
            deal_queries::claim_payment(&self.db, id, Utc::now()).await,
        )
    }

    /// `payment_claimed -> verified`. Called by the verification worker
    /// once on-chain payment is confirmed.
    pub async fn mark_verified(&self, id: &str) -> bool {
        self.report(
            "mark_verified",
            id,
            deal_queries::mark_verified(&self.db, id, Utc::now()).await,
        )
    }

    /// `proposed|accepted -> expired`. Irreversible; never touches other
    /// terminal states.
    pub async fn expire(&self, id: &str) -> bool {
        self.report("expire", id, deal_queries::expire_deal(&self.db, id).await)
    }

    /// `verified -> completed`, folding the deal into the user's trade
    /// statistics in the same transaction. Idempotent per deal: retries
    /// after the first success report a failed precondition and leave the
    /// statistics untouched.
    pub async fn complete(&self, id: &str) -> bool {
        self.report(
            "complete",
            id,
            deal_queries::complete_deal(&self.db, id, Utc::now()).await,
        )
    }

    /// Bind the chat message displaying this deal, for later status edits.
    pub async fn set_status_message(&self, id: &str, message_id: &str) -> bool {
        self.report(
            "set_status_message",
            id,
            deal_queries::set_status_message(&self.db, id, message_id).await,
        )
    }

    /// Deals awaiting on-chain payment verification, oldest claim first.
    /// Pure read; storage faults degrade to an empty page.
    pub async fn awaiting_verification(&self) -> Vec<Deal> {
        match deal_queries::list_awaiting_verification(&self.db, self.queue_page_size).await {
            Ok(deals) => deals,
            Err(e) => {
                warn!(error = %e, "verification queue read failed");
                Vec::new()
            }
        }
    }

    /// Verified deals awaiting asset execution, oldest verification first.
    /// Pure read; storage faults degrade to an empty page.
    pub async fn awaiting_execution(&self) -> Vec<Deal> {
        match deal_queries::list_awaiting_execution(&self.db, self.queue_page_size).await {
            Ok(deals) => deals,
            Err(e) => {
                warn!(error = %e, "execution queue read failed");
                Vec::new()
            }
        }
    }

    /// Expiry check against the current clock. See [`is_expired`].
    pub fn is_expired_now(&self, deal: &Deal) -> bool {
        is_expired(deal, Utc::now())
    }

    /// Collapse a guarded write result into the success boolean, logging
    /// the three distinct outcomes at their own levels.
    fn report(&self, op: &str, id: &str, result: Result<bool, KestrelError>) -> bool {
        match result {
            Ok(true) => {
                info!(deal_id = id, op = op, "deal operation applied");
                true
            }
            Ok(false) => {
                debug!(deal_id = id, op = op, "deal operation precondition failed");
                false
            }
            Err(e) => {
                warn!(deal_id = id, op = op, error = %e, "deal operation storage failure");
                false
            }
        }
    }
}
