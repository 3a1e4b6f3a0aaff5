// SPDX-FileCopyrightText: 2026 Kestrel Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Common domain types used across the Kestrel workspace.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// An inbound chat message, normalized from whatever channel delivered it.
///
/// `session_key` identifies the conversation the message belongs to and is
/// the key the debouncer batches on. `received_at` is stamped on receipt
/// and used to restore order defensively before a batch is handled.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InboundMessage {
    pub id: String,
    pub session_key: String,
    pub sender: String,
    pub text: String,
    pub received_at: DateTime<Utc>,
    pub metadata: Option<String>,
}

/// Lifecycle states of an escrow deal.
///
/// Transitions move strictly forward: `Proposed -> Accepted ->
/// PaymentClaimed -> Verified -> Completed`, with `Declined` reachable
/// only from `Proposed` and `Expired` from `Proposed` or `Accepted`.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum DealStatus {
    Proposed,
    Accepted,
    PaymentClaimed,
    Verified,
    Completed,
    Declined,
    Expired,
}

impl DealStatus {
    /// True for states no transition may ever leave.
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            DealStatus::Completed | DealStatus::Declined | DealStatus::Expired
        )
    }
}

/// One side of a deal: either plain currency or a unique on-chain asset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum OfferSide {
    /// A currency amount in lamports.
    Currency { lamports: u64 },
    /// A unique asset identified by its mint address.
    Asset { mint: String },
}

impl OfferSide {
    /// True when this side transfers a unique asset rather than currency.
    pub fn is_asset(&self) -> bool {
        matches!(self, OfferSide::Asset { .. })
    }
}

/// An escrow deal between a chat user and the agent.
///
/// The two offer sides are what each party puts in; the `*_value` fields
/// carry the common-unit (lamport) valuation computed at proposal time so
/// later accounting never re-prices. `expires_at` is re-based to a fresh
/// verification window on acceptance. `verified_at` doubles as the
/// verification/completion timestamp. `stats_recorded` marks that this
/// deal's completion has been accounted into the user's trade statistics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Deal {
    pub id: String,
    pub user_id: String,
    pub chat_id: String,
    pub user_offer: OfferSide,
    pub agent_offer: OfferSide,
    pub user_offer_value: i64,
    pub agent_offer_value: i64,
    pub profit_lamports: i64,
    pub status: DealStatus,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub payment_claimed_at: Option<DateTime<Utc>>,
    pub verified_at: Option<DateTime<Utc>>,
    pub stats_recorded: bool,
    pub status_message_id: Option<String>,
}

/// Aggregate trade statistics for one user.
///
/// Updated in the same transaction that completes a deal; the per-deal
/// `stats_recorded` marker guarantees a single deal is never counted twice.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserTradeStats {
    pub user_id: String,
    pub deal_count: i64,
    pub completed_count: i64,
    pub lamports_sent: i64,
    pub lamports_received: i64,
    pub assets_sent: i64,
    pub assets_received: i64,
    pub last_deal_at: Option<DateTime<Utc>>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn deal_status_display_and_from_str_round_trip() {
        let variants = [
            DealStatus::Proposed,
            DealStatus::Accepted,
            DealStatus::PaymentClaimed,
            DealStatus::Verified,
            DealStatus::Completed,
            DealStatus::Declined,
            DealStatus::Expired,
        ];
        assert_eq!(variants.len(), 7, "DealStatus must have exactly 7 variants");

        for variant in &variants {
            let s = variant.to_string();
            let parsed = DealStatus::from_str(&s).expect("should parse back");
            assert_eq!(*variant, parsed);
        }
    }

    #[test]
    fn deal_status_snake_case_strings() {
        assert_eq!(DealStatus::PaymentClaimed.to_string(), "payment_claimed");
        assert_eq!(DealStatus::Proposed.to_string(), "proposed");
        assert_eq!(
            DealStatus::from_str("payment_claimed").unwrap(),
            DealStatus::PaymentClaimed
        );
    }

    #[test]
    fn terminal_states() {
        assert!(DealStatus::Completed.is_terminal());
        assert!(DealStatus::Declined.is_terminal());
        assert!(DealStatus::Expired.is_terminal());
        assert!(!DealStatus::Proposed.is_terminal());
        assert!(!DealStatus::Accepted.is_terminal());
        assert!(!DealStatus::PaymentClaimed.is_terminal());
        assert!(!DealStatus::Verified.is_terminal());
    }

    #[test]
    fn offer_side_serialization() {
        let currency = OfferSide::Currency { lamports: 1_500_000 };
        let json = serde_json::to_string(&currency).expect("should serialize");
        assert!(json.contains(r#""kind":"currency""#));
        let parsed: OfferSide = serde_json::from_str(&json).expect("should deserialize");
        assert_eq!(currency, parsed);

        let asset = OfferSide::Asset {
            mint: "So11111111111111111111111111111111111111112".to_string(),
        };
        let json = serde_json::to_string(&asset).expect("should serialize");
        assert!(json.contains(r#""kind":"asset""#));
        let parsed: OfferSide = serde_json::from_str(&json).expect("should deserialize");
        assert_eq!(asset, parsed);
        assert!(parsed.is_asset());
    }

    #[test]
    fn inbound_message_clone_and_eq() {
        let msg = InboundMessage {
            id: "msg-1".to_string(),
            session_key: "chat-42".to_string(),
            sender: "alice".to_string(),
            text: "hello".to_string(),
            received_at: Utc::now(),
            metadata: None,
        };
        let msg2 = msg.clone();
        assert_eq!(msg, msg2);
    }
}
