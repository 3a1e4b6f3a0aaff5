// SPDX-FileCopyrightText: 2026 Kestrel Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core library for the Kestrel trading agent.
//!
//! This crate provides the error type and the shared domain types used
//! throughout the Kestrel workspace: inbound chat messages, escrow deals
//! and their lifecycle states, and per-user trade statistics.

pub mod error;
pub mod types;

// Re-export key items at crate root for ergonomic imports.
pub use error::KestrelError;
pub use types::{Deal, DealStatus, InboundMessage, OfferSide, UserTradeStats};
