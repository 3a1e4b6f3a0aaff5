// SPDX-FileCopyrightText: 2026 Kestrel Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Escrow deal lifecycle engine for the Kestrel trading agent.
//!
//! A deal is a two-party conditional exchange: the user's offer against the
//! agent's, not finalized until payment is independently verified on-chain.
//! This crate owns the lifecycle -- guarded transitions, time windows, poll
//! queues for the verification and execution workers, and idempotent
//! completion accounting into per-user trade statistics.
//!
//! Coordination is optimistic: every transition is a single atomic
//! conditional write in `kestrel-storage`, and losing a race is a normal
//! `false` result, not an error.

pub mod engine;

pub use engine::{is_expired, DealEngine, NewDeal};
