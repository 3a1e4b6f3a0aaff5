// SPDX-FileCopyrightText: 2026 Kestrel Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Per-conversation inbound message debouncing for the Kestrel trading agent.
//!
//! Chat users type in bursts. Handing every fragment to the agent wastes
//! model calls and produces fractured replies, so inbound messages are
//! buffered per conversation and flushed as one ordered batch after a
//! quiet period, with a hard cap on total latency and on buffer size.

pub mod debouncer;

pub use debouncer::{BatchHandler, DebouncePredicate, ErrorHandler, MessageDebouncer};
