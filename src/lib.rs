//! Ordered escrow transaction submission queue for the XRP Ledger.
//!
//! Accepts validated escrow intents for a single account, gates them on
//! spendable balance net of reserves and pending queued debits, and
//! submits them strictly in enqueue order so the account's transaction
//! sequence is never skipped or reordered.

pub mod application;
pub mod domain;
pub mod infrastructure;
pub mod service;
