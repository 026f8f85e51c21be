//! framescan - frame scoring engine with credit-gated analysis tiers
//!
//! Turns a message or photo into a 0-100 frame score across nine axes,
//! charges paid scan tiers against a credit ledger that refunds on failure,
//! and tracks each contact's score history and trend.
//!
//! [`engine::FrameEngine`] is the entry point; the other modules are its
//! building blocks.

pub mod config;
pub mod credits;
pub mod engine;
pub mod models;
pub mod persistence;
pub mod pipeline;
pub mod provider;
pub mod reporters;
pub mod scoring;
pub mod store;
pub mod triggers;
