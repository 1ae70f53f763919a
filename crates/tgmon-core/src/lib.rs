//! Core of the Telegram channel monitor.
//!
//! This crate is framework-agnostic. The MTProto user client, the Bot API and the
//! LLM relevance check live behind ports (traits) implemented in adapter crates.

pub mod config;
pub mod domain;
pub mod errors;
pub mod formatting;
pub mod logging;
pub mod monitor;
pub mod ports;
pub mod registry;
pub mod shutdown;
pub mod sink;
pub mod store;

pub use errors::{Error, Result};
