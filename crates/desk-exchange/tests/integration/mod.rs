//! Integration tests for desk-exchange.
//!
//! These tests drive the real HTTP client against a local server:
//! - Wallet balance account-type fallback
//! - Position scope aggregation
//! - Ticker category and price-kind fallback

pub mod common;
