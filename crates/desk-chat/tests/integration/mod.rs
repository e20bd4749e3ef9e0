//! Integration tests for desk-chat.
//!
//! These tests drive the Bot API gateway against a local server:
//! - Poll conflict backoff
//! - Webhook removal payload

pub mod common;
