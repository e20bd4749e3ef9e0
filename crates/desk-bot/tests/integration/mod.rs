//! Integration tests for desk-bot.
//!
//! These tests drive the dispatcher and application loop through the
//! recording chat gateway and exchange doubles:
//! - Command and callback routing
//! - Menu context and deferred cleanup
//! - Startup sequence and persisted state

pub mod common;
