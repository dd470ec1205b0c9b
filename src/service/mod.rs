//! Service integrations for external APIs and clients.
//!
//! This module contains implementations for the collaborators used by the relay:
//! - Chat services (e.g., Slack)
//! - The chat backend (JSON over HTTP, plus a local mock)
//!
//! Each service module defines both generic traits and concrete implementations,
//! allowing for extensibility and easy testing.

pub mod backend;
pub mod chat;
