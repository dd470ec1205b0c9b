//! Core components, types, and utilities for the chat-relay.
//!
//! This module contains fundamental building blocks used throughout the application:
//! - Configuration handling and environment variables.
//! - The relay error taxonomy and the fixed-delay retry executor.
//! - Mention stripping and sentence splitting.
//! - Common types and result handling.

pub mod config;
pub mod error;
pub mod retry;
pub mod telemetry;
pub mod text;
pub mod types;
