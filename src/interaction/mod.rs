//! Event handling and user interactions for chat-relay.
//!
//! This module provides the relay core:
//! - Tracking the single in-flight reply of each conversation
//! - Revealing a complete answer as paced incremental updates
//! - Orchestrating one relay run per inbound mention

pub mod delivery;
pub mod relay;
pub mod tracker;
