//! Core module: the session driver and everything it coordinates.
//!
//! This module contains:
//! - `history`: Conversation turns exchanged with the engine
//! - `events`: Decoded stream-item shapes
//! - `progress`: Step timing, ETA, progress bars
//! - `classify`: Step categories and field extraction
//! - `animator`: Single-line status animation
//! - `sink`: Console + durable-log output
//! - `demux`: One round of stream consumption
//! - `outcome`: Clarification-vs-done evaluation
//! - `driver`: The session loop and the operator seam
//! - `interrupt`: Signal handling for graceful interruption

pub mod animator;
pub mod classify;
pub mod demux;
pub mod driver;
pub mod events;
pub mod history;
pub mod interrupt;
pub mod outcome;
pub mod progress;
pub mod sink;

#[cfg(test)]
pub mod testing;
