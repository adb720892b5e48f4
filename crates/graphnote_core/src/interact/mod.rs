//! Input handling: per-note gesture state machines and global shortcuts.
//!
//! # Responsibility
//! - Translate host input events into store mutation and visual resync.
//! - Keep each note's gesture state fully isolated from every other note's.
//!
//! # Invariants
//! - Store mutation completes before the corresponding visual resync within
//!   one input event.
//! - A note's interaction wiring is acquired at materialization and released
//!   exactly once, at removal, including bulk clear.

pub mod controller;
pub mod events;
