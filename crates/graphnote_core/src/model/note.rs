//! Note entity model.
//!
//! # Responsibility
//! - Define the canonical annotation record owned by the note store.
//! - Provide the fixed color palette and interaction-state vocabulary.
//!
//! # Invariants
//! - `id` is unique and never reused within a session.
//! - `position` is always finite; it changes only when a drag completes.
//! - `size` never falls below `MIN_NOTE_WIDTH` / `MIN_NOTE_HEIGHT`.
//! - `color` is always a valid palette key; unknown keys decode to default.
//! - `created_at` is immutable after creation.

use crate::model::geometry::{Size, WorldPoint};
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

/// Smallest world-space width a note can be resized to.
pub const MIN_NOTE_WIDTH: f64 = 100.0;
/// Smallest world-space height a note can be resized to.
pub const MIN_NOTE_HEIGHT: f64 = 60.0;
/// World-space size applied when a note is created without one.
pub const DEFAULT_NOTE_SIZE: Size = Size {
    width: 220.0,
    height: 140.0,
};

/// Stable in-session identifier for one note.
///
/// Allocated monotonically by the note store and never reused, so delayed
/// callbacks can safely treat a missing id as "note already removed".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NoteId(pub u64);

impl Display for NoteId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Fixed color palette for note theming.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum PaletteColor {
    #[default]
    Yellow,
    Green,
    Blue,
    Pink,
    Purple,
    Gray,
}

impl PaletteColor {
    /// All palette keys, in picker order.
    pub const ALL: [PaletteColor; 6] = [
        Self::Yellow,
        Self::Green,
        Self::Blue,
        Self::Pink,
        Self::Purple,
        Self::Gray,
    ];

    /// Returns the stable string key used in persisted records.
    pub fn as_key(&self) -> &'static str {
        match self {
            Self::Yellow => "yellow",
            Self::Green => "green",
            Self::Blue => "blue",
            Self::Pink => "pink",
            Self::Purple => "purple",
            Self::Gray => "gray",
        }
    }

    /// Parses a persisted palette key, falling back to the default for
    /// anything unrecognized.
    pub fn from_key(value: &str) -> Self {
        match value {
            "yellow" => Self::Yellow,
            "green" => Self::Green,
            "blue" => Self::Blue,
            "pink" => Self::Pink,
            "purple" => Self::Purple,
            "gray" => Self::Gray,
            _ => Self::default(),
        }
    }
}

/// Interaction lifecycle state for one note.
///
/// Exactly one gesture-bearing state (`Dragging`, `Resizing`, `Editing`) can
/// be active per note, and only for the selected note.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InteractionState {
    #[default]
    Idle,
    Selected,
    Editing,
    Dragging,
    Resizing,
}

/// Canonical annotation entity.
///
/// Owned exclusively by the note store until removal; the overlay renderer
/// keeps the materialized visual keyed by `id` in lock-step with this record.
#[derive(Debug, Clone, PartialEq)]
pub struct Note {
    /// Stable in-session id, monotonically allocated.
    pub id: NoteId,
    /// World-space anchor; written only when a drag completes.
    pub position: WorldPoint,
    /// World-space box size, clamped to the documented minima.
    pub size: Size,
    /// Raw markdown source; mutable only while `Editing`.
    pub text: String,
    /// Palette theme key.
    pub color: PaletteColor,
    /// Creation timestamp in epoch milliseconds, immutable.
    pub created_at: i64,
    /// Interaction lifecycle state.
    pub state: InteractionState,
}

impl Note {
    /// Returns whether this note currently holds an editable text region.
    pub fn is_editing(&self) -> bool {
        self.state == InteractionState::Editing
    }

    /// Returns whether a delete request may be honored in the current state.
    ///
    /// Deletion is allowed from `Idle`/`Selected` only, never mid-gesture or
    /// while text input is live.
    pub fn is_deletable(&self) -> bool {
        matches!(
            self.state,
            InteractionState::Idle | InteractionState::Selected
        )
    }
}

/// Returns the current wall clock as epoch milliseconds.
///
/// Falls back to zero if the system clock reports a pre-epoch time.
pub fn now_epoch_ms() -> i64 {
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_millis() as i64)
        .unwrap_or(0)
}
