//! Input event vocabulary delivered by host glue.
//!
//! # Responsibility
//! - Describe pointer and key input in host-independent terms.
//! - Name the note sub-controls so gesture routing never inspects host
//!   widgets directly.
//!
//! # Invariants
//! - Pointer positions are view-space; world mapping happens inside the
//!   controller through the live transform.

use crate::model::geometry::ViewPoint;
use crate::model::note::{NoteId, PaletteColor};

/// Sub-control of a note's visual that received a pointer event.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum NoteRegion {
    /// Drag grip; excludes the interactive sub-controls sitting on it.
    Header,
    /// Content area; double-activation here enters editing.
    Body,
    /// Bottom-corner resize grip.
    ResizeHandle,
    /// One palette picker swatch.
    PaletteSwatch(PaletteColor),
    /// Per-note close control.
    CloseControl,
}

/// What a pointer event landed on.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PointerTarget {
    /// The canvas background outside any note.
    Canvas,
    /// A note's visual, with the specific sub-control.
    Note { id: NoteId, region: NoteRegion },
}

/// Abstract key vocabulary; host glue maps raw key codes and modifier
/// combinations onto these before delivery.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyInput {
    /// Held to arm creation mode; a canvas click then creates a note.
    CreationModifier,
    /// Removes the selected note when no edit is live.
    Delete,
    Copy,
    Paste,
    Duplicate,
    /// Commits an active edit. The plain confirm, not the newline-insert
    /// variant.
    Confirm,
    /// The newline-insert variant; stays in edit, the editor owns it.
    InsertNewline,
    /// Cancels an active gesture or edit.
    Cancel,
}

/// One discrete input occurrence routed into the controller.
#[derive(Debug, Clone, PartialEq)]
pub enum InputEvent {
    PointerDown {
        target: PointerTarget,
        position: ViewPoint,
    },
    PointerMove {
        position: ViewPoint,
    },
    PointerUp {
        position: ViewPoint,
    },
    /// Double-activation of a note's content region.
    DoubleActivate {
        id: NoteId,
    },
    KeyDown(KeyInput),
    KeyUp(KeyInput),
    /// Live text change from the note's editable region.
    EditorInput {
        id: NoteId,
        text: String,
    },
    /// The note's editable region lost input focus.
    EditorBlur {
        id: NoteId,
    },
    /// The whole host window lost focus.
    FocusLost,
}
