//! Overlay synchronization and note-lifecycle engine for a host node-graph
//! canvas.
//!
//! The host owns the rendering surface, the pan/zoom transform and the
//! document save/load lifecycle; this crate keeps free-form annotation
//! notes in lock-step with all three through two narrow seams
//! ([`transform::TransformProvider`] and [`render::overlay::OverlaySurface`]).

pub mod interact;
pub mod logging;
pub mod model;
pub mod persist;
pub mod render;
pub mod session;
pub mod store;
pub mod transform;

pub use interact::controller::{InteractionController, NoteSnapshot, DUPLICATE_OFFSET};
pub use interact::events::{InputEvent, KeyInput, NoteRegion, PointerTarget};
pub use logging::{default_log_level, init_logging, logging_status};
pub use model::geometry::{Size, ViewPoint, WorldPoint};
pub use model::note::{
    InteractionState, Note, NoteId, PaletteColor, DEFAULT_NOTE_SIZE, MIN_NOTE_HEIGHT,
    MIN_NOTE_WIDTH,
};
pub use persist::{NoteRecord, EXTRA_DATA_KEY};
pub use render::markdown::render;
pub use render::overlay::{
    InMemorySurface, NoteContent, OverlayRenderer, OverlaySurface, SurfaceError, SurfaceHandle,
    SurfaceResult, VisualFrame,
};
pub use session::{OverlaySession, STARTUP_RETRY_BUDGET};
pub use store::note_store::{NoteDraft, NoteStore};
pub use transform::{SharedTransform, TransformProvider, TransformWatcher, ViewTransform};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
