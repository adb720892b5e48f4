use graphnote_core::{
    InMemorySurface, InputEvent, InteractionState, KeyInput, NoteContent, NoteDraft, NoteId,
    NoteRegion, OverlaySession, PaletteColor, PointerTarget, SharedTransform, Size, ViewPoint,
    ViewTransform, WorldPoint, DUPLICATE_OFFSET, MIN_NOTE_HEIGHT, MIN_NOTE_WIDTH,
};

type Session = OverlaySession<SharedTransform, InMemorySurface>;

fn session_with(transform: ViewTransform) -> (SharedTransform, Session) {
    let shared = SharedTransform::with(transform);
    let mut session = OverlaySession::new(shared.clone(), InMemorySurface::new());
    session.tick();
    assert!(session.is_running());
    (shared, session)
}

fn note_at(session: &mut Session, x: f64, y: f64) -> NoteId {
    session
        .create_note(NoteDraft::at(WorldPoint::new(x, y)))
        .expect("running session creates notes")
}

fn pointer_down(session: &mut Session, id: NoteId, region: NoteRegion, x: f64, y: f64) {
    session.handle_input(InputEvent::PointerDown {
        target: PointerTarget::Note { id, region },
        position: ViewPoint::new(x, y),
    });
}

fn state_of(session: &Session, id: NoteId) -> InteractionState {
    session.store().find(id).expect("live note").state
}

#[test]
fn pointer_down_selects_and_switches_selection() {
    let (_shared, mut session) = session_with(ViewTransform::identity());
    let a = note_at(&mut session, 0.0, 0.0);
    let b = note_at(&mut session, 300.0, 0.0);

    pointer_down(&mut session, a, NoteRegion::Body, 5.0, 5.0);
    assert_eq!(session.store().selected_id(), Some(a));

    pointer_down(&mut session, b, NoteRegion::Body, 305.0, 5.0);
    assert_eq!(session.store().selected_id(), Some(b));
    assert_eq!(state_of(&session, a), InteractionState::Idle);
    assert_eq!(state_of(&session, b), InteractionState::Selected);
}

#[test]
fn canvas_click_deselects() {
    let (_shared, mut session) = session_with(ViewTransform::identity());
    let id = note_at(&mut session, 0.0, 0.0);
    pointer_down(&mut session, id, NoteRegion::Body, 1.0, 1.0);

    session.handle_input(InputEvent::PointerDown {
        target: PointerTarget::Canvas,
        position: ViewPoint::new(900.0, 900.0),
    });
    assert_eq!(session.store().selected_id(), None);
    assert_eq!(state_of(&session, id), InteractionState::Idle);
}

#[test]
fn drag_moves_view_only_until_release_writes_world_once() {
    let (_shared, mut session) = session_with(ViewTransform::identity());
    let id = note_at(&mut session, 10.0, 10.0);

    pointer_down(&mut session, id, NoteRegion::Header, 15.0, 15.0);
    session.handle_input(InputEvent::PointerMove {
        position: ViewPoint::new(25.0, 35.0),
    });

    // Mid-drag: visual follows the pointer, stored world position does not.
    assert_eq!(state_of(&session, id), InteractionState::Dragging);
    let note = session.store().find(id).expect("live note");
    assert_eq!(note.position, WorldPoint::new(10.0, 10.0));
    let frame = session
        .renderer()
        .surface()
        .frame_of(id)
        .expect("placed frame");
    assert_eq!(frame.origin, ViewPoint::new(20.0, 30.0));

    session.handle_input(InputEvent::PointerUp {
        position: ViewPoint::new(25.0, 35.0),
    });
    let note = session.store().find(id).expect("live note");
    assert_eq!(note.position, WorldPoint::new(20.0, 30.0));
    assert_eq!(note.state, InteractionState::Selected);
}

#[test]
fn drag_release_maps_through_the_live_transform() {
    let (_shared, mut session) = session_with(ViewTransform::new(2.0, 0.0, 0.0));
    let id = note_at(&mut session, 10.0, 10.0);

    // View origin starts at (20, 20); drag the pointer by (30, 10).
    pointer_down(&mut session, id, NoteRegion::Header, 22.0, 22.0);
    session.handle_input(InputEvent::PointerMove {
        position: ViewPoint::new(52.0, 32.0),
    });
    session.handle_input(InputEvent::PointerUp {
        position: ViewPoint::new(52.0, 32.0),
    });

    // Final view origin (50, 30) maps back at scale 2 to world (25, 15).
    let note = session.store().find(id).expect("live note");
    assert_eq!(note.position, WorldPoint::new(25.0, 15.0));
}

#[test]
fn drag_cancel_reverts_to_pre_gesture_position() {
    let (_shared, mut session) = session_with(ViewTransform::identity());
    let id = note_at(&mut session, 10.0, 10.0);

    pointer_down(&mut session, id, NoteRegion::Header, 15.0, 15.0);
    session.handle_input(InputEvent::PointerMove {
        position: ViewPoint::new(215.0, 315.0),
    });
    session.handle_input(InputEvent::KeyDown(KeyInput::Cancel));

    let note = session.store().find(id).expect("live note");
    assert_eq!(note.position, WorldPoint::new(10.0, 10.0));
    assert_eq!(note.state, InteractionState::Selected);
    let frame = session
        .renderer()
        .surface()
        .frame_of(id)
        .expect("placed frame");
    assert_eq!(frame.origin, ViewPoint::new(10.0, 10.0));
}

#[test]
fn resize_divides_view_delta_by_scale() {
    let (_shared, mut session) = session_with(ViewTransform::new(2.0, 0.0, 0.0));
    let id = note_at(&mut session, 0.0, 0.0);
    let start_size = session.store().find(id).expect("live note").size;

    pointer_down(&mut session, id, NoteRegion::ResizeHandle, 100.0, 100.0);
    assert_eq!(state_of(&session, id), InteractionState::Resizing);
    session.handle_input(InputEvent::PointerMove {
        position: ViewPoint::new(140.0, 120.0),
    });

    let note = session.store().find(id).expect("live note");
    assert_eq!(
        note.size,
        Size::new(start_size.width + 20.0, start_size.height + 10.0)
    );

    session.handle_input(InputEvent::PointerUp {
        position: ViewPoint::new(140.0, 120.0),
    });
    assert_eq!(state_of(&session, id), InteractionState::Selected);
}

#[test]
fn resize_clamps_to_minimum_dimensions_for_any_delta() {
    let (_shared, mut session) = session_with(ViewTransform::identity());
    let id = note_at(&mut session, 0.0, 0.0);

    pointer_down(&mut session, id, NoteRegion::ResizeHandle, 100.0, 100.0);
    session.handle_input(InputEvent::PointerMove {
        position: ViewPoint::new(-1e7, -1e7),
    });

    let note = session.store().find(id).expect("live note");
    assert_eq!(note.size, Size::new(MIN_NOTE_WIDTH, MIN_NOTE_HEIGHT));
}

#[test]
fn resize_cancel_restores_pre_gesture_size() {
    let (_shared, mut session) = session_with(ViewTransform::identity());
    let id = note_at(&mut session, 0.0, 0.0);
    let start_size = session.store().find(id).expect("live note").size;

    pointer_down(&mut session, id, NoteRegion::ResizeHandle, 100.0, 100.0);
    session.handle_input(InputEvent::PointerMove {
        position: ViewPoint::new(500.0, 500.0),
    });
    session.handle_input(InputEvent::KeyDown(KeyInput::Cancel));

    let note = session.store().find(id).expect("live note");
    assert_eq!(note.size, start_size);
    assert_eq!(note.state, InteractionState::Selected);
}

#[test]
fn double_activation_edits_and_confirm_commits() {
    let (_shared, mut session) = session_with(ViewTransform::identity());
    let id = note_at(&mut session, 0.0, 0.0);

    pointer_down(&mut session, id, NoteRegion::Body, 1.0, 1.0);
    session.handle_input(InputEvent::DoubleActivate { id });
    assert_eq!(state_of(&session, id), InteractionState::Editing);
    assert!(matches!(
        session.renderer().surface().content_of(id),
        Some(NoteContent::Edit { .. })
    ));

    session.handle_input(InputEvent::EditorInput {
        id,
        text: "hello **world**".to_string(),
    });
    session.handle_input(InputEvent::KeyDown(KeyInput::Confirm));

    assert_eq!(state_of(&session, id), InteractionState::Selected);
    match session.renderer().surface().content_of(id) {
        Some(NoteContent::View { markup }) => assert!(markup.contains("<b>world</b>")),
        other => panic!("expected rendered view content, got {other:?}"),
    }
}

#[test]
fn edit_cancel_reverts_text() {
    let (_shared, mut session) = session_with(ViewTransform::identity());
    let id = note_at(&mut session, 0.0, 0.0);

    pointer_down(&mut session, id, NoteRegion::Body, 1.0, 1.0);
    session.handle_input(InputEvent::DoubleActivate { id });
    session.handle_input(InputEvent::EditorInput {
        id,
        text: "kept".to_string(),
    });
    session.handle_input(InputEvent::KeyDown(KeyInput::Confirm));

    session.handle_input(InputEvent::DoubleActivate { id });
    session.handle_input(InputEvent::EditorInput {
        id,
        text: "scrapped".to_string(),
    });
    session.handle_input(InputEvent::KeyDown(KeyInput::Cancel));

    let note = session.store().find(id).expect("live note");
    assert_eq!(note.text, "kept");
    assert_eq!(note.state, InteractionState::Selected);
}

#[test]
fn editor_blur_commits_on_the_next_tick() {
    let (_shared, mut session) = session_with(ViewTransform::identity());
    let id = note_at(&mut session, 0.0, 0.0);

    pointer_down(&mut session, id, NoteRegion::Body, 1.0, 1.0);
    session.handle_input(InputEvent::DoubleActivate { id });
    session.handle_input(InputEvent::EditorInput {
        id,
        text: "via blur".to_string(),
    });
    session.handle_input(InputEvent::EditorBlur { id });

    // Debounced: still editing until the tick consumes the pending commit.
    assert_eq!(state_of(&session, id), InteractionState::Editing);
    session.tick();
    let note = session.store().find(id).expect("live note");
    assert_eq!(note.text, "via blur");
    assert_eq!(note.state, InteractionState::Selected);
}

#[test]
fn reentering_edit_before_tick_cancels_pending_blur_commit() {
    let (_shared, mut session) = session_with(ViewTransform::identity());
    let id = note_at(&mut session, 0.0, 0.0);

    pointer_down(&mut session, id, NoteRegion::Body, 1.0, 1.0);
    session.handle_input(InputEvent::DoubleActivate { id });
    session.handle_input(InputEvent::EditorBlur { id });
    session.handle_input(InputEvent::DoubleActivate { id });
    session.tick();
    assert_eq!(state_of(&session, id), InteractionState::Editing);
}

#[test]
fn delete_honors_selection_but_not_editing() {
    let (_shared, mut session) = session_with(ViewTransform::identity());
    let id = note_at(&mut session, 0.0, 0.0);

    // No selection: delete is a no-op.
    session.handle_input(InputEvent::KeyDown(KeyInput::Delete));
    assert!(session.store().find(id).is_some());

    // While editing, shortcuts are suppressed.
    pointer_down(&mut session, id, NoteRegion::Body, 1.0, 1.0);
    session.handle_input(InputEvent::DoubleActivate { id });
    session.handle_input(InputEvent::KeyDown(KeyInput::Delete));
    assert!(session.store().find(id).is_some());
    session.handle_input(InputEvent::KeyDown(KeyInput::Confirm));

    // Selected and not editing: delete removes note, visual and wiring.
    session.handle_input(InputEvent::KeyDown(KeyInput::Delete));
    assert!(session.store().find(id).is_none());
    assert!(!session.renderer().has_visual(id));
    assert!(!session.controller().has_wiring(id));
    assert_eq!(session.store().selected_id(), None);
}

#[test]
fn close_control_removes_the_note() {
    let (_shared, mut session) = session_with(ViewTransform::identity());
    let id = note_at(&mut session, 0.0, 0.0);
    pointer_down(&mut session, id, NoteRegion::CloseControl, 1.0, 1.0);
    assert!(session.store().find(id).is_none());
    assert_eq!(session.renderer().surface().attached_count(), 0);
}

#[test]
fn palette_swatch_recolors_the_note() {
    let (_shared, mut session) = session_with(ViewTransform::identity());
    let id = note_at(&mut session, 0.0, 0.0);
    pointer_down(
        &mut session,
        id,
        NoteRegion::PaletteSwatch(PaletteColor::Blue),
        1.0,
        1.0,
    );
    let note = session.store().find(id).expect("live note");
    assert_eq!(note.color, PaletteColor::Blue);
    let frame = session
        .renderer()
        .surface()
        .frame_of(id)
        .expect("placed frame");
    assert_eq!(frame.color, PaletteColor::Blue);
}

#[test]
fn creation_mode_click_creates_at_world_position() {
    let (_shared, mut session) = session_with(ViewTransform::new(2.0, 5.0, 5.0));

    session.handle_input(InputEvent::KeyDown(KeyInput::CreationModifier));
    assert!(session.controller().is_creation_armed());
    session.handle_input(InputEvent::PointerDown {
        target: PointerTarget::Canvas,
        position: ViewPoint::new(50.0, 60.0),
    });

    assert_eq!(session.store().len(), 1);
    let note = session.store().all().next().expect("created note");
    assert_eq!(note.position, WorldPoint::new(20.0, 25.0));
    // Plain creation leaves the selection untouched.
    assert_eq!(session.store().selected_id(), None);

    // Release disarms; further canvas clicks create nothing.
    session.handle_input(InputEvent::KeyUp(KeyInput::CreationModifier));
    session.handle_input(InputEvent::PointerDown {
        target: PointerTarget::Canvas,
        position: ViewPoint::new(10.0, 10.0),
    });
    assert_eq!(session.store().len(), 1);
}

#[test]
fn focus_loss_resets_creation_mode() {
    let (_shared, mut session) = session_with(ViewTransform::identity());
    session.handle_input(InputEvent::KeyDown(KeyInput::CreationModifier));
    session.handle_input(InputEvent::FocusLost);
    assert!(!session.controller().is_creation_armed());
}

#[test]
fn copy_paste_reproduces_content_at_view_center() {
    let (_shared, mut session) = session_with(ViewTransform::new(2.0, 0.0, 0.0));
    session.set_view_center(ViewPoint::new(400.0, 300.0));
    let id = note_at(&mut session, 0.0, 0.0);
    {
        pointer_down(&mut session, id, NoteRegion::Body, 1.0, 1.0);
        session.handle_input(InputEvent::DoubleActivate { id });
        session.handle_input(InputEvent::EditorInput {
            id,
            text: "copied text".to_string(),
        });
        session.handle_input(InputEvent::KeyDown(KeyInput::Confirm));
    }
    pointer_down(
        &mut session,
        id,
        NoteRegion::PaletteSwatch(PaletteColor::Green),
        1.0,
        1.0,
    );

    session.handle_input(InputEvent::KeyDown(KeyInput::Copy));
    session.handle_input(InputEvent::KeyDown(KeyInput::Paste));

    assert_eq!(session.store().len(), 2);
    let pasted = session
        .store()
        .all()
        .find(|note| note.id != id)
        .expect("pasted note");
    assert_eq!(pasted.position, WorldPoint::new(200.0, 150.0));
    assert_eq!(pasted.text, "copied text");
    assert_eq!(pasted.color, PaletteColor::Green);
    // Paste does not steal the selection.
    assert_eq!(session.store().selected_id(), Some(id));
}

#[test]
fn paste_without_copy_is_a_no_op() {
    let (_shared, mut session) = session_with(ViewTransform::identity());
    session.handle_input(InputEvent::KeyDown(KeyInput::Paste));
    assert!(session.store().is_empty());
}

#[test]
fn duplicate_offsets_in_world_space_and_selects_the_copy() {
    let (_shared, mut session) = session_with(ViewTransform::identity());
    let id = note_at(&mut session, 100.0, 50.0);
    pointer_down(&mut session, id, NoteRegion::Body, 101.0, 51.0);

    session.handle_input(InputEvent::KeyDown(KeyInput::Duplicate));

    assert_eq!(session.store().len(), 2);
    let copy = session
        .store()
        .all()
        .find(|note| note.id != id)
        .expect("duplicated note");
    assert_eq!(
        copy.position,
        WorldPoint::new(100.0 + DUPLICATE_OFFSET.0, 50.0 + DUPLICATE_OFFSET.1)
    );
    assert_eq!(session.store().selected_id(), Some(copy.id));
}

#[test]
fn events_for_dead_ids_are_guarded_no_ops() {
    let (_shared, mut session) = session_with(ViewTransform::identity());
    let id = note_at(&mut session, 0.0, 0.0);
    pointer_down(&mut session, id, NoteRegion::Body, 1.0, 1.0);
    session.handle_input(InputEvent::KeyDown(KeyInput::Delete));

    // Stale events referencing the removed id must not raise or recreate.
    pointer_down(&mut session, id, NoteRegion::Header, 1.0, 1.0);
    session.handle_input(InputEvent::DoubleActivate { id });
    session.handle_input(InputEvent::EditorInput {
        id,
        text: "ghost".to_string(),
    });
    session.handle_input(InputEvent::EditorBlur { id });
    session.tick();
    assert!(session.store().is_empty());
}
