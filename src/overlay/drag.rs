use super::{Point, Viewport};

/// Clamp a candidate overlay position so at least `min_visible` units remain
/// inside the viewport on every edge.
///
/// Horizontally the overlay may hang off either side; vertically the header
/// must never leave the top edge, so `y` has a hard floor of zero. Only the
/// width enters the math: the bottom bound keeps the header row visible, not
/// the overlay's full height.
pub fn clamp_position(candidate: Point, width: u16, viewport: Viewport, min_visible: u16) -> Point {
    let width = i32::from(width);
    let visible = i32::from(min_visible);

    let min_x = -(width - visible.min(width));
    let max_x = i32::from(viewport.width) - visible;
    let min_y = 0;
    let max_y = i32::from(viewport.height) - visible;

    Point {
        x: candidate.x.clamp(min_x, max_x.max(min_x)),
        y: candidate.y.clamp(min_y, max_y.max(min_y)),
    }
}

/// A clamped position ready to apply to the registry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DragUpdate {
    pub id: String,
    pub position: Point,
}

#[derive(Debug, Clone)]
struct DragSession {
    id: String,
    start: Point,
    origin: Point,
    width: u16,
}

/// Pointer-drag state machine for one overlay at a time.
///
/// Raw pointer samples are coalesced: `update` overwrites the pending sample
/// and the manager drains at most one clamped position per frame via
/// [`DragController::take_frame_update`]. Only [`DragController::finish`]
/// produces a position meant for the position store.
#[derive(Debug, Default)]
pub struct DragController {
    session: Option<DragSession>,
    pending: Option<Point>,
}

impl DragController {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start dragging `id`. `start` is the pointer cell, `origin` the
    /// overlay's position at that moment.
    pub fn begin(&mut self, id: impl Into<String>, start: Point, origin: Point, width: u16) {
        self.session = Some(DragSession {
            id: id.into(),
            start,
            origin,
            width,
        });
        self.pending = None;
    }

    pub fn is_dragging(&self) -> bool {
        self.session.is_some()
    }

    pub fn dragging_id(&self) -> Option<&str> {
        self.session.as_ref().map(|session| session.id.as_str())
    }

    /// Record the latest pointer sample. Samples arriving within the same
    /// frame overwrite each other; nothing is queued.
    pub fn update(&mut self, pointer: Point) {
        if self.session.is_some() {
            self.pending = Some(pointer);
        }
    }

    /// Drain the pending sample into a clamped position. Called once per
    /// frame; returns `None` when no sample arrived since the last call.
    pub fn take_frame_update(&mut self, viewport: Viewport, min_visible: u16) -> Option<DragUpdate> {
        let session = self.session.as_ref()?;
        let pointer = self.pending.take()?;
        Some(DragUpdate {
            id: session.id.clone(),
            position: Self::candidate(session, pointer, viewport, min_visible),
        })
    }

    /// End the drag, returning the final clamped position to commit.
    pub fn finish(&mut self, pointer: Point, viewport: Viewport, min_visible: u16) -> Option<DragUpdate> {
        let session = self.session.take()?;
        self.pending = None;
        Some(DragUpdate {
            id: session.id.clone(),
            position: Self::candidate(&session, pointer, viewport, min_visible),
        })
    }

    /// Abort without committing, e.g. when the dragged overlay gets closed.
    pub fn cancel(&mut self) {
        self.session = None;
        self.pending = None;
    }

    fn candidate(session: &DragSession, pointer: Point, viewport: Viewport, min_visible: u16) -> Point {
        let candidate = Point {
            x: session.origin.x + (pointer.x - session.start.x),
            y: session.origin.y + (pointer.y - session.start.y),
        };
        clamp_position(candidate, session.width, viewport, min_visible)
    }
}
