use tracing::debug;

use crate::geometry::{CropRect, DragKind, ResizeMode, FULL};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointerKind {
    Mouse,
    Touch,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

/// Bounding box of the element the crop overlay is drawn on, in screen pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds {
    pub left: f32,
    pub top: f32,
    pub width: f32,
    pub height: f32,
}

impl Bounds {
    pub fn new(left: f32, top: f32, width: f32, height: f32) -> Self {
        Self {
            left,
            top,
            width,
            height,
        }
    }

    fn is_degenerate(&self) -> bool {
        !(self.width > 0.0 && self.height > 0.0)
    }
}

/// A pointer event already normalised to one coordinate stream.
///
/// Mouse and touch input both end up here; for touch the first contact
/// point is used.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PointerEvent {
    Press {
        kind: PointerKind,
        target: DragKind,
        pos: Point,
        bounds: Bounds,
    },
    Move {
        kind: PointerKind,
        pos: Point,
    },
    Release {
        kind: PointerKind,
    },
}

#[derive(Debug, Clone, Copy)]
pub struct Gesture {
    pub kind: PointerKind,
    pub target: DragKind,
    pub anchor: CropRect,
    pub start: Point,
    pub bounds: Bounds,
}

impl Gesture {
    fn percent_delta(&self, pos: Point) -> (f32, f32) {
        (
            (pos.x - self.start.x) / self.bounds.width * FULL,
            (pos.y - self.start.y) / self.bounds.height * FULL,
        )
    }
}

/// Owns the crop rectangle and at most one gesture manipulating it.
#[derive(Debug, Clone)]
pub struct DragController {
    rect: CropRect,
    mode: ResizeMode,
    active: Option<Gesture>,
}

impl Default for DragController {
    fn default() -> Self {
        Self::new(CropRect::default(), ResizeMode::default())
    }
}

impl DragController {
    pub fn new(rect: CropRect, mode: ResizeMode) -> Self {
        Self {
            rect,
            mode,
            active: None,
        }
    }

    pub fn rect(&self) -> CropRect {
        self.rect
    }

    pub fn active(&self) -> Option<&Gesture> {
        self.active.as_ref()
    }

    pub fn is_active(&self) -> bool {
        self.active.is_some()
    }

    /// Replaces the rectangle wholesale, dropping any gesture in progress.
    pub fn reset(&mut self, rect: CropRect) {
        self.rect = rect;
        self.active = None;
    }

    /// Feeds one event; returns the rectangle when it changed.
    pub fn handle(&mut self, event: PointerEvent) -> Option<CropRect> {
        match event {
            PointerEvent::Press {
                kind,
                target,
                pos,
                bounds,
            } => {
                self.press(kind, target, pos, bounds);
                None
            }
            PointerEvent::Move { kind, pos } => self.move_to(kind, pos),
            PointerEvent::Release { kind } => {
                self.release(kind);
                None
            }
        }
    }

    /// Starts a gesture anchored at the current rectangle.
    ///
    /// Returns `false` when another gesture is still running or the bounds
    /// are empty.
    pub fn press(&mut self, kind: PointerKind, target: DragKind, pos: Point, bounds: Bounds) -> bool {
        if self.active.is_some() || bounds.is_degenerate() {
            return false;
        }
        debug!(?kind, ?target, "crop gesture started");
        self.active = Some(Gesture {
            kind,
            target,
            anchor: self.rect,
            start: pos,
            bounds,
        });
        true
    }

    pub fn move_to(&mut self, kind: PointerKind, pos: Point) -> Option<CropRect> {
        let gesture = self.active.filter(|g| g.kind == kind)?;
        let (dx, dy) = gesture.percent_delta(pos);
        let next = gesture.anchor.apply(gesture.target, dx, dy, self.mode);
        if next == self.rect {
            return None;
        }
        self.rect = next;
        Some(next)
    }

    pub fn release(&mut self, kind: PointerKind) -> bool {
        match self.active {
            Some(gesture) if gesture.kind == kind => {
                debug!(?kind, rect = ?self.rect, "crop gesture ended");
                self.active = None;
                true
            }
            _ => false,
        }
    }

    /// Keyboard nudge in percentage units; ignored mid-gesture.
    pub fn nudge(&mut self, dx: f32, dy: f32) -> Option<CropRect> {
        if self.active.is_some() {
            return None;
        }
        let next = self.rect.moved(dx, dy);
        if next == self.rect {
            return None;
        }
        self.rect = next;
        Some(next)
    }
}
