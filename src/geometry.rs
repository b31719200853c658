//! Crop rectangle math in percentage space.
//!
//! A [`CropRect`] is expressed in percent of the displayed image's bounding
//! box, so it survives window resizes untouched. Every operation here is a
//! pure function of the current rectangle and a delta.

pub const FULL: f32 = 100.0;
pub const MIN_CROP_SIZE: f32 = 20.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Size {
    pub width: f32,
    pub height: f32,
}

impl Size {
    pub fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }

    pub fn is_empty(&self) -> bool {
        self.width <= 0.0 || self.height <= 0.0
    }
}

/// A rectangle in pixel units of some surface (displayed or natural).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PixelRegion {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CropRect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Default for CropRect {
    fn default() -> Self {
        Self {
            x: 20.0,
            y: 20.0,
            width: 60.0,
            height: 60.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Corner {
    TopLeft,
    TopRight,
    BottomLeft,
    BottomRight,
}

impl Corner {
    pub const ALL: [Self; 4] = [
        Self::TopLeft,
        Self::TopRight,
        Self::BottomLeft,
        Self::BottomRight,
    ];

    pub fn id_suffix(self) -> &'static str {
        match self {
            Self::TopLeft => "handle_top_left",
            Self::TopRight => "handle_top_right",
            Self::BottomLeft => "handle_bottom_left",
            Self::BottomRight => "handle_bottom_right",
        }
    }

    fn moves_left(self) -> bool {
        matches!(self, Self::TopLeft | Self::BottomLeft)
    }

    fn moves_top(self) -> bool {
        matches!(self, Self::TopLeft | Self::TopRight)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ResizeMode {
    Freeform,
    /// Width and height grow together, anchored at the opposite corner.
    #[default]
    Square,
}

/// What a gesture manipulates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DragKind {
    Move,
    Resize(Corner),
}

impl CropRect {
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
        .normalized()
    }

    pub fn full() -> Self {
        Self {
            x: 0.0,
            y: 0.0,
            width: FULL,
            height: FULL,
        }
    }

    pub fn right(&self) -> f32 {
        self.x + self.width
    }

    pub fn bottom(&self) -> f32 {
        self.y + self.height
    }

    pub fn is_within_bounds(&self) -> bool {
        const EPS: f32 = 1e-3;
        self.x >= -EPS
            && self.y >= -EPS
            && self.right() <= FULL + EPS
            && self.bottom() <= FULL + EPS
            && self.width >= MIN_CROP_SIZE - EPS
            && self.height >= MIN_CROP_SIZE - EPS
    }

    /// Translates the rectangle, keeping its size and clamping it inside the box.
    pub fn moved(self, dx: f32, dy: f32) -> Self {
        Self {
            x: clamp_range(self.x + dx, 0.0, FULL - self.width),
            y: clamp_range(self.y + dy, 0.0, FULL - self.height),
            ..self
        }
    }

    /// Drags `corner` by the delta while the diagonally opposite corner stays put.
    pub fn resized(self, corner: Corner, dx: f32, dy: f32, mode: ResizeMode) -> Self {
        match mode {
            ResizeMode::Freeform => self.resized_freeform(corner, dx, dy),
            ResizeMode::Square => self.resized_square(corner, dx, dy),
        }
    }

    pub fn apply(self, kind: DragKind, dx: f32, dy: f32, mode: ResizeMode) -> Self {
        match kind {
            DragKind::Move => self.moved(dx, dy),
            DragKind::Resize(corner) => self.resized(corner, dx, dy, mode),
        }
    }

    /// Converts the percentages to pixels of a surface of the given size.
    pub fn to_pixels(&self, surface: Size) -> PixelRegion {
        PixelRegion {
            x: surface.width * self.x / FULL,
            y: surface.height * self.y / FULL,
            width: surface.width * self.width / FULL,
            height: surface.height * self.height / FULL,
        }
    }

    fn resized_freeform(self, corner: Corner, dx: f32, dy: f32) -> Self {
        let (x, width) = resize_axis(self.x, self.width, dx, corner.moves_left());
        let (y, height) = resize_axis(self.y, self.height, dy, corner.moves_top());
        Self {
            x,
            y,
            width,
            height,
        }
    }

    fn resized_square(self, corner: Corner, dx: f32, dy: f32) -> Self {
        // Growth along each axis, positive when the dragged corner moves outward.
        let grow_x = if corner.moves_left() { -dx } else { dx };
        let grow_y = if corner.moves_top() { -dy } else { dy };
        let growth = if grow_x.abs() >= grow_y.abs() {
            grow_x
        } else {
            grow_y
        };

        let room_x = if corner.moves_left() {
            self.right()
        } else {
            FULL - self.x
        };
        let room_y = if corner.moves_top() {
            self.bottom()
        } else {
            FULL - self.y
        };
        let max_growth = (room_x - self.width).min(room_y - self.height).max(0.0);
        let min_growth = (MIN_CROP_SIZE - self.width.min(self.height)).min(0.0);
        let growth = growth.clamp(min_growth, max_growth);
        if growth == 0.0 {
            return self;
        }

        let width = self.width + growth;
        let height = self.height + growth;
        let x = if corner.moves_left() {
            self.right() - width
        } else {
            self.x
        };
        let y = if corner.moves_top() {
            self.bottom() - height
        } else {
            self.y
        };
        Self {
            x,
            y,
            width,
            height,
        }
    }

    fn normalized(self) -> Self {
        let width = self.width.clamp(MIN_CROP_SIZE, FULL);
        let height = self.height.clamp(MIN_CROP_SIZE, FULL);
        Self {
            x: self.x.clamp(0.0, FULL - width),
            y: self.y.clamp(0.0, FULL - height),
            width,
            height,
        }
    }
}

/// Moves one edge of a span by `delta`; the other edge stays fixed.
fn resize_axis(start: f32, len: f32, delta: f32, moves_start: bool) -> (f32, f32) {
    if delta == 0.0 {
        return (start, len);
    }
    let end = start + len;
    if moves_start {
        let start = clamp_range(start + delta, 0.0, end - MIN_CROP_SIZE);
        (start, end - start)
    } else {
        let end = clamp_range(end + delta, start + MIN_CROP_SIZE, FULL);
        (start, end - start)
    }
}

// Lower bound wins when the range is inverted.
fn clamp_range(value: f32, lo: f32, hi: f32) -> f32 {
    value.min(hi).max(lo)
}
