use eframe::egui::{self, Pos2, Rect, Vec2};

use crate::{
    geometry::{Corner, CropRect, Size, FULL},
    gesture::{Bounds, Point},
};

/// Arrow key nudge, in percentage units.
pub const ARROW_NUDGE: f32 = 1.0;
pub const HANDLE_SIZE: f32 = 14.0;

/// Where the photo ended up on screen after fitting it into the canvas.
pub struct ImageMetrics {
    pub image_rect: Rect,
    pub image_size: Vec2,
    pub scale: f32,
}

impl ImageMetrics {
    pub fn new(canvas: Rect, image_size: Vec2) -> Self {
        let (display, scale) = fit_within(image_size, canvas.size());
        let offset = (canvas.size() - display) * 0.5;
        let image_rect = Rect::from_min_size(canvas.min + offset, display);
        Self {
            image_rect,
            image_size,
            scale,
        }
    }

    /// Rendered size of the photo, the "displayed" space crops are drawn in.
    pub fn displayed_size(&self) -> Size {
        Size::new(self.image_rect.width(), self.image_rect.height())
    }

    pub fn bounds(&self) -> Bounds {
        Bounds::new(
            self.image_rect.min.x,
            self.image_rect.min.y,
            self.image_rect.width(),
            self.image_rect.height(),
        )
    }

    pub fn crop_rect(&self, crop: &CropRect) -> Rect {
        let origin = self.image_rect.min;
        let (w, h) = (self.image_rect.width(), self.image_rect.height());
        Rect::from_min_max(
            egui::pos2(origin.x + crop.x / FULL * w, origin.y + crop.y / FULL * h),
            egui::pos2(
                origin.x + crop.right() / FULL * w,
                origin.y + crop.bottom() / FULL * h,
            ),
        )
    }
}

pub fn fit_within(image_size: Vec2, available: Vec2) -> (Vec2, f32) {
    let safe_size = egui::vec2(image_size.x.max(1.0), image_size.y.max(1.0));
    let scale = (available.x / safe_size.x)
        .min(available.y / safe_size.y)
        .max(0.01);
    (safe_size * scale, scale)
}

pub fn corner_pos(rect: Rect, corner: Corner) -> Pos2 {
    match corner {
        Corner::TopLeft => rect.left_top(),
        Corner::TopRight => rect.right_top(),
        Corner::BottomLeft => rect.left_bottom(),
        Corner::BottomRight => rect.right_bottom(),
    }
}

pub fn corner_handle_rect(rect: Rect, corner: Corner) -> Rect {
    Rect::from_center_size(corner_pos(rect, corner), Vec2::splat(HANDLE_SIZE))
}

pub fn to_point(pos: Pos2) -> Point {
    Point::new(pos.x, pos.y)
}

#[derive(Debug, Default, Clone, Copy)]
pub struct KeyboardState {
    pub confirm: bool,
    pub escape: bool,
    pub move_up: bool,
    pub move_down: bool,
    pub move_left: bool,
    pub move_right: bool,
}

impl KeyboardState {
    pub fn read(ctx: &egui::Context) -> Self {
        ctx.input(|input| Self {
            confirm: input.key_pressed(egui::Key::Enter),
            escape: input.key_pressed(egui::Key::Escape),
            move_up: input.key_pressed(egui::Key::ArrowUp),
            move_down: input.key_pressed(egui::Key::ArrowDown),
            move_left: input.key_pressed(egui::Key::ArrowLeft),
            move_right: input.key_pressed(egui::Key::ArrowRight),
        })
    }

    /// Nudge implied by the arrow keys, in percentage units.
    pub fn nudge(&self) -> Option<(f32, f32)> {
        let mut dx = 0.0;
        let mut dy = 0.0;
        if self.move_up {
            dy -= ARROW_NUDGE;
        }
        if self.move_down {
            dy += ARROW_NUDGE;
        }
        if self.move_left {
            dx -= ARROW_NUDGE;
        }
        if self.move_right {
            dx += ARROW_NUDGE;
        }
        (dx != 0.0 || dy != 0.0).then_some((dx, dy))
    }
}
