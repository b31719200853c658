use eframe::egui::{self, Color32, Stroke, StrokeKind};

use crate::{
    geometry::{Corner, DragKind},
    gesture::{DragController, PointerEvent, PointerKind},
    ui::{corner_handle_rect, to_point, ImageMetrics},
};

const OVERLAY: Color32 = Color32::from_rgba_premultiplied(0, 0, 0, 128);
const ACCENT: Color32 = Color32::from_rgb(66, 133, 244);

/// Draws the crop overlay and feeds its drags into `drag`.
///
/// Returns `true` when the rectangle changed this frame.
pub fn show(ui: &egui::Ui, metrics: &ImageMetrics, drag: &mut DragController) -> bool {
    let kind = if ui.ctx().input(|i| i.any_touches()) {
        PointerKind::Touch
    } else {
        PointerKind::Mouse
    };

    let mut changed = false;
    let crop = metrics.crop_rect(&drag.rect());

    // Handles are registered after the body so they win the hit test.
    let body = ui.interact(crop, ui.id().with("crop_body"), egui::Sense::click_and_drag());
    changed |= drive(&body, DragKind::Move, kind, metrics, drag);
    for corner in Corner::ALL {
        let handle = ui.interact(
            corner_handle_rect(crop, corner),
            ui.id().with(corner.id_suffix()),
            egui::Sense::click_and_drag(),
        );
        changed |= drive(&handle, DragKind::Resize(corner), kind, metrics, drag);
    }

    if body.hovered() && !drag.is_active() {
        ui.ctx().set_cursor_icon(egui::CursorIcon::Grab);
    }

    draw(ui.painter(), metrics, metrics.crop_rect(&drag.rect()));
    changed
}

fn drive(
    response: &egui::Response,
    target: DragKind,
    kind: PointerKind,
    metrics: &ImageMetrics,
    drag: &mut DragController,
) -> bool {
    if response.drag_started() {
        if let Some(pos) = response.interact_pointer_pos() {
            drag.handle(PointerEvent::Press {
                kind,
                target,
                pos: to_point(pos),
                bounds: metrics.bounds(),
            });
        }
    }
    let Some(gesture) = drag.active().copied().filter(|g| g.target == target) else {
        return false;
    };
    let mut changed = false;
    if response.dragged() {
        if let Some(pos) = response.interact_pointer_pos() {
            changed = drag
                .handle(PointerEvent::Move {
                    kind: gesture.kind,
                    pos: to_point(pos),
                })
                .is_some();
        }
    }
    if response.drag_stopped() {
        drag.handle(PointerEvent::Release { kind: gesture.kind });
    }
    changed
}

fn draw(painter: &egui::Painter, metrics: &ImageMetrics, crop: egui::Rect) {
    let image = metrics.image_rect;
    // Dim everything outside the crop.
    for band in [
        egui::Rect::from_min_max(image.min, egui::pos2(image.max.x, crop.min.y)),
        egui::Rect::from_min_max(egui::pos2(image.min.x, crop.max.y), image.max),
        egui::Rect::from_min_max(
            egui::pos2(image.min.x, crop.min.y),
            egui::pos2(crop.min.x, crop.max.y),
        ),
        egui::Rect::from_min_max(
            egui::pos2(crop.max.x, crop.min.y),
            egui::pos2(image.max.x, crop.max.y),
        ),
    ] {
        if band.is_positive() {
            painter.rect_filled(band, 0.0, OVERLAY);
        }
    }

    painter.rect_stroke(crop, 0.0, Stroke::new(2.0, ACCENT), StrokeKind::Outside);
    for third in [1.0 / 3.0, 2.0 / 3.0] {
        let x = crop.min.x + crop.width() * third;
        let y = crop.min.y + crop.height() * third;
        let guide = Stroke::new(1.0, Color32::from_white_alpha(90));
        painter.line_segment([egui::pos2(x, crop.min.y), egui::pos2(x, crop.max.y)], guide);
        painter.line_segment([egui::pos2(crop.min.x, y), egui::pos2(crop.max.x, y)], guide);
    }
    for corner in Corner::ALL {
        painter.rect_filled(corner_handle_rect(crop, corner), 3.0, ACCENT);
    }
}
