use dpmaker::geometry::{Corner, CropRect};
use dpmaker::ui::*;
use eframe::egui::{self, Rect, Vec2};

#[test]
fn image_metrics_center_image_and_compute_scale() {
    let canvas = Rect::from_min_max(egui::pos2(0.0, 0.0), egui::pos2(200.0, 100.0));
    let metrics = ImageMetrics::new(canvas, Vec2::new(50.0, 50.0));
    assert!(metrics.scale > 0.0);
    assert_eq!(metrics.image_size, Vec2::new(50.0, 50.0));
    assert!((metrics.image_rect.center() - canvas.center()).length_sq() < 1.0);
}

#[test]
fn bounds_and_displayed_size_follow_the_fitted_image() {
    let canvas = Rect::from_min_max(egui::pos2(0.0, 0.0), egui::pos2(400.0, 400.0));
    let metrics = ImageMetrics::new(canvas, Vec2::new(1000.0, 500.0));
    let displayed = metrics.displayed_size();
    assert_eq!((displayed.width, displayed.height), (400.0, 200.0));
    let bounds = metrics.bounds();
    assert_eq!((bounds.left, bounds.top), (0.0, 100.0));
    assert_eq!((bounds.width, bounds.height), (400.0, 200.0));
}

#[test]
fn crop_rect_maps_percent_to_screen() {
    let canvas = Rect::from_min_max(egui::pos2(0.0, 0.0), egui::pos2(400.0, 400.0));
    let metrics = ImageMetrics::new(canvas, Vec2::new(1000.0, 500.0));
    let rect = metrics.crop_rect(&CropRect::new(25.0, 25.0, 50.0, 50.0));
    assert_eq!(rect.min, egui::pos2(100.0, 150.0));
    assert_eq!(rect.max, egui::pos2(300.0, 250.0));

    let handle = corner_handle_rect(rect, Corner::BottomRight);
    assert_eq!(handle.center(), rect.right_bottom());
    assert_eq!(handle.width(), HANDLE_SIZE);
}

#[test]
fn fit_within_respects_available_bounds() {
    let (display, scale) = fit_within(Vec2::new(400.0, 100.0), Vec2::new(200.0, 200.0));
    assert_eq!(display.x, 200.0);
    assert!(display.y <= 200.0);
    assert_eq!(scale, 0.5);
}

#[test]
fn arrow_keys_nudge_one_unit() {
    let keys = KeyboardState {
        move_left: true,
        move_down: true,
        ..Default::default()
    };
    assert_eq!(keys.nudge(), Some((-ARROW_NUDGE, ARROW_NUDGE)));
    assert_eq!(KeyboardState::default().nudge(), None);
}
