use dpmaker::geometry::*;

#[test]
fn default_rect_is_centered_sixty_percent() {
    let rect = CropRect::default();
    assert_eq!(rect, CropRect::new(20.0, 20.0, 60.0, 60.0));
    assert!(rect.is_within_bounds());
}

#[test]
fn move_clamps_to_bounding_box() {
    let rect = CropRect::new(20.0, 20.0, 60.0, 60.0);
    let moved = rect.moved(50.0, -50.0);
    assert_eq!((moved.x, moved.y), (40.0, 0.0));
    assert_eq!((moved.width, moved.height), (60.0, 60.0));
    assert!(moved.is_within_bounds());
}

#[test]
fn move_by_zero_is_identity() {
    let rect = CropRect::new(13.5, 7.25, 33.0, 41.0);
    assert_eq!(rect.moved(0.0, 0.0), rect);
    for corner in Corner::ALL {
        assert_eq!(rect.resized(corner, 0.0, 0.0, ResizeMode::Square), rect);
        assert_eq!(rect.resized(corner, 0.0, 0.0, ResizeMode::Freeform), rect);
    }
}

#[test]
fn square_resize_keeps_width_equal_to_height() {
    let rect = CropRect::new(20.0, 20.0, 40.0, 40.0);
    let grown = rect.resized(Corner::BottomRight, 10.0, 4.0, ResizeMode::Square);
    assert_eq!((grown.width, grown.height), (50.0, 50.0));
    assert_eq!((grown.x, grown.y), (20.0, 20.0));
}

#[test]
fn top_left_resize_anchors_bottom_right() {
    let rect = CropRect::new(30.0, 30.0, 40.0, 40.0);
    let grown = rect.resized(Corner::TopLeft, -10.0, -10.0, ResizeMode::Square);
    assert_eq!(grown, CropRect::new(20.0, 20.0, 50.0, 50.0));
    assert_eq!(grown.right(), rect.right());
    assert_eq!(grown.bottom(), rect.bottom());
}

#[test]
fn resize_never_goes_below_minimum() {
    let rect = CropRect::new(20.0, 20.0, 60.0, 60.0);
    let shrunk = rect.resized(Corner::BottomRight, -200.0, -200.0, ResizeMode::Square);
    assert_eq!((shrunk.width, shrunk.height), (MIN_CROP_SIZE, MIN_CROP_SIZE));
    assert!(shrunk.is_within_bounds());

    let freeform = rect.resized(Corner::TopLeft, 200.0, 10.0, ResizeMode::Freeform);
    assert_eq!(freeform.width, MIN_CROP_SIZE);
    assert_eq!(freeform.right(), rect.right());
    assert_eq!(freeform.height, 50.0);
}

#[test]
fn resize_stops_at_the_edges() {
    let rect = CropRect::new(50.0, 60.0, 30.0, 30.0);
    let grown = rect.resized(Corner::BottomRight, 100.0, 100.0, ResizeMode::Square);
    // Limited by the bottom edge: 60 + 40 = 100.
    assert_eq!((grown.width, grown.height), (40.0, 40.0));
    assert!(grown.is_within_bounds());
}

#[test]
fn every_operation_stays_within_bounds() {
    let deltas = [-130.0, -35.5, -1.0, 0.5, 17.0, 99.0];
    let start = CropRect::new(25.0, 10.0, 45.0, 60.0);
    for &dx in &deltas {
        for &dy in &deltas {
            assert!(start.moved(dx, dy).is_within_bounds());
            for corner in Corner::ALL {
                for mode in [ResizeMode::Square, ResizeMode::Freeform] {
                    let next = start.apply(DragKind::Resize(corner), dx, dy, mode);
                    assert!(next.is_within_bounds(), "{corner:?} {mode:?} {dx} {dy} -> {next:?}");
                }
            }
        }
    }
}

#[test]
fn to_pixels_scales_each_axis() {
    let rect = CropRect::new(25.0, 25.0, 50.0, 50.0);
    let region = rect.to_pixels(Size::new(1000.0, 800.0));
    assert_eq!(
        region,
        PixelRegion {
            x: 250.0,
            y: 200.0,
            width: 500.0,
            height: 400.0
        }
    );
}
