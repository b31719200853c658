use std::sync::Arc;

use dpmaker::error::PipelineError;
use dpmaker::geometry::{CropRect, Size};
use dpmaker::image_utils::ImageMime;
use dpmaker::restyle::RestyleResult;
use dpmaker::session::*;

mod common;
use common::{encode_jpeg, encode_png, solid_image};

fn uploaded() -> SessionController {
    let mut session = SessionController::new();
    session
        .upload(encode_png(&solid_image(200, 100, [30, 60, 90, 255])))
        .expect("png upload");
    session
}

fn customizing() -> SessionController {
    let mut session = uploaded();
    session
        .confirm_crop(Size::new(400.0, 200.0), 1.0)
        .expect("crop");
    session
}

fn new_image() -> RestyleResult {
    RestyleResult::NewImage {
        bytes: encode_png(&solid_image(8, 8, [0, 255, 0, 255])),
        mime: ImageMime::Png,
    }
}

#[test]
fn upload_moves_to_crop_with_default_rect() {
    let session = uploaded();
    assert_eq!(session.stage(), Stage::Crop);
    assert!(session.state().uploaded_image.is_some());
    assert!(session.state().cropped_image.is_none());
    assert_eq!(session.crop_rect(), CropRect::default());
}

#[test]
fn jpeg_uploads_are_accepted() {
    let mut session = SessionController::new();
    session
        .upload(encode_jpeg(&solid_image(16, 16, [1, 1, 1, 255])))
        .unwrap();
    assert_eq!(session.stage(), Stage::Crop);
}

#[test]
fn unsupported_uploads_leave_state_untouched() {
    let mut heic = vec![0, 0, 0, 24];
    heic.extend_from_slice(b"ftypheic");
    heic.extend_from_slice(&[0; 32]);

    let mut session = SessionController::new();
    for bytes in [heic, b"plain text".to_vec()] {
        let err = session.upload(bytes).unwrap_err();
        assert!(matches!(err, PipelineError::UnsupportedFormat(_)));
        assert_eq!(session.state(), &SessionState::default());
    }
}

#[test]
fn confirm_crop_seeds_working_image() {
    let session = customizing();
    let state = session.state();
    assert_eq!(state.stage, Stage::Customize);
    let cropped = state.cropped_image.as_ref().unwrap();
    let working = state.final_image.as_ref().unwrap();
    assert!(Arc::ptr_eq(cropped, working));
    assert_eq!(cropped.mime(), Some(&ImageMime::Jpeg));

    // 60% of a 200x100 photo.
    let decoded = cropped.decode().unwrap();
    assert_eq!((decoded.width(), decoded.height()), (120, 60));
}

#[test]
fn centre_crop_of_a_large_jpeg_scales_with_pixel_density() {
    let mut session = SessionController::new();
    session
        .upload(encode_jpeg(&solid_image(1000, 800, [200, 40, 40, 255])))
        .unwrap();
    session
        .drag_mut()
        .reset(CropRect::new(25.0, 25.0, 50.0, 50.0));
    session
        .confirm_crop(Size::new(500.0, 400.0), 2.0)
        .unwrap();

    let decoded = session.state().cropped_image.as_ref().unwrap().decode().unwrap();
    assert_eq!((decoded.width(), decoded.height()), (1000, 800));
}

#[test]
fn generate_requires_a_name() {
    let mut session = customizing();
    for name in ["", "   \t"] {
        session.set_user_name(name);
        let err = session.generate().unwrap_err();
        assert!(matches!(err, PipelineError::Validation(_)));
        assert_eq!(session.stage(), Stage::Customize);
    }
    session.set_user_name("Ada");
    session.generate().unwrap();
    assert_eq!(session.stage(), Stage::Results);
}

#[test]
fn operations_out_of_order_are_rejected() {
    let mut session = SessionController::new();
    assert!(session.generate().is_err());
    assert!(session.confirm_crop(Size::new(10.0, 10.0), 1.0).is_err());
    assert!(session.begin_restyle("make it pop").is_err());
    assert_eq!(session.stage(), Stage::Upload);
}

#[test]
fn restyle_success_replaces_only_the_working_image() {
    let mut session = customizing();
    let cropped = session.state().cropped_image.clone().unwrap();
    let job = session.begin_restyle("  add sunglasses ").unwrap();
    assert_eq!(job.instruction, "add sunglasses");
    assert!(Arc::ptr_eq(&job.image, &cropped));
    assert!(session.is_restyling());

    session.finish_restyle(job.ticket, new_image()).unwrap();
    assert!(!session.is_restyling());
    let state = session.state();
    assert!(Arc::ptr_eq(state.cropped_image.as_ref().unwrap(), &cropped));
    assert!(!Arc::ptr_eq(state.final_image.as_ref().unwrap(), &cropped));
    assert_eq!(session.chat().len(), 2);
    assert_eq!(session.chat()[0], ChatMessage::user("add sunglasses"));
}

#[test]
fn restyle_failure_keeps_the_working_image() {
    let mut session = customizing();
    let before = session.working_image().cloned().unwrap();
    let job = session.begin_restyle("make it blue").unwrap();
    let err = session
        .finish_restyle(
            job.ticket,
            RestyleResult::Failure {
                reason: "boom".into(),
                status: Some(500),
            },
        )
        .unwrap_err();
    assert!(matches!(err, PipelineError::Transport { status: Some(500), .. }));
    assert!(Arc::ptr_eq(session.working_image().unwrap(), &before));
    let last = session.chat().last().unwrap();
    assert_eq!(last.role, Role::Assistant);
    assert_eq!(last.text, "API request failed with status code: 500.");
}

#[test]
fn undecodable_restyle_image_keeps_the_crop() {
    let mut session = customizing();
    let cropped = session.state().cropped_image.clone().unwrap();
    let job = session.begin_restyle("add a hat").unwrap();
    let err = session
        .finish_restyle(
            job.ticket,
            RestyleResult::NewImage {
                bytes: b"not an image at all".to_vec(),
                mime: ImageMime::Png,
            },
        )
        .unwrap_err();
    assert!(matches!(err, PipelineError::Decode(_)), "{err:?}");
    assert!(Arc::ptr_eq(session.working_image().unwrap(), &cropped));
    assert!(!session.is_restyling());
    assert_eq!(session.chat().last().unwrap().role, Role::Assistant);
}

#[test]
fn only_one_restyle_in_flight() {
    let mut session = customizing();
    assert!(matches!(
        session.begin_restyle("   "),
        Err(PipelineError::Validation(_))
    ));
    let job = session.begin_restyle("one").unwrap();
    assert!(session.begin_restyle("two").is_err());
    session
        .finish_restyle(job.ticket, RestyleResult::Explanation("no".into()))
        .unwrap_err();
    assert!(session.begin_restyle("three").is_ok());
}

#[test]
fn stale_restyle_results_are_dropped() {
    let mut session = customizing();
    let job = session.begin_restyle("one").unwrap();
    session.replace_photo();
    session.finish_restyle(job.ticket, new_image()).unwrap();
    assert_eq!(session.stage(), Stage::Upload);
    assert!(session.state().final_image.is_none());
}

#[test]
fn reset_working_image_restores_the_crop() {
    let mut session = customizing();
    let job = session.begin_restyle("one").unwrap();
    session.finish_restyle(job.ticket, new_image()).unwrap();
    session.reset_working_image();
    let state = session.state();
    assert!(Arc::ptr_eq(
        state.final_image.as_ref().unwrap(),
        state.cropped_image.as_ref().unwrap()
    ));
    assert!(session.chat().is_empty());
}

#[test]
fn reset_abandons_a_restyle_in_flight() {
    let mut session = customizing();
    let cropped = session.state().cropped_image.clone().unwrap();
    let job = session.begin_restyle("one").unwrap();
    session.reset_working_image();
    assert!(!session.is_restyling());

    session.finish_restyle(job.ticket, new_image()).unwrap();
    assert!(Arc::ptr_eq(session.working_image().unwrap(), &cropped));
    assert!(session.chat().is_empty());
    assert!(session.begin_restyle("two").is_ok());
}

#[test]
fn replace_photo_keeps_the_name() {
    let mut session = customizing();
    session.set_user_name("Ada");
    session.replace_photo();
    let state = session.state();
    assert_eq!(state.stage, Stage::Upload);
    assert!(state.uploaded_image.is_none());
    assert!(state.cropped_image.is_none());
    assert!(state.final_image.is_none());
    assert_eq!(state.user_name, "Ada");
}

#[test]
fn create_another_is_a_full_reset() {
    let mut session = customizing();
    session.set_user_name("Ada");
    session.generate().unwrap();
    session.create_another();
    assert_eq!(session.state(), &SessionState::default());
    assert!(session.chat().is_empty());
    assert!(session.source().is_none());
    assert_eq!(session.crop_rect(), CropRect::default());
}
