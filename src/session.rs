//! The Upload → Crop → Customize → Results state machine.
//!
//! [`SessionController`] is the only owner of the pipeline images. Views get
//! read-only access through [`SessionController::state`]; every mutation goes
//! through a method here and either succeeds or leaves the state untouched.

use std::sync::Arc;

use image::DynamicImage;
use tracing::{info, warn};

use crate::{
    error::{PipelineError, PipelineResult},
    geometry::{CropRect, ResizeMode, Size},
    gesture::DragController,
    image_utils::{EncodedImage, ImageHandle, ImageMime},
    rasterizer::{self, CropRequest},
    restyle::RestyleResult,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Stage {
    #[default]
    Upload,
    Crop,
    Customize,
    Results,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatMessage {
    pub role: Role,
    pub text: String,
}

impl ChatMessage {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            text: text.into(),
        }
    }

    pub fn assistant(text: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            text: text.into(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SessionState {
    pub stage: Stage,
    pub uploaded_image: Option<ImageHandle>,
    pub cropped_image: Option<ImageHandle>,
    pub final_image: Option<ImageHandle>,
    pub user_name: String,
}

/// An accepted upload, decoded and ready for cropping.
#[derive(Debug, Clone)]
pub struct DecodedUpload {
    pub encoded: ImageHandle,
    pub image: Arc<DynamicImage>,
}

impl DecodedUpload {
    pub fn natural_size(&self) -> Size {
        Size::new(self.image.width() as f32, self.image.height() as f32)
    }
}

/// Accepts PNG and JPEG uploads only.
///
/// HEIC is recognised but this build has no decoder for it.
pub fn check_upload_format(encoded: &EncodedImage) -> PipelineResult<()> {
    match encoded.mime() {
        Some(ImageMime::Png | ImageMime::Jpeg) => Ok(()),
        Some(ImageMime::Heic) => Err(PipelineError::UnsupportedFormat(
            "HEIC photos are not supported in this build, please convert to JPG".into(),
        )),
        Some(other) => Err(PipelineError::UnsupportedFormat(other.to_string())),
        None => Err(PipelineError::UnsupportedFormat("remote image".into())),
    }
}

/// Checks the format of an uploaded file and decodes it.
pub fn decode_upload(bytes: Vec<u8>) -> PipelineResult<DecodedUpload> {
    let encoded = EncodedImage::from_bytes(bytes)?;
    check_upload_format(&encoded)?;
    let image = encoded.decode()?;
    Ok(DecodedUpload {
        encoded: Arc::new(encoded),
        image: Arc::new(image),
    })
}

/// A restyle request handed to whoever performs the network call.
#[derive(Debug, Clone)]
pub struct RestyleJob {
    pub ticket: u64,
    pub image: ImageHandle,
    pub instruction: String,
}

#[derive(Debug, Default)]
pub struct SessionController {
    state: SessionState,
    source: Option<DecodedUpload>,
    crop: DragController,
    chat: Vec<ChatMessage>,
    in_flight: Option<u64>,
    next_ticket: u64,
}

impl SessionController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn stage(&self) -> Stage {
        self.state.stage
    }

    pub fn chat(&self) -> &[ChatMessage] {
        &self.chat
    }

    pub fn crop_rect(&self) -> CropRect {
        self.crop.rect()
    }

    pub fn drag(&self) -> &DragController {
        &self.crop
    }

    pub fn drag_mut(&mut self) -> &mut DragController {
        &mut self.crop
    }

    pub fn source(&self) -> Option<&DecodedUpload> {
        self.source.as_ref()
    }

    pub fn is_restyling(&self) -> bool {
        self.in_flight.is_some()
    }

    /// The image currently considered "current" in Customize and Results.
    pub fn working_image(&self) -> Option<&ImageHandle> {
        self.state
            .final_image
            .as_ref()
            .or(self.state.cropped_image.as_ref())
    }

    pub fn set_user_name(&mut self, name: impl Into<String>) {
        self.state.user_name = name.into();
    }

    /// Upload → Crop from raw file bytes.
    pub fn upload(&mut self, bytes: Vec<u8>) -> PipelineResult<()> {
        self.expect_stage(Stage::Upload)?;
        let upload = decode_upload(bytes).inspect_err(|err| {
            warn!(error = %err, "upload rejected");
        })?;
        self.accept_upload(upload)
    }

    /// Upload → Crop for an upload decoded elsewhere (e.g. a loader thread).
    pub fn accept_upload(&mut self, upload: DecodedUpload) -> PipelineResult<()> {
        self.expect_stage(Stage::Upload)?;
        let size = upload.natural_size();
        info!(width = size.width, height = size.height, "photo uploaded");
        self.state.uploaded_image = Some(upload.encoded.clone());
        self.source = Some(upload);
        self.crop = DragController::new(CropRect::default(), ResizeMode::Square);
        self.state.stage = Stage::Crop;
        Ok(())
    }

    /// Crop → Customize, rasterizing the current crop rectangle.
    ///
    /// `displayed` is the on-screen size of the photo the rectangle was drawn
    /// over.
    pub fn confirm_crop(&mut self, displayed: Size, pixel_density: f32) -> PipelineResult<()> {
        self.expect_stage(Stage::Crop)?;
        let source = self
            .source
            .as_ref()
            .ok_or_else(|| PipelineError::validation("Please upload an image first"))?;
        let request = CropRequest {
            displayed,
            natural: source.natural_size(),
            region: self.crop.rect().to_pixels(displayed),
            pixel_density,
        };
        let cropped = rasterizer::crop(&source.image, &request).inspect_err(|err| {
            warn!(error = %err, "crop failed");
        })?;
        let cropped = Arc::new(cropped);
        self.state.cropped_image = Some(cropped.clone());
        self.state.final_image = Some(cropped);
        self.chat.clear();
        self.state.stage = Stage::Customize;
        info!("crop confirmed");
        Ok(())
    }

    /// Starts a restyle of the working image.
    ///
    /// Only one request may be in flight; the returned job must be answered
    /// with [`SessionController::finish_restyle`].
    pub fn begin_restyle(&mut self, instruction: &str) -> PipelineResult<RestyleJob> {
        self.expect_stage(Stage::Customize)?;
        let instruction = instruction.trim();
        if instruction.is_empty() {
            return Err(PipelineError::validation("Please enter a prompt for styling"));
        }
        if self.in_flight.is_some() {
            return Err(PipelineError::validation(
                "Please wait for the current styling request to finish",
            ));
        }
        let image = self
            .working_image()
            .cloned()
            .ok_or_else(|| PipelineError::validation("Please upload and crop an image first"))?;

        self.next_ticket += 1;
        let ticket = self.next_ticket;
        self.in_flight = Some(ticket);
        self.chat.push(ChatMessage::user(instruction));
        Ok(RestyleJob {
            ticket,
            image,
            instruction: instruction.to_string(),
        })
    }

    /// Applies the outcome of a restyle job.
    ///
    /// Results for a job that is no longer current (the session was reset
    /// meanwhile) are dropped. On failure the working image is unchanged and
    /// the error is also recorded as an assistant message.
    pub fn finish_restyle(&mut self, ticket: u64, result: RestyleResult) -> PipelineResult<()> {
        if self.in_flight != Some(ticket) {
            warn!(ticket, "dropping stale restyle result");
            return Ok(());
        }
        self.in_flight = None;
        match result.into_image() {
            Ok(image) => {
                info!("restyle applied");
                self.state.final_image = Some(Arc::new(image));
                self.chat
                    .push(ChatMessage::assistant("Here is your restyled photo."));
                Ok(())
            }
            Err(err) => {
                warn!(error = %err, "restyle did not produce an image");
                self.chat.push(ChatMessage::assistant(err.user_message()));
                Err(err)
            }
        }
    }

    /// Restores the cropped image and clears the chat.
    ///
    /// A restyle still in flight is abandoned; its result will be dropped.
    pub fn reset_working_image(&mut self) {
        if self.state.stage != Stage::Customize {
            return;
        }
        if let Some(ticket) = self.in_flight.take() {
            info!(ticket, "abandoning restyle on reset");
        }
        self.state.final_image = self.state.cropped_image.clone();
        self.chat.clear();
    }

    /// Customize → Results.
    pub fn generate(&mut self) -> PipelineResult<()> {
        self.expect_stage(Stage::Customize)?;
        if self.state.user_name.trim().is_empty() {
            return Err(PipelineError::validation(
                "Please enter your name before generating your DP",
            ));
        }
        if self.working_image().is_none() {
            return Err(PipelineError::validation(
                "Please upload and crop an image first",
            ));
        }
        if self.state.final_image.is_none() {
            self.state.final_image = self.state.cropped_image.clone();
        }
        self.state.stage = Stage::Results;
        info!("DP generated");
        Ok(())
    }

    /// Back to Upload with every image dropped; the name is kept.
    pub fn replace_photo(&mut self) {
        let user_name = std::mem::take(&mut self.state.user_name);
        self.reset();
        self.state.user_name = user_name;
    }

    /// Back to a blank session.
    pub fn create_another(&mut self) {
        self.reset();
    }

    fn reset(&mut self) {
        info!(from = ?self.state.stage, "session reset");
        self.state = SessionState::default();
        self.source = None;
        self.crop = DragController::default();
        self.chat.clear();
        self.in_flight = None;
    }

    fn expect_stage(&self, stage: Stage) -> PipelineResult<()> {
        if self.state.stage == stage {
            Ok(())
        } else {
            Err(PipelineError::Validation(format!(
                "not available while in the {:?} step",
                self.state.stage
            )))
        }
    }
}
