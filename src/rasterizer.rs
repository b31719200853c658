//! Cuts the confirmed crop out of the decoded upload.
//!
//! The crop region arrives in displayed-pixel units (what the user saw on
//! screen). It is mapped to natural pixels with the per-axis ratio
//! `natural / displayed`, and the output surface is sized
//! `natural region × pixel density` so HiDPI screens keep their detail.

use fast_image_resize::images::Image;
use fast_image_resize::{FilterType, PixelType, ResizeAlg, ResizeOptions, Resizer};
use image::{DynamicImage, RgbaImage};
use tracing::instrument;

use crate::{
    error::{PipelineError, PipelineResult},
    geometry::{PixelRegion, Size},
    image_utils::{encode, EncodedImage, OutputFormat},
};

pub const CROP_JPEG_QUALITY: u8 = 95;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CropRequest {
    pub displayed: Size,
    pub natural: Size,
    pub region: PixelRegion,
    pub pixel_density: f32,
}

impl CropRequest {
    /// The crop region expressed in natural pixels, clipped to the image.
    pub fn natural_region(&self) -> PixelRegion {
        let sx = self.natural.width / self.displayed.width;
        let sy = self.natural.height / self.displayed.height;
        let x = (self.region.x * sx).clamp(0.0, self.natural.width);
        let y = (self.region.y * sy).clamp(0.0, self.natural.height);
        PixelRegion {
            x,
            y,
            width: (self.region.width * sx).min(self.natural.width - x),
            height: (self.region.height * sy).min(self.natural.height - y),
        }
    }

    pub fn output_size(&self) -> (u32, u32) {
        let region = self.natural_region();
        let density = self.pixel_density.max(f32::MIN_POSITIVE);
        (
            (region.width * density).round().max(1.0) as u32,
            (region.height * density).round().max(1.0) as u32,
        )
    }

    fn validate(&self, image: &DynamicImage) -> PipelineResult<()> {
        if self.displayed.is_empty() {
            return Err(PipelineError::Decode("image is not displayed yet".into()));
        }
        if !(self.pixel_density > 0.0) {
            return Err(PipelineError::Decode(format!(
                "invalid pixel density {}",
                self.pixel_density
            )));
        }
        let (w, h) = (image.width() as f32, image.height() as f32);
        if w != self.natural.width || h != self.natural.height {
            return Err(PipelineError::Decode(format!(
                "image is {w}x{h} but {}x{} was expected; decode has not completed",
                self.natural.width, self.natural.height
            )));
        }
        let region = self.natural_region();
        if region.width < 1.0 || region.height < 1.0 {
            return Err(PipelineError::Decode("crop region is empty".into()));
        }
        Ok(())
    }
}

/// Crops and rescales into a fresh RGBA surface.
pub fn crop_pixels(image: &DynamicImage, request: &CropRequest) -> PipelineResult<DynamicImage> {
    request.validate(image)?;
    let region = request.natural_region();
    let (out_w, out_h) = request.output_size();

    let rgba = image.to_rgba8();
    let src = Image::from_vec_u8(rgba.width(), rgba.height(), rgba.into_raw(), PixelType::U8x4)
        .map_err(|e| PipelineError::Decode(e.to_string()))?;
    let mut dst = Image::new(out_w, out_h, PixelType::U8x4);

    let options = ResizeOptions::new()
        .resize_alg(ResizeAlg::Convolution(FilterType::Lanczos3))
        .crop(
            region.x as f64,
            region.y as f64,
            region.width as f64,
            region.height as f64,
        );
    Resizer::new()
        .resize(&src, &mut dst, &options)
        .map_err(|e| PipelineError::Decode(e.to_string()))?;

    let surface = RgbaImage::from_raw(out_w, out_h, dst.into_vec())
        .ok_or_else(|| PipelineError::Decode("output surface has the wrong size".into()))?;
    Ok(DynamicImage::ImageRgba8(surface))
}

/// Crops the decoded image and encodes the result as a high quality JPEG.
#[instrument(skip(image), fields(natural = ?request.natural))]
pub fn crop(image: &DynamicImage, request: &CropRequest) -> PipelineResult<EncodedImage> {
    let surface = crop_pixels(image, request)?;
    tracing::debug!(
        width = surface.width(),
        height = surface.height(),
        "crop rasterized"
    );
    encode(&surface, OutputFormat::Jpg, CROP_JPEG_QUALITY)
}
