use std::{
    io::Cursor,
    path::PathBuf,
    sync::{
        mpsc::{self, Receiver, Sender},
        Arc,
    },
    thread,
    time::Instant,
};

use eframe::egui;
use fast_image_resize::images::Image;
use fast_image_resize::{PixelType, ResizeOptions, Resizer};
use image::DynamicImage;
use reqwest::blocking::Client;
use tracing::{debug, warn};
use zune_jpeg::JpegDecoder;

use crate::{
    error::{PipelineError, PipelineResult},
    image_utils::{to_color_image, EncodedImage, ImageMime},
    restyle::fetch_remote,
    session::{check_upload_format, DecodedUpload},
};

/// Largest preview texture handed to the GPU.
pub const PREVIEW_MAX: (u32, u32) = (3840, 2160);

#[derive(Debug)]
pub enum UploadSource {
    Path(PathBuf),
    Bytes { name: String, bytes: Vec<u8> },
    /// A `data:` URI or an `http(s)` URL.
    Uri(String),
}

impl UploadSource {
    /// Typed input: URIs are recognised by scheme, anything else is a path.
    pub fn from_input(input: &str) -> Self {
        let input = input.trim();
        if is_uri(input) {
            Self::Uri(input.to_string())
        } else {
            Self::Path(PathBuf::from(input))
        }
    }

    pub fn label(&self) -> String {
        match self {
            Self::Path(path) => path.display().to_string(),
            Self::Bytes { name, .. } => name.clone(),
            Self::Uri(uri) if uri.starts_with("data:") => "pasted image".to_string(),
            Self::Uri(uri) => uri.clone(),
        }
    }
}

fn is_uri(input: &str) -> bool {
    ["data:", "http://", "https://"]
        .iter()
        .any(|scheme| input.starts_with(*scheme))
}

pub struct LoadedPhoto {
    pub label: String,
    pub upload: DecodedUpload,
    pub preview: egui::ColorImage,
}

pub enum LoadOutcome {
    Loaded(LoadedPhoto),
    Failed { label: String, error: PipelineError },
}

pub struct Loader {
    result_rx: Receiver<LoadOutcome>,
    source_tx: Sender<UploadSource>,
    pub loading: Option<String>,
}

impl Default for Loader {
    fn default() -> Self {
        Self::new()
    }
}

impl Loader {
    pub fn new() -> Self {
        let (result_tx, result_rx) = mpsc::channel();
        let (source_tx, source_rx) = mpsc::channel::<UploadSource>();

        thread::spawn(move || {
            let http = Client::builder().build().ok();
            while let Ok(source) = source_rx.recv() {
                let label = source.label();
                let outcome = match load(source, http.as_ref()) {
                    Ok((upload, preview)) => LoadOutcome::Loaded(LoadedPhoto {
                        label,
                        upload,
                        preview,
                    }),
                    Err(error) => {
                        warn!(%label, %error, "upload rejected");
                        LoadOutcome::Failed { label, error }
                    }
                };
                if result_tx.send(outcome).is_err() {
                    break;
                }
            }
        });

        Self {
            result_rx,
            source_tx,
            loading: None,
        }
    }

    pub fn load(&mut self, source: UploadSource) {
        self.loading = Some(source.label());
        let _ = self.source_tx.send(source);
    }

    /// Most recent finished load, if any.
    pub fn poll(&mut self) -> Option<LoadOutcome> {
        let mut latest = None;
        while let Ok(outcome) = self.result_rx.try_recv() {
            latest = Some(outcome);
        }
        if latest.is_some() {
            self.loading = None;
        }
        latest
    }
}

fn load(
    source: UploadSource,
    http: Option<&Client>,
) -> PipelineResult<(DecodedUpload, egui::ColorImage)> {
    let start = Instant::now();
    let bytes = match source {
        UploadSource::Path(path) => std::fs::read(&path)?,
        UploadSource::Bytes { bytes, .. } => bytes,
        UploadSource::Uri(uri) => resolve_uri(&uri, http)?,
    };
    let encoded = EncodedImage::from_bytes(bytes)?;
    check_upload_format(&encoded)?;

    let decode_start = Instant::now();
    let image = decode(&encoded)?;
    let decode_duration = decode_start.elapsed();

    let preview = to_color_image(&downscale_for_preview(&image));
    debug!(
        width = image.width(),
        height = image.height(),
        ?decode_duration,
        total = ?start.elapsed(),
        "photo decoded"
    );
    Ok((
        DecodedUpload {
            encoded: Arc::new(encoded),
            image: Arc::new(image),
        },
        preview,
    ))
}

/// Raw bytes behind a URI; the format is sniffed afterwards like any upload.
fn resolve_uri(uri: &str, http: Option<&Client>) -> PipelineResult<Vec<u8>> {
    let encoded = match EncodedImage::parse(uri)? {
        EncodedImage::RemoteRef(url) => {
            let http = http.ok_or_else(|| PipelineError::Transport {
                reason: "HTTP client unavailable".into(),
                status: None,
            })?;
            fetch_remote(http, &url)?
        }
        local => local,
    };
    encoded
        .bytes()
        .map(<[u8]>::to_vec)
        .ok_or_else(|| PipelineError::Decode("link did not resolve to image data".into()))
}

fn decode(encoded: &EncodedImage) -> PipelineResult<DynamicImage> {
    if let (Some(ImageMime::Jpeg), Some(bytes)) = (encoded.mime(), encoded.bytes()) {
        if let Some(image) = decode_jpeg(bytes) {
            return Ok(image);
        }
    }
    encoded.decode()
}

/// zune-jpeg fast path; `None` means fall back to the generic decoder.
fn decode_jpeg(bytes: &[u8]) -> Option<DynamicImage> {
    let mut decoder = JpegDecoder::new(Cursor::new(bytes));
    let pixels = decoder.decode().ok()?;
    let info = decoder.info()?;
    image::RgbImage::from_raw(info.width as u32, info.height as u32, pixels)
        .map(DynamicImage::ImageRgb8)
}

fn downscale_for_preview(image: &DynamicImage) -> DynamicImage {
    let (max_w, max_h) = PREVIEW_MAX;
    if image.width() <= max_w && image.height() <= max_h {
        return image.clone();
    }
    let ratio = image.width() as f64 / image.height() as f64;
    let (new_w, new_h) = if ratio > max_w as f64 / max_h as f64 {
        (max_w, ((max_w as f64 / ratio) as u32).max(1))
    } else {
        (((max_h as f64 * ratio) as u32).max(1), max_h)
    };

    let rgba = image.to_rgba8();
    let Ok(src) = Image::from_vec_u8(rgba.width(), rgba.height(), rgba.into_raw(), PixelType::U8x4)
    else {
        return image.thumbnail(new_w, new_h);
    };
    let mut dst = Image::new(new_w, new_h, PixelType::U8x4);
    if Resizer::new()
        .resize(&src, &mut dst, &ResizeOptions::default())
        .is_err()
    {
        return image.thumbnail(new_w, new_h);
    }
    image::RgbaImage::from_raw(new_w, new_h, dst.into_vec())
        .map(DynamicImage::ImageRgba8)
        .unwrap_or_else(|| image.thumbnail(new_w, new_h))
}
