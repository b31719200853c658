use std::{fmt, io::Cursor, sync::Arc};

use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use eframe::egui;
use image::{codecs::jpeg::JpegEncoder, DynamicImage, ImageFormat};

use crate::error::{PipelineError, PipelineResult};

#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum OutputFormat {
    Jpg,
    Png,
}

impl OutputFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            OutputFormat::Jpg => "jpg",
            OutputFormat::Png => "png",
        }
    }

    pub fn mime(&self) -> ImageMime {
        match self {
            OutputFormat::Jpg => ImageMime::Jpeg,
            OutputFormat::Png => ImageMime::Png,
        }
    }
}

#[derive(Clone, PartialEq, Eq, Debug)]
pub enum ImageMime {
    Png,
    Jpeg,
    Webp,
    Heic,
    Other(String),
}

impl ImageMime {
    pub fn parse(value: &str) -> Self {
        let value = value.trim().to_ascii_lowercase();
        let essence = value.split(';').next().unwrap_or_default().trim();
        match essence {
            "image/png" => Self::Png,
            "image/jpeg" | "image/jpg" => Self::Jpeg,
            "image/webp" => Self::Webp,
            "image/heic" | "image/heif" => Self::Heic,
            other => Self::Other(other.to_string()),
        }
    }

    /// Identifies the format from the leading bytes.
    pub fn sniff(bytes: &[u8]) -> Option<Self> {
        if is_heic(bytes) {
            return Some(Self::Heic);
        }
        match image::guess_format(bytes).ok()? {
            ImageFormat::Png => Some(Self::Png),
            ImageFormat::Jpeg => Some(Self::Jpeg),
            ImageFormat::WebP => Some(Self::Webp),
            other => Some(Self::Other(other.to_mime_type().to_string())),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Png => "image/png",
            Self::Jpeg => "image/jpeg",
            Self::Webp => "image/webp",
            Self::Heic => "image/heic",
            Self::Other(mime) => mime,
        }
    }
}

impl fmt::Display for ImageMime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

fn is_heic(bytes: &[u8]) -> bool {
    if bytes.len() < 12 || &bytes[4..8] != b"ftyp" {
        return false;
    }
    matches!(
        &bytes[8..12],
        b"heic" | b"heix" | b"hevc" | b"hevx" | b"heim" | b"heis" | b"mif1" | b"msf1"
    )
}

/// An encoded raster image, resolved once when it enters the pipeline.
#[derive(Clone, PartialEq, Eq)]
pub enum EncodedImage {
    DataUri { mime: ImageMime, bytes: Arc<[u8]> },
    RemoteRef(String),
}

/// Shared, immutable reference to an image at one pipeline stage.
pub type ImageHandle = Arc<EncodedImage>;

impl fmt::Debug for EncodedImage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DataUri { mime, bytes } => f
                .debug_struct("DataUri")
                .field("mime", mime)
                .field("len", &bytes.len())
                .finish(),
            Self::RemoteRef(url) => f.debug_tuple("RemoteRef").field(url).finish(),
        }
    }
}

impl EncodedImage {
    pub fn new(mime: ImageMime, bytes: impl Into<Arc<[u8]>>) -> Self {
        Self::DataUri {
            mime,
            bytes: bytes.into(),
        }
    }

    /// Wraps raw file bytes, taking the MIME type from their signature.
    pub fn from_bytes(bytes: Vec<u8>) -> PipelineResult<Self> {
        let mime = ImageMime::sniff(&bytes)
            .ok_or_else(|| PipelineError::UnsupportedFormat("unrecognised file".into()))?;
        Ok(Self::new(mime, bytes))
    }

    /// Parses a `data:` URI or keeps an `http(s)` URL as a remote reference.
    pub fn parse(uri: &str) -> PipelineResult<Self> {
        let uri = uri.trim();
        if let Some(rest) = uri.strip_prefix("data:") {
            let (header, payload) = rest
                .split_once(',')
                .ok_or_else(|| PipelineError::Decode("data URI without payload".into()))?;
            let Some(mime) = header.strip_suffix(";base64") else {
                return Err(PipelineError::Decode("data URI is not base64 encoded".into()));
            };
            let bytes = BASE64
                .decode(payload)
                .map_err(|e| PipelineError::Decode(e.to_string()))?;
            let mime = if mime.is_empty() {
                ImageMime::sniff(&bytes).unwrap_or(ImageMime::Jpeg)
            } else {
                ImageMime::parse(mime)
            };
            return Ok(Self::new(mime, bytes));
        }
        if uri.starts_with("http://") || uri.starts_with("https://") {
            return Ok(Self::RemoteRef(uri.to_string()));
        }
        Err(PipelineError::Decode(format!(
            "not a data URI or URL: {}",
            uri.chars().take(32).collect::<String>()
        )))
    }

    pub fn mime(&self) -> Option<&ImageMime> {
        match self {
            Self::DataUri { mime, .. } => Some(mime),
            Self::RemoteRef(_) => None,
        }
    }

    pub fn bytes(&self) -> Option<&[u8]> {
        match self {
            Self::DataUri { bytes, .. } => Some(&bytes[..]),
            Self::RemoteRef(_) => None,
        }
    }

    pub fn to_data_uri(&self) -> String {
        match self {
            Self::DataUri { mime, bytes } => {
                format!("data:{mime};base64,{}", BASE64.encode(bytes))
            }
            Self::RemoteRef(url) => url.clone(),
        }
    }

    pub fn decode(&self) -> PipelineResult<DynamicImage> {
        match self {
            Self::DataUri { bytes, .. } => Ok(image::load_from_memory(bytes)?),
            Self::RemoteRef(url) => Err(PipelineError::Decode(format!(
                "{url} has not been fetched"
            ))),
        }
    }
}

pub fn encode(image: &DynamicImage, format: OutputFormat, quality: u8) -> PipelineResult<EncodedImage> {
    let mut buf = Vec::new();
    match format {
        OutputFormat::Jpg => {
            // JPEG has no alpha channel.
            let rgb = DynamicImage::ImageRgb8(image.to_rgb8());
            let encoder = JpegEncoder::new_with_quality(&mut buf, quality);
            rgb.write_with_encoder(encoder)?;
        }
        OutputFormat::Png => {
            image.write_to(&mut Cursor::new(&mut buf), ImageFormat::Png)?;
        }
    }
    Ok(EncodedImage::new(format.mime(), buf))
}

pub fn to_color_image(img: &DynamicImage) -> egui::ColorImage {
    let rgba = img.to_rgba8();
    let size = [rgba.width() as usize, rgba.height() as usize];
    let pixels = rgba.into_raw();
    egui::ColorImage::from_rgba_unmultiplied(size, &pixels)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn heic_brand_is_detected() {
        let mut header = vec![0, 0, 0, 24];
        header.extend_from_slice(b"ftypheic");
        header.extend_from_slice(&[0; 16]);
        assert_eq!(ImageMime::sniff(&header), Some(ImageMime::Heic));
    }

    #[test]
    fn mime_parse_ignores_parameters_and_case() {
        assert_eq!(ImageMime::parse("Image/JPEG; charset=binary"), ImageMime::Jpeg);
        assert_eq!(ImageMime::parse("image/gif"), ImageMime::Other("image/gif".into()));
    }
}
