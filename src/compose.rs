//! Final DP composition.
//!
//! The preview is described as an SVG surface (background, subject photo,
//! frame decorations and name label, back to front) and captured with
//! resvg at [`CAPTURE_SCALE`].

use std::{
    fmt::Write as _,
    sync::{Arc, OnceLock},
};

use clap::ValueEnum;
use resvg::{tiny_skia, usvg};
use serde::{Deserialize, Serialize};
use tracing::{instrument, warn};

use crate::{
    error::{PipelineError, PipelineResult},
    image_utils::{EncodedImage, ImageMime},
};

/// Edge length of the composition surface in CSS-like units.
pub const SURFACE_SIZE: u32 = 540;
pub const CAPTURE_SCALE: f32 = 2.0;

const LONG_NAME_CHARS: usize = 20;
const VERY_LONG_NAME_CHARS: usize = 30;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BackgroundOption {
    #[default]
    Blue,
    Orange,
    Purple,
    White,
}

impl BackgroundOption {
    pub const ALL: [Self; 4] = [Self::Blue, Self::Orange, Self::Purple, Self::White];

    pub fn name(self) -> &'static str {
        match self {
            Self::Blue => "Blue",
            Self::Orange => "Orange",
            Self::Purple => "Purple",
            Self::White => "White",
        }
    }

    /// Gradient stops (top-left to bottom-right).
    pub fn colors(self) -> [&'static str; 2] {
        match self {
            Self::Blue => ["#4285F4", "#1A4FB8"],
            Self::Orange => ["#F9AB00", "#E8710A"],
            Self::Purple => ["#A142F4", "#5E2B97"],
            Self::White => ["#FFFDF4", "#FDE293"],
        }
    }

    fn ink(self) -> &'static str {
        match self {
            Self::White => "#202124",
            _ => "#FFFFFF",
        }
    }
}

/// How the name label is sized, chosen purely by character count.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NameBucket {
    Normal,
    Long,
    VeryLong,
}

impl NameBucket {
    pub fn for_name(name: &str) -> Self {
        let len = name.chars().count();
        if len > VERY_LONG_NAME_CHARS {
            Self::VeryLong
        } else if len > LONG_NAME_CHARS {
            Self::Long
        } else {
            Self::Normal
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Normal => "normal",
            Self::Long => "long",
            Self::VeryLong => "very-long",
        }
    }

    pub fn font_size(self) -> f32 {
        match self {
            Self::Normal => 34.0,
            Self::Long => 26.0,
            Self::VeryLong => 19.0,
        }
    }
}

/// Decorations drawn over the background.
#[derive(Debug, Clone, PartialEq)]
pub struct FrameAssets {
    pub message: Vec<String>,
    pub logo_text: String,
    /// Optional SVG fragment drawn in the logo corner instead of `logo_text`.
    pub logo_svg: Option<String>,
    pub show_quote: bool,
}

impl Default for FrameAssets {
    fn default() -> Self {
        Self {
            message: vec![
                "I can't wait to be at".to_string(),
                "DevFest Lagos 2025!".to_string(),
            ],
            logo_text: "DevFest Lagos".to_string(),
            logo_svg: None,
            show_quote: true,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Composition<'a> {
    pub background: BackgroundOption,
    pub subject: &'a EncodedImage,
    pub user_name: &'a str,
    pub frame: &'a FrameAssets,
}

fn escape_xml(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            c => out.push(c),
        }
    }
    out
}

impl Composition<'_> {
    /// Builds the SVG surface for this composition.
    pub fn surface(&self) -> PipelineResult<String> {
        let subject_href = match self.subject {
            EncodedImage::DataUri { .. } => self.subject.to_data_uri(),
            EncodedImage::RemoteRef(url) => {
                return Err(PipelineError::Capture(format!(
                    "subject {url} must be fetched before composing"
                )))
            }
        };
        let [from, to] = self.background.colors();
        let ink = self.background.ink();
        let size = SURFACE_SIZE;
        let bucket = NameBucket::for_name(self.user_name);

        let mut svg = String::new();
        // fmt::Write into a String cannot fail.
        let _ = write!(
            svg,
            r##"<svg xmlns="http://www.w3.org/2000/svg" xmlns:xlink="http://www.w3.org/1999/xlink" width="{size}" height="{size}" viewBox="0 0 {size} {size}">
<defs>
  <linearGradient id="bg" x1="0" y1="0" x2="1" y2="1">
    <stop offset="0" stop-color="{from}"/>
    <stop offset="1" stop-color="{to}"/>
  </linearGradient>
  <clipPath id="subject-clip"><rect x="135" y="120" width="270" height="270" rx="24"/></clipPath>
</defs>
<rect id="background" width="{size}" height="{size}" fill="url(#bg)"/>
<circle cx="40" cy="500" r="90" fill="{ink}" fill-opacity="0.08"/>
<circle cx="520" cy="60" r="70" fill="{ink}" fill-opacity="0.08"/>
<image id="subject" x="135" y="120" width="270" height="270" preserveAspectRatio="xMidYMid slice" clip-path="url(#subject-clip)" xlink:href="{subject_href}"/>
<rect x="132" y="117" width="276" height="276" rx="26" fill="none" stroke="{ink}" stroke-width="6"/>
"##
        );

        let _ = writeln!(svg, r#"<g id="frame-message" fill="{ink}" font-family="sans-serif" font-weight="bold" text-anchor="middle">"#);
        for (i, line) in self.frame.message.iter().enumerate() {
            let y = 56 + i * 30;
            let _ = writeln!(
                svg,
                r#"  <text x="{}" y="{y}" font-size="24">{}</text>"#,
                size / 2,
                escape_xml(line)
            );
        }
        let _ = writeln!(svg, "</g>");

        if self.frame.show_quote {
            let _ = writeln!(
                svg,
                r#"<text id="quote-mark" x="40" y="96" font-family="serif" font-size="96" fill="{ink}" fill-opacity="0.6">&#8220;</text>"#
            );
        }

        match &self.frame.logo_svg {
            Some(fragment) => {
                let _ = writeln!(svg, r#"<g id="logo" transform="translate(420 490)">{fragment}</g>"#);
            }
            None => {
                let _ = writeln!(
                    svg,
                    r#"<text id="logo" x="520" y="526" font-family="sans-serif" font-size="14" font-weight="bold" text-anchor="end" fill="{ink}">{}</text>"#,
                    escape_xml(&self.frame.logo_text)
                );
            }
        }

        let _ = write!(
            svg,
            r##"<g id="user-name-overlay" data-length="{bucket}">
  <rect x="90" y="408" width="360" height="60" rx="30" fill="#FFFFFF"/>
  <text id="user-name" x="270" y="{baseline}" font-family="sans-serif" font-weight="bold" font-size="{font_size}" text-anchor="middle" fill="#202124">{name}</text>
</g>
</svg>
"##,
            bucket = bucket.as_str(),
            baseline = 438.0 + bucket.font_size() * 0.35,
            font_size = bucket.font_size(),
            name = escape_xml(self.user_name.trim()),
        );
        Ok(svg)
    }

    /// Captures the surface into a PNG at [`CAPTURE_SCALE`].
    #[instrument(skip(self), fields(background = ?self.background, name_len = self.user_name.len()))]
    pub fn render(&self) -> PipelineResult<EncodedImage> {
        let svg = self.surface()?;
        let mut options = usvg::Options::default();
        options.fontdb = font_database();
        let tree = usvg::Tree::from_str(&svg, &options)
            .map_err(|e| PipelineError::Capture(e.to_string()))?;

        let edge = (SURFACE_SIZE as f32 * CAPTURE_SCALE).round() as u32;
        let mut pixmap = tiny_skia::Pixmap::new(edge, edge)
            .ok_or_else(|| PipelineError::Capture("failed to allocate capture surface".into()))?;
        resvg::render(
            &tree,
            tiny_skia::Transform::from_scale(CAPTURE_SCALE, CAPTURE_SCALE),
            &mut pixmap.as_mut(),
        );
        let png = pixmap
            .encode_png()
            .map_err(|e| PipelineError::Capture(e.to_string()))?;
        Ok(EncodedImage::new(ImageMime::Png, png))
    }
}

fn font_database() -> Arc<usvg::fontdb::Database> {
    static FONTS: OnceLock<Arc<usvg::fontdb::Database>> = OnceLock::new();
    FONTS
        .get_or_init(|| {
            let mut db = usvg::fontdb::Database::new();
            db.load_system_fonts();
            Arc::new(db)
        })
        .clone()
}

/// Renders the composition, or `None` when it could not be captured.
///
/// Callers should fall back to asking the user to save the preview by hand.
pub fn compose(
    background: BackgroundOption,
    subject: &EncodedImage,
    user_name: &str,
    frame: &FrameAssets,
) -> Option<EncodedImage> {
    let composition = Composition {
        background,
        subject,
        user_name,
        frame,
    };
    match composition.render() {
        Ok(image) => Some(image),
        Err(err) => {
            warn!(error = %err, "composition capture failed");
            None
        }
    }
}
