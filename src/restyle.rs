//! Client for the generative restyle service.
//!
//! The service is reached through a server-side proxy that holds the access
//! credential; this client only knows the proxy URL. Every call is a single
//! attempt and never panics: whatever goes wrong comes back as
//! [`RestyleResult::Failure`].

use std::time::Duration;

use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use reqwest::blocking::Client;
use reqwest::header::CONTENT_TYPE;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument, warn};

use crate::{
    error::{PipelineError, PipelineResult},
    image_utils::{EncodedImage, ImageMime},
};

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(120);

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RestyleResult {
    NewImage { bytes: Vec<u8>, mime: ImageMime },
    /// The service answered but sent text instead of an image.
    Explanation(String),
    Failure { reason: String, status: Option<u16> },
}

impl RestyleResult {
    fn failure(reason: impl Into<String>) -> Self {
        Self::Failure {
            reason: reason.into(),
            status: None,
        }
    }

    /// The returned image, which must decode in full.
    pub fn into_image(self) -> PipelineResult<EncodedImage> {
        match self {
            Self::NewImage { bytes, mime } => {
                image::load_from_memory(&bytes)?;
                Ok(EncodedImage::new(mime, bytes))
            }
            Self::Explanation(text) => Err(PipelineError::ServiceDeclined(text)),
            Self::Failure { reason, status } => Err(PipelineError::Transport { reason, status }),
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest<'a> {
    contents: Vec<RequestContent<'a>>,
    generation_config: GenerationConfig,
}

#[derive(Serialize)]
struct RequestContent<'a> {
    parts: Vec<RequestPart<'a>>,
}

#[derive(Serialize)]
#[serde(untagged)]
enum RequestPart<'a> {
    Image {
        #[serde(rename = "inlineData")]
        inline_data: OutgoingInlineData<'a>,
    },
    Text {
        text: &'a str,
    },
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct OutgoingInlineData<'a> {
    mime_type: &'a str,
    data: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    response_modalities: [&'static str; 2],
}

#[derive(Deserialize, Default)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Deserialize)]
struct ResponsePart {
    #[serde(rename = "inlineData", alias = "inline_data")]
    inline_data: Option<IncomingInlineData>,
    text: Option<String>,
}

#[derive(Deserialize)]
struct IncomingInlineData {
    #[serde(rename = "mimeType", alias = "mime_type")]
    mime_type: Option<String>,
    data: Option<String>,
}

/// Builds the JSON body sent to the service.
pub fn request_body(mime: &ImageMime, base64_image: String, instruction: &str) -> serde_json::Value {
    let request = GenerateRequest {
        contents: vec![RequestContent {
            parts: vec![
                RequestPart::Image {
                    inline_data: OutgoingInlineData {
                        mime_type: mime.as_str(),
                        data: base64_image,
                    },
                },
                RequestPart::Text { text: instruction },
            ],
        }],
        generation_config: GenerationConfig {
            response_modalities: ["IMAGE", "TEXT"],
        },
    };
    serde_json::to_value(request).unwrap_or_default()
}

/// Turns an HTTP status and body into a result.
///
/// Returned image data must carry a PNG, JPEG or WebP signature; the MIME
/// type is taken from the bytes, not from the declared `mimeType`.
pub fn classify_response(status: u16, body: &str) -> RestyleResult {
    if !(200..300).contains(&status) {
        return RestyleResult::Failure {
            reason: format!("service returned HTTP {status}"),
            status: Some(status),
        };
    }
    let parsed: GenerateResponse = match serde_json::from_str(body) {
        Ok(parsed) => parsed,
        Err(err) => return RestyleResult::failure(format!("malformed response: {err}")),
    };
    let parts = parsed
        .candidates
        .into_iter()
        .next()
        .and_then(|c| c.content)
        .map(|c| c.parts)
        .unwrap_or_default();
    if parts.is_empty() {
        return RestyleResult::failure(
            "the response was successful but the content part was empty",
        );
    }

    if let Some(inline) = parts.iter().find_map(|p| p.inline_data.as_ref()) {
        let Some(data) = inline.data.as_deref().filter(|d| !d.is_empty()) else {
            return RestyleResult::failure("the response carried an image object but no image data");
        };
        let bytes = match BASE64.decode(data) {
            Ok(bytes) => bytes,
            Err(err) => return RestyleResult::failure(format!("image data is not base64: {err}")),
        };
        return match ImageMime::sniff(&bytes) {
            Some(mime @ (ImageMime::Png | ImageMime::Jpeg | ImageMime::Webp)) => {
                if let Some(declared) = inline.mime_type.as_deref().map(ImageMime::parse) {
                    if declared != mime {
                        debug!(%declared, %mime, "declared image type differs from its data");
                    }
                }
                RestyleResult::NewImage { bytes, mime }
            }
            _ => RestyleResult::failure("image data is not a decodable image"),
        };
    }

    let text = parts
        .iter()
        .filter_map(|p| p.text.as_deref())
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .collect::<Vec<_>>()
        .join("\n");
    if text.is_empty() {
        RestyleResult::failure("the response held neither an image nor a message")
    } else {
        RestyleResult::Explanation(text)
    }
}

pub struct RestyleClient {
    http: Client,
    endpoint: String,
}

impl RestyleClient {
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> PipelineResult<Self> {
        let http = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("dpmaker/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| PipelineError::Transport {
                reason: e.to_string(),
                status: None,
            })?;
        Ok(Self {
            http,
            endpoint: endpoint.into(),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    #[instrument(skip(self, image, instruction), fields(instruction_len = instruction.len()))]
    pub fn restyle(&self, image: &EncodedImage, instruction: &str) -> RestyleResult {
        let (mime, payload) = match self.payload(image) {
            Ok(payload) => payload,
            Err(result) => return result,
        };
        debug!(%mime, payload_len = payload.len(), "sending restyle request");
        let body = request_body(&mime, payload, instruction);

        let response = match self.http.post(&self.endpoint).json(&body).send() {
            Ok(response) => response,
            Err(err) => {
                warn!(error = %err, "restyle request failed");
                return RestyleResult::failure(err.to_string());
            }
        };
        let status = response.status().as_u16();
        let text = match response.text() {
            Ok(text) => text,
            Err(err) => return RestyleResult::failure(format!("failed to read response: {err}")),
        };
        let result = classify_response(status, &text);
        if let RestyleResult::Failure { reason, .. } = &result {
            warn!(status, %reason, "restyle service failure");
        }
        result
    }

    /// MIME type and base64 data of the image, fetching remote references.
    fn payload(&self, image: &EncodedImage) -> Result<(ImageMime, String), RestyleResult> {
        match image {
            EncodedImage::DataUri { mime, bytes } => Ok((mime.clone(), BASE64.encode(bytes))),
            EncodedImage::RemoteRef(url) => {
                let fetched = fetch_remote(&self.http, url)
                    .map_err(|e| RestyleResult::failure(e.to_string()))?;
                self.payload(&fetched)
            }
        }
    }
}

/// Downloads a remote image into memory.
///
/// The MIME type comes from `Content-Type` when it names an image format,
/// otherwise from the bytes themselves, otherwise JPEG is assumed.
pub fn fetch_remote(http: &Client, url: &str) -> PipelineResult<EncodedImage> {
    let transport = |e: reqwest::Error| PipelineError::Transport {
        reason: format!("failed to fetch {url}: {e}"),
        status: e.status().map(|s| s.as_u16()),
    };
    let response = http
        .get(url)
        .send()
        .and_then(|r| r.error_for_status())
        .map_err(transport)?;
    let declared = response
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(ImageMime::parse);
    let bytes = response.bytes().map_err(transport)?;
    let mime = declared
        .filter(|m| !matches!(m, ImageMime::Other(_)))
        .or_else(|| ImageMime::sniff(&bytes))
        .unwrap_or(ImageMime::Jpeg);
    Ok(EncodedImage::new(mime, bytes.to_vec()))
}
