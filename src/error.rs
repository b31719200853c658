use thiserror::Error;

pub type PipelineResult<T> = Result<T, PipelineError>;

/// Failures raised while moving a photo through the pipeline.
///
/// None of these are fatal: the session keeps its previous state and shows
/// [`PipelineError::user_message`] to the user.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum PipelineError {
    /// Required user input (name, prompt, image) is missing.
    #[error("{0}")]
    Validation(String),

    #[error("unsupported image format: {0}")]
    UnsupportedFormat(String),

    #[error("failed to decode image: {0}")]
    Decode(String),

    #[error("failed to encode image: {0}")]
    Encode(String),

    /// The restyle request failed at the network or status layer.
    #[error("restyle request failed: {reason}")]
    Transport { reason: String, status: Option<u16> },

    /// The restyle service answered with text instead of an image.
    #[error("restyle service replied: {0}")]
    ServiceDeclined(String),

    #[error("failed to capture composition: {0}")]
    Capture(String),

    #[error("i/o error: {0}")]
    Io(String),
}

impl PipelineError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn user_message(&self) -> String {
        match self {
            Self::Validation(msg) => msg.clone(),
            Self::UnsupportedFormat(detail) => {
                format!("Please upload a PNG or JPG photo ({detail}).")
            }
            Self::Decode(_) => "We couldn't read that image. Please try another photo.".into(),
            Self::Encode(_) => "Something went wrong while preparing your image.".into(),
            Self::Transport {
                status: Some(code), ..
            } => format!("API request failed with status code: {code}."),
            Self::Transport { status: None, .. } => {
                "Failed to apply styling. Please check your connection and try again.".into()
            }
            Self::ServiceDeclined(text) => format!("API message: {text}"),
            Self::Capture(_) => {
                "We couldn't generate the image automatically. Please take a screenshot to save your DP."
                    .into()
            }
            Self::Io(msg) => format!("Could not save the file: {msg}"),
        }
    }
}

impl From<std::io::Error> for PipelineError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}

impl From<image::ImageError> for PipelineError {
    fn from(err: image::ImageError) -> Self {
        match err {
            image::ImageError::Unsupported(inner) => Self::UnsupportedFormat(inner.to_string()),
            image::ImageError::Encoding(inner) => Self::Encode(inner.to_string()),
            other => Self::Decode(other.to_string()),
        }
    }
}
