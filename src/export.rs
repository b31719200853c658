use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use reqwest::Url;
use tracing::info;

use crate::{
    fs_utils::{sanitize_file_stem, write_unique},
    image_utils::EncodedImage,
};

pub const INSTAGRAM_STEPS: &str = "1. Open Instagram\n2. Create a new post\n3. Select the downloaded image\n4. Add the hashtag #DevFestLagos2025";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SharePlatform {
    Twitter,
    LinkedIn,
    Instagram,
}

impl SharePlatform {
    pub const ALL: [Self; 3] = [Self::Instagram, Self::LinkedIn, Self::Twitter];

    pub fn label(self) -> &'static str {
        match self {
            Self::Twitter => "X / Twitter",
            Self::LinkedIn => "LinkedIn",
            Self::Instagram => "Instagram",
        }
    }
}

/// What the host should do to share a saved DP on one platform.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShareAction {
    OpenUrl(String),
    /// Save the image first, then open the platform and show the steps.
    SaveThenOpen { url: String, instructions: String },
}

impl ShareAction {
    pub fn url(&self) -> &str {
        match self {
            Self::OpenUrl(url) | Self::SaveThenOpen { url, .. } => url,
        }
    }
}

/// `{name}-{tag}.png`, or `{name}-{tag}-DP.png` for the DP variant.
pub fn export_file_name(user_name: &str, tag: &str, dp_suffix: bool) -> String {
    let stem = sanitize_file_stem(user_name);
    if dp_suffix {
        format!("{stem}-{tag}-DP.png")
    } else {
        format!("{stem}-{tag}.png")
    }
}

pub fn share_file_name(user_name: &str, tag: &str) -> String {
    format!("{tag}-{}.png", sanitize_file_stem(user_name))
}

pub fn share_action(platform: SharePlatform, message: &str, link: &str) -> Result<ShareAction> {
    let action = match platform {
        SharePlatform::Twitter => {
            let url = Url::parse_with_params(
                "https://twitter.com/intent/tweet",
                &[("text", message), ("url", link)],
            )?;
            ShareAction::OpenUrl(url.into())
        }
        SharePlatform::LinkedIn => {
            let url = Url::parse_with_params(
                "https://www.linkedin.com/sharing/share-offsite/",
                &[("url", link)],
            )?;
            ShareAction::OpenUrl(url.into())
        }
        SharePlatform::Instagram => ShareAction::SaveThenOpen {
            url: "https://www.instagram.com".to_string(),
            instructions: INSTAGRAM_STEPS.to_string(),
        },
    };
    Ok(action)
}

/// Writes the composed DP into `dir` without overwriting existing files.
pub fn save_image(image: &EncodedImage, dir: &Path, file_name: &str) -> Result<PathBuf> {
    let bytes = image
        .bytes()
        .ok_or_else(|| anyhow!("composed image is not held in memory"))?;
    let path = write_unique(dir, file_name, bytes)
        .with_context(|| format!("Unable to save {file_name}"))?;
    info!(path = %path.display(), "DP saved");
    Ok(path)
}

pub fn open_url(url: &str) -> Result<()> {
    open::that(url).with_context(|| format!("Unable to open {url}"))
}
