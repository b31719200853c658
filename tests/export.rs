use std::fs;

use dpmaker::export::*;
use dpmaker::image_utils::{EncodedImage, ImageMime};
use tempfile::tempdir;

mod common;
use common::with_temp_workdir;

#[test]
fn export_names_follow_the_event_pattern() {
    assert_eq!(
        export_file_name("Ada Lovelace", "DevFestLagos", false),
        "Ada Lovelace-DevFestLagos.png"
    );
    assert_eq!(
        export_file_name("Ada", "DevFestLagos", true),
        "Ada-DevFestLagos-DP.png"
    );
    assert_eq!(share_file_name("Ada", "DevFestLagos"), "DevFestLagos-Ada.png");
}

#[test]
fn unsafe_names_are_sanitised() {
    assert_eq!(
        export_file_name("../a/b", "DevFestLagos", false),
        "_a_b-DevFestLagos.png"
    );
    assert_eq!(export_file_name("   ", "DevFestLagos", false), "DP-DevFestLagos.png");
}

#[test]
fn twitter_share_is_an_intent_url() {
    let action = share_action(
        SharePlatform::Twitter,
        "I'll be at #DevFestLagos2025!",
        "https://devfestlagos.com",
    )
    .unwrap();
    let ShareAction::OpenUrl(url) = action else {
        panic!("expected a link");
    };
    assert!(url.starts_with("https://twitter.com/intent/tweet?"));
    assert!(url.contains("%23DevFestLagos2025"));
    assert!(url.contains("url=https%3A%2F%2Fdevfestlagos.com"));
}

#[test]
fn linkedin_share_carries_only_the_link() {
    let action = share_action(SharePlatform::LinkedIn, "ignored", "https://devfestlagos.com").unwrap();
    assert_eq!(
        action.url(),
        "https://www.linkedin.com/sharing/share-offsite/?url=https%3A%2F%2Fdevfestlagos.com"
    );
}

#[test]
fn instagram_requires_saving_first() {
    let action = share_action(SharePlatform::Instagram, "msg", "https://x").unwrap();
    match action {
        ShareAction::SaveThenOpen { url, instructions } => {
            assert_eq!(url, "https://www.instagram.com");
            assert_eq!(instructions.lines().count(), 4);
        }
        other => panic!("unexpected {other:?}"),
    }
}

#[test]
fn save_image_never_overwrites() {
    let tmp = tempdir().unwrap();
    let image = EncodedImage::new(ImageMime::Png, vec![1u8, 2, 3]);
    let first = save_image(&image, tmp.path(), "Ada-DevFestLagos.png").unwrap();
    let second = save_image(&image, tmp.path(), "Ada-DevFestLagos.png").unwrap();
    assert_ne!(first, second);
    assert_eq!(second.file_name().unwrap(), "Ada-DevFestLagos-1.png");
    assert_eq!(fs::read(&second).unwrap(), vec![1, 2, 3]);
}

#[test]
fn save_image_creates_relative_output_dir() {
    with_temp_workdir(|cwd| {
        let image = EncodedImage::new(ImageMime::Png, vec![0u8; 8]);
        save_image(&image, "out/dp".as_ref(), "Bo-DevFestLagos.png").unwrap();
        assert!(cwd.join("out/dp/Bo-DevFestLagos.png").exists());
    });
}

#[test]
fn remote_images_cannot_be_saved_directly() {
    let tmp = tempdir().unwrap();
    let image = EncodedImage::RemoteRef("https://example.com/a.png".into());
    assert!(save_image(&image, tmp.path(), "a.png").is_err());
}
