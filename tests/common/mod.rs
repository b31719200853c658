#![allow(dead_code)]

use image::{DynamicImage, ImageFormat, Rgba, RgbaImage};
use once_cell::sync::Lazy;
use std::{
    env,
    io::Cursor,
    path::{Path, PathBuf},
    sync::{Mutex, MutexGuard},
};
use tempfile::tempdir;

pub static WORKDIR_GUARD: Lazy<Mutex<()>> = Lazy::new(|| Mutex::new(()));
pub static ENV_GUARD: Lazy<Mutex<()>> = Lazy::new(|| Mutex::new(()));

pub fn with_temp_workdir<F: FnOnce(&Path)>(func: F) {
    let guard = WORKDIR_GUARD
        .lock()
        .unwrap_or_else(|poison| poison.into_inner());
    let temp = tempdir().expect("tempdir");
    let previous = env::current_dir().expect("cwd");
    env::set_current_dir(temp.path()).expect("set cwd");

    struct RestoreCwd {
        previous: PathBuf,
    }

    impl Drop for RestoreCwd {
        fn drop(&mut self) {
            let _ = env::set_current_dir(&self.previous);
        }
    }

    let _restore = RestoreCwd { previous };
    func(temp.path());
    drop(guard);
}

/// Serialises tests that touch process environment variables.
pub fn lock_env() -> MutexGuard<'static, ()> {
    ENV_GUARD
        .lock()
        .unwrap_or_else(|poison| poison.into_inner())
}

pub fn solid_image(width: u32, height: u32, color: [u8; 4]) -> DynamicImage {
    let pixel = Rgba(color);
    let buffer = RgbaImage::from_pixel(width, height, pixel);
    DynamicImage::ImageRgba8(buffer)
}

/// Left half red, right half blue.
pub fn split_image(width: u32, height: u32) -> DynamicImage {
    let buffer = RgbaImage::from_fn(width, height, |x, _| {
        if x < width / 2 {
            Rgba([255, 0, 0, 255])
        } else {
            Rgba([0, 0, 255, 255])
        }
    });
    DynamicImage::ImageRgba8(buffer)
}

pub fn encode_png(image: &DynamicImage) -> Vec<u8> {
    let mut buf = Vec::new();
    image
        .write_to(&mut Cursor::new(&mut buf), ImageFormat::Png)
        .expect("encode png");
    buf
}

pub fn encode_jpeg(image: &DynamicImage) -> Vec<u8> {
    let mut buf = Vec::new();
    DynamicImage::ImageRgb8(image.to_rgb8())
        .write_to(&mut Cursor::new(&mut buf), ImageFormat::Jpeg)
        .expect("encode jpeg");
    buf
}
