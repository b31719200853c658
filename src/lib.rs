pub mod app;
pub mod compose;
pub mod config;
pub mod error;
pub mod export;
pub mod fs_utils;
pub mod geometry;
pub mod gesture;
pub mod image_utils;
pub mod rasterizer;
pub mod restyle;
pub mod session;
pub mod ui;
